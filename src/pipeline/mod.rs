//! The crop pipeline and its drivers.
//!
//! [`SmartCropper`] runs the stages on one image. [`BatchRunner`] wraps it
//! for directory trees, with per-file isolation and a summary table.

pub mod batch;
pub mod cropper;
pub mod measurement;
pub mod stats;
pub mod summary;

pub use batch::{BatchRunner, process_batch};
pub use cropper::{ProcessOutput, SmartCropper, cropped_file_name, process};
pub use measurement::measure;
pub use stats::{BatchStats, StatsManager};
pub use summary::{RowStatus, SUMMARY_HEADER, SummaryRow, SummaryTable};
