//! # IC SmartCrop
//!
//! Finds a packaged integrated circuit in a photograph, levels it and cuts it
//! out, reporting its pixel (and optionally physical) dimensions.
//!
//! ## Features
//!
//! - Foreground segmentation with Otsu or adaptive thresholds
//! - Contour ranking that rejects shadows and irregular blobs
//! - Minimum-area oriented boxes with angles folded into `[-45, 45)` degrees
//! - Rotation about the chip center and boundary-safe cropping
//! - Optional projection-profile refinement that trims protruding leads
//! - Parallel directory batches with a per-file summary table
//!
//! ## Modules
//!
//! * [`core`] - Configuration, constants and error handling
//! * [`domain`] - Frames, candidates, oriented boxes and records
//! * [`processors`] - Detection, selection and orientation stages
//! * [`utils`] - Decoding, encoding and the rotate-and-crop transform
//! * [`pipeline`] - The single-image pipeline and the batch driver
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ic_smartcrop::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("capture_20240501_101500.jpg")?;
//! let config = PipelineConfig::default()
//!     .with_margin_px(8)
//!     .with_scale_px_per_mm(Some(42.0));
//!
//! let output = process(&bytes, &config)?;
//! println!(
//!     "{} x {} px at {:.2} deg",
//!     output.record.width_px, output.record.height_px, output.record.angle_deg
//! );
//! std::fs::write("cropped.png", &output.cropped_bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Batch
//!
//! ```rust,no_run
//! use ic_smartcrop::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = process_batch(
//!     Path::new("lots/2024-05"),
//!     Path::new("lots/2024-05-cropped"),
//!     &BatchConfig::default(),
//! )?;
//! println!("{} of {} files cropped", table.succeeded(), table.len());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use ic_smartcrop::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        BatchConfig, BinarizationMethod, ConfigValidator, ErrorKind, OutputFormat, ParallelPolicy,
        PipelineConfig, PipelineError, PipelineResult, Polarity, ProfileRefinement,
        ThresholdSelection,
    };
    pub use crate::domain::{ChipBody, MeasurementRecord, OrientedBox, PackageClass};
    pub use crate::pipeline::{
        BatchRunner, ProcessOutput, SmartCropper, SummaryRow, SummaryTable, process, process_batch,
    };
}
