//! Domain-level structures shared across the crop pipeline.
//!
//! Each value here is scoped to a single pipeline invocation; nothing is
//! shared between invocations.

pub mod artifact;
pub mod body;
pub mod candidate;
pub mod frame;
pub mod orientation;

pub use artifact::{CroppedArtifact, MeasurementRecord};
pub use body::{ChipBody, PackageClass};
pub use candidate::Candidate;
pub use frame::{ForegroundMask, RawFrame};
pub use orientation::{OrientedBox, normalize_angle};
