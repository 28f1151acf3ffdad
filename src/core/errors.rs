//! Error types for the crop pipeline.
//!
//! Every stage of the pipeline reports failures through [`PipelineError`]. The
//! coarse [`ErrorKind`] taxonomy is what callers map onto their own transport
//! codes and what the batch summary records per file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::ConfigError;

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The input bytes are not a supported, well-formed raster image.
    DecodeError,
    /// No contour survived area filtering.
    NoRegionDetected,
    /// Contours exist but none is rectangular enough to be a chip body.
    NoPlausibleChip,
    /// The selected region (or the achievable crop) is below the pixel floor.
    DegenerateGeometry,
    /// A configuration value is out of range.
    InvalidConfiguration,
    /// The cropped image could not be encoded.
    EncodeError,
    /// Reading or writing a file failed.
    IoError,
}

impl ErrorKind {
    /// Stable identifier used in summary tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::NoRegionDetected => "NoRegionDetected",
            ErrorKind::NoPlausibleChip => "NoPlausibleChip",
            ErrorKind::DegenerateGeometry => "DegenerateGeometry",
            ErrorKind::InvalidConfiguration => "InvalidConfiguration",
            ErrorKind::EncodeError => "EncodeError",
            ErrorKind::IoError => "IoError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the crop pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input buffer could not be decoded as an image.
    #[error("image decode")]
    Decode(#[source] image::ImageError),

    /// No candidate contour survived area filtering.
    #[error("no region detected: {contours} contours found, none with area >= {min_area:.1} px")]
    NoRegionDetected {
        /// Number of external contours traced in the mask.
        contours: usize,
        /// Minimum polygon area a contour needed to reach.
        min_area: f32,
    },

    /// Candidates exist but none passes the rectangularity threshold.
    #[error(
        "no plausible chip: {candidates} candidates, best extent {best_extent:.3} below {threshold:.3}"
    )]
    NoPlausibleChip {
        /// Number of candidates that survived area filtering.
        candidates: usize,
        /// Highest extent ratio among them.
        best_extent: f32,
        /// Configured rectangularity threshold.
        threshold: f32,
    },

    /// The selected box or crop window is smaller than the minimum side.
    #[error("degenerate geometry: {width:.1}x{height:.1} px, minimum side is {min_side:.1} px")]
    DegenerateGeometry {
        /// Width of the rejected box.
        width: f32,
        /// Height of the rejected box.
        height: f32,
        /// Configured minimum side.
        min_side: f32,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration")]
    InvalidConfiguration(#[from] ConfigError),

    /// Encoding the cropped image failed.
    #[error("image encode")]
    Encode(#[source] image::ImageError),

    /// A file operation failed.
    #[error("io: {context}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The batch root directory could not be enumerated.
    #[error("cannot enumerate {}", path.display())]
    Enumerate {
        /// The directory that could not be listed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Decode(_) => ErrorKind::DecodeError,
            PipelineError::NoRegionDetected { .. } => ErrorKind::NoRegionDetected,
            PipelineError::NoPlausibleChip { .. } => ErrorKind::NoPlausibleChip,
            PipelineError::DegenerateGeometry { .. } => ErrorKind::DegenerateGeometry,
            PipelineError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            PipelineError::Encode(_) => ErrorKind::EncodeError,
            PipelineError::Io { .. } | PipelineError::Enumerate { .. } => ErrorKind::IoError,
        }
    }

    /// Creates an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a configuration error for an out-of-range value.
    pub fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::InvalidConfiguration(ConfigError::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        })
    }
}

/// Convenient result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
