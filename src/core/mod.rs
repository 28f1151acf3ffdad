//! The core module of the crop pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Configuration management
//! - Constants used throughout the pipeline
//! - Error handling

pub mod config;
pub mod constants;
pub mod errors;

pub use config::{
    BatchConfig, BinarizationMethod, ConfigError, ConfigValidator, OutputFormat, ParallelPolicy,
    PipelineConfig, Polarity, ProfileRefinement, ThresholdSelection,
};
pub use constants::*;
pub use errors::{ErrorKind, PipelineError, PipelineResult};
