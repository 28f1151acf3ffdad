//! Configuration management for the crop pipeline.
//!
//! This module provides configuration types and validation traits for single
//! pipeline runs and for directory batches.

pub mod errors;
pub mod parallel;
pub mod pipeline;

// Re-export commonly used types
pub use errors::{ConfigError, ConfigValidator};
pub use parallel::{BatchConfig, ParallelPolicy};
pub use pipeline::{
    BinarizationMethod, OutputFormat, PipelineConfig, Polarity, ProfileRefinement,
    ThresholdSelection,
};
