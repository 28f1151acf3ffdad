//! Batch and parallel processing configuration types.

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigValidator};
use super::pipeline::PipelineConfig;
use crate::core::constants::{
    DEFAULT_PARALLEL_THRESHOLD, DEFAULT_SUMMARY_FILE_NAME, SUPPORTED_EXTENSIONS,
};

/// Configuration for parallel processing behavior of the batch runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of worker threads.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Batches with at most this many files are processed sequentially.
    #[serde(default = "ParallelPolicy::default_batch_threshold")]
    pub batch_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the batch processing threshold.
    pub fn with_batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold;
        self
    }

    fn default_batch_threshold() -> usize {
        DEFAULT_PARALLEL_THRESHOLD
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            batch_threshold: Self::default_batch_threshold(),
        }
    }
}

/// Configuration of a directory batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Configuration applied to every file.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Worker pool settings.
    #[serde(default)]
    pub parallel: ParallelPolicy,

    /// Extensions (without dot) of the files to process.
    #[serde(default = "BatchConfig::default_extensions")]
    pub extensions: Vec<String>,

    /// Name of the summary table written under the output root.
    #[serde(default = "BatchConfig::default_summary_file_name")]
    pub summary_file_name: String,
}

impl BatchConfig {
    /// Create a new BatchConfig around a pipeline configuration.
    pub fn new(pipeline: PipelineConfig) -> Self {
        Self {
            pipeline,
            ..Self::default()
        }
    }

    /// Set the parallel policy.
    pub fn with_parallel(mut self, parallel: ParallelPolicy) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns true when `ext` is one of the configured extensions.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    fn default_extensions() -> Vec<String> {
        SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    fn default_summary_file_name() -> String {
        DEFAULT_SUMMARY_FILE_NAME.to_string()
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            parallel: ParallelPolicy::default(),
            extensions: Self::default_extensions(),
            summary_file_name: Self::default_summary_file_name(),
        }
    }
}

impl ConfigValidator for BatchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        if self.parallel.max_threads == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "parallel.max_threads",
                value: "0".to_string(),
                expected: "at least one thread",
            });
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "no file extensions configured".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let config = BatchConfig::default();
        assert!(config.accepts_extension("JPG"));
        assert!(config.accepts_extension("tiff"));
        assert!(!config.accepts_extension("txt"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = BatchConfig::default()
            .with_parallel(ParallelPolicy::new().with_max_threads(Some(0)));
        assert!(config.validate().is_err());
    }
}
