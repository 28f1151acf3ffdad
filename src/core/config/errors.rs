//! Configuration error types and validation traits.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A numeric field lies outside its allowed range.
    #[error("{field} = {value} is out of range, expected {expected}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value, formatted.
        value: String,
        /// Human readable description of the allowed range.
        expected: &'static str,
    },

    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A configuration file could not be parsed.
    #[error("malformed configuration")]
    Parse(#[from] serde_json::Error),
}

/// A trait for validating configuration parameters.
///
/// Implemented by every configuration value the pipeline accepts, so callers
/// can reject bad input before any image work starts.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Checks that `value` lies in the open interval `(0, 1)`.
    fn validate_unit_open(&self, field: &'static str, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value: value.to_string(),
                expected: "a value in (0, 1)",
            })
        }
    }

    /// Checks that `value` is finite and strictly positive.
    fn validate_positive(&self, field: &'static str, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value: value.to_string(),
                expected: "a finite value > 0",
            })
        }
    }

    /// Checks that `value` is finite and not negative.
    fn validate_non_negative(&self, field: &'static str, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value: value.to_string(),
                expected: "a finite value >= 0",
            })
        }
    }
}
