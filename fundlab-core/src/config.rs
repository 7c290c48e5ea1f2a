//! Construction-time validation errors shared by every configurable component.

use thiserror::Error;

/// Invalid parameters. Raised when a component is built or a config is
/// validated, never clamped silently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window size must be positive, got {0}")]
    InvalidWindow(usize),

    #[error("{name} threshold {value} is outside [0, 100]")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be non-negative, got {value}")]
    NegativeAmount { name: &'static str, value: f64 },

    #[error("{name} fraction {value} is outside (0, 1]")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Check that a percentile threshold lies in `[0, 100]`.
pub(crate) fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, value })
    }
}

pub(crate) fn check_amount(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeAmount { name, value })
    }
}

pub(crate) fn check_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidFraction { name, value })
    }
}
