//! Error taxonomy for Stagewatch.
//!
//! The viewing core never fails on log input. Errors only arise at the
//! configuration and persistence boundaries.

use crate::preferences::PreferenceError;

/// Errors produced by viewer configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,

    #[error("scroll threshold must be a finite, non-negative number, got {0}")]
    InvalidThreshold(f64),
}

/// Stagewatch errors.
#[derive(Debug, thiserror::Error)]
pub enum StagewatchError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("preference storage error: {0}")]
    Preference(#[from] PreferenceError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Stagewatch operations.
pub type Result<T> = std::result::Result<T, StagewatchError>;
