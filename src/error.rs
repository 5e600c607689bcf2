//! Error types for tiergate
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in tiergate
#[derive(Debug, Error)]
pub enum TierGateError {
    /// Invalid configuration, raised at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A validator failed in a way it could not recover from
    #[error("Validator error: {0}")]
    Validator(String),

    /// A reporter or sink failed to deliver
    #[error("Reporter error: {0}")]
    Reporter(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TierGateError {
    /// Shorthand for an [`TierGateError::InvalidConfig`] error.
    pub fn config(msg: impl Into<String>) -> Self {
        TierGateError::InvalidConfig(msg.into())
    }
}

/// Result type alias for tiergate operations
pub type Result<T> = std::result::Result<T, TierGateError>;
