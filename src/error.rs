//! Error types for bangumi-mcp
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while serving tool calls
#[derive(Debug, Error)]
pub enum BangumiError {
    /// A required argument is missing or has the wrong type
    #[error("{0}")]
    InvalidArgument(String),

    /// The backend answered with a body that violates its documented shape
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Network or HTTP client failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed protocol message from the caller
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration could not be resolved
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BangumiError {
    /// Shorthand for a missing required argument
    pub fn missing(name: &str) -> Self {
        Self::InvalidArgument(format!("{} parameter is required", name))
    }

    /// Whether this error is a caller mistake rather than a fault
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Result type alias for bangumi-mcp operations
pub type Result<T> = std::result::Result<T, BangumiError>;
