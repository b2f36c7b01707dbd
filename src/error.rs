// this_file: src/error.rs
//! Error types for the pixpool library

use thiserror::Error;

/// Main error type for pixpool operations
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input (empty key, unusable buffer, bad dimensions)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid pool configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation that the cache deliberately does not support
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pixpool operations
pub type Result<T> = std::result::Result<T, Error>;
