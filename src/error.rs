//! Error types for Tapedeck

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for Tapedeck operations
pub type Result<T> = std::result::Result<T, TapedeckError>;

/// Errors that can occur in Tapedeck
#[derive(Debug, Error)]
pub enum TapedeckError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Recording meta file exists but cannot be parsed
    #[error("Malformed recording at {}: {reason}", path.display())]
    MalformedRecording {
        /// Path of the offending meta file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Response header that cannot be represented as a string pair
    #[error("Unsupported header: {0}")]
    UnsupportedHeader(String),

    /// A rule's key maker failed
    #[error("Key maker failed: {0}")]
    KeyMaker(String),

    /// Live dispatch failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// URL could not be resolved or parsed
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as given
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
