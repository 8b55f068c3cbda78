//! Error types for the spam-detector-rust library.
//!
//! This module provides custom error types using `thiserror` so callers can
//! tell an invalid request, a broken model bundle, and a persistence failure
//! apart. A classification result stays valid and returnable even when the
//! subsequent write to the history fails.

use thiserror::Error;

/// Errors that can occur in the spam-detector-rust application.
#[derive(Error, Debug)]
pub enum SpamError {
    /// Rejected input: empty or oversized message. Never fatal, the single
    /// request is refused and no classification takes place.
    #[error("Invalid message: {0}")]
    Validation(String),

    /// Classifier or vectorizer artifacts missing or mutually incompatible.
    /// Fatal at startup; surfaced loudly if detected mid-session.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Prediction history storage unavailable or rejecting writes
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database-level errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with SpamError
pub type Result<T> = std::result::Result<T, SpamError>;

impl SpamError {
    /// True if this error rejected a single request rather than the process
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<r2d2::Error> for SpamError {
    fn from(err: r2d2::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for SpamError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
