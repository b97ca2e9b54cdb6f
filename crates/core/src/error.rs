//! Core error types for loading and validating desired state.
//!
//! All errors are explicit and typed. Nothing here reaches the network.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for document operations.
#[derive(Debug, Error)]
pub enum Error {
    // I/O errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    // Parsing errors
    #[error("JSON parse error: {reason}")]
    JsonParseFailed { reason: String },

    // Validation errors
    #[error("invalid desired state ({} problem(s)): {}", errors.len(), errors.join("; "))]
    ValidationFailed { errors: Vec<String> },
}

impl Error {
    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse_failed(reason: impl Into<String>) -> Self {
        Self::JsonParseFailed {
            reason: reason.into(),
        }
    }

    /// Create a validation error from the collected findings.
    pub const fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }
}

/// The standard Result type for document operations.
pub type Result<T> = std::result::Result<T, Error>;
