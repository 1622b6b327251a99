//! Error types for annotation format operations.
//!
//! `FormatError` covers hard failures only: I/O problems, a destination
//! that cannot be written, or a source that is not the kind of path the
//! codec expects. Data validation problems never become a `FormatError`;
//! they are collected as [`ErrorEntry`](crate::format::ErrorEntry) values
//! inside the operation report so one bad file never aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during annotation import/export operations.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid invocation (wrong kind of source/destination path, etc.)
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Source path does not exist or is not the expected kind of path
    #[error("Invalid source path: {path:?}")]
    InvalidSource {
        /// The offending path
        path: PathBuf,
    },
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create an invalid source path error.
    pub fn invalid_source(path: impl Into<PathBuf>) -> Self {
        Self::InvalidSource { path: path.into() }
    }
}
