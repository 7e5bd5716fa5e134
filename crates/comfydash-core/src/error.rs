//! Error types for the ComfyDash scanner.
//!
//! Only scan-level failures are represented here. Problems with individual
//! files never become a `ScanError`; they are reported as skipped entries on
//! the scan outcome and logged.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the scanner core.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("Root is not a directory: {0}")]
    NotADirectory(PathBuf),

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Scan cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, ScanError>;

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ScanError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ScanError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// True for root errors: the scan produced no catalog at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::RootNotFound(_) | ScanError::NotADirectory(_))
    }
}
