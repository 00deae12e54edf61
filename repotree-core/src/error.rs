//! Error types for repotree

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for repotree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for repotree operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid ignore pattern
    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Git command or library failure
    #[error("Git error: {0}")]
    Git(String),

    /// A scan root could not be traversed at all
    #[error("Cannot scan {}: {message}", .root.display())]
    Unreadable {
        /// The root that failed
        root: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// Repository store failure
    #[error("Store error: {0}")]
    Store(String),

    /// The scan was cancelled before it completed
    #[error("Scan cancelled")]
    Cancelled,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<git2::Error> for Error {
    fn from(e: git2::Error) -> Self {
        Error::Git(e.message().to_string())
    }
}
