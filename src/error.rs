//! Error types for the memory bank.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the memory bank.
#[derive(Error, Debug)]
pub enum Error {
    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Path escapes project root: {0}")]
    OutsideProject(String),

    // File store errors
    #[error("Write conflict on {path}: expected {expected}, found {actual}")]
    Conflict {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Timed out waiting for lock on {0}")]
    LockTimeout(String),

    #[error("Unresolved merge conflict markers in {0}")]
    ConflictMarkers(String),

    // Snapshot errors
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Snapshot corrupted: {path} (expected {expected}, found {actual})")]
    SnapshotCorrupted {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Snapshot hash does not match content for {0}")]
    SnapshotHashMismatch(String),

    // Suggestion / operation errors
    #[error("Invalid suggestion: {0}")]
    InvalidSuggestion(String),

    #[error("Execute operation failed: {0}")]
    ExecuteError(String),

    // History errors
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("Failed to persist history {path}: {source}")]
    HistoryPersistence {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
