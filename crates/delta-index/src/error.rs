//! Error types for the index crate.

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The trailing checksum does not match the file contents.
    #[error("index checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },

    /// The index file is structurally invalid.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// The specified path was not found in the index.
    #[error("path not found in index: {0}")]
    PathNotFound(String),

    /// A path that cannot be represented in the index format.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Reading or writing the index or the working copy failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
