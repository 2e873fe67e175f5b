//! Error types for memvault-state

use thiserror::Error;

/// Errors that can occur in the key-value persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would push the medium past its byte budget
    #[error("storage quota exceeded: writing {requested} bytes would exceed the {capacity} byte budget")]
    QuotaExceeded { requested: usize, capacity: usize },

    /// The medium refuses reads or writes (disabled, private mode, read-only)
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Key is not usable as a storage key
    #[error("invalid storage key: {key:?}")]
    InvalidKey { key: String },

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded before writing
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
