//! Domain-level error taxonomy for memvault.

use memvault_state::StorageError;
use serde::Serialize;

/// Discriminant carried by every [`QuotaError`], stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FreeLimitExceeded,
    StorageError,
}

impl ErrorKind {
    /// Wire code shown to UIs and logs.
    pub fn as_code(&self) -> &'static str {
        match self {
            ErrorKind::FreeLimitExceeded => "FREE_LIMIT_EXCEEDED",
            ErrorKind::StorageError => "STORAGE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

/// Structured failure of a store mutation.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// Save rejected before any mutation: the free tier is full.
    #[error("The free plan can store up to {limit} memories. Upgrade to premium to save more.")]
    FreeLimitExceeded { current_count: usize, limit: usize },

    /// The storage medium refused the write.
    #[error("Failed to write to storage: {source}")]
    Storage {
        #[from]
        source: StorageError,
    },
}

impl QuotaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuotaError::FreeLimitExceeded { .. } => ErrorKind::FreeLimitExceeded,
            QuotaError::Storage { .. } => ErrorKind::StorageError,
        }
    }

    /// Human-readable message for display.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<serde_json::Error> for QuotaError {
    fn from(err: serde_json::Error) -> Self {
        QuotaError::Storage {
            source: StorageError::from(err),
        }
    }
}

/// Result type for memvault domain operations.
pub type Result<T> = std::result::Result<T, QuotaError>;
