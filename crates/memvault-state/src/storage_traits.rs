//! Storage trait definitions for memvault
//!
//! `KvStore` is the only persistence abstraction the quota store depends on:
//! a flat map from string keys to string values, read and written whole.
//!
//! The trait is synchronous. Every mutation of the record list is flushed
//! before the mutating call returns, so there is nothing to overlap. In-memory
//! fakes are provided for testing via the `fakes` module.

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// KvStore: String Key-Value Medium
// ---------------------------------------------------------------------------

/// Size-bounded string key-value medium.
///
/// Guarantees:
/// - `get(key)` returns the exact value last passed to `set(key, ..)`.
/// - `get` on a key never written returns `Ok(None)`, not an error.
/// - A failed `set` leaves the previous value for that key intact.
/// - `remove` on an absent key is a no-op.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. No-op if absent.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: KvStore + ?Sized> KvStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}
