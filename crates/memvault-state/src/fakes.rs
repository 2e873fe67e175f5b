//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryKvStore`, which satisfies the `KvStore` contract without
//! touching the filesystem and can be switched into the failure modes a real
//! browser-style medium exhibits: full, or disabled outright.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryKvStore
// ---------------------------------------------------------------------------

/// In-memory key-value medium backed by a `HashMap<key, value>`.
///
/// The optional byte budget counts `key.len() + value.len()` over every
/// entry, checked against the state the map would be in after the write.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
    capacity: Option<usize>,
    disabled: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A medium that rejects writes once it would hold more than `bytes`.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            capacity: Some(bytes),
            ..Self::default()
        }
    }

    /// Seed a key without counting it as a write or checking capacity.
    pub fn seed(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
    }

    /// Make every subsequent `set`/`remove` fail with `Unavailable`.
    /// Reads keep working.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    /// Number of successful `set`/`remove` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of the raw value under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).cloned()
    }

    fn used_bytes_with(entries: &HashMap<String, String>, key: &str, value: &str) -> usize {
        let others: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        others + key.len() + value.len()
    }

    fn check_enabled(&self) -> StorageResult<()> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "in-memory medium is disabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_enabled()?;
        let mut entries = self.entries.lock().unwrap();
        if let Some(capacity) = self.capacity {
            let requested = Self::used_bytes_with(&entries, key, value);
            if requested > capacity {
                return Err(StorageError::QuotaExceeded {
                    requested,
                    capacity,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.check_enabled()?;
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_does_not_count_as_write() {
        let store = MemoryKvStore::new();
        store.seed("k", "v");
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn capacity_counts_replacement_not_sum() {
        let store = MemoryKvStore::with_capacity(10);
        store.set("k", "123456789").unwrap();
        // Overwriting the same key replaces its bytes rather than adding.
        store.set("k", "abcdefghi").unwrap();
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn disabled_blocks_writes_but_not_reads() {
        let store = MemoryKvStore::new();
        store.set("k", "v").unwrap();
        store.set_disabled(true);
        assert!(matches!(
            store.set("k", "w"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.remove("k").is_err());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.set_disabled(false);
        store.set("k", "w").unwrap();
        assert_eq!(store.raw("k").as_deref(), Some("w"));
    }
}
