use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::{KvStore, StorageResult};

const VALUE_EXT: &str = "val";

/// Filesystem-backed key-value medium, one file per key.
///
/// Layout: `<root>/kv/<key>.val`
///
/// Keys are restricted to ASCII alphanumerics plus `_`, `-` and `.` (not
/// leading) so a key always maps to exactly one file inside `kv/`.
pub struct FsKvStore {
    kv_dir: PathBuf,
    max_bytes: Option<u64>,
}

impl FsKvStore {
    /// Create a new `FsKvStore` rooted at `root`. Creates `root/kv/` if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let kv_dir = root.as_ref().join("kv");
        fs::create_dir_all(&kv_dir)?;
        Ok(Self {
            kv_dir,
            max_bytes: None,
        })
    }

    /// Bound the medium to `max_bytes` across all keys and values.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Directory holding the value files.
    pub fn kv_dir(&self) -> &Path {
        &self.kv_dir
    }

    fn value_path(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.kv_dir.join(format!("{key}.{VALUE_EXT}")))
    }

    /// Bytes held by every key other than `skip`, counted as key + value.
    fn used_bytes_excluding(&self, skip: &Path) -> StorageResult<u64> {
        let mut total = 0u64;
        for entry in fs::read_dir(&self.kv_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path == skip || path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXT) {
                continue;
            }
            let key_len = path
                .file_stem()
                .map(|s| s.len() as u64)
                .unwrap_or_default();
            total += key_len + entry.metadata()?.len();
        }
        Ok(total)
    }
}

impl KvStore for FsKvStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.value_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.value_path(key)?;

        if let Some(capacity) = self.max_bytes {
            let requested = self.used_bytes_excluding(&path)? + (key.len() + value.len()) as u64;
            if requested > capacity {
                return Err(StorageError::QuotaExceeded {
                    requested: requested as usize,
                    capacity: capacity as usize,
                });
            }
        }

        // Atomic write: write to temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(&self.kv_dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(key = %key, bytes = value.len(), "kv value written");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.value_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
