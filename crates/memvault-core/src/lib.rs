//! Memvault Core Library
//!
//! A local record store with tiered quota enforcement. Free stores hold at
//! most [`FREE_LIMIT`] memories; premium stores are unbounded and mirror
//! every save and delete to a remote collaborator in the background.
//!
//! ```rust,ignore
//! use memvault_core::{QuotaStore, Plan};
//! use memvault_state::FsKvStore;
//!
//! let mut store = QuotaStore::open(FsKvStore::new(".memvault")?);
//! let saved = store.save(serde_json::json!({"text": "hello"}).as_object().cloned().unwrap())?;
//! println!("{} of {}", saved.current_count, store.usage_stats().limit);
//! ```

pub mod config;
pub mod domain;
pub mod notify;
pub mod obs;
pub mod quota_store;
pub mod sync;
pub mod telemetry;

pub use config::{ConfigError, QuotaLimits, StoreConfig};
pub use domain::{
    ErrorKind, Limit, Memory, MemoryFields, ParsePlanError, Plan, QuotaError, Result, SavedMemory,
    StorageWarning, UsageStats, FREE_LIMIT, WARNING_THRESHOLD,
};
pub use notify::{BroadcastSink, NoopSink, PlanChangeSink, PlanChanged};
pub use quota_store::{QuotaStore, QuotaStoreBuilder, MEMORIES_KEY, PLAN_KEY};
pub use sync::{LoggingSync, NoopSync, RemoteSync, SyncDispatcher, SyncError};
pub use telemetry::init_tracing;

pub use memvault_state::{FsKvStore, KvStore, StorageError};

/// Builder for a file-backed store laid out as described by `config`.
pub fn fs_store_builder(
    config: &StoreConfig,
) -> std::result::Result<QuotaStoreBuilder<FsKvStore>, StorageError> {
    let mut kv = FsKvStore::new(&config.data_dir)?;
    if let Some(max_bytes) = config.max_bytes {
        kv = kv.with_max_bytes(max_bytes);
    }
    Ok(QuotaStore::builder(kv).limits(config.limits))
}
