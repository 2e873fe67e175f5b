//! Remote mirroring for premium stores.
//!
//! The store never waits on the remote side. [`SyncDispatcher`] hands each
//! push or remove to the tokio runtime as a detached task; a failed task only
//! produces a `sync.failed` log line. Callers that are about to exit can
//! await [`SyncDispatcher::flush`] to let in-flight tasks finish.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use memvault_core::sync::{LoggingSync, SyncDispatcher};
//!
//! // Must be called from inside a tokio runtime.
//! let dispatcher = SyncDispatcher::new(Arc::new(LoggingSync));
//! let store = QuotaStore::builder(kv).remote_sync(dispatcher).build();
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::Memory;
use crate::obs;

/// Errors a remote collaborator may report. Never surfaced to store callers.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    #[error("remote rejected {op}: {reason}")]
    Rejected { op: &'static str, reason: String },
}

/// Remote store the premium tier mirrors into.
///
/// Contract:
/// - `push` upserts by `memory.id`.
/// - `remove` on an unknown id is not an error.
/// - Neither is retried by the caller.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    async fn push(&self, memory: &Memory) -> Result<(), SyncError>;

    async fn remove(&self, id: &str) -> Result<(), SyncError>;
}

/// Accepts everything and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSync;

#[async_trait]
impl RemoteSync for NoopSync {
    async fn push(&self, _memory: &Memory) -> Result<(), SyncError> {
        Ok(())
    }

    async fn remove(&self, _id: &str) -> Result<(), SyncError> {
        Ok(())
    }
}

/// Stand-in backend: records each call in the log and succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSync;

#[async_trait]
impl RemoteSync for LoggingSync {
    async fn push(&self, memory: &Memory) -> Result<(), SyncError> {
        info!(event = "sync.push", memory_id = %memory.id, fields = memory.fields.len());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), SyncError> {
        info!(event = "sync.remove", memory_id = %id);
        Ok(())
    }
}

/// Fire-and-forget submitter for remote sync work.
#[derive(Clone)]
pub struct SyncDispatcher {
    remote: Option<Arc<dyn RemoteSync>>,
    runtime: Option<Handle>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SyncDispatcher {
    /// Dispatch onto the runtime the caller is currently inside, if any.
    pub fn new(remote: Arc<dyn RemoteSync>) -> Self {
        Self {
            remote: Some(remote),
            runtime: Handle::try_current().ok(),
            pending: Arc::default(),
        }
    }

    /// Dispatch onto an explicit runtime.
    pub fn with_runtime(remote: Arc<dyn RemoteSync>, runtime: Handle) -> Self {
        Self {
            remote: Some(remote),
            runtime: Some(runtime),
            pending: Arc::default(),
        }
    }

    /// A dispatcher with no remote. Submissions are dropped silently.
    pub fn disabled() -> Self {
        Self {
            remote: None,
            runtime: None,
            pending: Arc::default(),
        }
    }

    /// Whether submitted work will actually run.
    pub fn is_active(&self) -> bool {
        self.remote.is_some() && self.runtime.is_some()
    }

    /// Submit an upsert of `memory`. Returns immediately.
    pub fn push(&self, memory: Memory) {
        let Some((remote, runtime)) = self.target("push", &memory.id) else {
            return;
        };
        let task = runtime.spawn(async move {
            match remote.push(&memory).await {
                Ok(()) => debug!(memory_id = %memory.id, "remote push completed"),
                Err(err) => obs::emit_sync_failed("push", &memory.id, &err),
            }
        });
        self.track(task);
    }

    /// Submit a remote delete of `id`. Returns immediately.
    pub fn remove(&self, id: String) {
        let Some((remote, runtime)) = self.target("remove", &id) else {
            return;
        };
        let task = runtime.spawn(async move {
            match remote.remove(&id).await {
                Ok(()) => debug!(memory_id = %id, "remote remove completed"),
                Err(err) => obs::emit_sync_failed("remove", &id, &err),
            }
        });
        self.track(task);
    }

    /// Wait for every task submitted so far, through this dispatcher or any
    /// clone of it. Short-lived processes call this before exiting so the
    /// runtime does not cancel in-flight remote work.
    pub async fn flush(&self) {
        let tasks = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for task in tasks {
            if let Err(err) = task.await {
                debug!(error = %err, "remote sync task did not complete");
            }
        }
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.retain(|t| !t.is_finished());
        pending.push(task);
    }

    fn target(&self, op: &'static str, id: &str) -> Option<(Arc<dyn RemoteSync>, &Handle)> {
        let remote = self.remote.as_ref()?;
        match &self.runtime {
            Some(runtime) => Some((Arc::clone(remote), runtime)),
            None => {
                obs::emit_sync_skipped(op, id);
                None
            }
        }
    }
}

impl Default for SyncDispatcher {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for SyncDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDispatcher")
            .field("active", &self.is_active())
            .finish()
    }
}
