//! Structured observability hooks for store lifecycle events.
//!
//! Every mutation outcome emits one event with a stable `event` field so log
//! pipelines can filter on it. Failures that the store absorbs (bad data at
//! load, remote sync errors) are emitted at `warn!`, everything else at
//! `info!`. For JSON output, pass `json = true` to
//! [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

use crate::domain::Plan;

/// RAII guard that tags every log line inside it with the store's data root.
///
/// # Example
///
/// ```ignore
/// let _span = StoreSpan::enter("/home/me/.memvault");
/// ```
pub struct StoreSpan {
    _span: tracing::span::EnteredSpan,
}

impl StoreSpan {
    pub fn enter(location: &str) -> Self {
        let span = tracing::info_span!("memvault.store", location = %location);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: store opened with the state it loaded.
pub fn emit_store_opened(plan: Plan, count: usize) {
    info!(event = "store.opened", plan = %plan, count = count);
}

/// Emit event: a memory was saved and persisted.
pub fn emit_memory_saved(memory_id: &str, count: usize, plan: Plan) {
    info!(event = "memory.saved", memory_id = %memory_id, count = count, plan = %plan);
}

/// Emit event: a save was refused because the free tier is full.
pub fn emit_memory_rejected(count: usize, limit: usize) {
    info!(event = "memory.rejected", count = count, limit = limit);
}

/// Emit event: a memory was deleted and the list persisted.
pub fn emit_memory_deleted(memory_id: &str, count: usize) {
    info!(event = "memory.deleted", memory_id = %memory_id, count = count);
}

/// Emit event: the plan changed.
pub fn emit_plan_changed(from: Plan, to: Plan, count: usize) {
    info!(event = "plan.changed", from = %from, to = %to, count = count);
}

/// Emit event: a write to the medium failed and the in-memory change was undone.
pub fn emit_write_failed(key: &str, error: &dyn std::fmt::Display) {
    warn!(event = "storage.write_failed", key = %key, error = %error);
}

/// Emit event: persisted data under `key` was unusable and a default was used.
pub fn emit_load_recovered(key: &str, error: &dyn std::fmt::Display) {
    warn!(event = "storage.load_recovered", key = %key, error = %error);
}

/// Emit event: a remote sync task failed. The local write already succeeded.
pub fn emit_sync_failed(op: &str, memory_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "sync.failed", op = %op, memory_id = %memory_id, error = %error);
}

/// Emit event: remote sync was skipped because no runtime was available.
pub fn emit_sync_skipped(op: &str, memory_id: &str) {
    warn!(event = "sync.skipped", op = %op, memory_id = %memory_id, reason = "no tokio runtime");
}
