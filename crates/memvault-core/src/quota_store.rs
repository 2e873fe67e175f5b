//! Quota-enforced local persistence for memory records.
//!
//! [`QuotaStore`] mirrors two keys of a [`KvStore`]:
//!
//! - `userPlan`: `"free"` or `"premium"` (absent means free)
//! - `memories`: JSON array of records in insertion order (absent means empty)
//!
//! The list is loaded once at construction and rewritten whole on every
//! successful mutation. When a write fails, the in-memory change is undone
//! before the error is returned, so the list in memory always equals the
//! last list the medium accepted.
//!
//! The store assumes it is the only writer of these keys. Two processes
//! sharing one medium will overwrite each other's lists.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use memvault_state::KvStore;
use serde_json::Value;
use tracing::instrument;

use crate::config::QuotaLimits;
use crate::domain::{
    Memory, MemoryFields, Plan, QuotaError, Result, SavedMemory, StorageWarning, UsageStats,
};
use crate::notify::{NoopSink, PlanChangeSink, PlanChanged};
use crate::obs;
use crate::sync::SyncDispatcher;

/// Storage key holding the plan literal.
pub const PLAN_KEY: &str = "userPlan";

/// Storage key holding the JSON record list.
pub const MEMORIES_KEY: &str = "memories";

/// Issues millisecond-timestamp ids that never repeat within a store.
#[derive(Debug, Default)]
struct IdSequence {
    last: i64,
}

impl IdSequence {
    /// Start after the largest numeric id already present.
    fn seeded(memories: &[Memory]) -> Self {
        let last = memories
            .iter()
            .filter_map(|m| m.id.parse::<i64>().ok())
            .max()
            .unwrap_or_default();
        Self { last }
    }

    /// Next id at or after `now_ms`. When the numeric sequence is exhausted
    /// or the candidate is already `taken`, a `-<n>` suffix disambiguates.
    fn next(&mut self, now_ms: i64, taken: impl Fn(&str) -> bool) -> String {
        let base = match self.last.checked_add(1) {
            Some(after) => now_ms.max(after),
            None => self.last,
        };
        self.last = base;

        let mut id = base.to_string();
        let mut suffix = 1u32;
        while taken(&id) {
            id = format!("{base}-{suffix}");
            suffix += 1;
        }
        id
    }
}

/// Builder for [`QuotaStore`].
pub struct QuotaStoreBuilder<K: KvStore> {
    kv: K,
    limits: QuotaLimits,
    sync: SyncDispatcher,
    sink: Arc<dyn PlanChangeSink>,
}

impl<K: KvStore> QuotaStoreBuilder<K> {
    pub fn limits(mut self, limits: QuotaLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Mirror premium writes through `sync`. Without this no remote is reached.
    pub fn remote_sync(mut self, sync: SyncDispatcher) -> Self {
        self.sync = sync;
        self
    }

    pub fn plan_sink(mut self, sink: impl PlanChangeSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Load state from the medium and return the ready store.
    pub fn build(self) -> QuotaStore<K> {
        let plan = load_plan(&self.kv);
        let memories = load_memories(&self.kv);
        obs::emit_store_opened(plan, memories.len());

        QuotaStore {
            ids: IdSequence::seeded(&memories),
            kv: self.kv,
            plan,
            memories,
            limits: self.limits,
            sync: self.sync,
            sink: self.sink,
        }
    }
}

/// Record store enforcing the free-tier ceiling.
pub struct QuotaStore<K: KvStore> {
    kv: K,
    plan: Plan,
    memories: Vec<Memory>,
    limits: QuotaLimits,
    sync: SyncDispatcher,
    sink: Arc<dyn PlanChangeSink>,
    ids: IdSequence,
}

impl<K: KvStore> QuotaStore<K> {
    /// Open with default limits, no remote sync and no plan listener.
    pub fn open(kv: K) -> Self {
        Self::builder(kv).build()
    }

    pub fn builder(kv: K) -> QuotaStoreBuilder<K> {
        QuotaStoreBuilder {
            kv,
            limits: QuotaLimits::default(),
            sync: SyncDispatcher::disabled(),
            sink: Arc::new(NoopSink),
        }
    }

    pub fn plan(&self) -> Plan {
        self.plan
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// All records in insertion order.
    pub fn list(&self) -> &[Memory] {
        &self.memories
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Look up a record by exact id.
    pub fn get(&self, id: &str) -> Option<&Memory> {
        self.memories.iter().find(|m| m.id == id)
    }

    /// Persist and switch to `plan`, then notify the plan sink.
    ///
    /// On a failed write the plan is unchanged and nobody is notified.
    #[instrument(skip(self), fields(from = %self.plan))]
    pub fn set_plan(&mut self, plan: Plan) -> Result<PlanChanged> {
        if let Err(err) = self.kv.set(PLAN_KEY, plan.as_str()) {
            obs::emit_write_failed(PLAN_KEY, &err);
            return Err(err.into());
        }

        let previous = std::mem::replace(&mut self.plan, plan);
        obs::emit_plan_changed(previous, plan, self.memories.len());

        let event = PlanChanged {
            plan,
            usage: self.usage_stats(),
        };
        self.sink.notify(&event);
        Ok(event)
    }

    /// Append a new record built from `fields`.
    ///
    /// Any `id`/`createdAt` in `fields` is discarded; both are assigned here.
    #[instrument(skip(self, fields), fields(plan = %self.plan, count = self.memories.len()))]
    pub fn save(&mut self, fields: MemoryFields) -> Result<SavedMemory> {
        let count = self.memories.len();
        if self.plan == Plan::Free && count >= self.limits.free_limit {
            obs::emit_memory_rejected(count, self.limits.free_limit);
            return Err(QuotaError::FreeLimitExceeded {
                current_count: count,
                limit: self.limits.free_limit,
            });
        }

        let now = Utc::now().trunc_subsecs(3);
        let memories = &self.memories;
        let id = self
            .ids
            .next(now.timestamp_millis(), |id| memories.iter().any(|m| m.id == id));
        let memory = Memory::new(id, now, fields);
        self.memories.push(memory.clone());

        if let Err(err) = self.flush_memories() {
            self.memories.pop();
            obs::emit_write_failed(MEMORIES_KEY, &err);
            return Err(err);
        }

        if self.plan.syncs_remotely() {
            self.sync.push(memory.clone());
        }

        obs::emit_memory_saved(&memory.id, self.memories.len(), self.plan);
        Ok(SavedMemory {
            memory,
            current_count: self.memories.len(),
        })
    }

    /// Remove the record with `id`.
    ///
    /// Returns `Ok(false)` without touching the medium when no record
    /// matches. A failed write restores the record at its old position.
    #[instrument(skip(self), fields(plan = %self.plan))]
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.memories.iter().position(|m| m.id == id) else {
            return Ok(false);
        };

        let removed = self.memories.remove(index);
        if let Err(err) = self.flush_memories() {
            self.memories.insert(index, removed);
            obs::emit_write_failed(MEMORIES_KEY, &err);
            return Err(err);
        }

        if self.plan.syncs_remotely() {
            self.sync.remove(removed.id.clone());
        }

        obs::emit_memory_deleted(&removed.id, self.memories.len());
        Ok(true)
    }

    /// Current usage against the plan's ceiling. No side effects.
    pub fn usage_stats(&self) -> UsageStats {
        UsageStats::compute(self.plan, self.memories.len(), self.limits.free_limit)
    }

    /// Capacity warning for display. No side effects.
    pub fn check_storage_warning(&self) -> StorageWarning {
        StorageWarning::evaluate(
            self.plan,
            self.memories.len(),
            self.limits.free_limit,
            self.limits.warning_threshold,
        )
    }

    fn flush_memories(&self) -> Result<()> {
        let encoded = serde_json::to_string(&self.memories)?;
        self.kv.set(MEMORIES_KEY, &encoded)?;
        Ok(())
    }
}

impl<K: KvStore> std::fmt::Debug for QuotaStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaStore")
            .field("plan", &self.plan)
            .field("count", &self.memories.len())
            .field("limits", &self.limits)
            .field("sync", &self.sync)
            .finish()
    }
}

fn load_plan(kv: &impl KvStore) -> Plan {
    match kv.get(PLAN_KEY) {
        Ok(None) => Plan::default(),
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|err| {
            obs::emit_load_recovered(PLAN_KEY, &err);
            Plan::default()
        }),
        Err(err) => {
            obs::emit_load_recovered(PLAN_KEY, &err);
            Plan::default()
        }
    }
}

/// Unreadable or non-array data loads as an empty list. Inside a valid array,
/// entries that are not records, or whose id is empty or already seen, are
/// skipped individually.
fn load_memories(kv: &impl KvStore) -> Vec<Memory> {
    let raw = match kv.get(MEMORIES_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            obs::emit_load_recovered(MEMORIES_KEY, &err);
            return Vec::new();
        }
    };

    let entries: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(err) => {
            obs::emit_load_recovered(MEMORIES_KEY, &err);
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut memories = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Memory>(entry) {
            Ok(memory) if !memory.id.is_empty() && seen.insert(memory.id.clone()) => {
                memories.push(memory)
            }
            Ok(memory) => obs::emit_load_recovered(
                MEMORIES_KEY,
                &format!("entry {position}: empty or duplicate id {:?}", memory.id),
            ),
            Err(err) => {
                obs::emit_load_recovered(MEMORIES_KEY, &format!("entry {position}: {err}"))
            }
        }
    }
    memories
}

#[cfg(test)]
mod tests {
    use super::*;
    use memvault_state::fakes::MemoryKvStore;

    #[test]
    fn test_id_sequence_is_strictly_increasing() {
        let mut ids = IdSequence::default();
        let free = |_: &str| false;
        assert_eq!(ids.next(1000, free), "1000");
        assert_eq!(ids.next(1000, free), "1001");
        assert_eq!(ids.next(999, free), "1002");
        assert_eq!(ids.next(5000, free), "5000");
    }

    #[test]
    fn test_id_sequence_suffixes_when_exhausted() {
        let mut ids = IdSequence { last: i64::MAX };
        let max = i64::MAX.to_string();
        let taken = |id: &str| id == max;
        assert_eq!(ids.next(1000, taken), format!("{max}-1"));

        let taken = |id: &str| id == max || id == format!("{max}-1");
        assert_eq!(ids.next(1000, taken), format!("{max}-2"));
    }

    #[test]
    fn test_id_sequence_seeds_past_loaded_ids() {
        let at = Utc::now();
        let loaded = vec![
            Memory::new("2000", at, MemoryFields::new()),
            Memory::new("legacy-id", at, MemoryFields::new()),
            Memory::new("1500", at, MemoryFields::new()),
        ];
        let mut ids = IdSequence::seeded(&loaded);
        assert_eq!(ids.next(10, |_| false), "2001");
    }

    #[test]
    fn test_load_plan_defaults() {
        let kv = MemoryKvStore::new();
        assert_eq!(load_plan(&kv), Plan::Free);
        kv.seed(PLAN_KEY, "premium");
        assert_eq!(load_plan(&kv), Plan::Premium);
        kv.seed(PLAN_KEY, "platinum");
        assert_eq!(load_plan(&kv), Plan::Free);
    }

    #[test]
    fn test_load_memories_skips_bad_entries() {
        let kv = MemoryKvStore::new();
        kv.seed(
            MEMORIES_KEY,
            r#"[
                {"id":"1","createdAt":"2024-01-01T00:00:00.000Z","text":"a"},
                {"id":"","createdAt":"2024-01-01T00:00:00.000Z"},
                {"id":"1","createdAt":"2024-01-02T00:00:00.000Z","text":"dup"},
                {"text":"no id"},
                42,
                {"id":"2","createdAt":"2024-01-03T00:00:00.000Z","text":"b"}
            ]"#,
        );
        let memories = load_memories(&kv);
        let ids: Vec<&str> = memories.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(memories[0].field("text"), Some(&Value::from("a")));
    }

    #[test]
    fn test_load_memories_non_array_is_empty() {
        let kv = MemoryKvStore::new();
        kv.seed(MEMORIES_KEY, r#"{"id":"1"}"#);
        assert!(load_memories(&kv).is_empty());
        kv.seed(MEMORIES_KEY, "not json at all");
        assert!(load_memories(&kv).is_empty());
    }
}
