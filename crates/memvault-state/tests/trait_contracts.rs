//! Trait contract tests for KvStore.
//!
//! These tests verify the behavioral contract of the storage port against
//! both the in-memory fake and the filesystem backend. Any conforming
//! implementation must pass these.

use memvault_state::fakes::MemoryKvStore;
use memvault_state::{FsKvStore, KvStore, StorageError};

fn backends() -> Vec<(&'static str, Box<dyn KvStore>, Option<tempfile::TempDir>)> {
    let dir = tempfile::tempdir().unwrap();
    let fs = FsKvStore::new(dir.path()).unwrap();
    vec![
        ("memory", Box::new(MemoryKvStore::new()) as Box<dyn KvStore>, None),
        ("fs", Box::new(fs) as Box<dyn KvStore>, Some(dir)),
    ]
}

// ===========================================================================
// KvStore contract tests
// ===========================================================================

#[test]
fn kv_get_absent_is_none() {
    for (name, store, _dir) in backends() {
        assert_eq!(store.get("memories").unwrap(), None, "backend {name}");
    }
}

#[test]
fn kv_set_then_get_round_trip() {
    for (name, store, _dir) in backends() {
        let value = r#"[{"id":"1700000000000","createdAt":"2023-11-14T22:13:20.000Z","text":"héllo"}]"#;
        store.set("memories", value).unwrap();
        assert_eq!(
            store.get("memories").unwrap().as_deref(),
            Some(value),
            "backend {name}"
        );
    }
}

#[test]
fn kv_keys_are_independent() {
    for (name, store, _dir) in backends() {
        store.set("userPlan", "premium").unwrap();
        store.set("memories", "[]").unwrap();
        store.remove("memories").unwrap();

        assert_eq!(
            store.get("userPlan").unwrap().as_deref(),
            Some("premium"),
            "backend {name}"
        );
        assert_eq!(store.get("memories").unwrap(), None, "backend {name}");
    }
}

#[test]
fn kv_remove_absent_is_noop() {
    for (name, store, _dir) in backends() {
        assert!(store.remove("never-written").is_ok(), "backend {name}");
    }
}

#[test]
fn kv_empty_value_is_distinct_from_absent() {
    for (name, store, _dir) in backends() {
        store.set("userPlan", "").unwrap();
        assert_eq!(
            store.get("userPlan").unwrap().as_deref(),
            Some(""),
            "backend {name}"
        );
    }
}

// ===========================================================================
// Failure modes
// ===========================================================================

#[test]
fn bounded_memory_store_rejects_oversized_write_and_keeps_old_value() {
    let store = MemoryKvStore::with_capacity(32);
    store.set("memories", "[]").unwrap();

    let big = "x".repeat(64);
    let err = store.set("memories", &big).unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { capacity: 32, .. }));
    assert_eq!(store.get("memories").unwrap().as_deref(), Some("[]"));
}

#[test]
fn bounded_fs_store_counts_all_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsKvStore::new(dir.path()).unwrap().with_max_bytes(30);
    store.set("userPlan", "premium").unwrap(); // 15 bytes

    store.set("memories", "[1,2,3]").unwrap(); // 15 bytes, total 30
    let err = store.set("memories", "[1,2,3,4]").unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { .. }));
}

#[test]
fn disabled_memory_store_reports_unavailable() {
    let store = MemoryKvStore::new();
    store.set_disabled(true);
    let err = store.set("userPlan", "free").unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
    assert!(err.to_string().contains("unavailable"));
}

#[test]
fn shared_store_through_arc_sees_same_data() {
    let store = std::sync::Arc::new(MemoryKvStore::new());
    let handle: std::sync::Arc<MemoryKvStore> = std::sync::Arc::clone(&store);
    handle.set("userPlan", "premium").unwrap();
    assert_eq!(store.raw("userPlan").as_deref(), Some("premium"));
    assert_eq!(store.write_count(), 1);
}
