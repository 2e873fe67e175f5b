//! End-to-end persistence through the filesystem medium.

use memvault_core::{
    fs_store_builder, ErrorKind, MemoryFields, Plan, QuotaLimits, QuotaStore, StoreConfig,
};
use memvault_state::FsKvStore;
use serde_json::json;

fn text(s: &str) -> MemoryFields {
    json!({ "text": s }).as_object().cloned().unwrap()
}

fn config(dir: &tempfile::TempDir) -> StoreConfig {
    StoreConfig {
        data_dir: dir.path().to_path_buf(),
        ..StoreConfig::default()
    }
}

#[test]
fn records_and_plan_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let (first_id, second_id) = {
        let mut store = fs_store_builder(&config(&dir)).unwrap().build();
        let a = store.save(text("one")).unwrap();
        let b = store.save(text("two")).unwrap();
        store.set_plan(Plan::Premium).unwrap();
        (a.memory, b.memory)
    };

    let store = fs_store_builder(&config(&dir)).unwrap().build();
    assert_eq!(store.plan(), Plan::Premium);
    assert_eq!(store.list(), &[first_id.clone(), second_id.clone()][..]);
    assert_eq!(store.get(&first_id.id), Some(&first_id));
}

#[test]
fn custom_limits_apply() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    cfg.limits = QuotaLimits {
        free_limit: 3,
        warning_threshold: 1,
    };
    let mut store = fs_store_builder(&cfg).unwrap().build();
    assert_eq!(store.limits(), cfg.limits);
    assert_eq!(store.usage_stats().limit.value(), Some(3));

    store.save(text("a")).unwrap();
    assert!(!store.check_storage_warning().is_shown());
    store.save(text("b")).unwrap();
    assert!(store.check_storage_warning().is_shown());
    store.save(text("c")).unwrap();

    let err = store.save(text("d")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FreeLimitExceeded);
    assert!(err.message().contains("up to 3"));
}

#[test]
fn byte_budget_turns_into_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    cfg.max_bytes = Some(256);
    let mut store = fs_store_builder(&cfg).unwrap().build();

    let err = loop {
        if let Err(err) = store.save(text("filling the on-disk budget")) {
            break err;
        }
    };
    assert_eq!(err.kind(), ErrorKind::StorageError);

    let count = store.len();
    let reopened = QuotaStore::open(FsKvStore::new(dir.path()).unwrap());
    assert_eq!(reopened.len(), count);
}

#[test]
fn corrupted_file_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let kv = FsKvStore::new(dir.path()).unwrap();
    std::fs::write(kv.kv_dir().join("memories.val"), "{{{ not json").unwrap();
    std::fs::write(kv.kv_dir().join("userPlan.val"), "gold").unwrap();

    let mut store = QuotaStore::open(kv);
    assert!(store.is_empty());
    assert_eq!(store.plan(), Plan::Free);
    assert!(store.save(text("fresh start")).is_ok());
}
