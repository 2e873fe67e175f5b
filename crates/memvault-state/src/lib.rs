//! Memvault-State: key-value persistence for memvault
//!
//! This crate provides the storage medium the quota store writes through.
//! The medium is a flat string-to-string map, the same shape as browser
//! `localStorage`, so the store above it only needs `get` and `set`.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: durable whole-value writes and predictable failure modes
//! (medium full, medium disabled, I/O).
//!
//! ## Key Components
//!
//! - `KvStore`: the storage port
//! - `FsKvStore`: one file per key under a data directory
//! - `fakes::MemoryKvStore`: in-memory medium for tests, optionally size-bounded

mod error;
pub mod fakes;
mod fs_store;
pub mod storage_traits;

pub use error::StorageError;
pub use fs_store::FsKvStore;
pub use storage_traits::{KvStore, StorageResult};
