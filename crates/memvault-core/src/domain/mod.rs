//! Domain models for memvault.
//!
//! Canonical definitions for the core entities:
//! - `Plan`: the tier that decides the record ceiling and remote mirroring
//! - `Memory`: a user-created record with store-assigned identity
//! - `UsageStats` / `StorageWarning`: derived views over `(plan, count)`
//! - `QuotaError`: structured failures returned by store mutations

pub mod error;
pub mod memory;
pub mod plan;
pub mod usage;

// Re-export main types and errors
pub use error::{ErrorKind, QuotaError, Result};
pub use memory::{Memory, MemoryFields, SavedMemory};
pub use plan::{ParsePlanError, Plan, FREE_LIMIT};
pub use usage::{Limit, StorageWarning, UsageStats, WARNING_THRESHOLD};
