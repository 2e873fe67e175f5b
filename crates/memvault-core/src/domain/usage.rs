//! Usage statistics and capacity warnings.
//!
//! Both views are pure functions of `(plan, count)` plus the configured
//! ceiling, so they can be recomputed at any time and always agree with the
//! admission check in `QuotaStore::save`.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::plan::Plan;

/// Remaining-slot count at or below which the free tier shows a warning.
pub const WARNING_THRESHOLD: usize = 5;

/// Record ceiling as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Limited(usize),
    Unlimited,
}

impl Limit {
    pub fn value(&self) -> Option<usize> {
        match self {
            Limit::Limited(n) => Some(*n),
            Limit::Unlimited => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::Limited(n) => write!(f, "{n}"),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Serialized as a number, or the string `"unlimited"`.
impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Limited(n) => serializer.serialize_u64(*n as u64),
            Limit::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Snapshot of how much of the plan's ceiling is in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub current_count: usize,
    pub limit: Limit,
    /// Share of the ceiling used, rounded to the nearest whole percent.
    /// Always 0 when unlimited; may exceed 100 after a downgrade.
    pub percentage: u32,
    pub plan: Plan,
    pub can_add_more: bool,
}

impl UsageStats {
    pub fn compute(plan: Plan, count: usize, free_limit: usize) -> Self {
        match plan {
            Plan::Premium => Self {
                current_count: count,
                limit: Limit::Unlimited,
                percentage: 0,
                plan,
                can_add_more: true,
            },
            Plan::Free => {
                let percentage = if free_limit == 0 {
                    100
                } else {
                    ((count as f64 / free_limit as f64) * 100.0).round() as u32
                };
                Self {
                    current_count: count,
                    limit: Limit::Limited(free_limit),
                    percentage,
                    plan,
                    can_add_more: count < free_limit,
                }
            }
        }
    }
}

/// Display signal for how close the free tier is to its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageWarning {
    /// Nothing to show.
    Hidden,
    /// A few slots left.
    Warning { remaining: usize },
    /// No slots left.
    Error,
}

impl StorageWarning {
    /// Derive the signal. Premium never warns; free warns with
    /// `1..=threshold` slots left and errors with none left (including when
    /// the list is already over the ceiling).
    pub fn evaluate(plan: Plan, count: usize, free_limit: usize, threshold: usize) -> Self {
        if plan != Plan::Free {
            return StorageWarning::Hidden;
        }
        match free_limit.saturating_sub(count) {
            0 => StorageWarning::Error,
            remaining if remaining <= threshold => StorageWarning::Warning { remaining },
            _ => StorageWarning::Hidden,
        }
    }

    pub fn is_shown(&self) -> bool {
        !matches!(self, StorageWarning::Hidden)
    }

    /// `"warning"` or `"error"`; `None` when hidden.
    pub fn level(&self) -> Option<&'static str> {
        match self {
            StorageWarning::Hidden => None,
            StorageWarning::Warning { .. } => Some("warning"),
            StorageWarning::Error => Some("error"),
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            StorageWarning::Hidden => None,
            StorageWarning::Warning { remaining } => Some(format!(
                "{remaining} more until the free plan limit is reached."
            )),
            StorageWarning::Error => Some(
                "The free plan limit has been reached. Consider upgrading to premium.".to_string(),
            ),
        }
    }
}

/// Serialized as `{"show": bool, "type"?: .., "message"?: ..}`.
impl Serialize for StorageWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.is_shown() { 3 } else { 1 };
        let mut state = serializer.serialize_struct("StorageWarning", fields)?;
        state.serialize_field("show", &self.is_shown())?;
        if let (Some(level), Some(message)) = (self.level(), self.message()) {
            state.serialize_field("type", level)?;
            state.serialize_field("message", &message)?;
        }
        state.end()
    }
}
