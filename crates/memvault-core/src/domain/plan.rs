//! Plan tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Record ceiling for the free tier.
pub const FREE_LIMIT: usize = 50;

/// Subscription tier. Persisted under `userPlan` as its lowercase literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Quota-limited, local only.
    #[default]
    Free,
    /// Unlimited, mirrored to the remote store.
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
        }
    }

    /// Whether writes and deletes under this plan are mirrored remotely.
    pub fn syncs_remotely(&self) -> bool {
        matches!(self, Plan::Premium)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the plan literals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan: {0:?} (expected \"free\" or \"premium\")")]
pub struct ParsePlanError(pub String);

impl FromStr for Plan {
    type Err = ParsePlanError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "premium" => Ok(Plan::Premium),
            other => Err(ParsePlanError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_literals_round_trip() {
        for plan in [Plan::Free, Plan::Premium] {
            assert_eq!(plan.as_str().parse::<Plan>().unwrap(), plan);
            assert_eq!(
                serde_json::to_string(&plan).unwrap(),
                format!("\"{}\"", plan.as_str())
            );
        }
    }

    #[test]
    fn test_plan_parse_is_exact() {
        assert!("Premium".parse::<Plan>().is_err());
        assert!(" free".parse::<Plan>().is_err());
        let err = "gold".parse::<Plan>().unwrap_err();
        assert!(err.to_string().contains("gold"));
    }

    #[test]
    fn test_default_plan_is_free() {
        assert_eq!(Plan::default(), Plan::Free);
        assert!(!Plan::Free.syncs_remotely());
        assert!(Plan::Premium.syncs_remotely());
    }
}
