//! Store configuration.
//!
//! Values come from defaults, then the environment:
//! - `MEMVAULT_DATA_DIR` (default: `.memvault`)
//! - `MEMVAULT_FREE_LIMIT` (default: 50)
//! - `MEMVAULT_WARNING_THRESHOLD` (default: 5)
//! - `MEMVAULT_MAX_BYTES` (optional byte budget for the file-backed medium)

use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::{FREE_LIMIT, WARNING_THRESHOLD};

pub const DATA_DIR_ENV: &str = "MEMVAULT_DATA_DIR";
pub const FREE_LIMIT_ENV: &str = "MEMVAULT_FREE_LIMIT";
pub const WARNING_THRESHOLD_ENV: &str = "MEMVAULT_WARNING_THRESHOLD";
pub const MAX_BYTES_ENV: &str = "MEMVAULT_MAX_BYTES";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid number")]
    NotANumber { var: &'static str, value: String },

    #[error("free limit must be at least 1")]
    ZeroFreeLimit,
}

/// Admission thresholds for the free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    /// Maximum records under the free plan.
    pub free_limit: usize,
    /// Remaining-slot count at which a warning starts showing.
    pub warning_threshold: usize,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            free_limit: FREE_LIMIT,
            warning_threshold: WARNING_THRESHOLD,
        }
    }
}

/// Everything needed to open a file-backed store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub limits: QuotaLimits,
    pub max_bytes: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".memvault"),
            limits: QuotaLimits::default(),
            max_bytes: None,
        }
    }
}

impl StoreConfig {
    /// Load configuration from the process environment over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(limit) = parse_var(&lookup, FREE_LIMIT_ENV)? {
            config.limits.free_limit = limit;
        }
        if let Some(threshold) = parse_var(&lookup, WARNING_THRESHOLD_ENV)? {
            config.limits.warning_threshold = threshold;
        }
        config.max_bytes = parse_var(&lookup, MAX_BYTES_ENV)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.free_limit == 0 {
            return Err(ConfigError::ZeroFreeLimit);
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::NotANumber { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.limits.free_limit, 50);
        assert_eq!(config.limits.warning_threshold, 5);
        assert_eq!(config.max_bytes, None);
    }

    #[test]
    fn test_env_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            (DATA_DIR_ENV, "/var/lib/memvault"),
            (FREE_LIMIT_ENV, "10"),
            (WARNING_THRESHOLD_ENV, " 2 "),
            (MAX_BYTES_ENV, "5242880"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/memvault"));
        assert_eq!(config.limits.free_limit, 10);
        assert_eq!(config.limits.warning_threshold, 2);
        assert_eq!(config.max_bytes, Some(5_242_880));
    }

    #[test]
    fn test_bad_number_names_variable() {
        let err = StoreConfig::from_lookup(lookup(&[(FREE_LIMIT_ENV, "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotANumber {
                var: FREE_LIMIT_ENV,
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn test_zero_free_limit_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[(FREE_LIMIT_ENV, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroFreeLimit);
    }
}
