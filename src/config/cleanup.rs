//! Cleanup scheduling configuration.
//!
//! # Example
//!
//! ```toml
//! [cleanup]
//! instance = "default"
//! table_prefix = "icinga_"
//! limit = 10000
//! interval_secs = 60
//! fast_interval_secs = 10
//! once = false
//! dry_run = false
//! ```

use std::{sync::LazyLock, time::Duration};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::registry::DEFAULT_TABLE_PREFIX;

static TABLE_PREFIX_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Za-z0-9_]*$").expect("valid prefix pattern"));

/// Scheduling and batching settings for the cleanup loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupConfig {
    /// IDO instance name whose rows are cleaned (`icinga_instances.instance_name`).
    /// Default: "default"
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Prefix of the IDO table names.
    /// Default: "icinga_"
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// Maximum number of rows deleted from one table in one statement.
    /// Default: 10000
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Seconds between rounds while no table hits the limit.
    /// Default: 60
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds between rounds while at least one table hits the limit.
    /// Default: 10
    #[serde(default = "default_fast_interval_secs")]
    pub fast_interval_secs: u64,

    /// Run a single round and exit.
    #[serde(default)]
    pub once: bool,

    /// Count eligible rows instead of deleting them.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            table_prefix: default_table_prefix(),
            limit: default_limit(),
            interval_secs: default_interval_secs(),
            fast_interval_secs: default_fast_interval_secs(),
            once: false,
            dry_run: false,
        }
    }
}

fn default_instance() -> String {
    "default".to_string()
}

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

fn default_limit() -> u64 {
    10_000
}

fn default_interval_secs() -> u64 {
    60
}

fn default_fast_interval_secs() -> u64 {
    10
}

impl CleanupConfig {
    /// Normal interval between rounds.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Interval used while the previous round was busy.
    pub fn fast_interval(&self) -> Duration {
        Duration::from_secs(self.fast_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance.is_empty() {
            return Err(ConfigError::Validation(
                "cleanup.instance cannot be empty".into(),
            ));
        }
        // The prefix ends up inside SQL identifiers, never as a bound value.
        if !TABLE_PREFIX_RE.is_match(&self.table_prefix) {
            return Err(ConfigError::Validation(format!(
                "cleanup.table_prefix '{}' may only contain ASCII letters, digits and '_'",
                self.table_prefix
            )));
        }
        if self.limit == 0 {
            return Err(ConfigError::Validation(
                "cleanup.limit must be greater than 0".into(),
            ));
        }
        if self.fast_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "cleanup.fast_interval_secs must be greater than 0".into(),
            ));
        }
        if self.fast_interval_secs >= self.interval_secs {
            return Err(ConfigError::Validation(format!(
                "cleanup.fast_interval_secs ({}) must be less than cleanup.interval_secs ({})",
                self.fast_interval_secs, self.interval_secs
            )));
        }
        Ok(())
    }
}
