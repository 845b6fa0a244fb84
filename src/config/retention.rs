//! Per-table retention configuration.
//!
//! Ages are given in days. A table with age 0 is never touched. Tables that
//! are not listed keep their built-in default (365 days for the larger history
//! tables, 0 for the rest; see [`crate::registry`]).
//!
//! # Example
//!
//! ```toml
//! [retention.tables]
//! statehistory = 180
//! hostchecks = 7
//! logentries = 0   # keep forever
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::registry::{self, KNOWN_TABLES};

/// Retention ages configured per table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Table name (without prefix) to retention age in days.
    #[serde(default)]
    pub tables: BTreeMap<String, u32>,
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unknown: Vec<&str> = self
            .tables
            .keys()
            .filter(|name| registry::find_table(name).is_none())
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }

        let known = KNOWN_TABLES
            .iter()
            .map(|t| t.name)
            .collect::<Vec<_>>()
            .join(", ");
        Err(ConfigError::Validation(format!(
            "unknown retention table(s): {}. Known tables: {known}",
            unknown.join(", ")
        )))
    }

    /// Set the age for one table, replacing any configured value.
    pub fn set_age(&mut self, table: impl Into<String>, days: u32) {
        self.tables.insert(table.into(), days);
    }

    /// Effective age for a table: configured value, else the built-in default.
    pub fn age_for(&self, table: &str) -> u32 {
        self.tables
            .get(table)
            .copied()
            .unwrap_or_else(|| registry::default_age(table))
    }
}
