//! A single pass over the history tables.

use std::{collections::BTreeMap, fmt, sync::Arc, time::Instant};

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    config::RetentionConfig,
    db::{DbError, HistoryRepo, InstanceId},
    observability::metrics,
    registry::{KNOWN_TABLES, TableDescriptor},
};

/// Retention age in days per table, resolved once at startup.
///
/// Tables without an entry, or with age 0, are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    ages: BTreeMap<String, u32>,
}

impl RetentionPolicy {
    /// Effective ages for every known table.
    pub fn from_config(config: &RetentionConfig) -> Self {
        KNOWN_TABLES
            .iter()
            .map(|table| (table.name, config.age_for(table.name)))
            .collect()
    }

    pub fn age(&self, table: &str) -> u32 {
        self.ages.get(table).copied().unwrap_or(0)
    }

    /// Cutoff for a table relative to `now`, or `None` if the table is skipped.
    pub fn cutoff(&self, table: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.age(table) {
            0 => None,
            days => Some(
                now.checked_sub_signed(TimeDelta::days(i64::from(days)))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ),
        }
    }

    /// Number of tables that will be cleaned.
    pub fn active_tables(&self) -> usize {
        self.ages.values().filter(|days| **days > 0).count()
    }
}

impl<'a> FromIterator<(&'a str, u32)> for RetentionPolicy {
    fn from_iter<I: IntoIterator<Item = (&'a str, u32)>>(iter: I) -> Self {
        Self {
            ages: iter
                .into_iter()
                .map(|(name, days)| (name.to_string(), days))
                .collect(),
        }
    }
}

/// What a round does with eligible rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMode {
    /// Delete up to the limit.
    Purge,
    /// Count only.
    DryRun,
}

impl fmt::Display for RoundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundMode::Purge => write!(f, "purge"),
            RoundMode::DryRun => write!(f, "dry_run"),
        }
    }
}

/// Result of processing one table in one round.
#[derive(Debug)]
pub struct TableOutcome {
    pub table: &'static str,
    pub mode: RoundMode,
    /// Oldest surviving row, if known.
    pub oldest: Option<DateTime<Utc>>,
    /// Rows deleted, or rows eligible in dry-run mode.
    pub rows: u64,
    pub took: std::time::Duration,
    /// Failure on this table, if any. A failed `count`/`purge` replaces a
    /// failed `oldest_time`.
    pub error: Option<DbError>,
    /// The purge hit the per-call limit.
    pub busy: bool,
}

impl TableOutcome {
    fn oldest_display(&self) -> String {
        self.oldest
            .map(|ts| ts.to_string())
            .unwrap_or_else(|| "none".to_string())
    }

    fn log(&self) {
        let oldest = self.oldest_display();
        let took_ms = self.took.as_millis() as u64;

        match (self.mode, self.rows) {
            (RoundMode::DryRun, rows) => tracing::info!(
                table = self.table,
                oldest = %oldest,
                rows,
                took_ms,
                "DRY RUN: Would delete rows"
            ),
            (RoundMode::Purge, 0) => tracing::debug!(
                table = self.table,
                oldest = %oldest,
                rows = 0,
                took_ms,
                "Deleted rows"
            ),
            (RoundMode::Purge, rows) => tracing::info!(
                table = self.table,
                oldest = %oldest,
                rows,
                took_ms,
                busy = self.busy,
                "Deleted rows"
            ),
        }
    }
}

/// Aggregated result of one round.
#[derive(Debug, Default)]
pub struct RoundResult {
    /// At least one table hit the per-call limit.
    pub busy: bool,
    /// Outcomes of the tables that were processed, in registry order.
    pub outcomes: Vec<TableOutcome>,
}

impl RoundResult {
    pub fn total_rows(&self) -> u64 {
        self.outcomes.iter().map(|o| o.rows).sum()
    }

    pub fn errors(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// One cleanup pass over the table registry for a single instance.
///
/// Tables are processed sequentially in registry order. A failure on one
/// table is recorded in its outcome and never stops the round.
pub struct CleanupRound {
    repo: Arc<dyn HistoryRepo>,
    tables: Vec<TableDescriptor>,
    policy: RetentionPolicy,
    instance_id: InstanceId,
    limit: u64,
    mode: RoundMode,
}

impl CleanupRound {
    pub fn new(
        repo: Arc<dyn HistoryRepo>,
        policy: RetentionPolicy,
        instance_id: InstanceId,
        limit: u64,
    ) -> Self {
        Self {
            repo,
            tables: KNOWN_TABLES.to_vec(),
            policy,
            instance_id,
            limit,
            mode: RoundMode::Purge,
        }
    }

    /// Replace the table list (defaults to the full registry).
    pub fn with_tables(mut self, tables: Vec<TableDescriptor>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.mode = if dry_run {
            RoundMode::DryRun
        } else {
            RoundMode::Purge
        };
        self
    }

    pub fn mode(&self) -> RoundMode {
        self.mode
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Run a round with cutoffs relative to the current time.
    pub async fn run(&self) -> RoundResult {
        self.run_at(Utc::now()).await
    }

    /// Run a round with every cutoff computed from `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RoundResult {
        let mut result = RoundResult::default();

        for table in &self.tables {
            let Some(cutoff) = self.policy.cutoff(table.name, now) else {
                continue;
            };

            let outcome = self.process_table(table, cutoff).await;
            result.busy |= outcome.busy;
            result.outcomes.push(outcome);
        }

        result
    }

    async fn process_table(&self, table: &TableDescriptor, cutoff: DateTime<Utc>) -> TableOutcome {
        let start = Instant::now();
        let mut outcome = TableOutcome {
            table: table.name,
            mode: self.mode,
            oldest: None,
            rows: 0,
            took: std::time::Duration::ZERO,
            error: None,
            busy: false,
        };

        // Informational only; a failure here never prevents the purge.
        match self.repo.oldest_time(table, self.instance_id).await {
            Ok(oldest) => {
                metrics::record_oldest_row(table.name, oldest);
                outcome.oldest = oldest;
            }
            Err(e) => {
                tracing::error!(table = table.name, error = %e, "Could not get oldest row");
                metrics::record_table_error(table.name, "oldest_time");
                outcome.error = Some(e);
            }
        }

        let result = match self.mode {
            RoundMode::DryRun => self.repo.count(table, self.instance_id, cutoff).await,
            RoundMode::Purge => {
                self.repo
                    .purge(table, self.instance_id, cutoff, self.limit)
                    .await
            }
        };
        outcome.took = start.elapsed();

        match result {
            Ok(rows) => {
                outcome.rows = rows;
                match self.mode {
                    RoundMode::DryRun => metrics::record_rows_eligible(table.name, rows),
                    RoundMode::Purge => {
                        metrics::record_rows_deleted(table.name, rows);
                        outcome.busy = rows >= self.limit;
                    }
                }
                outcome.log();
            }
            Err(e) => {
                let operation = match self.mode {
                    RoundMode::DryRun => "count",
                    RoundMode::Purge => "purge",
                };
                tracing::error!(
                    table = table.name,
                    oldest = %outcome.oldest_display(),
                    operation,
                    error = %e,
                    "Could not clean up table"
                );
                metrics::record_table_error(table.name, operation);
                outcome.error = Some(e);
            }
        }

        outcome
    }
}
