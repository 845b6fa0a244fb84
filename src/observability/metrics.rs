//! Prometheus metrics for cleanup rounds.
//!
//! Provides metrics for:
//! - Rows deleted (or eligible, in dry-run mode) per table
//! - Per-table failures by operation
//! - Age of the oldest surviving row per table
//! - Round duration, busy rounds and the active interval

use chrono::{DateTime, Utc};
#[cfg(feature = "prometheus")]
use metrics::{counter, gauge, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
            &config.duration_buckets_secs,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?;

    // Installs the global recorder and spawns the scrape listener.
    builder.install().map_err(MetricsError::Install)?;

    tracing::info!(listen = %config.listen, "Prometheus metrics enabled");
    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if config.enabled {
        tracing::warn!(
            "Metrics are enabled in config but the 'prometheus' feature is not compiled. \
            Rebuild with: cargo build --features prometheus"
        );
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record rows removed from a table by one purge call.
pub fn record_rows_deleted(table: &str, rows: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("ido_cleanup_rows_deleted_total", "table" => table.to_string()).increment(rows);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (table, rows);
    }
}

/// Record the number of rows a dry run found eligible.
pub fn record_rows_eligible(table: &str, rows: u64) {
    #[cfg(feature = "prometheus")]
    {
        gauge!("ido_cleanup_rows_eligible", "table" => table.to_string()).set(rows as f64);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (table, rows);
    }
}

/// Record a failed table operation (`oldest_time`, `count` or `purge`).
pub fn record_table_error(table: &str, operation: &'static str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("ido_cleanup_errors_total", "table" => table.to_string(), "operation" => operation)
            .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (table, operation);
    }
}

/// Record the timestamp of the oldest surviving row, if the table has any.
pub fn record_oldest_row(table: &str, oldest: Option<DateTime<Utc>>) {
    #[cfg(feature = "prometheus")]
    {
        if let Some(ts) = oldest {
            gauge!("ido_cleanup_oldest_row_timestamp_seconds", "table" => table.to_string())
                .set(ts.timestamp() as f64);
        }
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (table, oldest);
    }
}

/// Record a completed round.
pub fn record_round(busy: bool, duration_secs: f64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("ido_cleanup_rounds_total", "busy" => if busy { "true" } else { "false" })
            .increment(1);
        histogram!("ido_cleanup_round_duration_seconds").record(duration_secs);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (busy, duration_secs);
    }
}

/// Record the interval the scheduler waits before the next round.
pub fn record_interval(interval_secs: f64) {
    #[cfg(feature = "prometheus")]
    {
        gauge!("ido_cleanup_interval_seconds").set(interval_secs);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = interval_secs;
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
