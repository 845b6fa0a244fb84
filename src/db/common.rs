//! Helpers shared by the backend implementations.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    db::error::{DbError, DbResult},
    registry::TableDescriptor,
};

/// Textual timestamp layout used by the IDO schema (`2024-07-02 08:25:44`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a timestamp read from a time column as UTC.
///
/// An optional fractional second part is accepted. Anything else (including
/// MySQL's zero date) is an error rather than a default.
pub fn parse_timestamp(
    table: &TableDescriptor,
    value: &str,
) -> DbResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|source| DbError::InvalidTimestamp {
            table: table.name.to_string(),
            column: table.time_column.to_string(),
            value: value.to_string(),
            source,
        })
}

/// Render a cutoff in the IDO text layout.
#[cfg_attr(not(feature = "database-sqlite"), allow(dead_code))]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Convert a SQL `COUNT(*)` result into a row count.
pub fn count_to_u64(count: i64) -> DbResult<u64> {
    u64::try_from(count).map_err(|_| DbError::Internal(format!("negative row count {count}")))
}

/// Convert a purge limit into the signed integer SQL expects.
pub fn limit_to_i64(limit: u64) -> DbResult<i64> {
    i64::try_from(limit).map_err(|_| DbError::Internal(format!("limit {limit} out of range")))
}
