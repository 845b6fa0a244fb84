use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    db::{
        common::{count_to_u64, format_timestamp, limit_to_i64, parse_timestamp},
        error::DbResult,
        repos::{HistoryRepo, InstanceId},
    },
    registry::TableDescriptor,
};

/// SQLite history tables.
///
/// Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text, so cutoffs are bound
/// in the same layout and compared lexically.
pub struct SqliteHistoryRepo {
    pool: SqlitePool,
    table_prefix: String,
}

impl SqliteHistoryRepo {
    pub fn new(pool: SqlitePool, table_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            table_prefix: table_prefix.into(),
        }
    }
}

#[async_trait]
impl HistoryRepo for SqliteHistoryRepo {
    async fn oldest_time(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
    ) -> DbResult<Option<DateTime<Utc>>> {
        let query = format!(
            "SELECT {col} FROM {tbl} WHERE instance_id = ? ORDER BY {col} ASC LIMIT 1",
            col = table.time_column,
            tbl = table.qualified_name(&self.table_prefix),
        );

        let value: Option<String> = sqlx::query_scalar(&query)
            .bind(instance_id)
            .fetch_optional(&self.pool)
            .await?;

        value.map(|v| parse_timestamp(table, &v)).transpose()
    }

    async fn count(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
        cutoff: DateTime<Utc>,
    ) -> DbResult<u64> {
        let query = format!(
            "SELECT COUNT(*) FROM {tbl} WHERE instance_id = ? AND {col} < ?",
            col = table.time_column,
            tbl = table.qualified_name(&self.table_prefix),
        );

        let count: i64 = sqlx::query_scalar(&query)
            .bind(instance_id)
            .bind(format_timestamp(cutoff))
            .fetch_one(&self.pool)
            .await?;

        count_to_u64(count)
    }

    async fn purge(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> DbResult<u64> {
        let tbl = table.qualified_name(&self.table_prefix);
        let query = format!(
            r#"
            DELETE FROM {tbl}
            WHERE rowid IN (
                SELECT rowid FROM {tbl}
                WHERE instance_id = ? AND {col} < ?
                LIMIT ?
            )
            "#,
            col = table.time_column,
        );

        let result = sqlx::query(&query)
            .bind(instance_id)
            .bind(format_timestamp(cutoff))
            .bind(limit_to_i64(limit)?)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
