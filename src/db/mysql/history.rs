use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use crate::{
    db::{
        common::{count_to_u64, parse_timestamp},
        error::DbResult,
        repos::{HistoryRepo, InstanceId},
    },
    registry::TableDescriptor,
};

/// MySQL / MariaDB history tables.
///
/// IDO time columns are `TIMESTAMP`/`DATETIME`. The session time zone is
/// UTC (sqlx sets it on connect), so cutoffs are bound as naive UTC values.
pub struct MysqlHistoryRepo {
    pool: MySqlPool,
    table_prefix: String,
}

impl MysqlHistoryRepo {
    pub fn new(pool: MySqlPool, table_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            table_prefix: table_prefix.into(),
        }
    }
}

#[async_trait]
impl HistoryRepo for MysqlHistoryRepo {
    async fn oldest_time(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
    ) -> DbResult<Option<DateTime<Utc>>> {
        // Read as text so a zero date surfaces as a parse error instead of a
        // decode failure deep inside sqlx.
        let query = format!(
            "SELECT CAST({col} AS CHAR) FROM {tbl} WHERE instance_id = ? ORDER BY {col} ASC LIMIT 1",
            col = table.time_column,
            tbl = table.qualified_name(&self.table_prefix),
        );

        let value: Option<Option<String>> = sqlx::query_scalar(&query)
            .bind(instance_id)
            .fetch_optional(&self.pool)
            .await?;

        match value {
            Some(Some(v)) => parse_timestamp(table, &v).map(Some),
            Some(None) => parse_timestamp(table, "NULL").map(Some),
            None => Ok(None),
        }
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
            .bind(cutoff.naive_utc())
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
        // MySQL accepts DELETE ... LIMIT directly; the limit is an integer we
        // own, so it is rendered into the statement.
        let query = format!(
            "DELETE FROM {tbl} WHERE instance_id = ? AND {col} < ? LIMIT {limit}",
            col = table.time_column,
            tbl = table.qualified_name(&self.table_prefix),
        );

        let result = sqlx::query(&query)
            .bind(instance_id)
            .bind(cutoff.naive_utc())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
