use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    db::{
        common::{count_to_u64, limit_to_i64, parse_timestamp},
        error::DbResult,
        repos::{HistoryRepo, InstanceId},
    },
    registry::TableDescriptor,
};

/// PostgreSQL history tables.
///
/// PostgreSQL has no `DELETE ... LIMIT`; a bounded batch is selected by
/// `ctid` and deleted in the same statement.
pub struct PostgresHistoryRepo {
    pool: PgPool,
    table_prefix: String,
}

impl PostgresHistoryRepo {
    pub fn new(pool: PgPool, table_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            table_prefix: table_prefix.into(),
        }
    }
}

#[async_trait]
impl HistoryRepo for PostgresHistoryRepo {
    async fn oldest_time(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
    ) -> DbResult<Option<DateTime<Utc>>> {
        let query = format!(
            r#"
            SELECT to_char({col} AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS')
            FROM {tbl}
            WHERE instance_id = $1
            ORDER BY {col} ASC
            LIMIT 1
            "#,
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
            "SELECT COUNT(*) FROM {tbl} WHERE instance_id = $1 AND {col} < $2",
            col = table.time_column,
            tbl = table.qualified_name(&self.table_prefix),
        );

        let count: i64 = sqlx::query_scalar(&query)
            .bind(instance_id)
            .bind(cutoff)
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
            WHERE ctid = ANY(ARRAY(
                SELECT ctid FROM {tbl}
                WHERE instance_id = $1 AND {col} < $2
                LIMIT $3
            ))
            "#,
            col = table.time_column,
        );

        let result = sqlx::query(&query)
            .bind(instance_id)
            .bind(cutoff)
            .bind(limit_to_i64(limit)?)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
