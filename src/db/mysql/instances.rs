use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::db::{
    error::DbResult,
    repos::{InstanceId, InstanceRepo},
};

pub struct MysqlInstanceRepo {
    pool: MySqlPool,
    table_prefix: String,
}

impl MysqlInstanceRepo {
    pub fn new(pool: MySqlPool, table_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            table_prefix: table_prefix.into(),
        }
    }
}

#[async_trait]
impl InstanceRepo for MysqlInstanceRepo {
    async fn find_id(&self, instance_name: &str) -> DbResult<Option<InstanceId>> {
        // instance_id is BIGINT UNSIGNED in the IDO schema.
        let query = format!(
            "SELECT CAST(instance_id AS SIGNED) FROM {}instances WHERE instance_name = ?",
            self.table_prefix
        );

        let id = sqlx::query_scalar(&query)
            .bind(instance_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }
}
