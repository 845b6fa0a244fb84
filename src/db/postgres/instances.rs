use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{
    error::DbResult,
    repos::{InstanceId, InstanceRepo},
};

pub struct PostgresInstanceRepo {
    pool: PgPool,
    table_prefix: String,
}

impl PostgresInstanceRepo {
    pub fn new(pool: PgPool, table_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            table_prefix: table_prefix.into(),
        }
    }
}

#[async_trait]
impl InstanceRepo for PostgresInstanceRepo {
    async fn find_id(&self, instance_name: &str) -> DbResult<Option<InstanceId>> {
        let query = format!(
            "SELECT instance_id FROM {}instances WHERE instance_name = $1",
            self.table_prefix
        );

        let id = sqlx::query_scalar(&query)
            .bind(instance_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }
}
