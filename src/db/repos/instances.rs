use async_trait::async_trait;

use super::InstanceId;
use crate::db::error::DbResult;

#[async_trait]
pub trait InstanceRepo: Send + Sync {
    /// Look up the id of the instance with the given name.
    async fn find_id(&self, instance_name: &str) -> DbResult<Option<InstanceId>>;
}
