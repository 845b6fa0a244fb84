use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{db::error::DbResult, registry::TableDescriptor};

/// Identifier of an IDO instance (`icinga_instances.instance_id`).
pub type InstanceId = i64;

/// Access to the history tables of one IDO database.
///
/// Every operation is scoped to a single instance and a single table. A
/// table is eligible for deletion row by row when its time column is strictly
/// older than the cutoff; `count` and `purge` share that selection.
#[async_trait]
pub trait HistoryRepo: Send + Sync {
    /// Timestamp of the oldest row of the instance, or `None` if it has no rows.
    ///
    /// A stored value that cannot be parsed is an error.
    async fn oldest_time(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
    ) -> DbResult<Option<DateTime<Utc>>>;

    /// Number of rows of the instance older than `cutoff`.
    async fn count(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
        cutoff: DateTime<Utc>,
    ) -> DbResult<u64>;

    // ==================== Retention Operations ====================

    /// Delete at most `limit` rows of the instance older than `cutoff`.
    ///
    /// Issues a single bounded statement and returns the number of rows
    /// actually deleted, which never exceeds `limit`.
    async fn purge(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> DbResult<u64>;
}
