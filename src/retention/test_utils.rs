//! In-memory `HistoryRepo` for round and scheduler tests.
//!
//! Each table holds a number of eligible rows. `count` reports them all,
//! `purge` removes at most `limit`. Every call is recorded together with the
//! (possibly paused) Tokio clock so tests can check order and cadence.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    db::{DbError, DbResult, HistoryRepo, InstanceId},
    registry::TableDescriptor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Oldest,
    Count,
    Purge,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub op: Op,
    pub table: &'static str,
    pub instance_id: InstanceId,
    pub cutoff: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub at: Instant,
}

#[derive(Default)]
struct State {
    rows: HashMap<&'static str, u64>,
    oldest: HashMap<&'static str, DateTime<Utc>>,
    failures: HashSet<(&'static str, Op)>,
    calls: Vec<Call>,
    purge_delay: Duration,
    cancel_on_purge: Option<(&'static str, usize, CancellationToken)>,
}

#[derive(Clone, Default)]
pub struct MockHistoryRepo {
    state: Arc<Mutex<State>>,
}

impl MockHistoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give a table `rows` eligible rows.
    pub fn with_rows(self, table: &'static str, rows: u64) -> Self {
        self.state.lock().unwrap().rows.insert(table, rows);
        self
    }

    pub fn with_oldest(self, table: &'static str, oldest: DateTime<Utc>) -> Self {
        self.state.lock().unwrap().oldest.insert(table, oldest);
        self
    }

    /// Make one operation on one table fail.
    pub fn failing(self, table: &'static str, op: Op) -> Self {
        self.state.lock().unwrap().failures.insert((table, op));
        self
    }

    /// Make every purge take `delay` of (paused) Tokio time.
    pub fn with_purge_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().purge_delay = delay;
        self
    }

    /// Cancel `token` from inside the `nth` purge (1-based) of `table`,
    /// before that purge returns.
    pub fn cancel_on_purge(
        self,
        table: &'static str,
        nth: usize,
        token: CancellationToken,
    ) -> Self {
        self.state.lock().unwrap().cancel_on_purge = Some((table, nth, token));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, op: Op) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn remaining(&self, table: &str) -> u64 {
        self.state
            .lock()
            .unwrap()
            .rows
            .get(table)
            .copied()
            .unwrap_or(0)
    }

    fn record(
        &self,
        op: Op,
        table: &TableDescriptor,
        instance_id: InstanceId,
        cutoff: Option<DateTime<Utc>>,
        limit: Option<u64>,
    ) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            op,
            table: table.name,
            instance_id,
            cutoff,
            limit,
            at: Instant::now(),
        });
        if state.failures.contains(&(table.name, op)) {
            return Err(DbError::Internal(format!("{op:?} failed for {}", table.name)));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryRepo for MockHistoryRepo {
    async fn oldest_time(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
    ) -> DbResult<Option<DateTime<Utc>>> {
        self.record(Op::Oldest, table, instance_id, None, None)?;
        Ok(self.state.lock().unwrap().oldest.get(table.name).copied())
    }

    async fn count(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
        cutoff: DateTime<Utc>,
    ) -> DbResult<u64> {
        self.record(Op::Count, table, instance_id, Some(cutoff), None)?;
        Ok(self.remaining(table.name))
    }

    async fn purge(
        &self,
        table: &TableDescriptor,
        instance_id: InstanceId,
        cutoff: DateTime<Utc>,
        limit: u64,
    ) -> DbResult<u64> {
        self.record(Op::Purge, table, instance_id, Some(cutoff), Some(limit))?;

        let (delay, cancel) = {
            let state = self.state.lock().unwrap();
            let purges = state
                .calls
                .iter()
                .filter(|c| c.op == Op::Purge && c.table == table.name)
                .count();
            let cancel = state
                .cancel_on_purge
                .as_ref()
                .filter(|(name, nth, _)| *name == table.name && *nth == purges)
                .map(|(_, _, token)| token.clone());
            (state.purge_delay, cancel)
        };
        if let Some(token) = cancel {
            token.cancel();
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        let rows = state.rows.entry(table.name).or_default();
        let deleted = (*rows).min(limit);
        *rows -= deleted;
        Ok(deleted)
    }
}
