//! Adaptive scheduling of cleanup rounds.
//!
//! The first round runs immediately. Afterwards rounds run on a periodic
//! timer whose period depends on the previous round: the fast interval while
//! some table keeps hitting the per-call limit, the normal interval otherwise.
//! Shutdown is observed between rounds only; a round in flight always
//! finishes.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::round::{CleanupRound, RoundMode};
use crate::{config::CleanupConfig, observability::metrics};

/// The two cadences of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub normal: Duration,
    pub fast: Duration,
}

impl Intervals {
    pub fn from_config(config: &CleanupConfig) -> Self {
        Self {
            normal: config.interval(),
            fast: config.fast_interval(),
        }
    }

    /// Interval to wait after a round with the given busy flag.
    pub fn next(&self, busy: bool) -> Duration {
        if busy { self.fast } else { self.normal }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick or for shutdown.
    Idle,
    RunningRound,
    /// Terminal.
    Stopped,
}

pub struct Scheduler {
    round: CleanupRound,
    intervals: Intervals,
    once: bool,
    state: SchedulerState,
    current_interval: Duration,
    rounds: u64,
}

impl Scheduler {
    pub fn new(round: CleanupRound, intervals: Intervals, once: bool) -> Self {
        Self {
            round,
            current_interval: intervals.normal,
            intervals,
            once,
            state: SchedulerState::Idle,
            rounds: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Number of completed rounds.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Run rounds until `shutdown` is cancelled, or a single round in
    /// single-shot mode.
    pub async fn run(&mut self, shutdown: &CancellationToken) {
        let dry_run_msg = if self.round.mode() == RoundMode::DryRun {
            " (DRY RUN)"
        } else {
            ""
        };
        tracing::info!(
            interval_secs = self.intervals.normal.as_secs(),
            fast_interval_secs = self.intervals.fast.as_secs(),
            tables = self.round.policy().active_tables(),
            once = self.once,
            "Starting cleanup scheduler{}",
            dry_run_msg
        );

        let busy = self.run_round().await;
        self.current_interval = self.intervals.next(busy);

        if self.once {
            tracing::info!("Stopping after one cleanup round");
            self.state = SchedulerState::Stopped;
            return;
        }

        if busy {
            tracing::debug!(
                interval_secs = self.current_interval.as_secs(),
                "Updating interval"
            );
        }
        metrics::record_interval(self.current_interval.as_secs_f64());
        let mut ticker = new_ticker(self.current_interval);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, stopping cleanup scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    let busy = self.run_round().await;
                    let next = self.intervals.next(busy);
                    if next != self.current_interval {
                        tracing::debug!(interval_secs = next.as_secs(), "Updating interval");
                        self.current_interval = next;
                        ticker = new_ticker(next);
                        metrics::record_interval(next.as_secs_f64());
                    }
                }
            }
        }

        self.state = SchedulerState::Stopped;
    }

    async fn run_round(&mut self) -> bool {
        self.state = SchedulerState::RunningRound;
        let start = Instant::now();

        let result = self.round.run().await;

        let elapsed = start.elapsed();
        self.rounds += 1;
        self.state = SchedulerState::Idle;
        metrics::record_round(result.busy, elapsed.as_secs_f64());

        tracing::debug!(
            round = self.rounds,
            busy = result.busy,
            tables = result.outcomes.len(),
            rows = result.total_rows(),
            errors = result.errors(),
            took_ms = elapsed.as_millis() as u64,
            "Cleanup round complete"
        );
        result.busy
    }
}

/// Periodic timer whose first tick is one full period away.
fn new_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        registry::TableDescriptor,
        retention::{
            round::RetentionPolicy,
            test_utils::{MockHistoryRepo, Op},
        },
    };

    const NORMAL: Duration = Duration::from_secs(60);
    const FAST: Duration = Duration::from_secs(10);

    fn intervals() -> Intervals {
        Intervals {
            normal: NORMAL,
            fast: FAST,
        }
    }

    fn scheduler(repo: &MockHistoryRepo, limit: u64, once: bool) -> Scheduler {
        let round = CleanupRound::new(
            Arc::new(repo.clone()),
            [("t", 5)].into_iter().collect::<RetentionPolicy>(),
            1,
            limit,
        )
        .with_tables(vec![TableDescriptor::new("t", "entry_time")]);
        Scheduler::new(round, intervals(), once)
    }

    /// Offsets of the purge calls from `start`, in whole seconds.
    fn purge_offsets(repo: &MockHistoryRepo, start: Instant) -> Vec<u64> {
        repo.calls_for(Op::Purge)
            .iter()
            .map(|c| c.at.duration_since(start).as_secs())
            .collect()
    }

    #[test]
    fn test_next_interval() {
        assert_eq!(intervals().next(true), FAST);
        assert_eq!(intervals().next(false), NORMAL);

        let config = CleanupConfig::default();
        assert_eq!(Intervals::from_config(&config), intervals());
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_stops_after_first_round() {
        let repo = MockHistoryRepo::new().with_rows("t", 15);
        let mut scheduler = scheduler(&repo, 10, true);
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.run(&CancellationToken::new()).await;

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.rounds(), 1);
        assert_eq!(scheduler.current_interval(), FAST);
        assert_eq!(repo.remaining("t"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switches_to_fast_then_back_to_normal() {
        let repo = MockHistoryRepo::new().with_rows("t", 15);
        let mut scheduler = scheduler(&repo, 10, false);
        let token = CancellationToken::new();
        let start = Instant::now();

        let handle = tokio::spawn({
            let token = token.clone();
            async move {
                scheduler.run(&token).await;
                scheduler
            }
        });

        tokio::time::sleep(Duration::from_secs(25)).await;
        token.cancel();
        let scheduler = handle.await.unwrap();

        // 10 rows at startup (busy), the remaining 5 one fast interval later.
        assert_eq!(purge_offsets(&repo, start), vec![0, 10]);
        assert_eq!(repo.remaining("t"), 0);
        assert_eq!(scheduler.current_interval(), NORMAL);
        assert_eq!(scheduler.rounds(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_cadence_repeats() {
        let repo = MockHistoryRepo::new();
        let mut scheduler = scheduler(&repo, 10, false);
        let token = CancellationToken::new();
        let start = Instant::now();

        let handle = tokio::spawn({
            let token = token.clone();
            async move {
                scheduler.run(&token).await;
                scheduler
            }
        });

        tokio::time::sleep(Duration::from_secs(130)).await;
        token.cancel();
        let scheduler = handle.await.unwrap();

        assert_eq!(purge_offsets(&repo, start), vec![0, 60, 120]);
        assert_eq!(scheduler.current_interval(), NORMAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_fast_while_busy() {
        let repo = MockHistoryRepo::new().with_rows("t", 100);
        let mut scheduler = scheduler(&repo, 10, false);
        let token = CancellationToken::new();
        let start = Instant::now();

        let handle = tokio::spawn({
            let token = token.clone();
            async move {
                scheduler.run(&token).await;
                scheduler
            }
        });

        tokio::time::sleep(Duration::from_secs(35)).await;
        token.cancel();
        let scheduler = handle.await.unwrap();

        assert_eq!(purge_offsets(&repo, start), vec![0, 10, 20, 30]);
        assert_eq!(repo.remaining("t"), 60);
        assert_eq!(scheduler.current_interval(), FAST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_round_finishes_every_table() {
        let token = CancellationToken::new();
        // Startup round leaves 5 rows per table (busy); the fast round at
        // t=10s sees the shutdown while purging the first table.
        let repo = MockHistoryRepo::new()
            .with_rows("a", 15)
            .with_rows("b", 15)
            .with_rows("c", 15)
            .with_purge_delay(Duration::from_secs(1))
            .cancel_on_purge("a", 2, token.clone());
        let round = CleanupRound::new(
            Arc::new(repo.clone()),
            [("a", 5), ("b", 5), ("c", 5)]
                .into_iter()
                .collect::<RetentionPolicy>(),
            1,
            10,
        )
        .with_tables(vec![
            TableDescriptor::new("a", "entry_time"),
            TableDescriptor::new("b", "entry_time"),
            TableDescriptor::new("c", "entry_time"),
        ]);
        let mut scheduler = Scheduler::new(round, intervals(), false);

        scheduler.run(&token).await;

        let purged: Vec<&str> = repo.calls_for(Op::Purge).iter().map(|c| c.table).collect();
        assert_eq!(purged, vec!["a", "b", "c", "a", "b", "c"]);
        for table in ["a", "b", "c"] {
            assert_eq!(repo.remaining(table), 0);
        }
        assert_eq!(scheduler.rounds(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_tick() {
        let repo = MockHistoryRepo::new().with_rows("t", 3);
        let mut scheduler = scheduler(&repo, 10, false);
        let token = CancellationToken::new();
        token.cancel();

        scheduler.run(&token).await;

        // The startup round always runs; no timed round follows.
        assert_eq!(scheduler.rounds(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(repo.calls_for(Op::Purge).len(), 1);
    }
}
