//! Cleanup of the IDO history tables.
//!
//! A [`CleanupRound`] visits every table of the registry once, deleting (or,
//! in dry-run mode, counting) rows older than the table's retention age. The
//! [`Scheduler`] repeats rounds, switching to a faster cadence while some
//! table keeps hitting the per-call row limit.
//!
//! Deletes are bounded per statement to avoid long-running locks on the IDO
//! database while Icinga keeps writing to it.

mod round;
mod scheduler;
#[cfg(test)]
pub(crate) mod test_utils;

pub use round::{CleanupRound, RetentionPolicy, RoundMode, RoundResult, TableOutcome};
pub use scheduler::{Intervals, Scheduler, SchedulerState};
