#![forbid(unsafe_code)]

//! Process-wide reconciliation counters.
//!
//! Counters are monotonic and never reset; compare two
//! [`TelemetrySnapshot`]s to measure an interval.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::worker::RunOutcome;

// ---------------------------------------------------------------------------
// Monotonic counters
// ---------------------------------------------------------------------------

static RUNS_STARTED: AtomicU64 = AtomicU64::new(0);
static RUNS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static RUNS_CANCELLED: AtomicU64 = AtomicU64::new(0);
static RUNS_FAILED: AtomicU64 = AtomicU64::new(0);

/// Runs handed to a worker.
#[must_use]
pub fn runs_started_total() -> u64 {
    RUNS_STARTED.load(Ordering::Relaxed)
}

#[must_use]
pub fn runs_completed_total() -> u64 {
    RUNS_COMPLETED.load(Ordering::Relaxed)
}

#[must_use]
pub fn runs_cancelled_total() -> u64 {
    RUNS_CANCELLED.load(Ordering::Relaxed)
}

/// Runs that ended in a setup failure, a panic, or a lost worker.
#[must_use]
pub fn runs_failed_total() -> u64 {
    RUNS_FAILED.load(Ordering::Relaxed)
}

pub(crate) fn record_start() {
    RUNS_STARTED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_outcome(outcome: &RunOutcome) {
    let counter = match outcome {
        RunOutcome::Completed => &RUNS_COMPLETED,
        RunOutcome::Cancelled => &RUNS_CANCELLED,
        RunOutcome::Failed(_) => &RUNS_FAILED,
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

/// All counters at one instant, including factory fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySnapshot {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_cancelled: u64,
    pub runs_failed: u64,
    pub fallbacks: u64,
}

impl TelemetrySnapshot {
    pub fn capture() -> Self {
        Self {
            runs_started: runs_started_total(),
            runs_completed: runs_completed_total(),
            runs_cancelled: runs_cancelled_total(),
            runs_failed: runs_failed_total(),
            fallbacks: splom_overlay::fallbacks_total(),
        }
    }

    /// Counter growth since `earlier`.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            runs_started: self.runs_started.saturating_sub(earlier.runs_started),
            runs_completed: self.runs_completed.saturating_sub(earlier.runs_completed),
            runs_cancelled: self.runs_cancelled.saturating_sub(earlier.runs_cancelled),
            runs_failed: self.runs_failed.saturating_sub(earlier.runs_failed),
            fallbacks: self.fallbacks.saturating_sub(earlier.fallbacks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_bump_their_counter() {
        let before = TelemetrySnapshot::capture();
        record_start();
        record_outcome(&RunOutcome::Completed);
        record_outcome(&RunOutcome::Cancelled);
        let delta = TelemetrySnapshot::capture().since(&before);
        // Other tests run concurrently, so only lower bounds hold.
        assert!(delta.runs_started >= 1);
        assert!(delta.runs_completed >= 1);
        assert!(delta.runs_cancelled >= 1);
    }
}
