#![forbid(unsafe_code)]

//! The reconciliation worker.
//!
//! [`run`] applies one [`Plan`] to every cell of a [`Grid`], in grid order:
//! the removal phase is fully applied before the addition phase of the same
//! cell; after each cell progress is reported. The cancellation token is
//! checked at every cell boundary and a cancelled run stops where it is,
//! without rollback.
//!
//! Cancellation is checked before each cell, so a cancel that arrives
//! after the last cell has been processed still ends the run as completed.
//!
//! The worker is synchronous. The controller runs it on a background
//! thread; tests may call it directly.

use std::panic::{self, AssertUnwindSafe};

use splom_overlay::{Cell, CellId, Grid, OverlayFactory};
use tracing::field;

use crate::cancellation::CancellationToken;
use crate::diff::Diff;
use crate::error::ReconcileError;

/// What a run does to each cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    pub diff: Diff,
    /// Detach every overlay before adding, not only `diff.to_remove`.
    pub clear_all: bool,
}

impl Plan {
    /// The plan for a diff: full rebuilds clear every cell.
    pub fn from_diff(diff: Diff) -> Self {
        Self {
            clear_all: diff.full_rebuild,
            diff,
        }
    }

    fn removes(&self, key: &str) -> bool {
        self.clear_all || self.diff.to_remove.iter().any(|k| k == key)
    }
}

/// Terminal outcome of a run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed(ReconcileError),
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

/// Result of [`run`].
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Cells fully processed.
    pub processed: usize,
    pub total: usize,
}

/// Percentage of `processed` out of `total`, rounded down. An empty grid is
/// complete.
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    // processed <= total, so the quotient is at most 100.
    u8::try_from(processed.min(total) * 100 / total).unwrap_or(100)
}

/// Apply `plan` to every cell of `grid`.
///
/// `progress` is called once per processed cell with a non-decreasing
/// percentage; a completed run always ends with 100.
pub fn run(
    grid: &mut Grid,
    plan: &Plan,
    factory: &OverlayFactory,
    cancel: &CancellationToken,
    run_id: u64,
    progress: &mut dyn FnMut(u8),
) -> RunReport {
    let total = grid.len();
    let span = tracing::info_span!(
        "reconcile.run",
        run_id,
        cells = total,
        to_add = plan.diff.to_add.len(),
        to_remove = plan.diff.to_remove.len(),
        full_rebuild = plan.diff.full_rebuild,
        outcome = field::Empty,
    );
    let _guard = span.enter();

    let mut processed = 0;
    let mut outcome = RunOutcome::Completed;
    for cell in grid.cells_mut() {
        if cancel.is_cancelled() {
            tracing::info!(
                target: "splom.reconcile",
                run_id,
                processed,
                total,
                "cancellation observed, stopping"
            );
            outcome = RunOutcome::Cancelled;
            break;
        }
        if let Err(err) = apply_guarded(cell, plan, factory) {
            tracing::error!(
                target: "splom.reconcile",
                run_id,
                processed,
                total,
                error = %err,
                "reconciliation failed"
            );
            outcome = RunOutcome::Failed(err);
            break;
        }
        processed += 1;
        let percent = progress_percent(processed, total);
        tracing::trace!(target: "splom.reconcile", run_id, percent, "progress");
        progress(percent);
    }
    if total == 0 && matches!(outcome, RunOutcome::Completed) {
        progress(100);
    }

    span.record("outcome", outcome.label());
    RunReport {
        outcome,
        processed,
        total,
    }
}

/// Reconcile one cell, turning a panic in overlay code into an error.
fn apply_guarded(cell: &mut Cell, plan: &Plan, factory: &OverlayFactory) -> Result<(), ReconcileError> {
    let id = cell.id();
    panic::catch_unwind(AssertUnwindSafe(|| apply(cell, plan, factory))).unwrap_or_else(|payload| {
        Err(ReconcileError::Panicked {
            cell: id,
            message: panic_message(payload.as_ref()),
        })
    })
}

fn apply(cell: &mut Cell, plan: &Plan, factory: &OverlayFactory) -> Result<(), ReconcileError> {
    let id: CellId = cell.id();
    let _span = tracing::debug_span!("reconcile.cell", row = id.row, column = id.column).entered();

    let removed = cell.detach_where(|key| plan.removes(key));
    for key in &plan.diff.to_add {
        let overlay = factory.instantiate(key, cell.binding());
        cell.attach(key.as_str(), overlay)
            .map_err(|source| ReconcileError::Overlay {
                cell: id,
                key: key.clone(),
                source,
            })?;
    }
    tracing::debug!(
        target: "splom.reconcile",
        removed,
        added = plan.diff.to_add.len(),
        overlays = cell.overlay_count(),
        "cell reconciled"
    );
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
