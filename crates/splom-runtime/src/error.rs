#![forbid(unsafe_code)]

//! Errors surfaced by the reconciliation controller and worker.

use splom_overlay::{CellId, OverlayError};

/// A reconciliation request was rejected, or a run failed.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// `start` was called while a run is in flight. The in-flight run is
    /// unaffected.
    #[error("a reconciliation is already running")]
    AlreadyRunning,

    #[error("sample percent {0} is outside 0..=100")]
    InvalidSamplePercent(u8),

    #[error("cell size {requested} is outside {min}..={max}")]
    InvalidCellSize { requested: u16, min: u16, max: u16 },

    /// An overlay's setup pass failed; the run stopped at this cell.
    #[error("overlay {key:?} failed in cell {cell}: {source}")]
    Overlay {
        cell: CellId,
        key: String,
        #[source]
        source: OverlayError,
    },

    /// Overlay code panicked while the worker was processing `cell`.
    #[error("overlay code panicked in cell {cell}: {message}")]
    Panicked { cell: CellId, message: String },

    /// The worker thread went away without handing the grid back.
    #[error("reconciliation worker exited without reporting a result")]
    WorkerLost,

    #[error("failed to spawn reconciliation worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl ReconcileError {
    /// `true` for errors returned synchronously from `start` that leave the
    /// controller exactly as it was.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning
                | Self::InvalidSamplePercent(_)
                | Self::InvalidCellSize { .. }
                | Self::Spawn(_)
        )
    }
}
