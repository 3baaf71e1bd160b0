#![forbid(unsafe_code)]

//! The reconciliation controller.
//!
//! # State machine
//!
//! ```text
//!   Idle/Completed/Cancelled/Failed --start--> Running
//!   Running --cancel--> CancelRequested
//!   Running | CancelRequested --worker finishes--> Completed | Cancelled | Failed
//! ```
//!
//! `start` while `Running` or `CancelRequested` is rejected with
//! [`ReconcileError::AlreadyRunning`] and the in-flight run is unaffected.
//!
//! # Ownership
//!
//! The controller owns the baseline and, between runs, the [`Grid`]. On
//! `start` the grid moves to a worker thread together with the plan; the
//! worker hands it back in its final event. While a run is in flight
//! [`Controller::grid`] returns `None`. None of `start`, `cancel` or
//! [`poll`](Controller::poll) block; [`wait`](Controller::wait) does.
//!
//! # Interrupted runs
//!
//! A cancelled or failed run leaves the baseline untouched but marks the
//! grid dirty: the cells it reached no longer match the baseline, and the
//! ones it did not reach still do. The next run ignores the baseline and
//! rebuilds every cell from the requested set, so no cell keeps a stale
//! overlay or ends up with two instances of the same one.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use splom_core::{Descriptor, Sampler, Size};
use splom_overlay::{Grid, OverlayFactory, StrategyFactory};

use crate::cancellation::CancellationSource;
use crate::config::MatrixConfig;
use crate::diff::{self, diff};
use crate::error::ReconcileError;
use crate::telemetry;
use crate::worker::{self, Plan, RunOutcome, RunReport};

/// Lifecycle of the controller's current (or last) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// No run has been started yet.
    Idle,
    Running,
    CancelRequested,
    Completed,
    Cancelled,
    Failed,
}

impl ReconcileState {
    /// A worker currently owns the grid.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running | Self::CancelRequested)
    }
}

/// The overlay set and sample percent last applied to every cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Baseline {
    /// Canonical strings, in the order they were requested.
    pub overlays: Vec<String>,
    /// `None` until a run has completed.
    pub sample_percent: Option<u8>,
}

impl Baseline {
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

/// Everything the UI asks for, supplied wholesale on every start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub overlays: Vec<Descriptor>,
    pub strategy: Descriptor,
    pub sample_percent: u8,
    pub cell_size: Size,
}

impl ReconcileRequest {
    /// A request with the config's defaults and no overlays.
    pub fn from_config(config: &MatrixConfig) -> Self {
        Self {
            overlays: Vec::new(),
            strategy: Descriptor::parse(&config.render_strategy)
                .unwrap_or_else(|_| Descriptor::new(config.fallback_strategy.as_str())),
            sample_percent: config.sample_percent,
            cell_size: config.default_size(),
        }
    }

    #[must_use]
    pub fn with_overlays(mut self, overlays: impl IntoIterator<Item = Descriptor>) -> Self {
        self.overlays = overlays.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: Descriptor) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_sample_percent(mut self, percent: u8) -> Self {
        self.sample_percent = percent;
        self
    }

    #[must_use]
    pub fn with_cell_size(mut self, size: Size) -> Self {
        self.cell_size = size;
        self
    }
}

/// Receives run notifications on the thread that calls
/// [`Controller::poll`] or [`Controller::wait`].
pub trait ReconcileListener {
    fn on_progress(&mut self, _percent: u8) {}
    fn on_completed(&mut self, _baseline: &Baseline) {}
    fn on_cancelled(&mut self) {}
    fn on_failed(&mut self, _error: &ReconcileError) {}
}

enum WorkerEvent {
    Progress(u8),
    Finished { grid: Grid, report: RunReport },
}

struct ActiveRun {
    run_id: u64,
    source: CancellationSource,
    events: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
    pending: Baseline,
}

/// Owns the baseline and the grid, and drives reconciliation runs.
pub struct Controller {
    config: MatrixConfig,
    overlays: Arc<OverlayFactory>,
    strategies: StrategyFactory,
    sampler: Box<dyn Sampler>,
    grid: Option<Grid>,
    baseline: Baseline,
    dirty: bool,
    state: ReconcileState,
    progress: u8,
    active: Option<ActiveRun>,
    last_error: Option<ReconcileError>,
    listener: Option<Box<dyn ReconcileListener>>,
    next_run_id: u64,
}

impl Controller {
    /// Lay out the grid over the sampler's view at the config's default
    /// percentage, with the built-in factories falling back to the
    /// config's `fallback_overlay` and `fallback_strategy`.
    ///
    /// A fallback naming no built-in type keeps the stock one.
    pub fn new(config: MatrixConfig, sampler: Box<dyn Sampler>) -> Self {
        let mut overlays = OverlayFactory::builtin();
        if let Err(err) = overlays.set_fallback(&config.fallback_overlay) {
            tracing::warn!(
                target: "splom.controller",
                fallback = %config.fallback_overlay,
                error = %err,
                "configured overlay fallback rejected, keeping the stock one"
            );
        }
        let mut strategies = StrategyFactory::builtin();
        if let Err(err) = strategies.set_fallback(&config.fallback_strategy) {
            tracing::warn!(
                target: "splom.controller",
                fallback = %config.fallback_strategy,
                error = %err,
                "configured strategy fallback rejected, keeping the stock one"
            );
        }
        Self::with_factories(config, sampler, overlays, strategies)
    }

    /// Like [`new`](Self::new) but with caller-built factories, used as
    /// given.
    pub fn with_factories(
        config: MatrixConfig,
        mut sampler: Box<dyn Sampler>,
        overlays: OverlayFactory,
        strategies: StrategyFactory,
    ) -> Self {
        let view = Arc::new(sampler.resample(config.sample_percent.min(100)));
        let strategy = Descriptor::parse(&config.render_strategy)
            .map(|d| d.canonical())
            .unwrap_or_else(|_| config.render_strategy.clone());
        let grid = Grid::new(view, config.default_size(), &strategies, &strategy);
        Self {
            config,
            overlays: Arc::new(overlays),
            strategies,
            sampler,
            grid: Some(grid),
            baseline: Baseline::default(),
            dirty: false,
            state: ReconcileState::Idle,
            progress: 0,
            active: None,
            last_error: None,
            listener: None,
            next_run_id: 1,
        }
    }

    pub fn set_listener(&mut self, listener: impl ReconcileListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    pub fn state(&self) -> ReconcileState {
        self.state
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Latest progress of the current or last run.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// The grid, unless a worker holds it.
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    /// An interrupted run may have left cells ahead of the baseline.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Error of the last failed run.
    pub fn last_error(&self) -> Option<&ReconcileError> {
        self.last_error.as_ref()
    }

    /// Start reconciling every cell towards `request`.
    ///
    /// Returns the run id. Validation rejections leave the controller
    /// unchanged.
    pub fn start(&mut self, request: ReconcileRequest) -> Result<u64, ReconcileError> {
        self.poll();
        if self.state.is_running() {
            tracing::debug!(target: "splom.controller", "start rejected, run in flight");
            return Err(ReconcileError::AlreadyRunning);
        }
        if request.sample_percent > 100 {
            return Err(ReconcileError::InvalidSamplePercent(request.sample_percent));
        }
        let size = request.cell_size;
        for side in [size.width, size.height] {
            if !self.config.cell_size_in_range(side) {
                return Err(ReconcileError::InvalidCellSize {
                    requested: side,
                    min: self.config.min_cell_size,
                    max: self.config.max_cell_size,
                });
            }
        }
        let Some(mut grid) = self.grid.take() else {
            return Err(ReconcileError::WorkerLost);
        };

        let percent = request.sample_percent;
        // A different sample invalidates everything attached so far.
        let reset_baseline = self.baseline.sample_percent != Some(percent);
        let mut resampled = false;
        if grid.view().percent() != percent {
            grid.set_view(Arc::new(self.sampler.resample(percent)));
            resampled = true;
        }
        let strategy = request.strategy.canonical();
        if resampled || grid.strategy_key() != strategy {
            grid.set_strategy(&self.strategies, &strategy);
        }
        if grid.size() != size {
            grid.set_size(size);
        }

        let desired: Vec<String> = request.overlays.iter().map(Descriptor::canonical).collect();
        let baseline: &[String] = if reset_baseline || self.dirty {
            &[]
        } else {
            &self.baseline.overlays
        };
        let plan = Plan::from_diff(diff(baseline, &desired));
        let pending = Baseline {
            overlays: diff::unique(&desired),
            sample_percent: Some(percent),
        };

        let rebuild = plan.clear_all;
        let run_id = self.next_run_id;
        let (grid_tx, grid_rx) = mpsc::channel::<Grid>();
        let (events_tx, events) = mpsc::channel();
        let source = CancellationSource::new();
        let token = source.token();
        let factory = Arc::clone(&self.overlays);
        let spawned = thread::Builder::new()
            .name("splom-reconcile".into())
            .spawn(move || {
                let Ok(mut grid) = grid_rx.recv() else {
                    return;
                };
                let report = worker::run(&mut grid, &plan, &factory, &token, run_id, &mut |p| {
                    let _ = events_tx.send(WorkerEvent::Progress(p));
                });
                let _ = events_tx.send(WorkerEvent::Finished { grid, report });
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.grid = Some(grid);
                return Err(ReconcileError::Spawn(err));
            }
        };
        if let Err(mpsc::SendError(grid)) = grid_tx.send(grid) {
            // The worker died before taking the grid.
            self.grid = Some(grid);
            return Err(ReconcileError::WorkerLost);
        }

        if reset_baseline {
            self.baseline = Baseline::default();
        }
        self.next_run_id += 1;
        telemetry::record_start();
        tracing::info!(
            target: "splom.controller",
            run_id,
            percent,
            strategy = %strategy,
            overlays = pending.overlays.len(),
            rebuild,
            "reconciliation started"
        );
        self.state = ReconcileState::Running;
        self.progress = 0;
        self.last_error = None;
        self.active = Some(ActiveRun {
            run_id,
            source,
            events,
            handle: Some(handle),
            pending,
        });
        Ok(run_id)
    }

    /// Ask the running worker to stop at the next cell boundary.
    ///
    /// Returns `false` if no run is in flight.
    pub fn cancel(&mut self) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        if active.source.cancel() {
            tracing::info!(target: "splom.controller", run_id = active.run_id, "cancellation requested");
        }
        self.state = ReconcileState::CancelRequested;
        true
    }

    /// Deliver pending worker events without blocking.
    ///
    /// The listener only sees strictly increasing progress values.
    pub fn poll(&mut self) -> ReconcileState {
        loop {
            let Some(active) = &self.active else {
                break;
            };
            match active.events.try_recv() {
                Ok(event) => self.handle(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.lose_worker(),
            }
        }
        self.state
    }

    /// Block until the in-flight run (if any) finishes.
    pub fn wait(&mut self) -> ReconcileState {
        while let Some(active) = &self.active {
            match active.events.recv() {
                Ok(event) => self.handle(event),
                Err(_) => self.lose_worker(),
            }
        }
        self.state
    }

    fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress(percent) => {
                if percent > self.progress {
                    self.progress = percent;
                    tracing::trace!(target: "splom.controller", percent, "progress delivered");
                    if let Some(l) = self.listener.as_mut() {
                        l.on_progress(percent);
                    }
                }
            }
            WorkerEvent::Finished { grid, report } => {
                if let Some(mut active) = self.active.take() {
                    if let Some(handle) = active.handle.take() {
                        let _ = handle.join();
                    }
                    self.grid = Some(grid);
                    self.finish(active, report);
                }
            }
        }
    }

    fn finish(&mut self, active: ActiveRun, report: RunReport) {
        telemetry::record_outcome(&report.outcome);
        let run_id = active.run_id;
        match report.outcome {
            RunOutcome::Completed => {
                self.baseline = active.pending;
                self.dirty = false;
                self.state = ReconcileState::Completed;
                tracing::info!(
                    target: "splom.controller",
                    run_id,
                    cells = report.total,
                    "reconciliation completed"
                );
                if let Some(l) = self.listener.as_mut() {
                    l.on_completed(&self.baseline);
                }
            }
            RunOutcome::Cancelled => {
                self.dirty = true;
                self.state = ReconcileState::Cancelled;
                tracing::info!(
                    target: "splom.controller",
                    run_id,
                    processed = report.processed,
                    total = report.total,
                    "reconciliation cancelled"
                );
                if let Some(l) = self.listener.as_mut() {
                    l.on_cancelled();
                }
            }
            RunOutcome::Failed(err) => self.fail(run_id, err),
        }
    }

    fn fail(&mut self, run_id: u64, err: ReconcileError) {
        self.dirty = true;
        self.state = ReconcileState::Failed;
        tracing::error!(target: "splom.controller", run_id, error = %err, "reconciliation failed");
        if let Some(l) = self.listener.as_mut() {
            l.on_failed(&err);
        }
        self.last_error = Some(err);
    }

    fn lose_worker(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Some(handle) = active.handle.take() {
                let _ = handle.join();
            }
            telemetry::record_outcome(&RunOutcome::Failed(ReconcileError::WorkerLost));
            self.fail(active.run_id, ReconcileError::WorkerLost);
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .field("baseline", &self.baseline)
            .field("dirty", &self.dirty)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.source.cancel();
        }
    }
}
