#![forbid(unsafe_code)]

//! splom public facade crate.
//!
//! Re-exports the descriptor, overlay, and reconciliation types from the
//! internal crates and offers a small prelude for applications that drive a
//! scatter-plot matrix.

// --- Core re-exports -------------------------------------------------------

pub use splom_core::{
    Bounds, Dataset, DatasetError, DatasetView, Descriptor, ParamError, ParseError, Point,
    Polyline, Rgb, Sampler, Size, SubSampler,
};

// --- Overlay re-exports ----------------------------------------------------

pub use splom_overlay::{
    Cell, CellBinding, CellId, CellState, Grid, Overlay, OverlayError, OverlayFactory,
    OverlayRegistry, RenderStrategy, StrategyFactory, StrategyRegistry,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "config")]
pub use splom_runtime::ConfigError;
pub use splom_runtime::{
    Baseline, Controller, MatrixConfig, ReconcileError, ReconcileListener, ReconcileRequest,
    ReconcileState, TelemetrySnapshot,
};

#[cfg(feature = "logging")]
pub mod logging;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for splom applications.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[cfg(feature = "config")]
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The loaded configuration failed validation.
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),
}

/// Standard result type for splom APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Validate `config` and build a controller that samples `data`.
pub fn controller(config: MatrixConfig, data: Dataset) -> Result<Controller> {
    let problems = config.validate();
    if !problems.is_empty() {
        return Err(Error::InvalidConfig(problems));
    }
    let sampler = SubSampler::new(std::sync::Arc::new(data), config.sampler_seed);
    tracing::debug!(
        target: "splom.controller",
        columns = sampler.column_count(),
        seed = config.sampler_seed,
        "controller configured"
    );
    Ok(Controller::new(config, Box::new(sampler)))
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Baseline, Controller, Dataset, Descriptor, Error, MatrixConfig, ReconcileListener,
        ReconcileRequest, ReconcileState, Result,
    };

    pub use crate::{core, overlay, runtime};
}

pub use splom_core as core;
pub use splom_overlay as overlay;
pub use splom_runtime as runtime;
