#![forbid(unsafe_code)]

//! Overlay reconciliation for the scatter-plot matrix.
//!
//! # Role in splom
//! `splom-runtime` keeps every [`Cell`](splom_overlay::Cell) of a
//! [`Grid`](splom_overlay::Grid) in step with the overlay configuration the
//! user asks for:
//!
//! - [`diff()`] computes what to add and remove against the last fully applied
//!   [`Baseline`].
//! - [`worker::run`] applies a [`Plan`] cell by cell, removal before
//!   addition, reporting progress and honoring a [`CancellationToken`].
//! - [`Controller`] owns the baseline, runs the worker on a background
//!   thread, rejects concurrent starts, and publishes the outcome.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use splom_core::{Dataset, Descriptor, SubSampler};
//! use splom_runtime::{Controller, MatrixConfig, ReconcileRequest, ReconcileState};
//!
//! let data = Dataset::new(
//!     vec!["a".into(), "b".into()],
//!     vec![vec![1.0, 2.0, 3.0], vec![3.0, 1.0, 2.0]],
//! )
//! .unwrap();
//! let config = MatrixConfig::default();
//! let mut controller = Controller::new(
//!     config.clone(),
//!     Box::new(SubSampler::new(Arc::new(data), config.sampler_seed)),
//! );
//! let request = ReconcileRequest::from_config(&config)
//!     .with_overlays([Descriptor::new("diagonal")]);
//! controller.start(request).unwrap();
//! assert_eq!(controller.wait(), ReconcileState::Completed);
//! assert_eq!(controller.baseline().overlays, vec!["diagonal"]);
//! ```

pub mod cancellation;
pub mod config;
pub mod controller;
pub mod diff;
pub mod error;
pub mod telemetry;
pub mod worker;

pub use cancellation::{CancellationSource, CancellationToken};
#[cfg(feature = "config")]
pub use config::ConfigError;
pub use config::MatrixConfig;
pub use controller::{Baseline, Controller, ReconcileListener, ReconcileRequest, ReconcileState};
pub use diff::{Diff, diff};
pub use error::ReconcileError;
pub use telemetry::TelemetrySnapshot;
pub use worker::{Plan, RunOutcome, RunReport};
