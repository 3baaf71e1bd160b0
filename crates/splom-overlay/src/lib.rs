#![forbid(unsafe_code)]

//! Live overlays, render strategies, cells, and the plot grid.
//!
//! # Role in splom
//! `splom-overlay` turns canonical strings into running objects. It owns the
//! [`Overlay`] and [`RenderStrategy`] traits, the injected [`Registry`] that
//! maps a type tag to a constructor, and the two factories that apply the
//! failure-to-default policy. A [`Cell`] is one plot of the matrix; a
//! [`Grid`] is every cell in deterministic grid order.
//!
//! # Failure policy
//! Reconstruction never fails: an unknown type tag or a malformed parameter
//! makes the factory log a warning and substitute its documented fallback
//! (`diagonal` for overlays, `circle` for render strategies). Setup
//! failures are different; they surface as [`OverlayError`] and are fatal
//! to the reconciliation run that triggered them.

pub mod builtin;
pub mod cell;
pub mod factory;
pub mod grid;
pub mod overlay;
pub mod registry;
pub mod strategy;

pub use cell::{AttachedOverlay, Cell, CellId, CellState};
pub use factory::{Factory, OverlayFactory, StrategyFactory, fallbacks_total};
pub use grid::Grid;
pub use overlay::{CellBinding, Overlay, OverlayError, Stroke};
pub use registry::{BuildError, OverlayRegistry, Registry, StrategyRegistry};
pub use strategy::{Mark, MarkShape, RenderStrategy};
