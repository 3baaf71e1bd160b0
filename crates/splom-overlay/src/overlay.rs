#![forbid(unsafe_code)]

//! The overlay trait and the binding that ties an instance to one cell.

use std::fmt;
use std::sync::Arc;

use splom_core::{Descriptor, DatasetView, ParamError, Point, Polyline, Rgb, Size};

use crate::cell::{CellId, CellState};

/// Everything an overlay instance needs to know about the cell it is
/// attached to.
#[derive(Debug, Clone)]
pub struct CellBinding {
    pub cell: CellId,
    pub view: Arc<DatasetView>,
    pub size: Size,
}

impl CellBinding {
    #[inline]
    pub fn x_column(&self) -> usize {
        self.cell.x_column()
    }

    #[inline]
    pub fn y_column(&self) -> usize {
        self.cell.y_column()
    }

    /// The cell's finite data points.
    ///
    /// Fails when the cell addresses a column the view does not have, which
    /// happens when a grid built for one dataset is handed a view of another.
    pub fn points(&self) -> Result<Vec<Point>, OverlayError> {
        let columns = self.view.column_count();
        for column in [self.x_column(), self.y_column()] {
            if column >= columns {
                return Err(OverlayError::ColumnOutOfRange { column, columns });
            }
        }
        Ok(self.view.points(self.x_column(), self.y_column()))
    }
}

/// A live visual annotation bound to one cell.
///
/// Instances are created by the [`OverlayFactory`](crate::OverlayFactory),
/// owned by exactly one [`Cell`](crate::Cell), and dropped when detached.
pub trait Overlay: Send + fmt::Debug {
    /// The type tag this instance was built for.
    fn kind(&self) -> &str;

    /// The configuration the instance was built from.
    fn descriptor(&self) -> &Descriptor;

    /// The cell this instance is bound to.
    fn binding(&self) -> &CellBinding;

    /// One-time calculation pass over the bound cell's data.
    ///
    /// May be expensive (curve fitting over the whole sample). An error here
    /// means the configuration cannot be applied to the current dataset.
    fn setup(&mut self) -> Result<(), OverlayError>;

    /// Data-space geometry produced by [`setup`](Self::setup).
    fn geometry(&self) -> &[Polyline];

    /// Line style for drawing the geometry.
    fn stroke(&self) -> Stroke;

    /// Called after setup succeeds, just before the instance joins the cell.
    fn on_attach(&mut self, _state: &mut CellState) {}

    /// Called when the instance leaves the cell.
    fn on_detach(&mut self, _state: &mut CellState) {}
}

/// Overlay setup failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OverlayError {
    #[error("column {column} is out of range for a view with {columns} columns")]
    ColumnOutOfRange { column: usize, columns: usize },
    #[error("polygon needs at least 3 vertices, got {vertices}")]
    DegeneratePolygon { vertices: usize },
    #[error("overlay setup failed: {0}")]
    Setup(String),
}

/// Line color and thickness shared by the built-in overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stroke {
    pub color: Rgb,
    pub thickness: u8,
}

impl Stroke {
    pub const fn new(color: Rgb, thickness: u8) -> Self {
        Self { color, thickness }
    }

    /// Read `color` and `thickness` from a descriptor.
    pub fn from_descriptor(descriptor: &Descriptor, default: Stroke) -> Result<Self, ParamError> {
        let thickness = descriptor.param_or("thickness", default.thickness)?;
        if thickness == 0 {
            return Err(ParamError::Invalid {
                key: "thickness".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            color: descriptor.param_or("color", default.color)?,
            thickness,
        })
    }
}
