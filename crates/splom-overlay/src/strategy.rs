#![forbid(unsafe_code)]

//! Render strategies: how a cell turns its sampled points into marks.
//!
//! Pixel drawing happens in the host; a strategy only decides the mark
//! shape, color, and where each sampled row lands inside the cell.

use std::fmt;

use splom_core::{Bounds, DatasetView, Descriptor, Rgb, Size};

/// Shape drawn for a single data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkShape {
    Circle { diameter: u8, filled: bool },
    Square { side: u8 },
    Cross { arm: u8 },
}

/// One projected data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    /// Source row in the dataset.
    pub row: usize,
    pub x: u16,
    pub y: u16,
}

/// A pluggable point-drawing strategy, one instance per cell.
pub trait RenderStrategy: Send + fmt::Debug {
    fn kind(&self) -> &str;

    fn descriptor(&self) -> &Descriptor;

    fn shape(&self) -> MarkShape;

    fn color(&self) -> Rgb;

    /// Project the view's rows for a column pair into pixel space.
    ///
    /// Rows with a non-finite coordinate produce no mark.
    fn marks(&self, view: &DatasetView, x_column: usize, y_column: usize, size: Size) -> Vec<Mark> {
        let points = view.points(x_column, y_column);
        let Some(bounds) = Bounds::from_points(&points) else {
            return Vec::new();
        };
        let dataset = view.dataset();
        view.rows()
            .iter()
            .filter_map(|&row| {
                let x = dataset.value(row, x_column)?;
                let y = dataset.value(row, y_column)?;
                let p = splom_core::Point::new(x, y);
                if !p.is_finite() {
                    return None;
                }
                let (px, py) = bounds.project(p, size);
                Some(Mark { row, x: px, y: py })
            })
            .collect()
    }
}
