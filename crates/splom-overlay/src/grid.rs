#![forbid(unsafe_code)]

//! The scatter-plot matrix: one [`Cell`] per ordered pair of distinct
//! columns.

use std::sync::Arc;

use splom_core::{DatasetView, Size};

use crate::cell::{Cell, CellId};
use crate::factory::StrategyFactory;

/// Every cell of the matrix in grid order.
///
/// Order is row-major with the y-axis column as the row: `(row 0, col 1)`,
/// `(row 0, col 2)`, …, `(row 1, col 0)`, …. Diagonal positions have no cell.
/// The order is fixed at construction and is the order reconciliation
/// visits cells in.
#[derive(Debug)]
pub struct Grid {
    cells: Vec<Cell>,
    view: Arc<DatasetView>,
    size: Size,
    strategy_key: String,
    columns: usize,
}

impl Grid {
    /// Build cells for every off-diagonal column pair of `view`, each with
    /// its own strategy instance built from `strategy`.
    pub fn new(view: Arc<DatasetView>, size: Size, strategies: &StrategyFactory, strategy: &str) -> Self {
        let columns = view.column_count();
        let mut cells = Vec::with_capacity(columns * columns.saturating_sub(1));
        for row in 0..columns {
            for column in (0..columns).filter(|&c| c != row) {
                cells.push(Cell::new(
                    CellId::new(row, column),
                    Arc::clone(&view),
                    size,
                    strategy,
                    strategies.create(strategy),
                ));
            }
        }
        tracing::debug!(
            target: "splom.grid",
            columns,
            cells = cells.len(),
            strategy,
            "grid built"
        );
        Self {
            cells,
            view,
            size,
            strategy_key: strategy.to_string(),
            columns,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id() == id)
    }

    /// Number of dataset columns the grid was laid out for.
    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn view(&self) -> &Arc<DatasetView> {
        &self.view
    }

    /// Share a new view with every cell.
    pub fn set_view(&mut self, view: Arc<DatasetView>) {
        for cell in &mut self.cells {
            cell.set_view(Arc::clone(&view));
        }
        self.view = view;
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_size(&mut self, size: Size) {
        for cell in &mut self.cells {
            cell.set_size(size);
        }
        self.size = size;
    }

    /// Canonical string of the grid-wide render strategy.
    pub fn strategy_key(&self) -> &str {
        &self.strategy_key
    }

    /// Give every cell a fresh strategy instance for `canonical`.
    pub fn set_strategy(&mut self, strategies: &StrategyFactory, canonical: &str) {
        for cell in &mut self.cells {
            cell.set_strategy(canonical, strategies.create(canonical));
        }
        self.strategy_key = canonical.to_string();
    }
}
