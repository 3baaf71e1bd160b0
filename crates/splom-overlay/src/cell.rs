#![forbid(unsafe_code)]

//! One plot of the matrix.
//!
//! A [`Cell`] owns its render strategy and its ordered list of attached
//! overlays. It shares the grid's dataset view through an `Arc`. Cells are
//! created once per grid position; reconciliation swaps overlays and
//! strategies in place and never recreates the cell.

use std::fmt;
use std::sync::Arc;

use splom_core::{DatasetView, Size};

use crate::overlay::{CellBinding, Overlay, OverlayError};
use crate::strategy::{Mark, RenderStrategy};

/// Grid position: `row` is the y-axis column, `column` the x-axis column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub row: usize,
    pub column: usize,
}

impl CellId {
    #[inline]
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    #[inline]
    pub const fn x_column(self) -> usize {
        self.column
    }

    #[inline]
    pub const fn y_column(self) -> usize {
        self.row
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Cell-wide flags that overlays may toggle on attach/detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellState {
    /// Interactive point selection is active in this cell.
    pub selection_enabled: bool,
}

/// An overlay instance together with the canonical key it was requested
/// under.
///
/// The key is what reconciliation removes by. It is the *requested* string,
/// so an instance that came from the fallback path is still removed when
/// its original request leaves the configuration.
#[derive(Debug)]
pub struct AttachedOverlay {
    key: String,
    overlay: Box<dyn Overlay>,
}

impl AttachedOverlay {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn overlay(&self) -> &dyn Overlay {
        self.overlay.as_ref()
    }
}

/// One scatter plot in the grid.
#[derive(Debug)]
pub struct Cell {
    id: CellId,
    view: Arc<DatasetView>,
    size: Size,
    strategy_key: String,
    strategy: Box<dyn RenderStrategy>,
    overlays: Vec<AttachedOverlay>,
    state: CellState,
}

impl Cell {
    pub fn new(
        id: CellId,
        view: Arc<DatasetView>,
        size: Size,
        strategy_key: impl Into<String>,
        strategy: Box<dyn RenderStrategy>,
    ) -> Self {
        Self {
            id,
            view,
            size,
            strategy_key: strategy_key.into(),
            strategy,
            overlays: Vec::new(),
            state: CellState::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[inline]
    pub fn view(&self) -> &Arc<DatasetView> {
        &self.view
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn state(&self) -> CellState {
        self.state
    }

    /// The binding handed to overlays built for this cell.
    pub fn binding(&self) -> CellBinding {
        CellBinding {
            cell: self.id,
            view: Arc::clone(&self.view),
            size: self.size,
        }
    }

    pub fn strategy(&self) -> &dyn RenderStrategy {
        self.strategy.as_ref()
    }

    /// Canonical string the current strategy was requested under.
    pub fn strategy_key(&self) -> &str {
        &self.strategy_key
    }

    pub fn set_strategy(&mut self, key: impl Into<String>, strategy: Box<dyn RenderStrategy>) {
        self.strategy_key = key.into();
        self.strategy = strategy;
    }

    /// Replace the dataset view.
    ///
    /// Attached overlays keep the geometry they computed against the old
    /// view until they are rebuilt.
    pub fn set_view(&mut self, view: Arc<DatasetView>) {
        self.view = view;
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn overlays(&self) -> &[AttachedOverlay] {
        &self.overlays
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Canonical keys of the attached overlays, in attach order.
    pub fn overlay_keys(&self) -> impl Iterator<Item = &str> {
        self.overlays.iter().map(|o| o.key.as_str())
    }

    /// Run the overlay's setup pass and append it.
    ///
    /// On failure the instance is dropped and the cell is left as it was.
    pub fn attach(&mut self, key: impl Into<String>, mut overlay: Box<dyn Overlay>) -> Result<(), OverlayError> {
        overlay.setup()?;
        overlay.on_attach(&mut self.state);
        self.overlays.push(AttachedOverlay {
            key: key.into(),
            overlay,
        });
        Ok(())
    }

    /// Detach every overlay whose key matches, keeping the order of the rest.
    ///
    /// Returns how many were detached.
    pub fn detach_where(&mut self, mut matches: impl FnMut(&str) -> bool) -> usize {
        let mut detached = 0;
        let mut kept = Vec::with_capacity(self.overlays.len());
        for mut attached in self.overlays.drain(..) {
            if matches(&attached.key) {
                attached.overlay.on_detach(&mut self.state);
                detached += 1;
            } else {
                kept.push(attached);
            }
        }
        self.overlays = kept;
        detached
    }

    /// Detach every overlay.
    pub fn detach_all(&mut self) -> usize {
        self.detach_where(|_| true)
    }

    /// The strategy's marks for this cell's points.
    pub fn marks(&self) -> Vec<Mark> {
        self.strategy
            .marks(&self.view, self.id.x_column(), self.id.y_column(), self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{self, PointStrategy};
    use crate::factory::OverlayFactory;
    use splom_core::Dataset;

    fn cell() -> Cell {
        let data = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![0.0, 1.0, 2.0, 3.0], vec![3.0, 1.0, 2.0, 0.0]],
        )
        .unwrap();
        Cell::new(
            CellId::new(0, 1),
            Arc::new(DatasetView::full(Arc::new(data))),
            Size::square(40),
            builtin::CIRCLE,
            Box::new(PointStrategy::circle()),
        )
    }

    fn attach(cell: &mut Cell, key: &str) {
        let overlay = OverlayFactory::builtin().instantiate(key, cell.binding());
        cell.attach(key, overlay).unwrap();
    }

    #[test]
    fn attach_runs_setup_and_keeps_order() {
        let mut c = cell();
        attach(&mut c, "diagonal");
        attach(&mut c, "coordinates:divisions=2");
        assert_eq!(
            c.overlay_keys().collect::<Vec<_>>(),
            vec!["diagonal", "coordinates:divisions=2"]
        );
        assert!(!c.overlays()[0].overlay().geometry().is_empty());
    }

    #[test]
    fn failed_setup_leaves_cell_untouched() {
        let mut c = cell();
        let overlay = OverlayFactory::builtin().instantiate("polygon:vertices=0 0;1 1", c.binding());
        let err = c.attach("polygon:vertices=0 0;1 1", overlay).unwrap_err();
        assert_eq!(err, OverlayError::DegeneratePolygon { vertices: 2 });
        assert_eq!(c.overlay_count(), 0);
        assert!(!c.state().selection_enabled);
    }

    #[test]
    fn detach_where_matches_keys_and_preserves_rest() {
        let mut c = cell();
        attach(&mut c, "diagonal");
        attach(&mut c, "lowess:window=3");
        attach(&mut c, "diagonal");
        assert_eq!(c.detach_where(|k| k == "diagonal"), 2);
        assert_eq!(c.overlay_keys().collect::<Vec<_>>(), vec!["lowess:window=3"]);
        assert_eq!(c.detach_all(), 1);
        assert_eq!(c.overlay_count(), 0);
    }

    #[test]
    fn selection_flag_follows_polygon_lifecycle() {
        let mut c = cell();
        let key = "polygon:vertices=0 0;4 0;4 4";
        attach(&mut c, key);
        assert!(c.state().selection_enabled);
        c.detach_where(|k| k == key);
        assert!(!c.state().selection_enabled);
    }

    #[test]
    fn fallback_instance_keeps_requested_key() {
        let mut c = cell();
        attach(&mut c, "mystery:x=1");
        assert_eq!(c.overlays()[0].overlay().kind(), "diagonal");
        assert_eq!(c.overlays()[0].key(), "mystery:x=1");
        assert_eq!(c.detach_where(|k| k == "mystery:x=1"), 1);
    }

    #[test]
    fn marks_use_cell_axes() {
        let c = cell();
        let marks = c.marks();
        assert_eq!(marks.len(), 4);
        // x comes from column "b", y from column "a": row 0 is (3, 0).
        assert_eq!(marks[0], Mark { row: 0, x: 39, y: 39 });
        assert_eq!(marks[3], Mark { row: 3, x: 0, y: 0 });
    }
}
