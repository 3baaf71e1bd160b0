#![forbid(unsafe_code)]

//! Numeric datasets, sampled views, and the sampler collaborator.
//!
//! Loading and column typing happen elsewhere; by the time data reaches
//! this crate it is a rectangular table of `f64` columns. Missing or
//! non-numeric cells are represented as `NaN` and skipped wherever points
//! are extracted.
//!
//! A [`DatasetView`] is a cheap, immutable row subset shared by every cell
//! in the grid. Resampling never mutates a view; it produces a new one.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::geometry::Point;

/// A rectangular table of named numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    rows: usize,
}

/// The dataset's shape is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetError {
    #[error("{names} column names for {columns} columns")]
    NameCount { names: usize, columns: usize },
    #[error("column {column:?} has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
}

impl Dataset {
    /// Build a dataset from column names and column-major values.
    pub fn new(names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self, DatasetError> {
        if names.len() != columns.len() {
            return Err(DatasetError::NameCount {
                names: names.len(),
                columns: columns.len(),
            });
        }
        let rows = columns.first().map_or(0, Vec::len);
        for (name, column) in names.iter().zip(&columns) {
            if column.len() != rows {
                return Err(DatasetError::RaggedColumn {
                    column: name.clone(),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }
        Ok(Self {
            names,
            columns,
            rows,
        })
    }

    /// Build a dataset from row-major records.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, DatasetError> {
        let mut columns = vec![Vec::with_capacity(rows.len()); names.len()];
        for (r, row) in rows.iter().enumerate() {
            if row.len() != names.len() {
                return Err(DatasetError::RaggedColumn {
                    column: format!("row {r}"),
                    expected: names.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(*value);
            }
        }
        Self::new(names, columns)
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_name(&self, column: usize) -> Option<&str> {
        self.names.get(column).map(String::as_str)
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Value at `(row, column)`, `None` when out of range.
    #[inline]
    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        self.columns.get(column)?.get(row).copied()
    }
}

/// An immutable row subset of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct DatasetView {
    dataset: Arc<Dataset>,
    rows: Arc<[usize]>,
    percent: u8,
}

impl DatasetView {
    /// A view over every row.
    pub fn full(dataset: Arc<Dataset>) -> Self {
        let rows: Arc<[usize]> = (0..dataset.row_count()).collect();
        Self {
            dataset,
            rows,
            percent: 100,
        }
    }

    /// A view over the given source rows, kept in the order supplied.
    ///
    /// Rows beyond the dataset are dropped.
    pub fn with_rows(dataset: Arc<Dataset>, rows: Vec<usize>, percent: u8) -> Self {
        let limit = dataset.row_count();
        let rows: Arc<[usize]> = rows.into_iter().filter(|&r| r < limit).collect();
        Self {
            dataset,
            rows,
            percent: percent.min(100),
        }
    }

    /// The sample percentage this view was drawn with.
    #[inline]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    #[inline]
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.dataset.column_count()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Source row indices, in view order.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Values of one column across the view's rows.
    pub fn column(&self, column: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows
            .iter()
            .map(move |&r| self.dataset.value(r, column).unwrap_or(f64::NAN))
    }

    /// Finite `(x, y)` points for a column pair, in view order.
    pub fn points(&self, x_column: usize, y_column: usize) -> Vec<Point> {
        self.rows
            .iter()
            .filter_map(|&r| {
                let p = Point::new(
                    self.dataset.value(r, x_column)?,
                    self.dataset.value(r, y_column)?,
                );
                p.is_finite().then_some(p)
            })
            .collect()
    }

    /// Both views read the same dataset and rows.
    pub fn same_rows(&self, other: &DatasetView) -> bool {
        Arc::ptr_eq(&self.dataset, &other.dataset) && self.rows == other.rows
    }
}

/// Produces the dataset view for a sample percentage.
///
/// The controller calls this before a reconciliation whose sample percent
/// differs from the view currently installed in the grid.
pub trait Sampler: Send {
    /// Draw a view containing roughly `percent`% of the rows.
    fn resample(&mut self, percent: u8) -> DatasetView;

    /// Number of columns every view from this sampler has.
    fn column_count(&self) -> usize;
}

/// Seeded random subsampling without replacement.
///
/// Picks `round(rows * percent / 100)` rows and keeps them in source order,
/// so the same seed and percentage always yield the same view.
#[derive(Debug, Clone)]
pub struct SubSampler {
    dataset: Arc<Dataset>,
    seed: u64,
}

impl SubSampler {
    pub fn new(dataset: Arc<Dataset>, seed: u64) -> Self {
        Self { dataset, seed }
    }

    /// Number of rows a sample of `percent` keeps.
    pub fn sample_len(&self, percent: u8) -> usize {
        let rows = self.dataset.row_count();
        let percent = usize::from(percent.min(100));
        (rows * percent + 50) / 100
    }
}

impl Sampler for SubSampler {
    fn resample(&mut self, percent: u8) -> DatasetView {
        let percent = percent.min(100);
        if percent == 100 {
            return DatasetView::full(Arc::clone(&self.dataset));
        }
        let amount = self.sample_len(percent);
        let mut rng = SmallRng::seed_from_u64(self.seed ^ u64::from(percent));
        let mut rows = rand::seq::index::sample(&mut rng, self.dataset.row_count(), amount)
            .into_vec();
        rows.sort_unstable();
        tracing::debug!(
            target: "splom.sampler",
            percent,
            rows = rows.len(),
            source_rows = self.dataset.row_count(),
            "dataset resampled"
        );
        DatasetView::with_rows(Arc::clone(&self.dataset), rows, percent)
    }

    fn column_count(&self) -> usize {
        self.dataset.column_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{i}")).collect()
    }

    fn linear(rows: usize) -> Arc<Dataset> {
        let xs: Vec<f64> = (0..rows).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        Arc::new(Dataset::new(names(2), vec![xs, ys]).unwrap())
    }

    #[test]
    fn new_rejects_ragged_columns() {
        let err = Dataset::new(names(2), vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::RaggedColumn {
                column: "c1".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn new_rejects_name_mismatch() {
        let err = Dataset::new(names(1), vec![vec![], vec![]]).unwrap_err();
        assert_eq!(err, DatasetError::NameCount { names: 1, columns: 2 });
    }

    #[test]
    fn from_rows_transposes() {
        let d = Dataset::from_rows(names(2), &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(d.row_count(), 2);
        assert_eq!(d.value(1, 0), Some(3.0));
        assert_eq!(d.value(0, 1), Some(2.0));
        assert_eq!(d.value(2, 0), None);
    }

    #[test]
    fn points_skip_nan() {
        let d = Arc::new(
            Dataset::new(names(2), vec![vec![1.0, f64::NAN, 3.0], vec![1.0, 2.0, 3.0]]).unwrap(),
        );
        let view = DatasetView::full(d);
        assert_eq!(
            view.points(0, 1),
            vec![Point::new(1.0, 1.0), Point::new(3.0, 3.0)]
        );
    }

    #[test]
    fn points_out_of_range_column_is_empty() {
        let view = DatasetView::full(linear(5));
        assert!(view.points(0, 7).is_empty());
        assert!(view.column(9).all(f64::is_nan));
    }

    #[test]
    fn subsample_is_deterministic_and_ordered() {
        let data = linear(200);
        let mut a = SubSampler::new(Arc::clone(&data), 7);
        let mut b = SubSampler::new(data, 7);
        let va = a.resample(20);
        let vb = b.resample(20);
        assert_eq!(va.rows(), vb.rows());
        assert_eq!(va.row_count(), 40);
        assert_eq!(va.percent(), 20);
        assert!(va.rows().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn subsample_extremes() {
        let mut s = SubSampler::new(linear(10), 1);
        assert_eq!(s.resample(100).row_count(), 10);
        assert_eq!(s.resample(0).row_count(), 0);
        assert_eq!(s.resample(250).percent(), 100);
        assert_eq!(s.sample_len(15), 2);
    }

    #[test]
    fn same_rows_compares_identity_and_rows() {
        let data = linear(50);
        let mut s = SubSampler::new(Arc::clone(&data), 3);
        let a = s.resample(50);
        let b = s.resample(50);
        assert!(a.same_rows(&b));
        assert!(!a.same_rows(&DatasetView::full(data)));
    }
}
