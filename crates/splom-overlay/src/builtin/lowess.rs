#![forbid(unsafe_code)]

use splom_core::{Descriptor, ParamError, Point, Polyline, Rgb};

use crate::overlay::{CellBinding, Overlay, OverlayError, Stroke};

use super::LOWESS;

const DEFAULT_WINDOW: usize = 100;
const DEFAULT_STROKE: Stroke = Stroke::new(Rgb::RED, 1);

/// Locally weighted scatterplot smoothing.
///
/// Each point's fitted value comes from a tricube-weighted linear regression
/// over its `window` nearest neighbours along x. The fitted curve is drawn
/// through the points in ascending x order.
#[derive(Debug)]
pub struct Lowess {
    descriptor: Descriptor,
    binding: CellBinding,
    window: usize,
    stroke: Stroke,
    geometry: Vec<Polyline>,
}

impl Lowess {
    pub fn from_descriptor(descriptor: &Descriptor, binding: CellBinding) -> Result<Self, ParamError> {
        descriptor.check_keys(&["window", "color", "thickness"])?;
        let window: usize = descriptor.param_or("window", DEFAULT_WINDOW)?;
        if window < 2 {
            return Err(ParamError::Invalid {
                key: "window".into(),
                value: window.to_string(),
                reason: "must be at least 2".into(),
            });
        }
        Ok(Self {
            descriptor: descriptor.clone(),
            binding,
            window,
            stroke: Stroke::from_descriptor(descriptor, DEFAULT_STROKE)?,
            geometry: Vec::new(),
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Overlay for Lowess {
    fn kind(&self) -> &str {
        LOWESS
    }

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn binding(&self) -> &CellBinding {
        &self.binding
    }

    fn setup(&mut self) -> Result<(), OverlayError> {
        let mut points = self.binding.points()?;
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        let fitted = smooth(&points, self.window);
        self.geometry = if fitted.len() < 2 {
            Vec::new()
        } else {
            vec![Polyline::open(fitted)]
        };
        Ok(())
    }

    fn geometry(&self) -> &[Polyline] {
        &self.geometry
    }

    fn stroke(&self) -> Stroke {
        self.stroke
    }
}

/// Fit every point of `sorted` (ascending x) against its nearest `window`
/// neighbours.
pub(crate) fn smooth(sorted: &[Point], window: usize) -> Vec<Point> {
    let n = sorted.len();
    if n == 0 {
        return Vec::new();
    }
    let k = window.clamp(1, n);
    let mut lo = 0;
    let mut fitted = Vec::with_capacity(n);
    for p in sorted {
        // Slide the k-wide window right while that brings it closer to p.
        while lo + k < n && sorted[lo + k].x - p.x < p.x - sorted[lo].x {
            lo += 1;
        }
        let neighbours = &sorted[lo..lo + k];
        fitted.push(Point::new(p.x, fit_at(p.x, neighbours)));
    }
    fitted
}

fn fit_at(x: f64, neighbours: &[Point]) -> f64 {
    let reach = neighbours
        .iter()
        .map(|q| (q.x - x).abs())
        .fold(0.0_f64, f64::max);

    let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for q in neighbours {
        let w = if reach > 0.0 {
            tricube((q.x - x).abs() / reach)
        } else {
            1.0
        };
        sw += w;
        swx += w * q.x;
        swy += w * q.y;
        swxx += w * q.x * q.x;
        swxy += w * q.x * q.y;
    }
    if sw <= 0.0 {
        return neighbours.iter().map(|q| q.y).sum::<f64>() / neighbours.len() as f64;
    }

    let denom = sw * swxx - swx * swx;
    if denom.abs() <= f64::EPSILON * sw * swxx.abs().max(1.0) {
        // All weight sits on one x: the local fit is a constant.
        return swy / sw;
    }
    let slope = (sw * swxy - swx * swy) / denom;
    let intercept = (swy - slope * swx) / sw;
    intercept + slope * x
}

#[inline]
fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        0.0
    } else {
        let t = 1.0 - u * u * u;
        t * t * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellId;
    use splom_core::{Dataset, DatasetView, Size};
    use std::sync::Arc;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn binding(xs: Vec<f64>, ys: Vec<f64>) -> CellBinding {
        let data = Dataset::new(vec!["y".into(), "x".into()], vec![ys, xs]).unwrap();
        CellBinding {
            cell: CellId::new(0, 1),
            view: Arc::new(DatasetView::full(Arc::new(data))),
            size: Size::square(100),
        }
    }

    #[test]
    fn recovers_a_straight_line() {
        let xs: Vec<f64> = (0..40).map(|i| f64::from(i) * 0.5).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x - 2.0).collect();
        let pts: Vec<Point> = xs.iter().zip(&ys).map(|(&x, &y)| Point::new(x, y)).collect();
        for p in smooth(&pts, 7) {
            assert!(close(p.y, 3.0 * p.x - 2.0), "{p:?}");
        }

        let mut overlay = Lowess::from_descriptor(
            &Descriptor::new(LOWESS).with_param("window", 5),
            binding(xs, ys),
        )
        .unwrap();
        overlay.setup().unwrap();
        let curve = &overlay.geometry()[0];
        assert_eq!(curve.len(), 40);
        assert!(curve.points.windows(2).all(|w| w[0].x <= w[1].x));
    }

    #[test]
    fn smooths_towards_the_local_mean() {
        // Alternating noise around y = 1.
        let pts: Vec<Point> = (0..21)
            .map(|i| Point::new(f64::from(i), if i % 2 == 0 { 2.0 } else { 0.0 }))
            .collect();
        let fitted = smooth(&pts, 21);
        let mid = fitted[10].y;
        assert!((mid - 1.0).abs() < 0.25, "mid = {mid}");
    }

    #[test]
    fn repeated_x_fits_a_constant() {
        let pts = vec![Point::new(1.0, 1.0), Point::new(1.0, 3.0), Point::new(1.0, 5.0)];
        for p in smooth(&pts, 3) {
            assert!(close(p.y, 3.0));
        }
    }

    #[test]
    fn window_is_validated() {
        let b = binding(vec![0.0, 1.0], vec![0.0, 1.0]);
        let err = Lowess::from_descriptor(&Descriptor::new(LOWESS).with_param("window", 1), b.clone())
            .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { ref key, .. } if key == "window"));
        let ok = Lowess::from_descriptor(&Descriptor::new(LOWESS), b).unwrap();
        assert_eq!(ok.window(), DEFAULT_WINDOW);
    }

    #[test]
    fn single_point_draws_nothing() {
        let mut overlay =
            Lowess::from_descriptor(&Descriptor::new(LOWESS), binding(vec![4.0], vec![2.0])).unwrap();
        overlay.setup().unwrap();
        assert!(overlay.geometry().is_empty());
    }
}
