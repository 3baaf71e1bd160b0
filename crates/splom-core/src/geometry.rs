#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Two coordinate spaces meet here: overlay geometry lives in *data space*
//! (`f64` values straight from the dataset columns), while cells and render
//! strategies work in *pixel space* (`u16`, origin at top-left).

/// Pixel size of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Create a square size, the shape every matrix cell uses.
    #[inline]
    pub const fn square(side: u16) -> Self {
        Self::new(side, side)
    }

    /// Check if the size has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Area in pixels.
    #[inline]
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A point in data space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned extent of a point cloud in data space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Compute the bounds of the finite points in `points`.
    ///
    /// Returns `None` when there is no finite point.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for p in points.into_iter().filter(|p| p.is_finite()) {
            bounds = Some(match bounds {
                None => Bounds {
                    min_x: p.x,
                    max_x: p.x,
                    min_y: p.y,
                    max_y: p.y,
                },
                Some(b) => Bounds {
                    min_x: b.min_x.min(p.x),
                    max_x: b.max_x.max(p.x),
                    min_y: b.min_y.min(p.y),
                    max_y: b.max_y.max(p.y),
                },
            });
        }
        bounds
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Map a data-space point into a pixel position inside `size`.
    ///
    /// The y axis is flipped so larger values sit higher in the cell. A
    /// zero-width or zero-height extent maps onto the cell's centre line.
    pub fn project(&self, p: Point, size: Size) -> (u16, u16) {
        let max_px = f64::from(size.width.saturating_sub(1));
        let max_py = f64::from(size.height.saturating_sub(1));
        let fx = if self.width() > 0.0 {
            (p.x - self.min_x) / self.width()
        } else {
            0.5
        };
        let fy = if self.height() > 0.0 {
            (p.y - self.min_y) / self.height()
        } else {
            0.5
        };
        let px = (fx.clamp(0.0, 1.0) * max_px).round() as u16;
        let py = ((1.0 - fy.clamp(0.0, 1.0)) * max_py).round() as u16;
        (px, py)
    }
}

/// An open or closed sequence of data-space points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyline {
    pub points: Vec<Point>,
    /// The last point connects back to the first.
    pub closed: bool,
}

impl Polyline {
    pub fn open(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    pub fn closed(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    /// A two-point segment.
    pub fn segment(from: Point, to: Point) -> Self {
        Self::open(vec![from, to])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_skip_non_finite_points() {
        let pts = [
            Point::new(1.0, 2.0),
            Point::new(f64::NAN, 100.0),
            Point::new(-3.0, 5.0),
            Point::new(0.0, f64::INFINITY),
        ];
        let b = Bounds::from_points(&pts).unwrap();
        assert_eq!(b.min_x, -3.0);
        assert_eq!(b.max_x, 1.0);
        assert_eq!(b.min_y, 2.0);
        assert_eq!(b.max_y, 5.0);
    }

    #[test]
    fn bounds_of_nothing_is_none() {
        assert!(Bounds::from_points(&Vec::<Point>::new()).is_none());
        assert!(Bounds::from_points(&[Point::new(f64::NAN, 0.0)]).is_none());
    }

    #[test]
    fn project_flips_y_and_hits_corners() {
        let b = Bounds {
            min_x: 0.0,
            max_x: 10.0,
            min_y: 0.0,
            max_y: 10.0,
        };
        let size = Size::square(101);
        assert_eq!(b.project(Point::new(0.0, 0.0), size), (0, 100));
        assert_eq!(b.project(Point::new(10.0, 10.0), size), (100, 0));
        assert_eq!(b.project(Point::new(5.0, 5.0), size), (50, 50));
    }

    #[test]
    fn project_degenerate_extent_centres() {
        let b = Bounds {
            min_x: 3.0,
            max_x: 3.0,
            min_y: 1.0,
            max_y: 1.0,
        };
        assert_eq!(b.project(Point::new(3.0, 1.0), Size::square(11)), (5, 5));
    }

    #[test]
    fn size_display_and_area() {
        let s = Size::square(100);
        assert_eq!(s.to_string(), "100x100");
        assert_eq!(s.area(), 10_000);
        assert!(Size::new(0, 5).is_empty());
    }
}
