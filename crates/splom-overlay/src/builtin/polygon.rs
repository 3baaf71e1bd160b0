#![forbid(unsafe_code)]

use splom_core::{Descriptor, ParamError, Point, Polyline, Rgb};

use crate::cell::CellState;
use crate::overlay::{CellBinding, Overlay, OverlayError, Stroke};

use super::POLYGON;

const DEFAULT_STROKE: Stroke = Stroke::new(Rgb::BLUE, 1);

/// A polygon in data space that selects the points inside it.
///
/// While attached it turns on the cell's point selection; detaching turns it
/// back off. `vertices` is a `;`-separated list of `x y` pairs.
#[derive(Debug)]
pub struct PolygonSelection {
    descriptor: Descriptor,
    binding: CellBinding,
    vertices: Vec<Point>,
    stroke: Stroke,
    geometry: Vec<Polyline>,
    selected: Vec<usize>,
}

impl PolygonSelection {
    pub fn from_descriptor(descriptor: &Descriptor, binding: CellBinding) -> Result<Self, ParamError> {
        descriptor.check_keys(&["vertices", "color", "thickness"])?;
        let vertices = match descriptor.raw_param("vertices") {
            Some(raw) => parse_vertices(raw)?,
            None => Vec::new(),
        };
        Ok(Self {
            descriptor: descriptor.clone(),
            binding,
            vertices,
            stroke: Stroke::from_descriptor(descriptor, DEFAULT_STROKE)?,
            geometry: Vec::new(),
            selected: Vec::new(),
        })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Dataset rows inside the polygon, ascending. Filled by setup.
    pub fn selected_rows(&self) -> &[usize] {
        &self.selected
    }
}

impl Overlay for PolygonSelection {
    fn kind(&self) -> &str {
        POLYGON
    }

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn binding(&self) -> &CellBinding {
        &self.binding
    }

    fn setup(&mut self) -> Result<(), OverlayError> {
        if self.vertices.len() < 3 {
            return Err(OverlayError::DegeneratePolygon {
                vertices: self.vertices.len(),
            });
        }
        // Validates the cell's columns against the view.
        self.binding.points()?;

        let view = &self.binding.view;
        let (xc, yc) = (self.binding.x_column(), self.binding.y_column());
        let dataset = view.dataset();
        self.selected = view
            .rows()
            .iter()
            .copied()
            .filter(|&row| {
                match (dataset.value(row, xc), dataset.value(row, yc)) {
                    (Some(x), Some(y)) => {
                        let p = Point::new(x, y);
                        p.is_finite() && contains(&self.vertices, p)
                    }
                    _ => false,
                }
            })
            .collect();
        self.geometry = vec![Polyline::closed(self.vertices.clone())];
        Ok(())
    }

    fn geometry(&self) -> &[Polyline] {
        &self.geometry
    }

    fn stroke(&self) -> Stroke {
        self.stroke
    }

    fn on_attach(&mut self, state: &mut CellState) {
        state.selection_enabled = true;
    }

    fn on_detach(&mut self, state: &mut CellState) {
        state.selection_enabled = false;
    }
}

fn parse_vertices(raw: &str) -> Result<Vec<Point>, ParamError> {
    let invalid = |reason: &str| ParamError::Invalid {
        key: "vertices".into(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    raw.split(';')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let mut it = pair.split_whitespace();
            let (Some(x), Some(y), None) = (it.next(), it.next(), it.next()) else {
                return Err(invalid("expected `x y` pairs separated by `;`"));
            };
            let x: f64 = x.parse().map_err(|_| invalid("coordinate is not a number"))?;
            let y: f64 = y.parse().map_err(|_| invalid("coordinate is not a number"))?;
            let p = Point::new(x, y);
            if !p.is_finite() {
                return Err(invalid("coordinate is not finite"));
            }
            Ok(p)
        })
        .collect()
}

/// Even-odd ray casting.
fn contains(polygon: &[Point], p: Point) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let cross_x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
