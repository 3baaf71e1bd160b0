#![forbid(unsafe_code)]

use splom_core::{Bounds, Descriptor, ParamError, Point, Polyline, Rgb};

use crate::overlay::{CellBinding, Overlay, OverlayError, Stroke};

use super::COORDINATES;

const DEFAULT_DIVISIONS: u16 = 4;
const DEFAULT_STROKE: Stroke = Stroke::new(Rgb::new(200, 200, 200), 1);

/// Evenly spaced grid lines across the data extent.
///
/// `divisions` splits each axis into that many bands, so the overlay draws
/// `divisions + 1` vertical and `divisions + 1` horizontal lines.
#[derive(Debug)]
pub struct Coordinates {
    descriptor: Descriptor,
    binding: CellBinding,
    divisions: u16,
    stroke: Stroke,
    geometry: Vec<Polyline>,
}

impl Coordinates {
    pub fn from_descriptor(descriptor: &Descriptor, binding: CellBinding) -> Result<Self, ParamError> {
        descriptor.check_keys(&["divisions", "color", "thickness"])?;
        let divisions: u16 = descriptor.param_or("divisions", DEFAULT_DIVISIONS)?;
        if divisions == 0 {
            return Err(ParamError::Invalid {
                key: "divisions".into(),
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            descriptor: descriptor.clone(),
            binding,
            divisions,
            stroke: Stroke::from_descriptor(descriptor, DEFAULT_STROKE)?,
            geometry: Vec::new(),
        })
    }
}

impl Overlay for Coordinates {
    fn kind(&self) -> &str {
        COORDINATES
    }

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn binding(&self) -> &CellBinding {
        &self.binding
    }

    fn setup(&mut self) -> Result<(), OverlayError> {
        let points = self.binding.points()?;
        let Some(b) = Bounds::from_points(&points) else {
            self.geometry.clear();
            return Ok(());
        };
        let steps = f64::from(self.divisions);
        let mut lines = Vec::with_capacity(2 * (usize::from(self.divisions) + 1));
        for i in 0..=self.divisions {
            let t = f64::from(i) / steps;
            let x = b.min_x + t * b.width();
            lines.push(Polyline::segment(Point::new(x, b.min_y), Point::new(x, b.max_y)));
        }
        for i in 0..=self.divisions {
            let t = f64::from(i) / steps;
            let y = b.min_y + t * b.height();
            lines.push(Polyline::segment(Point::new(b.min_x, y), Point::new(b.max_x, y)));
        }
        self.geometry = lines;
        Ok(())
    }

    fn geometry(&self) -> &[Polyline] {
        &self.geometry
    }

    fn stroke(&self) -> Stroke {
        self.stroke
    }
}
