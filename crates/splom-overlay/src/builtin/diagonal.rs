#![forbid(unsafe_code)]

use splom_core::{Bounds, Descriptor, ParamError, Point, Polyline, Rgb};

use crate::overlay::{CellBinding, Overlay, OverlayError, Stroke};

use super::DIAGONAL;

const DEFAULT_STROKE: Stroke = Stroke::new(Rgb::GRAY, 1);

/// Reference line from the lower-left to the upper-right corner of the
/// cell's data extent. Also the overlay fallback.
#[derive(Debug)]
pub struct Diagonal {
    descriptor: Descriptor,
    binding: CellBinding,
    stroke: Stroke,
    geometry: Vec<Polyline>,
}

impl Diagonal {
    pub fn from_descriptor(descriptor: &Descriptor, binding: CellBinding) -> Result<Self, ParamError> {
        descriptor.check_keys(&["color", "thickness"])?;
        Ok(Self {
            stroke: Stroke::from_descriptor(descriptor, DEFAULT_STROKE)?,
            descriptor: descriptor.clone(),
            binding,
            geometry: Vec::new(),
        })
    }

    /// A default-configured diagonal.
    pub fn fallback(binding: CellBinding) -> Box<dyn Overlay> {
        Box::new(Self {
            descriptor: Descriptor::new(DIAGONAL),
            binding,
            stroke: DEFAULT_STROKE,
            geometry: Vec::new(),
        })
    }
}

impl Overlay for Diagonal {
    fn kind(&self) -> &str {
        DIAGONAL
    }

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn binding(&self) -> &CellBinding {
        &self.binding
    }

    fn setup(&mut self) -> Result<(), OverlayError> {
        let points = self.binding.points()?;
        self.geometry = Bounds::from_points(&points)
            .map(|b| {
                vec![Polyline::segment(
                    Point::new(b.min_x, b.min_y),
                    Point::new(b.max_x, b.max_y),
                )]
            })
            .unwrap_or_default();
        Ok(())
    }

    fn geometry(&self) -> &[Polyline] {
        &self.geometry
    }

    fn stroke(&self) -> Stroke {
        self.stroke
    }
}
