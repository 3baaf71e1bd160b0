#![forbid(unsafe_code)]

use splom_core::{Descriptor, ParamError, Rgb};

use crate::strategy::{MarkShape, RenderStrategy};

use super::{CIRCLE, CROSS, SQUARE};

const DEFAULT_SIZE: u8 = 3;

/// The built-in point strategies: one mark shape, one color.
#[derive(Debug, Clone)]
pub struct PointStrategy {
    descriptor: Descriptor,
    shape: MarkShape,
    color: Rgb,
}

impl PointStrategy {
    /// Default filled circle, also the strategy fallback.
    pub fn circle() -> Self {
        Self {
            descriptor: Descriptor::new(CIRCLE),
            shape: MarkShape::Circle {
                diameter: DEFAULT_SIZE,
                filled: true,
            },
            color: Rgb::BLACK,
        }
    }

    /// Build a `circle`, `square` or `cross` strategy.
    pub fn from_descriptor(descriptor: &Descriptor) -> Result<Self, ParamError> {
        let shape = match descriptor.kind() {
            SQUARE => {
                descriptor.check_keys(&["side", "color"])?;
                MarkShape::Square {
                    side: positive(descriptor, "side")?,
                }
            }
            CROSS => {
                descriptor.check_keys(&["arm", "color"])?;
                MarkShape::Cross {
                    arm: positive(descriptor, "arm")?,
                }
            }
            _ => {
                descriptor.check_keys(&["size", "filled", "color"])?;
                MarkShape::Circle {
                    diameter: positive(descriptor, "size")?,
                    filled: descriptor.param_or("filled", true)?,
                }
            }
        };
        Ok(Self {
            descriptor: descriptor.clone(),
            shape,
            color: descriptor.param_or("color", Rgb::BLACK)?,
        })
    }
}

fn positive(descriptor: &Descriptor, key: &str) -> Result<u8, ParamError> {
    let value: u8 = descriptor.param_or(key, DEFAULT_SIZE)?;
    if value == 0 {
        return Err(ParamError::Invalid {
            key: key.to_string(),
            value: "0".into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(value)
}

impl RenderStrategy for PointStrategy {
    fn kind(&self) -> &str {
        self.descriptor.kind()
    }

    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn shape(&self) -> MarkShape {
        self.shape
    }

    fn color(&self) -> Rgb {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_follow_kind() {
        let sq = PointStrategy::from_descriptor(&Descriptor::new(SQUARE).with_param("side", 5)).unwrap();
        assert_eq!(sq.shape(), MarkShape::Square { side: 5 });
        let cross = PointStrategy::from_descriptor(&Descriptor::new(CROSS)).unwrap();
        assert_eq!(cross.shape(), MarkShape::Cross { arm: DEFAULT_SIZE });
        let hollow = PointStrategy::from_descriptor(
            &Descriptor::new(CIRCLE)
                .with_param("filled", false)
                .with_param("color", "#0000ff"),
        )
        .unwrap();
        assert_eq!(
            hollow.shape(),
            MarkShape::Circle {
                diameter: DEFAULT_SIZE,
                filled: false
            }
        );
        assert_eq!(hollow.color(), Rgb::BLUE);
    }

    #[test]
    fn rejects_foreign_and_zero_parameters() {
        assert!(PointStrategy::from_descriptor(&Descriptor::new(SQUARE).with_param("arm", 2)).is_err());
        assert!(PointStrategy::from_descriptor(&Descriptor::new(CIRCLE).with_param("size", 0)).is_err());
    }

    #[test]
    fn fallback_circle_has_plain_canonical() {
        let c = PointStrategy::circle();
        assert_eq!(c.kind(), CIRCLE);
        assert_eq!(c.descriptor().canonical(), "circle");
    }
}
