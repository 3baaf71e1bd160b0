#![forbid(unsafe_code)]

//! Stock overlay types and render strategies.
//!
//! | tag           | parameters                          |
//! |---------------|-------------------------------------|
//! | `diagonal`    | `color`, `thickness`                |
//! | `lowess`      | `window`, `color`, `thickness`      |
//! | `coordinates` | `divisions`, `color`, `thickness`   |
//! | `polygon`     | `vertices`, `color`, `thickness`    |
//! | `circle`      | `size`, `filled`, `color`           |
//! | `square`      | `side`, `color`                     |
//! | `cross`       | `arm`, `color`                      |

mod coordinates;
mod diagonal;
mod lowess;
mod marks;
mod polygon;

pub use coordinates::Coordinates;
pub use diagonal::Diagonal;
pub use lowess::Lowess;
pub use marks::PointStrategy;
pub use polygon::PolygonSelection;

use crate::registry::{OverlayRegistry, StrategyRegistry};

pub const DIAGONAL: &str = "diagonal";
pub const LOWESS: &str = "lowess";
pub const COORDINATES: &str = "coordinates";
pub const POLYGON: &str = "polygon";

pub const CIRCLE: &str = "circle";
pub const SQUARE: &str = "square";
pub const CROSS: &str = "cross";

/// Registry with every built-in overlay type.
pub fn overlay_registry() -> OverlayRegistry {
    OverlayRegistry::new()
        .with(DIAGONAL, |d, b| Ok(Box::new(Diagonal::from_descriptor(d, b)?)))
        .with(LOWESS, |d, b| Ok(Box::new(Lowess::from_descriptor(d, b)?)))
        .with(COORDINATES, |d, b| {
            Ok(Box::new(Coordinates::from_descriptor(d, b)?))
        })
        .with(POLYGON, |d, b| {
            Ok(Box::new(PolygonSelection::from_descriptor(d, b)?))
        })
}

/// Registry with every built-in render strategy.
pub fn strategy_registry() -> StrategyRegistry {
    StrategyRegistry::new()
        .with(CIRCLE, |d, ()| Ok(Box::new(PointStrategy::from_descriptor(d)?)))
        .with(SQUARE, |d, ()| Ok(Box::new(PointStrategy::from_descriptor(d)?)))
        .with(CROSS, |d, ()| Ok(Box::new(PointStrategy::from_descriptor(d)?)))
}
