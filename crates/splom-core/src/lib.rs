#![forbid(unsafe_code)]

//! Core: overlay descriptors, canonical identities, geometry, and datasets.
//!
//! # Role in splom
//! `splom-core` is the leaf layer. It owns the value types every other crate
//! passes around: [`Descriptor`](descriptor::Descriptor) and its canonical
//! string, the data-space and pixel-space primitives in [`geometry`], and the
//! [`DatasetView`](dataset::DatasetView) that cells read when computing
//! overlay geometry.
//!
//! # Primary responsibilities
//! - **Canonicalizer**: a deterministic, order-independent identity string for
//!   every descriptor, and the parser that reverses it.
//! - **Dataset views**: immutable, shareable row subsets of a numeric dataset.
//! - **Sampler**: the collaborator trait that produces a view for a sample
//!   percentage, with a seeded [`SubSampler`](dataset::SubSampler).
//!
//! # How it fits in the system
//! `splom-overlay` builds live overlay instances from canonical strings and
//! binds them to cells; `splom-runtime` diffs sets of canonical strings and
//! drives reconciliation. Neither needs to know how a descriptor is encoded.

pub mod color;
pub mod dataset;
pub mod descriptor;
pub mod geometry;

pub use color::Rgb;
pub use dataset::{Dataset, DatasetError, DatasetView, Sampler, SubSampler};
pub use descriptor::{Descriptor, ParamError, ParseError};
pub use geometry::{Bounds, Point, Polyline, Size};
