//! Data model and pure geometry algorithms for the tracery processing pipeline.
//!
//! This crate defines the [`Feature`] type that flows through every pipeline
//! stage, together with the geometry algorithms the operation catalogue is
//! built on: validity repair, island removal, multi-part explosion and offset
//! (buffer) construction. All algorithms operate on [`geo::Geometry<f64>`]
//! values and report failures by returning `None` instead of panicking, so a
//! single bad geometry never takes down a whole stream.

pub mod feature;
pub use feature::*;

pub mod family;
pub use family::GeometryFamily;

pub mod repair;
pub use repair::{explode, remove_islands, repair};

pub mod offset;
pub use offset::{offset, CapStyle, JoinStyle, OffsetParams};
