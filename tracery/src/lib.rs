//! Tracery turns geographic vector data into styled drawing layers through
//! configurable chains of geometry operations.
//!
//! A project configuration declares *layers* (a feature source plus an
//! ordered operation chain) and *pipelines* (which layers to process and
//! which of their outputs to write). Everything flows through lazy,
//! pull-driven feature streams: no source is read and no geometry is
//! computed until the output side asks for the next feature, so memory
//! stays bounded even for large datasets (the aggregating operations,
//! dissolve and merge, are the only stages that buffer).
//!
//! # Quick start
//!
//! Processing one layer against an in-memory source:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tracery::operations::{CentroidLabelPlacer, IdentityProjector, OperationEnv};
//! use tracery::pipeline::{process_layer, LayerConfig};
//! use tracery::provider::{ReaderRegistry, StaticReader};
//! use tracery::style::StyleRegistry;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut readers = ReaderRegistry::new();
//! readers.register("static", Arc::new(StaticReader::default()));
//!
//! let env = OperationEnv {
//!     projector: Arc::new(IdentityProjector),
//!     label_placer: Arc::new(CentroidLabelPlacer),
//!     styles: Arc::new(StyleRegistry::default()),
//!     readers: Arc::new(readers),
//! };
//!
//! let layer: LayerConfig = serde_json::from_str(
//!     r#"{
//!         "name": "parcels",
//!         "source": { "kind": "static", "location": "parcels" },
//!         "operations": [
//!             { "operation": "buffer", "distance": 0.5 },
//!             { "operation": "dissolve", "attribute": "zone" }
//!         ]
//!     }"#,
//! )?;
//!
//! for (name, features) in process_layer(Arc::new(layer), &env)? {
//!     println!("{name}: {} features", features.count());
//! }
//! # Ok(()) }
//! ```
//!
//! # Main components
//!
//! * [`tracery_types`] holds the [`Feature`](tracery_types::Feature) data
//!   model and the geometry primitives (repair, offset, explode) every
//!   operation builds on.
//! * [`operations`] is the catalogue of stream transforms: buffer,
//!   simplify, clean, explode, dissolve, merge, the attribute and extent
//!   filters, reproject, labels and intersection. Each is configured
//!   through one variant of [`operations::OperationConfig`].
//! * [`tracery_expr`] parses and evaluates the condition expressions the
//!   attribute filter uses.
//! * [`style`] resolves named presets and inline overrides into one style
//!   through the cascade merge.
//! * [`pipeline`] folds operation chains over source streams and hands the
//!   selected outputs to the drawing writer.
//!
//! Reading concrete source formats, writing the concrete drawing format and
//! projection math stay outside: the host supplies them through the
//! [`provider::FeatureReader`], [`pipeline::EntityConverter`],
//! [`pipeline::DrawingWriter`], [`operations::CrsProjector`] and
//! [`operations::LabelPlacer`] traits.

mod color;
pub mod error;
pub mod operations;
pub mod pipeline;
pub mod provider;
pub mod style;

pub use color::Color;
pub use error::TraceryError;
pub use tracery_expr;
pub use tracery_types;
