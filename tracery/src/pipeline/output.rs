//! Hand-off of processed streams to the drawing side.
//!
//! The pipeline does not know the concrete drawing format. An
//! [`EntityConverter`] turns features into the format's entity type and a
//! [`DrawingWriter`] encodes the batch; both are supplied by the host.

use std::path::Path;
use std::sync::Arc;

use tracery_types::Feature;

use crate::error::TraceryError;
use crate::pipeline::LayerConfig;
use crate::style::StyleRegistry;

/// Converts one feature into zero or more drawing entities.
pub trait EntityConverter {
    /// Entity type of the target drawing format.
    type Entity;

    /// Converts the feature, using the originating layer configuration and
    /// the style presets as styling context.
    fn convert(
        &self,
        feature: &Feature,
        layer: &LayerConfig,
        styles: &StyleRegistry,
        target_layer: &str,
    ) -> Vec<Self::Entity>;
}

/// Entities of one output layer, ready for the writer.
pub struct LayerEntities<E> {
    /// Name of the output layer.
    pub name: String,
    /// Layer configuration the entities originate from.
    pub layer: Arc<LayerConfig>,
    /// Lazy stream of the layer's entities.
    pub entities: Box<dyn Iterator<Item = E>>,
}

/// Writes one batch of converted layers into the output drawing.
pub trait DrawingWriter {
    /// Entity type of the target drawing format.
    type Entity;

    /// Writes the batch. Called exactly once per pipeline run, with an
    /// empty batch when nothing was produced; the writer is responsible
    /// for emitting a minimal valid empty drawing in that case.
    fn write(
        &mut self,
        path: &Path,
        layers: Vec<LayerEntities<Self::Entity>>,
    ) -> Result<(), TraceryError>;
}
