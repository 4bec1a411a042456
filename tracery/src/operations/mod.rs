//! Catalogue of stream operations over geographic features.
//!
//! Every operation consumes a lazy feature stream and produces a new one.
//! Streaming operations are single-pass and order-preserving; the
//! aggregating operations (dissolve, merge) buffer their input before
//! emitting. A fault affecting one feature drops that feature and lets the
//! stream continue; it never aborts the pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracery_types::Feature;

use crate::error::TraceryError;
use crate::provider::ReaderRegistry;
use crate::style::StyleRegistry;

pub mod buffer;
pub mod clean;
pub mod dissolve;
pub mod explode;
pub mod filter_attribute;
pub mod filter_extent;
pub mod intersection;
pub mod labels;
pub mod merge;
pub mod reproject;
pub mod simplify;

pub use buffer::{BufferConfig, BufferOperation};
pub use clean::{CleanConfig, CleanOperation};
pub use dissolve::{DissolveConfig, DissolveOperation};
pub use explode::{ExplodeConfig, ExplodeOperation};
pub use filter_attribute::{CombineMode, FilterByAttributeConfig, FilterByAttributeOperation};
pub use filter_extent::{Extent, FilterByExtentConfig, FilterByExtentOperation, SpatialPredicate};
pub use intersection::{IntersectionConfig, IntersectionOperation};
pub use labels::{CentroidLabelPlacer, LabelPlacer, LabelsConfig, LabelsOperation, PlacedLabel};
pub use merge::{MergeConfig, MergeOperation};
pub use reproject::{CrsProjector, IdentityProjector, ReprojectConfig, ReprojectOperation};
pub use simplify::{SimplifyConfig, SimplifyOperation};

/// Lazy, forward-only stream of features flowing between pipeline stages.
pub type FeatureStream = Box<dyn Iterator<Item = Feature>>;

/// One configured stage of a layer's operation chain.
pub trait Operation {
    /// Name of the operation for logging.
    fn name(&self) -> &'static str;
    /// Wraps the input stream into this operation's output stream.
    ///
    /// No work happens until the returned stream is pulled.
    fn execute(&self, input: FeatureStream) -> FeatureStream;
}

/// Recoverable per-feature fault. The feature is dropped, logged at debug
/// level, and the stream continues.
#[derive(Debug, Clone, Error)]
pub enum Skip {
    /// The feature has no geometry but the operation requires one.
    #[error("feature has no geometry")]
    NoGeometry,
    /// The geometry became empty or unrepairable.
    #[error("geometry produced nothing")]
    EmptyResult,
    /// Any other per-feature fault.
    #[error("{0}")]
    Other(String),
}

/// Adapts a per-feature function into a stream stage with the drop-and-
/// continue policy applied.
pub(crate) fn per_feature<F>(name: &'static str, input: FeatureStream, f: F) -> FeatureStream
where
    F: Fn(Feature) -> Result<Vec<Feature>, Skip> + 'static,
{
    Box::new(input.flat_map(move |feature| {
        let produced = match f(feature) {
            Ok(features) => features,
            Err(skip) => {
                log::debug!("{name}: feature dropped: {skip}");
                Vec::new()
            }
        };
        produced.into_iter()
    }))
}

/// Wraps a stream-consuming aggregation so that the input is not consumed
/// before the output stream is first pulled.
pub(crate) fn aggregate<F>(input: FeatureStream, f: F) -> FeatureStream
where
    F: FnOnce(FeatureStream) -> Vec<Feature> + 'static,
{
    let mut pending = Some((input, f));
    let mut produced: Option<std::vec::IntoIter<Feature>> = None;
    Box::new(std::iter::from_fn(move || {
        if produced.is_none() {
            let (input, f) = pending.take()?;
            produced = Some(f(input).into_iter());
        }
        produced.as_mut()?.next()
    }))
}

/// Collaborators shared by operation constructors: plain lookup tables and
/// capabilities built once at startup and passed down explicitly.
#[derive(Clone)]
pub struct OperationEnv {
    /// Projection function used by the reproject operation.
    pub projector: Arc<dyn CrsProjector>,
    /// Placement capability used by the label operation.
    pub label_placer: Arc<dyn LabelPlacer>,
    /// Style presets used by the label operation.
    pub styles: Arc<StyleRegistry>,
    /// Feature readers used to resolve overlay sources.
    pub readers: Arc<ReaderRegistry>,
}

/// Configuration of one operation: a closed tagged union with one variant
/// per operation kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationConfig {
    /// Grow or shrink geometries by a distance.
    Buffer(BufferConfig),
    /// Reduce vertex count within a tolerance.
    Simplify(SimplifyConfig),
    /// Repair geometries, optionally with a tolerance buffer.
    Clean(CleanConfig),
    /// Emit one feature per single-part constituent geometry.
    ExplodeMultipart(ExplodeConfig),
    /// Union features grouped by an attribute value.
    Dissolve(DissolveConfig),
    /// Union the whole stream into as few features as possible.
    Merge(MergeConfig),
    /// Keep features matching attribute conditions.
    FilterByAttribute(FilterByAttributeConfig),
    /// Keep features in a spatial relation with a fixed extent.
    FilterByExtent(FilterByExtentConfig),
    /// Transform coordinates into a target CRS.
    Reproject(ReprojectConfig),
    /// Emit point features for placed labels.
    Labels(LabelsConfig),
    /// Overlay the stream with a second polygonal source.
    Intersection(IntersectionConfig),
}

impl OperationConfig {
    /// Name of the configured operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationConfig::Buffer(_) => "buffer",
            OperationConfig::Simplify(_) => "simplify",
            OperationConfig::Clean(_) => "clean",
            OperationConfig::ExplodeMultipart(_) => "explode_multipart",
            OperationConfig::Dissolve(_) => "dissolve",
            OperationConfig::Merge(_) => "merge",
            OperationConfig::FilterByAttribute(_) => "filter_by_attribute",
            OperationConfig::FilterByExtent(_) => "filter_by_extent",
            OperationConfig::Reproject(_) => "reproject",
            OperationConfig::Labels(_) => "labels",
            OperationConfig::Intersection(_) => "intersection",
        }
    }
}

/// Builds the operation described by the configuration.
///
/// `layer_name` identifies the owning layer for logging and label context.
pub fn build_operation(
    config: &OperationConfig,
    env: &OperationEnv,
    layer_name: &str,
) -> Result<Box<dyn Operation>, TraceryError> {
    Ok(match config {
        OperationConfig::Buffer(config) => Box::new(BufferOperation::new(config.clone())),
        OperationConfig::Simplify(config) => Box::new(SimplifyOperation::new(config.clone())),
        OperationConfig::Clean(config) => Box::new(CleanOperation::new(config.clone())),
        OperationConfig::ExplodeMultipart(config) => {
            Box::new(ExplodeOperation::new(config.clone()))
        }
        OperationConfig::Dissolve(config) => Box::new(DissolveOperation::new(config.clone())),
        OperationConfig::Merge(config) => Box::new(MergeOperation::new(config.clone())),
        OperationConfig::FilterByAttribute(config) => {
            Box::new(FilterByAttributeOperation::new(config.clone()))
        }
        OperationConfig::FilterByExtent(config) => {
            Box::new(FilterByExtentOperation::new(config.clone()))
        }
        OperationConfig::Reproject(config) => Box::new(ReprojectOperation::new(
            config.clone(),
            env.projector.clone(),
        )),
        OperationConfig::Labels(config) => Box::new(LabelsOperation::new(
            config.clone(),
            layer_name.to_string(),
            env.label_placer.clone(),
            env.styles.clone(),
        )),
        OperationConfig::Intersection(config) => Box::new(IntersectionOperation::new(
            config.clone(),
            env.readers.clone(),
        )),
    })
}

#[cfg(test)]
pub(crate) mod test_env {
    use super::*;

    /// Environment with identity projection, centroid labels, no presets
    /// and no readers.
    pub fn empty() -> OperationEnv {
        OperationEnv {
            projector: Arc::new(IdentityProjector),
            label_placer: Arc::new(CentroidLabelPlacer::default()),
            styles: Arc::new(StyleRegistry::default()),
            readers: Arc::new(ReaderRegistry::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_config_deserializes_by_tag() {
        let config: OperationConfig = serde_json::from_str(
            r#"{ "operation": "buffer", "distance": 2.5 }"#,
        )
        .expect("valid config");
        assert_eq!(config.kind(), "buffer");

        let config: OperationConfig =
            serde_json::from_str(r#"{ "operation": "explode_multipart" }"#).expect("valid config");
        assert_eq!(config.kind(), "explode_multipart");
    }

    #[test]
    fn factory_builds_every_kind() {
        let env = test_env::empty();
        let configs = vec![
            OperationConfig::Buffer(BufferConfig::new(1.0)),
            OperationConfig::Simplify(SimplifyConfig::default()),
            OperationConfig::Clean(CleanConfig::default()),
            OperationConfig::ExplodeMultipart(ExplodeConfig::default()),
            OperationConfig::Dissolve(DissolveConfig::default()),
            OperationConfig::Merge(MergeConfig::default()),
            OperationConfig::FilterByAttribute(FilterByAttributeConfig::default()),
            OperationConfig::FilterByExtent(FilterByExtentConfig::default()),
            OperationConfig::Reproject(ReprojectConfig {
                target_crs: "EPSG:3857".to_string(),
            }),
            OperationConfig::Labels(LabelsConfig::default()),
            OperationConfig::Intersection(IntersectionConfig::default()),
        ];
        for config in &configs {
            let operation = build_operation(config, &env, "test").expect("operation builds");
            assert_eq!(operation.name(), config.kind());
        }
    }
}
