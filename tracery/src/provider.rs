//! Feature sources and the reader registry.
//!
//! The pipeline itself never parses a concrete file format. A layer declares
//! a [`SourceConfig`] and the registered [`FeatureReader`] for its kind turns
//! that descriptor into a lazy feature stream.

use std::sync::Arc;

use ahash::HashMap;
use serde::{Deserialize, Serialize};
use tracery_types::Feature;

use crate::error::TraceryError;
use crate::operations::FeatureStream;

/// Descriptor of a feature source, resolved by an external reader.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Kind of the source; selects the reader in the [`ReaderRegistry`].
    pub kind: String,
    /// Location of the data (path, URL, dataset name), if the reader needs
    /// one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// CRS to assign or reproject to at read time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Reader-specific parameters, passed through opaquely.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

/// Turns a source descriptor into a feature stream.
pub trait FeatureReader: Send + Sync {
    /// Opens the source and returns its lazy feature stream.
    fn open(&self, source: &SourceConfig) -> Result<FeatureStream, TraceryError>;
}

/// Lookup table of feature readers keyed by source kind, built once at
/// startup and passed down to the pipeline.
#[derive(Default, Clone)]
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn FeatureReader>>,
}

impl ReaderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reader for the given source kind, replacing a previous
    /// one.
    pub fn register(&mut self, kind: impl Into<String>, reader: Arc<dyn FeatureReader>) {
        self.readers.insert(kind.into(), reader);
    }

    /// Opens the source with the reader registered for its kind.
    pub fn open(&self, source: &SourceConfig) -> Result<FeatureStream, TraceryError> {
        let reader = self
            .readers
            .get(&source.kind)
            .ok_or_else(|| TraceryError::MissingReference {
                kind: "source reader",
                name: source.kind.clone(),
            })?;
        reader.open(source)
    }
}

/// Reader serving features held in memory, keyed by source location.
///
/// Useful for fixtures and for layers whose data is assembled by the
/// surrounding application rather than read from a file.
#[derive(Default, Clone)]
pub struct StaticReader {
    sources: HashMap<String, Vec<Feature>>,
}

impl StaticReader {
    /// Creates a reader with the given named feature sets.
    pub fn new(sources: impl IntoIterator<Item = (String, Vec<Feature>)>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
        }
    }
}

impl FeatureReader for StaticReader {
    fn open(&self, source: &SourceConfig) -> Result<FeatureStream, TraceryError> {
        let location = source.location.as_deref().unwrap_or_default();
        let features = self
            .sources
            .get(location)
            .ok_or_else(|| TraceryError::MissingReference {
                kind: "static source",
                name: location.to_string(),
            })?
            .clone();
        let crs = source.crs.clone();
        Ok(Box::new(features.into_iter().map(move |feature| {
            match (&crs, feature.crs()) {
                (Some(crs), None) => feature.with_crs(crs.clone()),
                _ => feature,
            }
        })))
    }
}
