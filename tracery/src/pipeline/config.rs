//! Configuration of layers and pipelines.
//!
//! Loaded once per run from external configuration and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::operations::OperationConfig;
use crate::provider::SourceConfig;
use crate::style::{FeatureStyle, StyleSelector};

fn default_enabled() -> bool {
    true
}

/// Declaration of one processing layer: a source and an ordered operation
/// chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Name of the layer, unique within the configuration.
    pub name: String,
    /// Disabled layers are skipped entirely and produce no output.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Source the layer's features are read from.
    pub source: SourceConfig,
    /// Operation chain applied to the source stream, in order.
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
    /// Name of the output layer. Defaults to the layer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_layer: Option<String>,
    /// Style of the layer's features in the output drawing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleSelector>,
}

impl LayerConfig {
    /// Name of the output layer this layer's features land on.
    pub fn output_layer(&self) -> &str {
        self.output_layer.as_deref().unwrap_or(&self.name)
    }
}

/// Declaration of one pipeline: which layers to run and which output layers
/// to write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Names of the layer configurations to process, in order.
    #[serde(default)]
    pub layers_to_process: Vec<String>,
    /// Names of the output layers handed to the drawing writer. An output
    /// layer no processed layer produced is skipped with a warning.
    #[serde(default)]
    pub layers_to_write: Vec<String>,
}

/// Root of the external configuration file: layers, pipelines and style
/// presets in one document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// All declared layers.
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    /// All declared pipelines.
    #[serde(default)]
    pub pipelines: Vec<PipelineConfig>,
    /// Named style presets referenced by layer and label styles.
    #[serde(default)]
    pub styles: std::collections::HashMap<String, FeatureStyle>,
}
