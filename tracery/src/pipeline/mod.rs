//! Layer processing and pipeline orchestration.
//!
//! A layer is one source folded through an ordered operation chain into a
//! named output stream; a pipeline selects which layers to process and
//! which of the produced output layers to hand to the drawing writer. The
//! whole run is one lazily-evaluated stream graph: nothing is read or
//! computed until the writer pulls.

use std::path::Path;
use std::sync::Arc;

use ahash::HashMap;

use crate::error::TraceryError;
use crate::operations::{build_operation, FeatureStream, OperationEnv};

pub mod config;
pub mod output;

pub use config::{LayerConfig, PipelineConfig, ProjectConfig};
pub use output::{DrawingWriter, EntityConverter, LayerEntities};

/// Runs one layer: opens its source and folds the operation chain over the
/// stream, left to right.
///
/// No stage is eagerly materialized. Returns the layer's named output
/// streams; a disabled layer returns none.
pub fn process_layer(
    layer: Arc<LayerConfig>,
    env: &OperationEnv,
) -> Result<Vec<(String, FeatureStream)>, TraceryError> {
    if !layer.enabled {
        log::debug!("layer {:?} is disabled, skipping", layer.name);
        return Ok(Vec::new());
    }

    let mut stream = env.readers.open(&layer.source)?;
    for config in &layer.operations {
        let operation = build_operation(config, env, &layer.name)?;
        log::debug!("layer {:?}: chaining {}", layer.name, operation.name());
        stream = operation.execute(stream);
    }
    Ok(vec![(layer.output_layer().to_string(), stream)])
}

/// Orchestrator owning the configuration tables and the output collaborators.
pub struct Pipeline<C: EntityConverter, W> {
    layers: HashMap<String, Arc<LayerConfig>>,
    pipelines: HashMap<String, PipelineConfig>,
    env: OperationEnv,
    converter: Arc<C>,
    writer: W,
}

impl<C, W> Pipeline<C, W>
where
    C: EntityConverter + 'static,
    C::Entity: 'static,
    W: DrawingWriter<Entity = C::Entity>,
{
    /// Creates the orchestrator from a loaded project configuration.
    ///
    /// Style presets declared in the configuration document are added to
    /// the environment's style registry, overriding host-registered presets
    /// of the same name.
    pub fn new(project: &ProjectConfig, env: OperationEnv, converter: C, writer: W) -> Self {
        let mut env = env;
        if !project.styles.is_empty() {
            let mut styles = (*env.styles).clone();
            for (name, style) in &project.styles {
                styles.insert(name.clone(), style.clone());
            }
            env.styles = Arc::new(styles);
        }

        let mut layers: HashMap<String, Arc<LayerConfig>> = HashMap::default();
        for layer in &project.layers {
            if layers
                .insert(layer.name.clone(), Arc::new(layer.clone()))
                .is_some()
            {
                log::warn!("layer {:?} is defined twice, keeping the later one", layer.name);
            }
        }
        let mut pipelines: HashMap<String, PipelineConfig> = HashMap::default();
        for pipeline in &project.pipelines {
            if pipelines
                .insert(pipeline.name.clone(), pipeline.clone())
                .is_some()
            {
                log::warn!(
                    "pipeline {:?} is defined twice, keeping the later one",
                    pipeline.name
                );
            }
        }
        Self {
            layers,
            pipelines,
            env,
            converter: Arc::new(converter),
            writer,
        }
    }

    /// Runs the named pipeline and writes its output to the given path.
    ///
    /// A pipeline name that is not defined is fatal. Missing layers and
    /// output layers are skipped with a warning. The writer is called
    /// exactly once, with an empty batch if nothing was produced.
    pub fn run(&mut self, pipeline_name: &str, output_path: &Path) -> Result<(), TraceryError> {
        let pipeline = self
            .pipelines
            .get(pipeline_name)
            .ok_or_else(|| TraceryError::MissingReference {
                kind: "pipeline",
                name: pipeline_name.to_string(),
            })?
            .clone();
        log::info!("running pipeline {pipeline_name:?}");

        let mut namespace: HashMap<String, (Arc<LayerConfig>, FeatureStream)> = HashMap::default();
        for layer_name in &pipeline.layers_to_process {
            let Some(layer) = self.layers.get(layer_name).cloned() else {
                log::warn!("layer {layer_name:?} is not defined, skipping");
                continue;
            };
            let outputs = match process_layer(layer.clone(), &self.env) {
                Ok(outputs) => outputs,
                Err(err) => {
                    log::warn!("layer {layer_name:?} failed: {err}, skipping");
                    continue;
                }
            };
            for (output_name, stream) in outputs {
                if namespace
                    .insert(output_name.clone(), (layer.clone(), stream))
                    .is_some()
                {
                    log::warn!(
                        "output layer {output_name:?} produced more than once, keeping the later one"
                    );
                }
            }
        }

        let mut batch = Vec::new();
        for write_name in &pipeline.layers_to_write {
            let Some((layer, stream)) = namespace.remove(write_name) else {
                log::warn!("output layer {write_name:?} was not produced, skipping");
                continue;
            };
            let converter = self.converter.clone();
            let styles = self.env.styles.clone();
            let context = layer.clone();
            let target = write_name.clone();
            let entities: Box<dyn Iterator<Item = C::Entity>> =
                Box::new(stream.flat_map(move |feature| {
                    converter
                        .convert(&feature, &context, &styles, &target)
                        .into_iter()
                }));
            batch.push(LayerEntities {
                name: write_name.clone(),
                layer,
                entities,
            });
        }

        log::info!(
            "pipeline {pipeline_name:?}: writing {} output layers to {}",
            batch.len(),
            output_path.display()
        );
        self.writer.write(output_path, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use geo::point;
    use tracery_types::{AttributeMap, Feature};

    use crate::operations::{
        CentroidLabelPlacer, FilterByAttributeConfig, IdentityProjector, OperationConfig,
    };
    use crate::provider::{ReaderRegistry, SourceConfig, StaticReader};
    use crate::style::StyleRegistry;

    struct NameConverter;

    impl EntityConverter for NameConverter {
        type Entity = String;

        fn convert(
            &self,
            feature: &Feature,
            _layer: &LayerConfig,
            _styles: &StyleRegistry,
            target_layer: &str,
        ) -> Vec<String> {
            let name = feature
                .attribute("name")
                .map(|v| v.to_string())
                .unwrap_or_default();
            vec![format!("{target_layer}/{name}")]
        }
    }

    type WrittenBatches = Arc<Mutex<Vec<Vec<(String, Vec<String>)>>>>;

    #[derive(Default)]
    struct RecordingWriter {
        batches: WrittenBatches,
    }

    impl DrawingWriter for RecordingWriter {
        type Entity = String;

        fn write(
            &mut self,
            _path: &Path,
            layers: Vec<LayerEntities<String>>,
        ) -> Result<(), TraceryError> {
            let drained = layers
                .into_iter()
                .map(|layer| (layer.name, layer.entities.collect()))
                .collect();
            self.batches.lock().expect("writer lock").push(drained);
            Ok(())
        }
    }

    fn town(name: &str, population: i64) -> Feature {
        let mut attributes = AttributeMap::new();
        attributes.insert("name".to_string(), name.into());
        attributes.insert("population".to_string(), population.into());
        Feature::new(Some(point! { x: 0.0, y: 0.0 }.into()), attributes)
    }

    fn env_with(reader: StaticReader) -> OperationEnv {
        let mut readers = ReaderRegistry::new();
        readers.register("static", Arc::new(reader));
        OperationEnv {
            projector: Arc::new(IdentityProjector),
            label_placer: Arc::new(CentroidLabelPlacer),
            styles: Arc::new(StyleRegistry::default()),
            readers: Arc::new(readers),
        }
    }

    fn static_source(location: &str) -> SourceConfig {
        SourceConfig {
            kind: "static".to_string(),
            location: Some(location.to_string()),
            ..Default::default()
        }
    }

    fn pipeline_with(
        layers: Vec<LayerConfig>,
        pipeline: PipelineConfig,
        env: OperationEnv,
    ) -> (Pipeline<NameConverter, RecordingWriter>, WrittenBatches) {
        let writer = RecordingWriter::default();
        let batches = writer.batches.clone();
        let project = ProjectConfig {
            layers,
            pipelines: vec![pipeline],
            styles: Default::default(),
        };
        (Pipeline::new(&project, env, NameConverter, writer), batches)
    }

    #[test]
    fn runs_a_layer_chain_end_to_end() {
        let reader = StaticReader::new([(
            "towns".to_string(),
            vec![town("Oakton", 5000), town("Smallville", 10)],
        )]);
        let layer = LayerConfig {
            name: "towns".to_string(),
            enabled: true,
            source: static_source("towns"),
            operations: vec![OperationConfig::FilterByAttribute(FilterByAttributeConfig {
                conditions: vec!["population >= 1000".to_string()],
                combine: Default::default(),
            })],
            output_layer: None,
            style: None,
        };
        let pipeline = PipelineConfig {
            name: "main".to_string(),
            layers_to_process: vec!["towns".to_string()],
            layers_to_write: vec!["towns".to_string()],
        };

        let (mut orchestrator, batches) = pipeline_with(vec![layer], pipeline, env_with(reader));
        orchestrator
            .run("main", Path::new("out.dxf"))
            .expect("pipeline runs");

        let batches = batches.lock().expect("writer lock");
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![("towns".to_string(), vec!["towns/Oakton".to_string()])]
        );
    }

    #[test]
    fn disabled_layer_contributes_nothing() {
        let reader = StaticReader::new([("towns".to_string(), vec![town("Oakton", 5000)])]);
        let layer = LayerConfig {
            name: "towns".to_string(),
            enabled: false,
            source: static_source("towns"),
            operations: Vec::new(),
            output_layer: None,
            style: None,
        };
        let pipeline = PipelineConfig {
            name: "main".to_string(),
            layers_to_process: vec!["towns".to_string()],
            layers_to_write: vec!["towns".to_string()],
        };

        let (mut orchestrator, batches) = pipeline_with(vec![layer], pipeline, env_with(reader));
        orchestrator
            .run("main", Path::new("out.dxf"))
            .expect("pipeline runs");

        // The write still happens, with an empty batch.
        let batches = batches.lock().expect("writer lock");
        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_empty());
    }

    #[test]
    fn missing_pipeline_is_fatal() {
        let (mut orchestrator, _) = pipeline_with(
            Vec::new(),
            PipelineConfig {
                name: "main".to_string(),
                layers_to_process: Vec::new(),
                layers_to_write: Vec::new(),
            },
            env_with(StaticReader::default()),
        );
        assert_matches!(
            orchestrator.run("nightly", Path::new("out.dxf")),
            Err(TraceryError::MissingReference { kind: "pipeline", .. })
        );
    }

    #[test]
    fn missing_layers_and_write_names_are_skipped() {
        let reader = StaticReader::new([("towns".to_string(), vec![town("Oakton", 5000)])]);
        let layer = LayerConfig {
            name: "towns".to_string(),
            enabled: true,
            source: static_source("towns"),
            operations: Vec::new(),
            output_layer: None,
            style: None,
        };
        let pipeline = PipelineConfig {
            name: "main".to_string(),
            layers_to_process: vec!["towns".to_string(), "rivers".to_string()],
            layers_to_write: vec!["towns".to_string(), "contours".to_string()],
        };

        let (mut orchestrator, batches) = pipeline_with(vec![layer], pipeline, env_with(reader));
        orchestrator
            .run("main", Path::new("out.dxf"))
            .expect("pipeline runs");

        let batches = batches.lock().expect("writer lock");
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].0, "towns");
    }

    #[test]
    fn document_style_presets_reach_entity_conversion() {
        use crate::style::{FeatureStyle, TextStyle};

        /// Emits the height of the "road_labels" preset for each feature.
        struct PresetHeightConverter;

        impl EntityConverter for PresetHeightConverter {
            type Entity = String;

            fn convert(
                &self,
                _feature: &Feature,
                _layer: &LayerConfig,
                styles: &StyleRegistry,
                target_layer: &str,
            ) -> Vec<String> {
                let height = styles
                    .preset("road_labels")
                    .and_then(|style| style.text.as_ref())
                    .and_then(|text| text.height)
                    .unwrap_or_default();
                vec![format!("{target_layer}:{height}")]
            }
        }

        let reader = StaticReader::new([("towns".to_string(), vec![town("Oakton", 5000)])]);
        let project = ProjectConfig {
            layers: vec![LayerConfig {
                name: "towns".to_string(),
                enabled: true,
                source: static_source("towns"),
                operations: Vec::new(),
                output_layer: None,
                style: None,
            }],
            pipelines: vec![PipelineConfig {
                name: "main".to_string(),
                layers_to_process: vec!["towns".to_string()],
                layers_to_write: vec!["towns".to_string()],
            }],
            styles: [(
                "road_labels".to_string(),
                FeatureStyle {
                    layer: None,
                    text: Some(TextStyle {
                        height: Some(7.5),
                        font: None,
                        color: None,
                    }),
                },
            )]
            .into_iter()
            .collect(),
        };

        let writer = RecordingWriter::default();
        let batches = writer.batches.clone();
        let mut orchestrator =
            Pipeline::new(&project, env_with(reader), PresetHeightConverter, writer);
        orchestrator
            .run("main", Path::new("out.dxf"))
            .expect("pipeline runs");

        let batches = batches.lock().expect("writer lock");
        assert_eq!(
            batches[0],
            vec![("towns".to_string(), vec!["towns:7.5".to_string()])]
        );
    }

    #[test]
    fn later_layer_overwrites_a_shared_output_name() {
        let reader = StaticReader::new([
            ("draft".to_string(), vec![town("Draftville", 1)]),
            ("final".to_string(), vec![town("Finaltown", 2)]),
        ]);
        let draft = LayerConfig {
            name: "draft".to_string(),
            enabled: true,
            source: static_source("draft"),
            operations: Vec::new(),
            output_layer: Some("towns".to_string()),
            style: None,
        };
        let final_ = LayerConfig {
            name: "final".to_string(),
            enabled: true,
            source: static_source("final"),
            operations: Vec::new(),
            output_layer: Some("towns".to_string()),
            style: None,
        };
        let pipeline = PipelineConfig {
            name: "main".to_string(),
            layers_to_process: vec!["draft".to_string(), "final".to_string()],
            layers_to_write: vec!["towns".to_string()],
        };

        let (mut orchestrator, batches) =
            pipeline_with(vec![draft, final_], pipeline, env_with(reader));
        orchestrator
            .run("main", Path::new("out.dxf"))
            .expect("pipeline runs");

        let batches = batches.lock().expect("writer lock");
        assert_eq!(
            batches[0],
            vec![("towns".to_string(), vec!["towns/Finaltown".to_string()])]
        );
    }
}
