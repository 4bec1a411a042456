//! Runs a small pipeline over in-memory parcels and prints the produced
//! entities instead of writing a drawing file.

use std::path::Path;
use std::sync::Arc;

use geo::polygon;
use tracery::operations::{CentroidLabelPlacer, IdentityProjector, OperationEnv};
use tracery::pipeline::{
    DrawingWriter, EntityConverter, LayerConfig, LayerEntities, Pipeline, ProjectConfig,
};
use tracery::provider::{ReaderRegistry, StaticReader};
use tracery::style::StyleRegistry;
use tracery::tracery_types::{AttributeMap, Feature};
use tracery::TraceryError;

struct WktLikeConverter;

impl EntityConverter for WktLikeConverter {
    type Entity = String;

    fn convert(
        &self,
        feature: &Feature,
        _layer: &LayerConfig,
        _styles: &StyleRegistry,
        target_layer: &str,
    ) -> Vec<String> {
        let zone = feature
            .attribute("zone")
            .map(|value| value.to_string())
            .unwrap_or_default();
        vec![format!("{target_layer}: zone={zone} {:?}", feature.geometry())]
    }
}

struct StdoutWriter;

impl DrawingWriter for StdoutWriter {
    type Entity = String;

    fn write(
        &mut self,
        path: &Path,
        layers: Vec<LayerEntities<String>>,
    ) -> Result<(), TraceryError> {
        println!("-- {} --", path.display());
        for layer in layers {
            println!("layer {}", layer.name);
            for entity in layer.entities {
                println!("  {entity}");
            }
        }
        Ok(())
    }
}

fn parcel(origin: f64, zone: &str) -> Feature {
    let shape = polygon![
        (x: origin, y: 0.0),
        (x: origin + 2.0, y: 0.0),
        (x: origin + 2.0, y: 2.0),
        (x: origin, y: 2.0),
    ];
    let mut attributes = AttributeMap::new();
    attributes.insert("zone".to_string(), zone.into());
    Feature::new(Some(shape.into()), attributes)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let reader = StaticReader::new([(
        "parcels".to_string(),
        vec![
            parcel(0.0, "residential"),
            parcel(1.0, "residential"),
            parcel(10.0, "industrial"),
        ],
    )]);
    let mut readers = ReaderRegistry::new();
    readers.register("static", Arc::new(reader));

    let env = OperationEnv {
        projector: Arc::new(IdentityProjector),
        label_placer: Arc::new(CentroidLabelPlacer),
        styles: Arc::new(StyleRegistry::default()),
        readers: Arc::new(readers),
    };

    let project: ProjectConfig = serde_json::from_str(
        r#"{
            "layers": [
                {
                    "name": "parcels",
                    "source": { "kind": "static", "location": "parcels" },
                    "operations": [
                        { "operation": "buffer", "distance": 0.1 },
                        { "operation": "dissolve", "attribute": "zone" }
                    ],
                    "output_layer": "zones"
                }
            ],
            "pipelines": [
                {
                    "name": "main",
                    "layers_to_process": ["parcels"],
                    "layers_to_write": ["zones"]
                }
            ]
        }"#,
    )?;

    let mut pipeline = Pipeline::new(&project, env, WktLikeConverter, StdoutWriter);
    pipeline.run("main", Path::new("zones.out"))?;
    Ok(())
}
