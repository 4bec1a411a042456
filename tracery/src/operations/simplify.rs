//! Simplify operation: reduces vertex count within a tolerance.

use geo::{Geometry, HasDimensions, Simplify, SimplifyVwPreserve};
use serde::{Deserialize, Serialize};
use tracery_types::repair::explode;

use super::{per_feature, FeatureStream, Operation, Skip};

/// Configuration of the simplify operation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SimplifyConfig {
    /// Simplification tolerance in coordinate units.
    #[serde(default)]
    pub tolerance: f64,
    /// Use a topology-preserving algorithm that never introduces
    /// self-intersections.
    #[serde(default)]
    pub preserve_topology: bool,
}

/// Stream stage applying [`SimplifyConfig`] to every feature.
pub struct SimplifyOperation {
    config: SimplifyConfig,
}

impl SimplifyOperation {
    /// Creates the operation.
    pub fn new(config: SimplifyConfig) -> Self {
        Self { config }
    }
}

fn simplify_geometry(
    geometry: &Geometry<f64>,
    tolerance: f64,
    preserve_topology: bool,
) -> Geometry<f64> {
    macro_rules! simplified {
        ($geom:expr) => {
            if preserve_topology {
                $geom.simplify_vw_preserve(&tolerance).into()
            } else {
                $geom.simplify(&tolerance).into()
            }
        };
    }

    match geometry {
        Geometry::LineString(line) => simplified!(line),
        Geometry::MultiLineString(lines) => simplified!(lines),
        Geometry::Polygon(polygon) => simplified!(polygon),
        Geometry::MultiPolygon(polygons) => simplified!(polygons),
        Geometry::GeometryCollection(_) => {
            let parts: Vec<Geometry<f64>> = explode(geometry)
                .iter()
                .map(|part| simplify_geometry(part, tolerance, preserve_topology))
                .collect();
            Geometry::GeometryCollection(geo::GeometryCollection::new_from(parts))
        }
        // Points and degenerate shapes have nothing to simplify.
        other => other.clone(),
    }
}

impl Operation for SimplifyOperation {
    fn name(&self) -> &'static str {
        "simplify"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        let config = self.config.clone();
        per_feature("simplify", input, move |feature| {
            let Some(geometry) = feature.geometry() else {
                return Err(Skip::NoGeometry);
            };
            let simplified =
                simplify_geometry(geometry, config.tolerance, config.preserve_topology);
            if simplified.is_empty() {
                return Err(Skip::EmptyResult);
            }
            Ok(vec![feature.with_geometry(Some(simplified))])
        })
    }
}
