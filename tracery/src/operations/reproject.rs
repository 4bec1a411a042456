//! Reproject operation: transforms feature coordinates into a target CRS.

use std::sync::Arc;

use geo::Geometry;
use serde::{Deserialize, Serialize};

use crate::error::TraceryError;

use super::{per_feature, FeatureStream, Operation, Skip};

/// Coordinate transformation between two named reference systems.
///
/// The pipeline does not bundle projection math; the host supplies whatever
/// engine it has and the reproject operation drives it.
pub trait CrsProjector: Send + Sync {
    /// Projects every coordinate of the geometry from `source` to `target`.
    fn project(
        &self,
        geometry: &Geometry<f64>,
        source: &str,
        target: &str,
    ) -> Result<Geometry<f64>, TraceryError>;
}

/// Projector that returns geometries unchanged. Useful when all sources
/// already share one CRS, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityProjector;

impl CrsProjector for IdentityProjector {
    fn project(
        &self,
        geometry: &Geometry<f64>,
        _source: &str,
        _target: &str,
    ) -> Result<Geometry<f64>, TraceryError> {
        Ok(geometry.clone())
    }
}

/// Configuration of the reproject operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReprojectConfig {
    /// CRS identifier the features are transformed into, e.g. "EPSG:3857".
    pub target_crs: String,
}

/// Stream stage projecting each feature into the target CRS.
pub struct ReprojectOperation {
    config: ReprojectConfig,
    projector: Arc<dyn CrsProjector>,
}

impl ReprojectOperation {
    /// Creates the operation.
    pub fn new(config: ReprojectConfig, projector: Arc<dyn CrsProjector>) -> Self {
        Self { config, projector }
    }
}

impl Operation for ReprojectOperation {
    fn name(&self) -> &'static str {
        "reproject"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        let target = self.config.target_crs.clone();
        let projector = self.projector.clone();
        per_feature("reproject", input, move |feature| {
            let Some(geometry) = feature.geometry() else {
                return Err(Skip::NoGeometry);
            };
            let Some(source) = feature.crs() else {
                log::warn!("reproject: feature without a source CRS dropped");
                return Ok(Vec::new());
            };
            if source.eq_ignore_ascii_case(&target) {
                return Ok(vec![feature.clone()]);
            }
            match projector.project(geometry, source, &target) {
                Ok(projected) => Ok(vec![feature
                    .with_geometry(Some(projected))
                    .with_crs(target.clone())]),
                Err(err) => Err(Skip::Other(format!("projection failed: {err}"))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, MapCoords};
    use tracery_types::Feature;

    /// Doubles every coordinate; stands in for a real projection engine.
    struct DoublingProjector;

    impl CrsProjector for DoublingProjector {
        fn project(
            &self,
            geometry: &Geometry<f64>,
            _source: &str,
            _target: &str,
        ) -> Result<Geometry<f64>, TraceryError> {
            Ok(geometry.map_coords(|c| geo::coord! { x: c.x * 2.0, y: c.y * 2.0 }))
        }
    }

    fn run(projector: Arc<dyn CrsProjector>, input: Vec<Feature>) -> Vec<Feature> {
        let config = ReprojectConfig {
            target_crs: "EPSG:3857".to_string(),
        };
        ReprojectOperation::new(config, projector)
            .execute(Box::new(input.into_iter()))
            .collect()
    }

    #[test]
    fn projects_and_stamps_target_crs() {
        let feature =
            Feature::from_geometry(point! { x: 1.0, y: 2.0 }).with_crs("EPSG:4326".to_string());
        let output = run(Arc::new(DoublingProjector), vec![feature]);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].crs(), Some("EPSG:3857"));
        assert_eq!(
            output[0].geometry(),
            Some(&point! { x: 2.0, y: 4.0 }.into())
        );
    }

    #[test]
    fn matching_crs_passes_through_unchanged() {
        let feature =
            Feature::from_geometry(point! { x: 1.0, y: 2.0 }).with_crs("epsg:3857".to_string());
        let output = run(Arc::new(DoublingProjector), vec![feature.clone()]);
        assert_eq!(output, vec![feature]);
    }

    #[test]
    fn missing_source_crs_drops_the_feature() {
        let feature = Feature::from_geometry(point! { x: 1.0, y: 2.0 });
        let output = run(Arc::new(IdentityProjector), vec![feature]);
        assert!(output.is_empty());
    }
}
