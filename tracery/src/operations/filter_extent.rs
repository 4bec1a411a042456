//! Extent filter: keeps features in a spatial relation with a fixed
//! rectangle.

use geo::{coord, Polygon, Rect, Relate};
use serde::{Deserialize, Serialize};
use tracery_types::GeometryFamily;

use super::{per_feature, FeatureStream, Operation, Skip};

/// Axis-aligned rectangular extent in the stream's coordinate space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Minimum x coordinate.
    pub min_x: f64,
    /// Minimum y coordinate.
    pub min_y: f64,
    /// Maximum x coordinate.
    pub max_x: f64,
    /// Maximum y coordinate.
    pub max_y: f64,
}

impl Extent {
    /// Creates an extent from its corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    fn to_polygon(self) -> Option<Polygon<f64>> {
        let finite = [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min_x >= self.max_x || self.min_y >= self.max_y {
            return None;
        }
        Some(
            Rect::new(
                coord! { x: self.min_x, y: self.min_y },
                coord! { x: self.max_x, y: self.max_y },
            )
            .to_polygon(),
        )
    }
}

/// Spatial relation tested between a feature and the extent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialPredicate {
    /// The geometries share at least one point.
    #[default]
    Intersects,
    /// The feature contains the extent.
    Contains,
    /// The feature lies within the extent.
    Within,
    /// The geometries share no point.
    Disjoint,
    /// The boundaries touch without interior overlap.
    Touches,
    /// The feature crosses through the extent.
    Crosses,
    /// The geometries overlap without either containing the other.
    Overlaps,
}

/// Configuration of the extent filter.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FilterByExtentConfig {
    /// Extent rectangle the features are tested against.
    pub extent: Extent,
    /// Predicate to test.
    #[serde(default)]
    pub predicate: SpatialPredicate,
}

/// Stream stage testing each feature against the extent rectangle.
pub struct FilterByExtentOperation {
    config: FilterByExtentConfig,
}

impl FilterByExtentOperation {
    /// Creates the operation.
    pub fn new(config: FilterByExtentConfig) -> Self {
        Self { config }
    }
}

impl Operation for FilterByExtentOperation {
    fn name(&self) -> &'static str {
        "filter_by_extent"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        let Some(extent) = self.config.extent.to_polygon() else {
            // Fail open: a broken extent must not silently drain the layer.
            log::error!(
                "filter_by_extent: invalid extent {:?}, passing all features through",
                self.config.extent
            );
            return input;
        };

        let predicate = self.config.predicate;
        per_feature("filter_by_extent", input, move |feature| {
            let Some(geometry) = feature.geometry() else {
                return Err(Skip::NoGeometry);
            };
            if matches(geometry, &extent, predicate) {
                Ok(vec![feature.clone()])
            } else {
                Ok(Vec::new())
            }
        })
    }
}

fn matches(geometry: &geo::Geometry<f64>, extent: &Polygon<f64>, predicate: SpatialPredicate) -> bool {
    let im = geometry.relate(extent);
    match predicate {
        SpatialPredicate::Intersects => im.is_intersects(),
        SpatialPredicate::Disjoint => im.is_disjoint(),
        SpatialPredicate::Contains => im.is_contains(),
        SpatialPredicate::Within => im.is_within(),
        SpatialPredicate::Touches => ["FT*******", "F**T*****", "F***T****"]
            .iter()
            .any(|pattern| im.matches(pattern).unwrap_or(false)),
        SpatialPredicate::Crosses => {
            // The extent is two-dimensional, so crossing is defined only for
            // lower-dimensional features.
            match GeometryFamily::of(geometry) {
                Some(family) if family.dimensions() < 2 => {
                    im.matches("T*T******").unwrap_or(false)
                }
                _ => false,
            }
        }
        SpatialPredicate::Overlaps => match GeometryFamily::of(geometry) {
            Some(GeometryFamily::Area) => im.matches("T*T***T**").unwrap_or(false),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon};
    use tracery_types::Feature;

    fn run(config: FilterByExtentConfig, input: Vec<Feature>) -> Vec<Feature> {
        FilterByExtentOperation::new(config)
            .execute(Box::new(input.into_iter()))
            .collect()
    }

    fn unit_extent() -> Extent {
        Extent::new(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn intersects_keeps_only_touching_features() {
        let config = FilterByExtentConfig {
            extent: unit_extent(),
            predicate: SpatialPredicate::Intersects,
        };
        let output = run(
            config,
            vec![
                Feature::from_geometry(point! { x: 5.0, y: 5.0 }),
                Feature::from_geometry(point! { x: 50.0, y: 50.0 }),
            ],
        );
        assert_eq!(output.len(), 1);
    }

    #[test]
    fn within_and_disjoint() {
        let inside = Feature::from_geometry(
            polygon![(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 2.0)],
        );
        let outside = Feature::from_geometry(
            polygon![(x: 20.0, y: 20.0), (x: 21.0, y: 20.0), (x: 21.0, y: 21.0), (x: 20.0, y: 21.0)],
        );

        let within = run(
            FilterByExtentConfig {
                extent: unit_extent(),
                predicate: SpatialPredicate::Within,
            },
            vec![inside.clone(), outside.clone()],
        );
        assert_eq!(within, vec![inside]);

        let disjoint = run(
            FilterByExtentConfig {
                extent: unit_extent(),
                predicate: SpatialPredicate::Disjoint,
            },
            vec![outside.clone()],
        );
        assert_eq!(disjoint, vec![outside]);
    }

    #[test]
    fn crosses_applies_to_lines_only() {
        let through = Feature::from_geometry(line_string![(x: -5.0, y: 5.0), (x: 15.0, y: 5.0)]);
        let config = FilterByExtentConfig {
            extent: unit_extent(),
            predicate: SpatialPredicate::Crosses,
        };
        let output = run(config.clone(), vec![through.clone()]);
        assert_eq!(output, vec![through]);

        let area = Feature::from_geometry(
            polygon![(x: -5.0, y: -5.0), (x: 5.0, y: -5.0), (x: 5.0, y: 5.0), (x: -5.0, y: 5.0)],
        );
        assert!(run(config, vec![area]).is_empty());
    }

    #[test]
    fn invalid_extent_fails_open() {
        let config = FilterByExtentConfig {
            extent: Extent::new(10.0, 10.0, 0.0, 0.0),
            predicate: SpatialPredicate::Within,
        };
        let outside = Feature::from_geometry(point! { x: 50.0, y: 50.0 });
        let output = run(config, vec![outside.clone()]);
        assert_eq!(output, vec![outside]);
    }
}
