//! Intersection operation: overlays the stream with a second polygonal
//! source.
//!
//! Each input feature is intersected with every overlay feature it touches,
//! producing one output per intersecting pair. The output carries the input
//! feature's attributes plus the overlay feature's attributes under a
//! configurable prefix, so a stream of parcels overlaid with zoning areas
//! yields parcel pieces that know their zone.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use geo::{
    BooleanOps, BoundingRect, Geometry, Intersects, MultiLineString, MultiPolygon, Point, Rect,
};
use serde::{Deserialize, Serialize};
use tracery_types::repair::{collapse_area, explode, repair, to_multi_polygon, try_intersection};
use tracery_types::{AttributeMap, Feature, GeometryFamily};

use crate::provider::{ReaderRegistry, SourceConfig};

use super::{FeatureStream, Operation};

fn default_attribute_prefix() -> String {
    "overlay_".to_string()
}

/// Configuration of the intersection operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionConfig {
    /// Source of the overlay features. Only area geometries are usable.
    pub overlay: SourceConfig,
    /// Prefix under which overlay attributes land on the output features.
    #[serde(default = "default_attribute_prefix")]
    pub attribute_prefix: String,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            overlay: SourceConfig::default(),
            attribute_prefix: default_attribute_prefix(),
        }
    }
}

/// Stream stage intersecting each feature with an overlay source.
///
/// The overlay is read once, on the first pull of the output stream. If it
/// cannot be read the operation fails open and passes the input through
/// unchanged.
pub struct IntersectionOperation {
    config: IntersectionConfig,
    readers: Arc<ReaderRegistry>,
}

impl IntersectionOperation {
    /// Creates the operation.
    pub fn new(config: IntersectionConfig, readers: Arc<ReaderRegistry>) -> Self {
        Self { config, readers }
    }
}

impl Operation for IntersectionOperation {
    fn name(&self) -> &'static str {
        "intersection"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        Box::new(IntersectionStream {
            input,
            readers: self.readers.clone(),
            source: self.config.overlay.clone(),
            prefix: self.config.attribute_prefix.clone(),
            overlay: None,
            pending: Vec::new().into_iter(),
        })
    }
}

struct OverlayEntry {
    polygons: MultiPolygon<f64>,
    bounds: Rect<f64>,
    attributes: AttributeMap,
}

enum Overlay {
    Loaded(Vec<OverlayEntry>),
    /// The overlay could not be read; the stage passes features through.
    Unavailable,
}

struct IntersectionStream {
    input: FeatureStream,
    readers: Arc<ReaderRegistry>,
    source: SourceConfig,
    prefix: String,
    overlay: Option<Overlay>,
    pending: std::vec::IntoIter<Feature>,
}

impl Iterator for IntersectionStream {
    type Item = Feature;

    fn next(&mut self) -> Option<Feature> {
        loop {
            if let Some(feature) = self.pending.next() {
                return Some(feature);
            }
            if self.overlay.is_none() {
                self.overlay = Some(self.load_overlay());
            }
            let feature = self.input.next()?;
            match self.overlay.as_ref()? {
                Overlay::Unavailable => return Some(feature),
                Overlay::Loaded(entries) => {
                    self.pending = intersect(&feature, entries, &self.prefix).into_iter();
                }
            }
        }
    }
}

impl IntersectionStream {
    fn load_overlay(&self) -> Overlay {
        let stream = match self.readers.open(&self.source) {
            Ok(stream) => stream,
            Err(err) => {
                log::error!("intersection: overlay source unavailable ({err}), passing features through");
                return Overlay::Unavailable;
            }
        };

        let mut entries = Vec::new();
        for feature in stream {
            let (geometry, attributes, _) = feature.into_parts();
            let Some(polygons) = geometry
                .and_then(repair)
                .as_ref()
                .and_then(to_multi_polygon)
            else {
                log::warn!("intersection: non-area overlay feature skipped");
                continue;
            };
            let Some(bounds) = polygons.bounding_rect() else {
                continue;
            };
            entries.push(OverlayEntry {
                polygons,
                bounds,
                attributes,
            });
        }
        log::debug!("intersection: overlay loaded with {} features", entries.len());
        Overlay::Loaded(entries)
    }
}

fn intersect(feature: &Feature, entries: &[OverlayEntry], prefix: &str) -> Vec<Feature> {
    let Some(geometry) = feature.geometry() else {
        log::debug!("intersection: feature without geometry dropped");
        return Vec::new();
    };
    let Some(bounds) = geometry.bounding_rect() else {
        return Vec::new();
    };

    let mut output = Vec::new();
    for entry in entries {
        if !bounds.intersects(&entry.bounds) {
            continue;
        }
        if let Some(piece) = intersect_one(geometry, &entry.polygons) {
            let mut result = feature.with_geometry(Some(piece));
            for (key, value) in &entry.attributes {
                result
                    .attributes_mut()
                    .insert(format!("{prefix}{key}"), value.clone());
            }
            output.push(result);
        }
    }
    output
}

fn intersect_one(
    geometry: &Geometry<f64>,
    overlay: &MultiPolygon<f64>,
) -> Option<Geometry<f64>> {
    match GeometryFamily::of(geometry)? {
        GeometryFamily::Area => {
            let source = to_multi_polygon(geometry)?;
            collapse_area(try_intersection(&source, overlay)?)
        }
        GeometryFamily::Line => {
            let lines = MultiLineString::new(
                explode(geometry)
                    .into_iter()
                    .filter_map(|part| match part {
                        Geometry::LineString(line) => Some(line),
                        _ => None,
                    })
                    .collect(),
            );
            let mut clipped =
                catch_unwind(AssertUnwindSafe(|| overlay.clip(&lines, false))).ok()?;
            clipped.0.retain(|line| line.0.len() >= 2);
            match clipped.0.len() {
                0 => None,
                1 => clipped.0.pop().map(Into::into),
                _ => Some(clipped.into()),
            }
        }
        GeometryFamily::Point => {
            let points: Vec<Point<f64>> = explode(geometry)
                .into_iter()
                .filter_map(|part| match part {
                    Geometry::Point(point) => Some(point),
                    _ => None,
                })
                .filter(|point| overlay.intersects(point))
                .collect();
            match points.len() {
                0 => None,
                1 => Some(points[0].into()),
                _ => Some(geo::MultiPoint::new(points).into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticReader;
    use approx::assert_relative_eq;
    use geo::{line_string, point, polygon, Area, EuclideanLength};

    fn zone(origin: f64, name: &str) -> Feature {
        let polygon = polygon![
            (x: origin, y: 0.0),
            (x: origin + 10.0, y: 0.0),
            (x: origin + 10.0, y: 10.0),
            (x: origin, y: 10.0),
        ];
        let mut attributes = AttributeMap::new();
        attributes.insert("zone".to_string(), name.into());
        Feature::new(Some(polygon.into()), attributes)
    }

    fn operation_with_zones() -> IntersectionOperation {
        let reader = StaticReader::new([(
            "zones".to_string(),
            vec![zone(0.0, "residential"), zone(10.0, "industrial")],
        )]);
        let mut readers = ReaderRegistry::new();
        readers.register("static", Arc::new(reader));
        let config = IntersectionConfig {
            overlay: SourceConfig {
                kind: "static".to_string(),
                location: Some("zones".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        IntersectionOperation::new(config, Arc::new(readers))
    }

    fn run(operation: &IntersectionOperation, input: Vec<Feature>) -> Vec<Feature> {
        operation.execute(Box::new(input.into_iter())).collect()
    }

    #[test]
    fn splits_areas_across_overlay_features() {
        // A parcel straddling both zones.
        let parcel = Feature::from_geometry(polygon![
            (x: 8.0, y: 4.0),
            (x: 12.0, y: 4.0),
            (x: 12.0, y: 6.0),
            (x: 8.0, y: 6.0),
        ]);
        let output = run(&operation_with_zones(), vec![parcel]);

        assert_eq!(output.len(), 2);
        assert_eq!(output[0].attribute("overlay_zone"), Some(&"residential".into()));
        assert_eq!(output[1].attribute("overlay_zone"), Some(&"industrial".into()));
        for piece in &output {
            let area = to_multi_polygon(piece.geometry().expect("geometry"))
                .expect("area")
                .unsigned_area();
            assert_relative_eq!(area, 4.0, max_relative = 1e-6);
        }
    }

    #[test]
    fn clips_lines_and_keeps_points() {
        let road = Feature::from_geometry(line_string![(x: 5.0, y: 5.0), (x: 25.0, y: 5.0)]);
        let hydrant = Feature::from_geometry(point! { x: 3.0, y: 3.0 });
        let outside = Feature::from_geometry(point! { x: 50.0, y: 50.0 });

        let output = run(&operation_with_zones(), vec![road, hydrant, outside]);
        assert_eq!(output.len(), 3);

        // The road is cut at the zone boundaries.
        let clipped = match output[0].geometry() {
            Some(Geometry::LineString(line)) => line.euclidean_length(),
            other => panic!("expected a line string, got {other:?}"),
        };
        assert_relative_eq!(clipped, 5.0, max_relative = 1e-6);
        assert_eq!(output[2].attribute("overlay_zone"), Some(&"residential".into()));
    }

    #[test]
    fn unreadable_overlay_fails_open() {
        let config = IntersectionConfig {
            overlay: SourceConfig {
                kind: "missing".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let operation = IntersectionOperation::new(config, Arc::new(ReaderRegistry::new()));
        let input = vec![zone(0.0, "a"), zone(10.0, "b")];
        let output = run(&operation, input.clone());
        assert_eq!(output, input);
    }
}
