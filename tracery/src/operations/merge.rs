//! Merge operation: unions the entire stream into as few features as the
//! union naturally produces.

use serde::{Deserialize, Serialize};
use tracery_types::repair::{repair, union_parts};
use tracery_types::{AttributeMap, Feature, GeometryFamily};

use super::{aggregate, FeatureStream, Operation};

/// Configuration of the merge operation. Has no parameters.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MergeConfig {}

/// Aggregating stage that unions the whole input stream.
///
/// Geometries union within their semantic family, so a mixed stream
/// produces at most one feature per family present, each carrying the first
/// input feature's attributes.
pub struct MergeOperation {
    _config: MergeConfig,
}

impl MergeOperation {
    /// Creates the operation.
    pub fn new(config: MergeConfig) -> Self {
        Self { _config: config }
    }
}

impl Operation for MergeOperation {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        aggregate(input, |input| {
            let mut first: Option<(AttributeMap, Option<String>)> = None;
            let mut buckets: Vec<(GeometryFamily, Vec<geo::Geometry<f64>>)> = Vec::new();

            for feature in input {
                if first.is_none() {
                    first = Some((
                        feature.attributes().clone(),
                        feature.crs().map(str::to_string),
                    ));
                }
                let Some(geometry) = feature.geometry() else {
                    log::debug!("merge: feature without geometry dropped");
                    continue;
                };
                let Some(repaired) = repair(geometry.clone()) else {
                    log::debug!("merge: unrepairable geometry dropped");
                    continue;
                };
                let Some(family) = GeometryFamily::of(&repaired) else {
                    log::debug!("merge: mixed-family geometry dropped");
                    continue;
                };
                match buckets.iter_mut().find(|(f, _)| *f == family) {
                    Some((_, parts)) => parts.push(repaired),
                    None => buckets.push((family, vec![repaired])),
                }
            }

            let Some((attributes, crs)) = first else {
                return Vec::new();
            };

            let mut output = Vec::new();
            for (family, parts) in buckets {
                match union_parts(parts, family).and_then(repair) {
                    Some(geometry) => {
                        let mut feature = Feature::new(Some(geometry), attributes.clone());
                        if let Some(crs) = &crs {
                            feature = feature.with_crs(crs.clone());
                        }
                        output.push(feature);
                    }
                    None => log::warn!("merge: union of {family:?} parts produced nothing"),
                }
            }
            output
        })
    }
}
