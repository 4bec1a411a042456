//! Dissolve operation: unions features grouped by an attribute value.

use ahash::HashMap;
use serde::{Deserialize, Serialize};
use tracery_types::repair::{repair, union_parts};
use tracery_types::{AttributeMap, AttributeValue, Feature, GeometryFamily};

use super::{aggregate, FeatureStream, Operation};

/// Configuration of the dissolve operation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DissolveConfig {
    /// Attribute whose value forms the groups. Without it the whole stream
    /// is one implicit group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// Aggregating stage that unions each group's geometries into one feature.
pub struct DissolveOperation {
    config: DissolveConfig,
}

impl DissolveOperation {
    /// Creates the operation.
    pub fn new(config: DissolveConfig) -> Self {
        Self { config }
    }
}

struct Group {
    value: AttributeValue,
    attributes: AttributeMap,
    crs: Option<String>,
    parts: Vec<geo::Geometry<f64>>,
}

impl Operation for DissolveOperation {
    fn name(&self) -> &'static str {
        "dissolve"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        let attribute = self.config.attribute.clone();
        aggregate(input, move |input| {
            let mut order: Vec<String> = Vec::new();
            let mut groups: HashMap<String, Group> = HashMap::default();

            for feature in input {
                let Some(geometry) = feature.geometry() else {
                    log::debug!("dissolve: feature without geometry dropped");
                    continue;
                };
                let Some(repaired) = repair(geometry.clone()) else {
                    log::debug!("dissolve: unrepairable geometry dropped");
                    continue;
                };

                let value = attribute
                    .as_ref()
                    .and_then(|name| feature.attribute(name).cloned())
                    .unwrap_or(AttributeValue::Null);
                let key = value.to_string();
                let group = groups.entry(key.clone()).or_insert_with(|| {
                    order.push(key);
                    Group {
                        value,
                        attributes: feature.attributes().clone(),
                        crs: feature.crs().map(str::to_string),
                        parts: Vec::new(),
                    }
                });
                group.parts.push(repaired);
            }

            let mut output = Vec::new();
            for key in order {
                let Some(group) = groups.remove(&key) else {
                    continue;
                };
                let Some(family) = group.parts.iter().find_map(GeometryFamily::of) else {
                    log::warn!("dissolve: group {key:?} has no usable geometry, skipping");
                    continue;
                };
                match union_parts(group.parts, family).and_then(repair) {
                    Some(geometry) => {
                        let mut attributes = group.attributes;
                        if let Some(name) = &attribute {
                            attributes.insert(name.clone(), group.value);
                        }
                        let mut feature = Feature::new(Some(geometry), attributes);
                        if let Some(crs) = group.crs {
                            feature = feature.with_crs(crs);
                        }
                        output.push(feature);
                    }
                    None => {
                        log::warn!("dissolve: union of group {key:?} produced nothing, skipping");
                    }
                }
            }
            output
        })
    }
}
