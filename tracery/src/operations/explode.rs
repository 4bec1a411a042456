//! Explode operation: one output feature per single-part constituent
//! geometry.

use serde::{Deserialize, Serialize};
use tracery_types::repair::explode;

use super::{per_feature, FeatureStream, Operation, Skip};

/// Configuration of the explode operation. Has no parameters.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ExplodeConfig {}

/// Stream stage flattening multi-part geometries.
pub struct ExplodeOperation {
    _config: ExplodeConfig,
}

impl ExplodeOperation {
    /// Creates the operation.
    pub fn new(config: ExplodeConfig) -> Self {
        Self { _config: config }
    }
}

impl Operation for ExplodeOperation {
    fn name(&self) -> &'static str {
        "explode_multipart"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        per_feature("explode_multipart", input, |feature| {
            let Some(geometry) = feature.geometry() else {
                return Err(Skip::NoGeometry);
            };
            let parts = explode(geometry);
            if parts.is_empty() {
                return Err(Skip::EmptyResult);
            }
            Ok(parts
                .into_iter()
                .map(|part| feature.with_geometry(Some(part)))
                .collect())
        })
    }
}
