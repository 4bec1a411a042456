//! Clean operation: repairs geometries, optionally widening by a tolerance
//! buffer first.

use serde::{Deserialize, Serialize};
use tracery_types::offset::{offset, OffsetParams};
use tracery_types::repair::repair;

use super::{per_feature, FeatureStream, Operation, Skip};

/// Configuration of the clean operation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Buffer amount applied before the repair. Zero repairs in place.
    #[serde(default)]
    pub tolerance: f64,
}

/// Stream stage repairing every feature's geometry.
pub struct CleanOperation {
    config: CleanConfig,
}

impl CleanOperation {
    /// Creates the operation.
    pub fn new(config: CleanConfig) -> Self {
        Self { config }
    }
}

impl Operation for CleanOperation {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        let tolerance = self.config.tolerance;
        per_feature("clean", input, move |feature| {
            let Some(geometry) = feature.geometry() else {
                return Err(Skip::NoGeometry);
            };
            let mut cleaned = repair(geometry.clone()).ok_or(Skip::EmptyResult)?;
            if tolerance != 0.0 {
                cleaned = offset(&cleaned, &OffsetParams::new(tolerance))
                    .and_then(repair)
                    .ok_or(Skip::EmptyResult)?;
            }
            Ok(vec![feature.with_geometry(Some(cleaned))])
        })
    }
}
