//! Buffer operation: grows or shrinks geometries by a signed distance.

use serde::{Deserialize, Serialize};
use tracery_types::offset::{offset, CapStyle, JoinStyle, OffsetParams};
use tracery_types::repair::{remove_islands, repair};

use super::{per_feature, FeatureStream, Operation, Skip};

fn default_mitre_limit() -> f64 {
    5.0
}

fn default_resolution() -> usize {
    32
}

fn default_true() -> bool {
    true
}

/// Configuration of the buffer operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Default signed buffer distance.
    pub distance: f64,
    /// Attribute carrying a per-feature distance override. An invalid or
    /// unparseable value falls back to `distance`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_attribute: Option<String>,
    /// Join style at vertices.
    #[serde(default)]
    pub join: JoinStyle,
    /// Cap style at open line ends.
    #[serde(default)]
    pub cap: CapStyle,
    /// Mitre limit, as a multiple of the distance.
    #[serde(default = "default_mitre_limit")]
    pub mitre_limit: f64,
    /// Segments approximating a full circle in round joins and caps.
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    /// Repair geometries before buffering.
    #[serde(default)]
    pub repair_input: bool,
    /// Repair the buffered result.
    #[serde(default = "default_true")]
    pub repair_output: bool,
    /// Keep interior holes of the buffered result. When false, each output
    /// polygon is rebuilt from its outer boundary.
    #[serde(default = "default_true")]
    pub preserve_islands: bool,
}

impl BufferConfig {
    /// Configuration with the given distance and default styles.
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            distance_attribute: None,
            join: JoinStyle::default(),
            cap: CapStyle::default(),
            mitre_limit: default_mitre_limit(),
            resolution: default_resolution(),
            repair_input: false,
            repair_output: true,
            preserve_islands: true,
        }
    }
}

/// Stream stage applying [`BufferConfig`] to every feature.
pub struct BufferOperation {
    config: BufferConfig,
}

impl BufferOperation {
    /// Creates the operation.
    pub fn new(config: BufferConfig) -> Self {
        Self { config }
    }
}

impl Operation for BufferOperation {
    fn name(&self) -> &'static str {
        "buffer"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        let config = self.config.clone();
        per_feature("buffer", input, move |feature| {
            let Some(geometry) = feature.geometry() else {
                return Err(Skip::NoGeometry);
            };

            let distance = match &config.distance_attribute {
                Some(attribute) => match feature.attribute(attribute).and_then(|v| v.as_f64()) {
                    Some(distance) => distance,
                    None => {
                        log::debug!(
                            "buffer: attribute {attribute:?} has no usable distance, using {}",
                            config.distance
                        );
                        config.distance
                    }
                },
                None => config.distance,
            };

            let mut geometry = geometry.clone();
            if config.repair_input {
                geometry = repair(geometry).ok_or(Skip::EmptyResult)?;
            }

            let params = OffsetParams {
                distance,
                join: config.join,
                cap: config.cap,
                mitre_limit: config.mitre_limit,
                resolution: config.resolution,
            };
            let mut buffered = offset(&geometry, &params).ok_or(Skip::EmptyResult)?;
            buffered = remove_islands(buffered, config.preserve_islands).ok_or(Skip::EmptyResult)?;
            if config.repair_output {
                buffered = repair(buffered).ok_or(Skip::EmptyResult)?;
            }

            Ok(vec![feature.with_geometry(Some(buffered))])
        })
    }
}
