//! Label operation: derives point features carrying label text from the
//! stream.

use std::sync::Arc;

use geo::{Centroid, Point};
use serde::{Deserialize, Serialize};
use tracery_types::Feature;

use crate::style::{StyleRegistry, StyleSelector, TextStyle};

use super::{FeatureStream, Operation};

/// Configuration of the label operation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// Attribute holding the label text. Falls back to "name".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_attribute: Option<String>,
    /// Style of the produced labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleSelector>,
}

impl LabelsConfig {
    /// Attribute the label text is read from.
    pub fn text_attribute(&self) -> &str {
        self.text_attribute.as_deref().unwrap_or("name")
    }
}

/// One label with its placement decided.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    /// Text of the label.
    pub text: String,
    /// Anchor point of the label.
    pub position: Point<f64>,
    /// Rotation in degrees counterclockwise.
    pub rotation: f64,
}

/// Strategy deciding where each feature's label goes.
///
/// Implementations may drop features (no text, no geometry) or emit several
/// labels per feature (long line features, for instance).
pub trait LabelPlacer: Send + Sync {
    /// Turns the feature stream into a lazy stream of placed labels.
    fn place(
        &self,
        input: FeatureStream,
        config: &LabelsConfig,
        style: &TextStyle,
    ) -> Box<dyn Iterator<Item = PlacedLabel>>;
}

/// Placer anchoring one horizontal label at each feature's centroid.
#[derive(Debug, Default, Clone, Copy)]
pub struct CentroidLabelPlacer;

impl LabelPlacer for CentroidLabelPlacer {
    fn place(
        &self,
        input: FeatureStream,
        config: &LabelsConfig,
        _style: &TextStyle,
    ) -> Box<dyn Iterator<Item = PlacedLabel>> {
        let attribute = config.text_attribute().to_string();
        Box::new(input.filter_map(move |feature| {
            let text = feature.attribute(&attribute)?;
            if text.is_null() {
                return None;
            }
            let position = feature.geometry()?.centroid()?;
            Some(PlacedLabel {
                text: text.to_string(),
                position,
                rotation: 0.0,
            })
        }))
    }
}

/// Stream stage replacing features with label point features.
///
/// Each output feature is a point at the label anchor with `text` and
/// `rotation` attributes. The text style resolved from the configuration
/// travels along as `text_height`, `text_font` and `text_color` attributes
/// (set fields only), so entity conversion can style each label without
/// access to the label configuration.
pub struct LabelsOperation {
    config: LabelsConfig,
    layer_name: String,
    placer: Arc<dyn LabelPlacer>,
    styles: Arc<StyleRegistry>,
}

impl LabelsOperation {
    /// Creates the operation for the named layer.
    pub fn new(
        config: LabelsConfig,
        layer_name: String,
        placer: Arc<dyn LabelPlacer>,
        styles: Arc<StyleRegistry>,
    ) -> Self {
        Self {
            config,
            layer_name,
            placer,
            styles,
        }
    }
}

impl Operation for LabelsOperation {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        let style = self
            .config
            .style
            .as_ref()
            .map(|selector| self.styles.resolve(selector))
            .and_then(|style| style.text)
            .unwrap_or_default();
        log::debug!("labels: placing labels for layer {:?}", self.layer_name);
        let labels = self.placer.place(input, &self.config, &style);
        Box::new(labels.map(move |label| {
            let mut feature = Feature::from_geometry(label.position);
            let attributes = feature.attributes_mut();
            attributes.insert("text".to_string(), label.text.into());
            attributes.insert("rotation".to_string(), label.rotation.into());
            if let Some(height) = style.height {
                attributes.insert("text_height".to_string(), height.into());
            }
            if let Some(font) = &style.font {
                attributes.insert("text_font".to_string(), font.as_str().into());
            }
            if let Some(color) = style.color {
                attributes.insert("text_color".to_string(), color.to_hex().into());
            }
            feature
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use tracery_types::{AttributeMap, AttributeValue};

    fn named_square(name: Option<&str>) -> Feature {
        let polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
        ];
        let mut attributes = AttributeMap::new();
        if let Some(name) = name {
            attributes.insert("name".to_string(), name.into());
        }
        Feature::new(Some(polygon.into()), attributes)
    }

    fn run(config: LabelsConfig, input: Vec<Feature>) -> Vec<Feature> {
        let operation = LabelsOperation::new(
            config,
            "towns".to_string(),
            Arc::new(CentroidLabelPlacer),
            Arc::new(StyleRegistry::default()),
        );
        operation.execute(Box::new(input.into_iter())).collect()
    }

    #[test]
    fn places_labels_at_centroids() {
        let output = run(LabelsConfig::default(), vec![named_square(Some("Oakton"))]);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].attribute("text"), Some(&"Oakton".into()));
        assert_eq!(output[0].attribute("rotation"), Some(&0.0_f64.into()));
        assert_eq!(
            output[0].geometry(),
            Some(&geo::point! { x: 1.0, y: 1.0 }.into())
        );
    }

    #[test]
    fn features_without_text_produce_no_label() {
        let mut nulled = named_square(None);
        nulled
            .attributes_mut()
            .insert("name".to_string(), AttributeValue::Null);
        let output = run(LabelsConfig::default(), vec![named_square(None), nulled]);
        assert!(output.is_empty());
    }

    #[test]
    fn resolved_style_lands_on_label_features() {
        let preset = crate::style::FeatureStyle {
            layer: None,
            text: Some(TextStyle {
                height: Some(7.5),
                font: Some("Arial".to_string()),
                color: None,
            }),
        };
        let registry = StyleRegistry::new([("road_labels".to_string(), preset)]);
        let config = LabelsConfig {
            text_attribute: None,
            style: Some(crate::style::StyleSelector {
                preset: Some("road_labels".to_string()),
                inline: None,
            }),
        };
        let operation = LabelsOperation::new(
            config,
            "roads".to_string(),
            Arc::new(CentroidLabelPlacer),
            Arc::new(registry),
        );
        let output: Vec<_> = operation
            .execute(Box::new(std::iter::once(named_square(Some("Main St")))))
            .collect();

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].attribute("text"), Some(&"Main St".into()));
        assert_eq!(output[0].attribute("text_height"), Some(&7.5_f64.into()));
        assert_eq!(output[0].attribute("text_font"), Some(&"Arial".into()));
        // Fields the cascade left unset stay absent.
        assert_eq!(output[0].attribute("text_color"), None);
    }

    #[test]
    fn reads_the_configured_attribute() {
        let mut feature = named_square(Some("ignored"));
        feature
            .attributes_mut()
            .insert("label".to_string(), "Main St".into());
        let config = LabelsConfig {
            text_attribute: Some("label".to_string()),
            style: None,
        };
        let output = run(config, vec![feature]);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].attribute("text"), Some(&"Main St".into()));
    }
}
