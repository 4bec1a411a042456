//! Style objects and the cascade that resolves them.
//!
//! A [`FeatureStyle`] is a tree of independently optional fields. Styles are
//! combined with a strictly two-operand cascade: a base (usually a named
//! preset) contributes the fields it set, an override (usually an inline
//! style) wins field by field, and nested style sub-objects merge
//! recursively under the same rule. A field absent on both sides stays
//! absent; the cascade never fills in defaults.

use ahash::HashMap;
use serde::{Deserialize, Serialize};

use crate::Color;

/// Resolved or partial style of a drawing layer's features.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStyle {
    /// Display properties of the layer's geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<LayerDisplayStyle>,
    /// Text properties for labels derived from the layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextStyle>,
}

/// Display properties of a layer's geometry.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDisplayStyle {
    /// Stroke color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    /// Stroke weight in drawing units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_weight: Option<f64>,
    /// Named line pattern of the target drawing format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_type: Option<String>,
    /// Whether area geometries are filled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
}

/// Text properties for labels.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Text height in drawing units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Font name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// Text color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// Reference to the style of a layer: an optional named preset topped up by
/// an optional inline override.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSelector {
    /// Name of a preset in the [`StyleRegistry`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Inline style overriding the preset field by field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<FeatureStyle>,
}

fn merge_field<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    over.clone().or_else(|| base.clone())
}

impl FeatureStyle {
    /// Merges two optional styles, override winning field by field.
    ///
    /// The cascade is strictly pairwise and not associative: it must be
    /// invoked in resolution order, preset first, inline second.
    pub fn cascade(base: Option<&FeatureStyle>, over: Option<&FeatureStyle>) -> FeatureStyle {
        match (base, over) {
            (None, None) => FeatureStyle::default(),
            (Some(only), None) | (None, Some(only)) => only.clone(),
            (Some(base), Some(over)) => FeatureStyle {
                layer: merge_sub(&base.layer, &over.layer, LayerDisplayStyle::cascade),
                text: merge_sub(&base.text, &over.text, TextStyle::cascade),
            },
        }
    }
}

fn merge_sub<T: Clone>(
    base: &Option<T>,
    over: &Option<T>,
    recurse: impl Fn(&T, &T) -> T,
) -> Option<T> {
    match (base, over) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(base), Some(over)) => Some(recurse(base, over)),
    }
}

impl LayerDisplayStyle {
    fn cascade(base: &LayerDisplayStyle, over: &LayerDisplayStyle) -> LayerDisplayStyle {
        LayerDisplayStyle {
            color: merge_field(&base.color, &over.color),
            line_weight: merge_field(&base.line_weight, &over.line_weight),
            line_type: merge_field(&base.line_type, &over.line_type),
            fill: merge_field(&base.fill, &over.fill),
        }
    }
}

impl TextStyle {
    fn cascade(base: &TextStyle, over: &TextStyle) -> TextStyle {
        TextStyle {
            height: merge_field(&base.height, &over.height),
            font: merge_field(&base.font, &over.font),
            color: merge_field(&base.color, &over.color),
        }
    }
}

/// Table of named style presets, built once at startup.
#[derive(Debug, Default, Clone)]
pub struct StyleRegistry {
    presets: HashMap<String, FeatureStyle>,
}

impl StyleRegistry {
    /// Creates a registry from named presets.
    pub fn new(presets: impl IntoIterator<Item = (String, FeatureStyle)>) -> Self {
        Self {
            presets: presets.into_iter().collect(),
        }
    }

    /// Adds a named preset, replacing a previous one of the same name.
    pub fn insert(&mut self, name: impl Into<String>, style: FeatureStyle) {
        self.presets.insert(name.into(), style);
    }

    /// Looks up a preset by name.
    pub fn preset(&self, name: &str) -> Option<&FeatureStyle> {
        self.presets.get(name)
    }

    /// Resolves a selector into one style through the cascade.
    ///
    /// A preset name that is not registered is reported as a warning and
    /// treated as absent.
    pub fn resolve(&self, selector: &StyleSelector) -> FeatureStyle {
        let preset = selector.preset.as_deref().and_then(|name| {
            let preset = self.presets.get(name);
            if preset.is_none() {
                log::warn!("style preset {name:?} is not defined");
            }
            preset
        });
        FeatureStyle::cascade(preset, selector.inline.as_ref())
    }
}
