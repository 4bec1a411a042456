//! Geographic features and their attribute values.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use geo::Geometry;
use serde::{Deserialize, Serialize};

/// Mapping of attribute name to value carried by a [`Feature`].
pub type AttributeMap = HashMap<String, AttributeValue>;

/// Scalar value of a feature attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value. Covers all integer types of source formats.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Explicitly set empty value. Distinct from the attribute being absent
    /// from the map only in that the key is still listed.
    Null,
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{v}"),
            AttributeValue::Integer(v) => write!(f, "{v}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::String(v) => write!(f, "{v}"),
            AttributeValue::Null => write!(f, "<NONE>"),
        }
    }
}

impl AttributeValue {
    /// Returns true for the [`AttributeValue::Null`] variant.
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Numeric view of the value. Strings are parsed, booleans are rejected.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::String(v) => v.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view of the value. Strings `"true"`/`"false"` (any case) and
    /// integers (non-zero is true) are coerced.
    pub fn as_bool_lossy(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            AttributeValue::Integer(v) => Some(*v != 0),
            AttributeValue::String(v) => match v.to_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// One geographic feature: a geometry, an attribute map and an optional CRS
/// identifier.
///
/// Features are immutable once yielded by a stream. Operations that change a
/// feature construct a new one, usually through [`Feature::with_geometry`].
///
/// A feature without a geometry is a valid non-spatial carrier. Operations
/// that require a geometry skip such features instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    geometry: Option<Geometry<f64>>,
    #[serde(default)]
    attributes: AttributeMap,
    #[serde(default)]
    crs: Option<String>,
}

impl Feature {
    /// Creates a feature with the given geometry and attributes and no CRS.
    pub fn new(geometry: Option<Geometry<f64>>, attributes: AttributeMap) -> Self {
        Self {
            geometry,
            attributes,
            crs: None,
        }
    }

    /// Creates a feature with a geometry only.
    pub fn from_geometry(geometry: impl Into<Geometry<f64>>) -> Self {
        Self::new(Some(geometry.into()), AttributeMap::new())
    }

    /// Returns a copy of this feature with the CRS identifier set.
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    /// Constructs a new feature with the given geometry, carrying over this
    /// feature's attributes and CRS.
    pub fn with_geometry(&self, geometry: Option<Geometry<f64>>) -> Self {
        Self {
            geometry,
            attributes: self.attributes.clone(),
            crs: self.crs.clone(),
        }
    }

    /// Geometry of the feature, if any.
    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        self.geometry.as_ref()
    }

    /// All attributes of the feature.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Mutable access to the attributes.
    pub fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }

    /// Value of the named attribute, if present.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// CRS identifier the geometry coordinates are expressed in.
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    /// Splits the feature into its parts.
    pub fn into_parts(self) -> (Option<Geometry<f64>>, AttributeMap, Option<String>) {
        (self.geometry, self.attributes, self.crs)
    }
}
