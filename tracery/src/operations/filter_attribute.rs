//! Attribute filter: keeps features matching condition expressions.

use serde::{Deserialize, Serialize};
use tracery_expr::Condition;

use super::{FeatureStream, Operation};

/// How multiple conditions combine into one verdict.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    /// Every condition must hold.
    #[default]
    And,
    /// At least one condition must hold.
    Or,
}

/// Configuration of the attribute filter.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FilterByAttributeConfig {
    /// Condition expressions evaluated against each feature's attributes.
    /// With no conditions every feature passes through unchanged.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Combination mode of the conditions.
    #[serde(default)]
    pub combine: CombineMode,
}

/// Stream stage keeping features whose attributes satisfy the conditions.
pub struct FilterByAttributeOperation {
    combine: CombineMode,
    /// Parsed once at build time. An unparseable condition never matches.
    conditions: Vec<Option<Condition>>,
}

impl FilterByAttributeOperation {
    /// Creates the operation, parsing the configured conditions.
    pub fn new(config: FilterByAttributeConfig) -> Self {
        let conditions = config
            .conditions
            .iter()
            .map(|expression| match Condition::parse(expression) {
                Ok(condition) => Some(condition),
                Err(err) => {
                    log::warn!("filter_by_attribute: {err}; the condition never matches");
                    None
                }
            })
            .collect();
        Self {
            combine: config.combine,
            conditions,
        }
    }
}

impl Operation for FilterByAttributeOperation {
    fn name(&self) -> &'static str {
        "filter_by_attribute"
    }

    fn execute(&self, input: FeatureStream) -> FeatureStream {
        if self.conditions.is_empty() {
            return input;
        }
        let conditions = self.conditions.clone();
        let combine = self.combine;
        Box::new(input.filter(move |feature| {
            let mut verdicts = conditions.iter().map(|condition| {
                condition
                    .as_ref()
                    .map(|c| c.evaluate(feature.attributes()))
                    .unwrap_or(false)
            });
            match combine {
                CombineMode::And => verdicts.all(|v| v),
                CombineMode::Or => verdicts.any(|v| v),
            }
        }))
    }
}
