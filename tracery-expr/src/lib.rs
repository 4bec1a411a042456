//! Per-feature condition expressions.
//!
//! A condition is a short textual predicate evaluated against a feature's
//! attribute map, of the form `KEY OP VALUE` or `KEY EXISTS` /
//! `KEY NOT EXISTS`. Operator keywords are case-insensitive, values may be
//! quoted with single or double quotes, and an expression that cannot be
//! parsed evaluates to `false` instead of failing the stream.
//!
//! ```
//! use std::collections::HashMap;
//! use tracery_expr::evaluate;
//!
//! let mut attributes = HashMap::new();
//! attributes.insert("population".to_string(), 12000_i64.into());
//! assert!(evaluate("population >= 1000", &attributes));
//! assert!(!evaluate("name CONTAINS ville", &attributes));
//! ```

use std::fmt::{Display, Formatter};

use lazy_static::lazy_static;
use regex::Regex;
use tracery_types::{AttributeMap, AttributeValue};

mod error;
pub use error::ExprError;

lazy_static! {
    static ref SYMBOL_OP: Regex = Regex::new(r"^\s*([\w.-]+)\s*(!=|==|>=|<=|=|>|<)\s*(.*?)\s*$")
        .expect("invalid symbolic condition regex");
    static ref WORD_OP: Regex = Regex::new(
        r"(?i)^\s*([\w.-]+)\s+(NOT\s+EXISTS|NOT\s+CONTAINS|NOT\s+IN|EXISTS|CONTAINS|IN)\b\s*(.*?)\s*$"
    )
    .expect("invalid keyword condition regex");
}

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=` or `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// Case-insensitive substring test.
    Contains,
    /// Negated substring test.
    NotContains,
    /// Membership in a comma-separated list.
    In,
    /// Negated list membership.
    NotIn,
    /// The key is present and its value is not null.
    Exists,
    /// The key is absent or its value is null.
    NotExists,
}

/// Typed view of a condition's right-hand side.
#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Integer(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::String(v) => write!(f, "{v}"),
        }
    }
}

impl Literal {
    fn coerce(raw: &str) -> Literal {
        let stripped = strip_quotes(raw.trim());
        if stripped.eq_ignore_ascii_case("true") {
            return Literal::Bool(true);
        }
        if stripped.eq_ignore_ascii_case("false") {
            return Literal::Bool(false);
        }
        if let Ok(value) = stripped.parse::<i64>() {
            return Literal::Integer(value);
        }
        if let Ok(value) = stripped.parse::<f64>() {
            return Literal::Float(value);
        }
        Literal::String(stripped.to_string())
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(v) => Some(*v as f64),
            Literal::Float(v) => Some(*v),
            Literal::String(v) => v.parse().ok(),
            Literal::Bool(_) => None,
        }
    }
}

/// One parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    key: String,
    operator: Operator,
    /// Right-hand side exactly as written, without outer trimming.
    raw_value: String,
    literal: Literal,
}

impl Condition {
    /// Parses a condition from its textual form.
    pub fn parse(expression: &str) -> Result<Condition, ExprError> {
        if let Some(captures) = SYMBOL_OP.captures(expression) {
            let operator = match &captures[2] {
                "=" | "==" => Operator::Eq,
                "!=" => Operator::Ne,
                ">" => Operator::Gt,
                "<" => Operator::Lt,
                ">=" => Operator::Ge,
                "<=" => Operator::Le,
                _ => return Err(ExprError::Parse(expression.to_string())),
            };
            return Ok(Self::from_parts(&captures[1], operator, &captures[3]));
        }

        if let Some(captures) = WORD_OP.captures(expression) {
            let keyword = captures[2].to_uppercase();
            let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
            let operator = match keyword.as_str() {
                "EXISTS" => Operator::Exists,
                "NOT EXISTS" => Operator::NotExists,
                "CONTAINS" => Operator::Contains,
                "NOT CONTAINS" => Operator::NotContains,
                "IN" => Operator::In,
                "NOT IN" => Operator::NotIn,
                _ => return Err(ExprError::Parse(expression.to_string())),
            };
            return Ok(Self::from_parts(&captures[1], operator, &captures[3]));
        }

        Err(ExprError::Parse(expression.to_string()))
    }

    fn from_parts(key: &str, operator: Operator, raw_value: &str) -> Condition {
        Condition {
            key: key.to_string(),
            operator,
            raw_value: raw_value.to_string(),
            literal: Literal::coerce(raw_value),
        }
    }

    /// Key the condition reads from the attribute map.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Operator of the condition.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Evaluates the condition against the given attribute map.
    pub fn evaluate(&self, attributes: &AttributeMap) -> bool {
        let attribute = attributes.get(&self.key).filter(|value| !value.is_null());

        let Some(attribute) = attribute else {
            // A missing or null attribute satisfies only the negated
            // operators.
            return matches!(
                self.operator,
                Operator::NotExists | Operator::Ne | Operator::NotContains | Operator::NotIn
            );
        };

        match self.operator {
            Operator::Exists => true,
            Operator::NotExists => false,
            Operator::Eq => self.equals(attribute),
            Operator::Ne => !self.equals(attribute),
            Operator::Gt => self.ordering(attribute, |a, b| a > b),
            Operator::Lt => self.ordering(attribute, |a, b| a < b),
            Operator::Ge => self.ordering(attribute, |a, b| a >= b),
            Operator::Le => self.ordering(attribute, |a, b| a <= b),
            Operator::Contains => self.contains(attribute),
            Operator::NotContains => !self.contains(attribute),
            Operator::In => self.in_list(attribute),
            Operator::NotIn => !self.in_list(attribute),
        }
    }

    fn equals(&self, attribute: &AttributeValue) -> bool {
        match (attribute, &self.literal) {
            (AttributeValue::String(a), Literal::String(b)) => a == b,
            (AttributeValue::Bool(a), Literal::Bool(b)) => a == b,
            (AttributeValue::Integer(a), Literal::Integer(b)) => a == b,
            (AttributeValue::Float(a), Literal::Float(b)) => a == b,
            (AttributeValue::Integer(a), Literal::Float(b)) => *a as f64 == *b,
            (AttributeValue::Float(a), Literal::Integer(b)) => *a == *b as f64,
            (_, Literal::Bool(b)) => attribute.as_bool_lossy() == Some(*b),
            (AttributeValue::Bool(a), literal) => {
                Literal::coerce(&literal.to_string()) == Literal::Bool(*a)
                    || matches!(literal, Literal::Integer(v) if (*v != 0) == *a)
            }
            _ => {
                attribute.to_string().to_lowercase() == self.literal.to_string().to_lowercase()
            }
        }
    }

    fn ordering(&self, attribute: &AttributeValue, cmp: impl Fn(f64, f64) -> bool) -> bool {
        match (attribute.as_f64(), self.literal.as_f64()) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }

    fn contains(&self, attribute: &AttributeValue) -> bool {
        attribute
            .to_string()
            .to_lowercase()
            .contains(&self.literal.to_string().to_lowercase())
    }

    fn in_list(&self, attribute: &AttributeValue) -> bool {
        let value = attribute.to_string().to_lowercase();
        self.raw_value
            .split(',')
            .map(|item| strip_quotes(item.trim()).to_lowercase())
            .any(|item| item == value)
    }
}

/// Evaluates the expression against the attribute map.
///
/// An expression that does not parse evaluates to `false`.
pub fn evaluate(expression: &str, attributes: &AttributeMap) -> bool {
    match Condition::parse(expression) {
        Ok(condition) => condition.evaluate(attributes),
        Err(err) => {
            log::debug!("condition {expression:?} did not parse: {err}");
            false
        }
    }
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
