//! Error types of the expression crate.

use thiserror::Error;

/// Error raised when a condition expression cannot be parsed.
#[derive(Debug, Clone, Error)]
pub enum ExprError {
    /// The expression does not match the `KEY OP VALUE` grammar.
    #[error("invalid condition expression: {0}")]
    Parse(String),
}
