//! Null-pattern agreement.

use super::ValidationStrategy;
use crate::core::{Evaluation, Value};
use serde::{Deserialize, Serialize};

/// Configuration of the null strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Treat empty strings as null; the run's setting when unset.
    pub treat_empty_as_null: Option<bool>,
    /// Additional literal strings that count as null (e.g. `"null/empty"`).
    /// Only consulted when empty strings are treated as null.
    pub null_tokens: Vec<String>,
}

/// Checks that both sides agree on whether a value is present.
///
/// Non-null values are not compared with each other; combine this strategy
/// with another one in a composite for that.
#[derive(Debug, Clone)]
pub struct NullStrategy {
    treat_empty_as_null: bool,
    null_tokens: Vec<String>,
}

impl NullStrategy {
    pub fn new(config: &NullConfig, default_treat_empty_as_null: bool) -> Self {
        Self {
            treat_empty_as_null: config
                .treat_empty_as_null
                .unwrap_or(default_treat_empty_as_null),
            null_tokens: config.null_tokens.clone(),
        }
    }

    /// Returns true if the value counts as null under this configuration.
    pub fn is_null_equivalent(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Text(s) if self.treat_empty_as_null => {
                s.is_empty() || self.null_tokens.iter().any(|token| token == s)
            }
            _ => false,
        }
    }
}

impl ValidationStrategy for NullStrategy {
    fn name(&self) -> &str {
        "null"
    }

    fn evaluate(&self, source: &Value, target: &Value) -> Evaluation {
        match (
            self.is_null_equivalent(source),
            self.is_null_equivalent(target),
        ) {
            (true, true) => Evaluation::matched("both null"),
            (false, false) => Evaluation::matched("both present"),
            (true, false) => Evaluation::mismatch("null in source, present in target"),
            (false, true) => Evaluation::mismatch("present in source, null in target"),
        }
    }
}
