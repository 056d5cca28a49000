//! Format-class agreement using named regular expressions.

use super::ValidationStrategy;
use crate::core::{Evaluation, Value};
use crate::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Patterns available in every pattern table unless overridden by name.
static BUILTIN_PATTERNS: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "email",
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        ),
        ("phone", r"^\+?[0-9][0-9\s().-]{5,19}$"),
        (
            "uuid",
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        ),
        (
            "url",
            r"^https?://[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}(?::\d+)?(?:/[^\s]*)?$",
        ),
        (
            "ipv4",
            r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
        ),
        ("iso_date", r"^\d{4}-\d{2}-\d{2}$"),
    ])
});

/// Named regular expressions available to pattern strategies.
///
/// User entries shadow built-ins of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternTable(BTreeMap<String, String>);

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a named pattern.
    pub fn with_pattern(mut self, name: impl Into<String>, regex: impl Into<String>) -> Self {
        self.0.insert(name.into(), regex.into());
        self
    }

    /// Returns the source of a named pattern, user entries first.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .or_else(|| BUILTIN_PATTERNS.get(name).copied())
    }

    /// Compiles a named pattern.
    pub fn compile(&self, name: &str) -> Result<Regex> {
        let source = self.get(name).ok_or_else(|| {
            ReconcileError::configuration(format!("unknown pattern '{name}' in pattern table"))
        })?;
        Regex::new(source).map_err(|e| ReconcileError::InvalidPattern {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Compiles every user-supplied pattern, failing on the first invalid one.
    pub fn validate(&self) -> Result<()> {
        for name in self.0.keys() {
            self.compile(name)?;
        }
        Ok(())
    }
}

/// Configuration of the pattern strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Name of the pattern in the pattern table.
    pub pattern: String,
}

impl PatternConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            pattern: name.into(),
        }
    }
}

/// Checks that a format class is preserved between source and target.
///
/// The verdict is `Match` when both values satisfy the pattern or both violate
/// it; the raw values are never compared with each other. Nulls never satisfy
/// a pattern.
#[derive(Debug, Clone)]
pub struct PatternStrategy {
    pattern_name: String,
    regex: Regex,
}

impl PatternStrategy {
    pub fn new(config: &PatternConfig, table: &PatternTable) -> Result<Self> {
        if config.pattern.is_empty() {
            return Err(ReconcileError::configuration(
                "pattern strategy requires a pattern name",
            ));
        }
        Ok(Self {
            pattern_name: config.pattern.clone(),
            regex: table.compile(&config.pattern)?,
        })
    }

    fn satisfies(&self, value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::Text(s) => self.regex.is_match(s),
            other => self.regex.is_match(&other.to_string()),
        }
    }
}

impl ValidationStrategy for PatternStrategy {
    fn name(&self) -> &str {
        "pattern"
    }

    fn evaluate(&self, source: &Value, target: &Value) -> Evaluation {
        let describe = |ok: bool| if ok { "satisfies" } else { "violates" };
        let s = self.satisfies(source);
        let t = self.satisfies(target);
        Evaluation::from_bool(
            s == t,
            format!(
                "source {} '{}', target {} '{}'",
                describe(s),
                self.pattern_name,
                describe(t),
                self.pattern_name
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Verdict;

    fn email() -> PatternStrategy {
        PatternStrategy::new(&PatternConfig::named("email"), &PatternTable::new()).unwrap()
    }

    #[test]
    fn test_both_satisfy_matches_even_if_values_differ() {
        let eval = email().evaluate(&Value::from("a@example.com"), &Value::from("b@example.org"));
        assert_eq!(eval.verdict, Verdict::Match);
    }

    #[test]
    fn test_both_violate_matches() {
        assert!(email()
            .evaluate(&Value::from("not-an-email"), &Value::Null)
            .verdict
            .is_match());
    }

    #[test]
    fn test_format_lost_in_target() {
        let eval = email().evaluate(&Value::from("a@example.com"), &Value::from("a at example"));
        assert_eq!(eval.verdict, Verdict::Mismatch);
        assert!(eval.detail.contains("target violates"));
    }

    #[test]
    fn test_user_pattern_shadows_builtin() {
        let table = PatternTable::new().with_pattern("phone", r"^\d{3}-\d{4}$");
        let s = PatternStrategy::new(&PatternConfig::named("phone"), &table).unwrap();
        assert!(s
            .evaluate(&Value::from("555-1234"), &Value::from("555-9876"))
            .verdict
            .is_match());
        assert!(!s
            .evaluate(&Value::from("555-1234"), &Value::from("+1 555 1234"))
            .verdict
            .is_match());
    }

    #[test]
    fn test_configuration_errors() {
        let unknown = PatternStrategy::new(&PatternConfig::named("nope"), &PatternTable::new());
        assert!(matches!(unknown, Err(ReconcileError::Configuration(_))));

        let table = PatternTable::new().with_pattern("broken", "([a-z");
        let invalid = PatternStrategy::new(&PatternConfig::named("broken"), &table);
        assert!(matches!(invalid, Err(ReconcileError::InvalidPattern { .. })));
        assert!(table.validate().is_err());
    }
}
