//! Categorical (label) comparison.

use super::ValidationStrategy;
use crate::core::{Anomaly, Evaluation, Value};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Configuration of the categorical strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoricalConfig {
    /// Compare case-insensitively.
    pub ignore_case: bool,
    /// Strip leading and trailing whitespace before comparing.
    pub trim_whitespace: bool,
    /// Source label → target label translations, applied after normalization.
    pub mapping: BTreeMap<String, String>,
    /// When non-empty, labels outside this set are reported as unknown.
    pub allowed: BTreeSet<String>,
}

impl CategoricalConfig {
    /// Case- and whitespace-insensitive comparison.
    pub fn normalized() -> Self {
        Self {
            ignore_case: true,
            trim_whitespace: true,
            ..Self::default()
        }
    }

    pub fn with_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.mapping.insert(from.into(), to.into());
        self
    }

    pub fn with_allowed<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed.extend(labels.into_iter().map(Into::into));
        self
    }
}

/// Compares labels for equality after normalization.
#[derive(Debug, Clone)]
pub struct CategoricalStrategy {
    ignore_case: bool,
    trim_whitespace: bool,
    mapping: BTreeMap<String, String>,
    allowed: BTreeSet<String>,
}

impl CategoricalStrategy {
    pub fn new(config: &CategoricalConfig) -> Result<Self> {
        let mut strategy = Self {
            ignore_case: config.ignore_case,
            trim_whitespace: config.trim_whitespace,
            mapping: BTreeMap::new(),
            allowed: BTreeSet::new(),
        };
        for (from, to) in &config.mapping {
            let from = strategy.normalize(from);
            let to = strategy.normalize(to);
            if let Some(previous) = strategy.mapping.insert(from.clone(), to.clone()) {
                if previous != to {
                    return Err(ReconcileError::configuration(format!(
                        "categorical mapping for '{from}' is ambiguous after normalization"
                    )));
                }
            }
        }
        strategy.allowed = config.allowed.iter().map(|l| strategy.normalize(l)).collect();
        Ok(strategy)
    }

    fn normalize(&self, label: &str) -> String {
        let label = if self.trim_whitespace {
            label.trim()
        } else {
            label
        };
        if self.ignore_case {
            label.to_lowercase()
        } else {
            label.to_string()
        }
    }

    fn label(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn is_known(&self, label: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(label)
    }
}

impl ValidationStrategy for CategoricalStrategy {
    fn name(&self) -> &str {
        "categorical"
    }

    fn evaluate(&self, source: &Value, target: &Value) -> Evaluation {
        let (s, t) = match (Self::label(source), Self::label(target)) {
            (None, None) => return Evaluation::matched("both null"),
            (Some(s), Some(t)) => (s, t),
            (Some(label), None) | (None, Some(label)) => {
                return Evaluation::mismatch(format!("null vs '{label}'"))
            }
        };

        let s = self.normalize(&s);
        let s = self.mapping.get(&s).cloned().unwrap_or(s);
        let t = self.normalize(&t);

        for label in [&s, &t] {
            if !self.is_known(label) {
                return Evaluation::anomaly(
                    Anomaly::UnknownCategory,
                    format!("unknown category '{label}'"),
                );
            }
        }

        if s == t {
            Evaluation::matched(format!("'{s}'"))
        } else {
            Evaluation::mismatch(format!("'{s}' != '{t}'"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Verdict;

    fn eval(config: CategoricalConfig, s: &str, t: &str) -> Evaluation {
        CategoricalStrategy::new(&config)
            .unwrap()
            .evaluate(&Value::from(s), &Value::from(t))
    }

    #[test]
    fn test_exact_by_default() {
        assert!(eval(CategoricalConfig::default(), "gold", "gold")
            .verdict
            .is_match());
        assert_eq!(
            eval(CategoricalConfig::default(), "gold", "Gold ").verdict,
            Verdict::Mismatch
        );
    }

    #[test]
    fn test_normalization() {
        assert!(eval(CategoricalConfig::normalized(), " Gold", "gold ")
            .verdict
            .is_match());
    }

    #[test]
    fn test_mapping_applies_to_source() {
        let config = CategoricalConfig::normalized().with_mapping("Y", "yes");
        assert!(eval(config.clone(), "y", "YES").verdict.is_match());
        assert!(!eval(config, "yes", "y").verdict.is_match());
    }

    #[test]
    fn test_unknown_category_is_distinct_anomaly() {
        let config = CategoricalConfig::default().with_allowed(["gold", "silver"]);
        let known_mismatch = eval(config.clone(), "gold", "silver");
        assert_eq!(known_mismatch.verdict, Verdict::Mismatch);
        assert_eq!(known_mismatch.anomaly, None);

        let unknown = eval(config, "gold", "platinum");
        assert_eq!(unknown.verdict, Verdict::Mismatch);
        assert_eq!(unknown.anomaly, Some(Anomaly::UnknownCategory));
        assert!(unknown.detail.contains("platinum"));
    }

    #[test]
    fn test_non_text_values_use_display() {
        let s = CategoricalStrategy::new(&CategoricalConfig::default()).unwrap();
        assert!(s.evaluate(&Value::Int(3), &Value::from("3")).verdict.is_match());
        assert!(s.evaluate(&Value::Null, &Value::Null).verdict.is_match());
        assert!(!s.evaluate(&Value::Null, &Value::from("")).verdict.is_match());
    }

    #[test]
    fn test_ambiguous_mapping_rejected() {
        let config = CategoricalConfig::normalized()
            .with_mapping("Y", "yes")
            .with_mapping("y", "no");
        assert!(CategoricalStrategy::new(&config).is_err());
    }
}
