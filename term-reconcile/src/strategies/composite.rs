//! Combination of several row-level strategies.

use super::{BuildContext, StrategySpec, ValidationStrategy};
use crate::core::{ChildVerdict, Evaluation, Value, Verdict};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How child verdicts combine into the composite verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositePolicy {
    /// Every child must match.
    #[default]
    All,
    /// At least one child must match.
    Any,
}

/// Configuration of a composite strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// Child strategies, evaluated in order.
    pub strategies: Vec<StrategySpec>,
    #[serde(default)]
    pub policy: CompositePolicy,
}

impl CompositeConfig {
    pub fn all(strategies: Vec<StrategySpec>) -> Self {
        Self {
            strategies,
            policy: CompositePolicy::All,
        }
    }

    pub fn any(strategies: Vec<StrategySpec>) -> Self {
        Self {
            strategies,
            policy: CompositePolicy::Any,
        }
    }
}

/// Applies ordered child strategies and combines their verdicts.
///
/// Every child is evaluated, even after the outcome is decided, so the result
/// always carries one [`ChildVerdict`] per child. On failure the detail starts
/// with the first failing child's detail.
#[derive(Debug, Clone)]
pub struct CompositeStrategy {
    children: Vec<Arc<dyn ValidationStrategy>>,
    policy: CompositePolicy,
}

impl CompositeStrategy {
    pub fn new(config: &CompositeConfig, ctx: &BuildContext) -> Result<Self> {
        if config.strategies.is_empty() {
            return Err(ReconcileError::configuration(
                "composite strategy requires at least one child",
            ));
        }

        let mut children = Vec::with_capacity(config.strategies.len());
        for spec in &config.strategies {
            let built = spec.build(ctx)?;
            let row = built.as_row().ok_or_else(|| {
                ReconcileError::configuration(format!(
                    "composite strategy cannot contain column-level strategy '{}'",
                    built.name()
                ))
            })?;
            children.push(Arc::clone(row));
        }

        Ok(Self {
            children,
            policy: config.policy,
        })
    }

    pub fn policy(&self) -> CompositePolicy {
        self.policy
    }
}

impl ValidationStrategy for CompositeStrategy {
    fn name(&self) -> &str {
        "composite"
    }

    fn evaluate(&self, source: &Value, target: &Value) -> Evaluation {
        let children: Vec<ChildVerdict> = self
            .children
            .iter()
            .map(|child| {
                let eval = child.evaluate(source, target);
                ChildVerdict {
                    strategy: child.name().to_string(),
                    verdict: eval.verdict,
                    detail: eval.detail,
                    anomaly: eval.anomaly,
                }
            })
            .collect();

        let passed = match self.policy {
            CompositePolicy::All => children.iter().all(|c| c.verdict.is_match()),
            CompositePolicy::Any => children.iter().any(|c| c.verdict.is_match()),
        };

        let summary = children
            .iter()
            .map(|c| format!("{}={}", c.strategy, c.verdict))
            .collect::<Vec<_>>()
            .join(", ");

        let first_failure = children
            .iter()
            .find(|c| !c.verdict.is_match())
            .filter(|_| !passed);
        let (verdict, detail, anomaly) = match first_failure {
            None => (Verdict::Match, format!("[{summary}]"), None),
            Some(failed) => (
                Verdict::Mismatch,
                format!("{}: {} [{summary}]", failed.strategy, failed.detail),
                failed.anomaly,
            ),
        };

        Evaluation {
            verdict,
            detail,
            anomaly,
            children,
        }
    }
}
