//! Column comparison strategies.
//!
//! A strategy decides whether two aligned values are "equal enough". Row-level
//! strategies implement [`ValidationStrategy`] and see one pair of values at a
//! time; column-level strategies implement [`ColumnStrategy`] and see every
//! value of one column within a batch.
//!
//! Strategies are described by the serializable [`StrategySpec`] enum and
//! turned into trait objects by [`StrategySpec::build`], which is where every
//! configuration error is raised. Once built, a strategy never fails: a value
//! it cannot compare is a `Mismatch` carrying an [`Anomaly`](crate::core::Anomaly).
//!
//! ## Available strategies
//!
//! | Spec | Scope | Compares |
//! |------|-------|----------|
//! | `numeric` | row | absolute or relative difference within a tolerance |
//! | `categorical` | row | normalized equality, optional mapping and allowed set |
//! | `date_time` | row | instants within a duration |
//! | `null` | row | agreement of nullness only |
//! | `pattern` | row | both values satisfy (or both violate) a named regex |
//! | `composite` | row | ordered children combined by a policy |
//! | `distribution` | column | summary statistics and KS distance |
//!
//! ## Example
//!
//! ```rust
//! use term_reconcile::core::{Value, Verdict};
//! use term_reconcile::strategies::{BuildContext, NumericConfig, StrategySpec};
//!
//! let strategy = StrategySpec::Numeric(NumericConfig::absolute(0.01))
//!     .build(&BuildContext::default())
//!     .unwrap();
//! let row = strategy.as_row().unwrap();
//! let eval = row.evaluate(&Value::Float(10.001), &Value::Float(10.0));
//! assert_eq!(eval.verdict, Verdict::Match);
//! ```

mod categorical;
mod composite;
mod datetime;
mod distribution;
mod null;
mod numeric;
mod pattern;

pub use categorical::{CategoricalConfig, CategoricalStrategy};
pub use composite::{CompositeConfig, CompositePolicy, CompositeStrategy};
pub use datetime::{DateTimeConfig, DateTimeStrategy};
pub use distribution::{ColumnStats, DistributionConfig, DistributionStrategy};
pub use null::{NullConfig, NullStrategy};
pub use numeric::{NumericConfig, NumericMode, NumericStrategy};
pub use pattern::{PatternConfig, PatternStrategy, PatternTable};

use crate::core::{Evaluation, Value};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Default absolute tolerance for numeric comparison.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// A strategy comparing one aligned pair of values.
pub trait ValidationStrategy: Debug + Send + Sync {
    /// Name recorded on every result produced by this strategy.
    fn name(&self) -> &str;

    /// Compares a source value with a target value.
    fn evaluate(&self, source: &Value, target: &Value) -> Evaluation;
}

/// A strategy comparing all values of one column within a batch.
pub trait ColumnStrategy: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Compares the source values of a column with the target values.
    fn evaluate_column(&self, source: &[Value], target: &[Value]) -> Evaluation;
}

/// A built strategy, ready to be applied by the engine.
#[derive(Debug, Clone)]
pub enum Strategy {
    Row(Arc<dyn ValidationStrategy>),
    Column(Arc<dyn ColumnStrategy>),
}

impl Strategy {
    pub fn name(&self) -> &str {
        match self {
            Strategy::Row(s) => s.name(),
            Strategy::Column(s) => s.name(),
        }
    }

    /// Returns the row-level strategy, if this is one.
    pub fn as_row(&self) -> Option<&Arc<dyn ValidationStrategy>> {
        match self {
            Strategy::Row(s) => Some(s),
            Strategy::Column(_) => None,
        }
    }

    /// Returns the column-level strategy, if this is one.
    pub fn as_column(&self) -> Option<&Arc<dyn ColumnStrategy>> {
        match self {
            Strategy::Column(s) => Some(s),
            Strategy::Row(_) => None,
        }
    }
}

/// Run-wide defaults that strategy specs may leave unset.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub patterns: PatternTable,
    pub default_tolerance: f64,
    pub timezone_aware: bool,
    pub treat_empty_as_null: bool,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            patterns: PatternTable::default(),
            default_tolerance: DEFAULT_TOLERANCE,
            timezone_aware: false,
            treat_empty_as_null: false,
        }
    }
}

/// Serializable description of a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategySpec {
    Numeric(NumericConfig),
    Categorical(CategoricalConfig),
    DateTime(DateTimeConfig),
    Null(NullConfig),
    Distribution(DistributionConfig),
    Pattern(PatternConfig),
    Composite(CompositeConfig),
}

impl StrategySpec {
    /// Numeric comparison using the run's default tolerance.
    pub fn numeric() -> Self {
        StrategySpec::Numeric(NumericConfig::default())
    }

    /// Exact categorical comparison.
    pub fn categorical() -> Self {
        StrategySpec::Categorical(CategoricalConfig::default())
    }

    /// Instant comparison with the run's timezone setting and zero tolerance.
    pub fn date_time() -> Self {
        StrategySpec::DateTime(DateTimeConfig::default())
    }

    /// Nullness agreement with the run's null-equivalence setting.
    pub fn null() -> Self {
        StrategySpec::Null(NullConfig::default())
    }

    /// Pattern agreement for a named pattern.
    pub fn pattern(name: impl Into<String>) -> Self {
        StrategySpec::Pattern(PatternConfig::named(name))
    }

    /// Composite of the given children, all of which must match.
    pub fn all_of(children: Vec<StrategySpec>) -> Self {
        StrategySpec::Composite(CompositeConfig::all(children))
    }

    /// Validates the spec and builds the strategy.
    pub fn build(&self, ctx: &BuildContext) -> Result<Strategy> {
        let strategy = match self {
            StrategySpec::Numeric(cfg) => {
                Strategy::Row(Arc::new(NumericStrategy::new(cfg, ctx.default_tolerance)?))
            }
            StrategySpec::Categorical(cfg) => {
                Strategy::Row(Arc::new(CategoricalStrategy::new(cfg)?))
            }
            StrategySpec::DateTime(cfg) => {
                Strategy::Row(Arc::new(DateTimeStrategy::new(cfg, ctx.timezone_aware)?))
            }
            StrategySpec::Null(cfg) => {
                Strategy::Row(Arc::new(NullStrategy::new(cfg, ctx.treat_empty_as_null)))
            }
            StrategySpec::Pattern(cfg) => {
                Strategy::Row(Arc::new(PatternStrategy::new(cfg, &ctx.patterns)?))
            }
            StrategySpec::Distribution(cfg) => {
                Strategy::Column(Arc::new(DistributionStrategy::new(cfg)?))
            }
            StrategySpec::Composite(cfg) => {
                Strategy::Row(Arc::new(CompositeStrategy::new(cfg, ctx)?))
            }
        };
        Ok(strategy)
    }
}

/// Checks that a tolerance-like value is a finite, non-negative number.
pub(crate) fn validate_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ReconcileError::configuration(format!(
            "{name} must be a finite number >= 0, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_serde_is_tagged() {
        let spec: StrategySpec =
            serde_json::from_str(r#"{"type": "numeric", "tolerance": 0.5}"#).unwrap();
        assert_eq!(spec, StrategySpec::Numeric(NumericConfig::absolute(0.5)));

        let spec: StrategySpec = serde_json::from_str(
            r#"{"type": "composite", "strategies": [{"type": "null"}, {"type": "numeric"}]}"#,
        )
        .unwrap();
        assert!(matches!(spec, StrategySpec::Composite(_)));
    }

    #[test]
    fn test_build_reports_scope() {
        let ctx = BuildContext::default();
        let row = StrategySpec::numeric().build(&ctx).unwrap();
        assert!(row.as_row().is_some());
        assert_eq!(row.name(), "numeric");

        let column = StrategySpec::Distribution(DistributionConfig::default())
            .build(&ctx)
            .unwrap();
        assert!(column.as_column().is_some());
        assert!(column.as_row().is_none());
    }

    #[test]
    fn test_negative_tolerance_rejected_at_build() {
        let err = StrategySpec::Numeric(NumericConfig::absolute(-1.0))
            .build(&BuildContext::default())
            .unwrap_err();
        assert!(err.is_setup_error());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("tolerance", 0.0).is_ok());
        assert!(validate_non_negative("tolerance", f64::NAN).is_err());
        assert!(validate_non_negative("tolerance", f64::INFINITY).is_err());
    }
}
