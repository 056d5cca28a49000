//! Tolerance-based numeric comparison.

use super::{validate_non_negative, ValidationStrategy};
use crate::core::{Anomaly, Evaluation, Value};
use crate::prelude::*;
use serde::{Deserialize, Serialize};

/// How the difference between two numbers is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericMode {
    /// `|s - t| <= tolerance`
    #[default]
    Absolute,
    /// `|s - t| / max(|s|, |t|, epsilon) <= tolerance`
    Relative,
}

/// Configuration of the numeric strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericConfig {
    /// Allowed difference; the run's default tolerance when unset.
    pub tolerance: Option<f64>,
    pub mode: NumericMode,
    /// Lower bound of the relative-mode denominator.
    pub epsilon: f64,
}

impl Default for NumericConfig {
    fn default() -> Self {
        Self {
            tolerance: None,
            mode: NumericMode::Absolute,
            epsilon: f64::EPSILON,
        }
    }
}

impl NumericConfig {
    /// Absolute comparison within `tolerance`.
    pub fn absolute(tolerance: f64) -> Self {
        Self {
            tolerance: Some(tolerance),
            ..Self::default()
        }
    }

    /// Relative comparison within `tolerance` (a fraction, e.g. `0.01` for 1%).
    pub fn relative(tolerance: f64) -> Self {
        Self {
            tolerance: Some(tolerance),
            mode: NumericMode::Relative,
            ..Self::default()
        }
    }
}

/// Compares numbers within a tolerance.
///
/// Identical values always match, including infinities and NaN, so the
/// strategy is reflexive; the difference is symmetric in its arguments.
#[derive(Debug, Clone)]
pub struct NumericStrategy {
    tolerance: f64,
    mode: NumericMode,
    epsilon: f64,
}

impl NumericStrategy {
    pub fn new(config: &NumericConfig, default_tolerance: f64) -> Result<Self> {
        let tolerance = config.tolerance.unwrap_or(default_tolerance);
        validate_non_negative("numeric tolerance", tolerance)?;
        if !(config.epsilon.is_finite() && config.epsilon > 0.0) {
            return Err(ReconcileError::configuration(format!(
                "numeric epsilon must be a finite number > 0, got {}",
                config.epsilon
            )));
        }
        Ok(Self {
            tolerance,
            mode: config.mode,
            epsilon: config.epsilon,
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Scales an absolute difference according to the mode and checks it.
    fn judge(&self, abs_diff: f64, s: f64, t: f64) -> Evaluation {
        let diff = match self.mode {
            NumericMode::Absolute => abs_diff,
            NumericMode::Relative => abs_diff / s.abs().max(t.abs()).max(self.epsilon),
        };
        let detail = format!(
            "difference {diff:e} {} tolerance {:e}",
            if diff <= self.tolerance { "within" } else { "exceeds" },
            self.tolerance
        );
        Evaluation::from_bool(diff <= self.tolerance, detail)
    }
}

impl ValidationStrategy for NumericStrategy {
    fn name(&self) -> &str {
        "numeric"
    }

    fn evaluate(&self, source: &Value, target: &Value) -> Evaluation {
        match (source, target) {
            (Value::Null, Value::Null) => Evaluation::matched("both null"),
            (Value::Null, other) | (other, Value::Null) => {
                Evaluation::mismatch(format!("null vs {other}"))
            }
            (Value::Int(s), Value::Int(t)) if s == t => Evaluation::matched("equal"),
            (Value::Int(s), Value::Int(t)) => {
                // exact in i128; casting to f64 first loses precision above 2^53
                let diff = (i128::from(*s) - i128::from(*t)).unsigned_abs();
                self.judge(diff as f64, *s as f64, *t as f64)
            }
            _ => match (source.as_f64(), target.as_f64()) {
                (Some(s), Some(t)) => {
                    if s == t || (s.is_nan() && t.is_nan()) {
                        return Evaluation::matched("equal");
                    }
                    self.judge((s - t).abs(), s, t)
                }
                _ => Evaluation::anomaly(
                    Anomaly::TypeMismatch,
                    format!(
                        "type error: cannot compare {} with {} numerically",
                        source.type_name(),
                        target.type_name()
                    ),
                ),
            },
        }
    }
}
