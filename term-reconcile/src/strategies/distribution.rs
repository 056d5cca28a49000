//! Column-level comparison of summary statistics.

use super::{validate_non_negative, ColumnStrategy};
use crate::core::{Evaluation, Value};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Configuration of the distribution strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Maximum relative difference of each statistic, in percent.
    pub threshold_pct: f64,
    /// Maximum two-sample Kolmogorov–Smirnov distance; not checked when unset.
    pub max_ks_distance: Option<f64>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            threshold_pct: 5.0,
            max_ks_distance: None,
        }
    }
}

/// Summary statistics of one side of a column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl ColumnStats {
    /// Computes statistics over sorted, non-empty values.
    fn from_sorted(values: &[f64]) -> Self {
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let stddev = if count > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        let median = if count % 2 == 1 {
            values[count / 2]
        } else {
            (values[count / 2 - 1] + values[count / 2]) / 2.0
        };
        Self {
            count,
            mean,
            stddev,
            min: values[0],
            max: values[count - 1],
            median,
        }
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("mean", self.mean),
            ("median", self.median),
            ("stddev", self.stddev),
            ("min", self.min),
            ("max", self.max),
        ]
    }
}

/// Compares the distribution of a numeric column between source and target.
///
/// Non-numeric and null values are ignored. A side without numeric values only
/// matches a side that has none either.
#[derive(Debug, Clone)]
pub struct DistributionStrategy {
    threshold_pct: f64,
    max_ks_distance: Option<f64>,
}

impl DistributionStrategy {
    pub fn new(config: &DistributionConfig) -> Result<Self> {
        validate_non_negative("distribution threshold_pct", config.threshold_pct)?;
        if let Some(ks) = config.max_ks_distance {
            validate_non_negative("distribution max_ks_distance", ks)?;
            if ks > 1.0 {
                return Err(ReconcileError::configuration(format!(
                    "max_ks_distance must be <= 1, got {ks}"
                )));
            }
        }
        Ok(Self {
            threshold_pct: config.threshold_pct,
            max_ks_distance: config.max_ks_distance,
        })
    }

    fn numeric_sorted(values: &[Value]) -> Vec<f64> {
        let mut out: Vec<f64> = values
            .iter()
            .filter_map(Value::as_f64)
            .filter(|v| v.is_finite())
            .collect();
        out.sort_by(f64::total_cmp);
        out
    }

    /// Computes statistics, or `None` when there are no numeric values.
    pub fn stats(values: &[Value]) -> Option<ColumnStats> {
        let sorted = Self::numeric_sorted(values);
        (!sorted.is_empty()).then(|| ColumnStats::from_sorted(&sorted))
    }

    /// Two-sample Kolmogorov–Smirnov statistic over sorted samples.
    pub fn ks_distance(a: &[f64], b: &[f64]) -> f64 {
        let (n, m) = (a.len() as f64, b.len() as f64);
        let (mut i, mut j) = (0, 0);
        let mut distance: f64 = 0.0;
        while i < a.len() && j < b.len() {
            let x = a[i].min(b[j]);
            while i < a.len() && a[i] <= x {
                i += 1;
            }
            while j < b.len() && b[j] <= x {
                j += 1;
            }
            distance = distance.max((i as f64 / n - j as f64 / m).abs());
        }
        distance
    }

    /// Relative difference in percent; `None` when the source statistic is zero
    /// and the difference cannot be scaled, in which case it is not checked.
    fn pct_difference(source: f64, target: f64) -> Option<f64> {
        if source == target {
            Some(0.0)
        } else if source == 0.0 {
            None
        } else {
            Some((source - target).abs() / source.abs() * 100.0)
        }
    }
}

impl ColumnStrategy for DistributionStrategy {
    fn name(&self) -> &str {
        "distribution"
    }

    fn evaluate_column(&self, source: &[Value], target: &[Value]) -> Evaluation {
        let s_sorted = Self::numeric_sorted(source);
        let t_sorted = Self::numeric_sorted(target);

        match (s_sorted.is_empty(), t_sorted.is_empty()) {
            (true, true) => return Evaluation::matched("no numeric values on either side"),
            (true, false) | (false, true) => {
                return Evaluation::mismatch(format!(
                    "numeric values: source {}, target {}",
                    s_sorted.len(),
                    t_sorted.len()
                ))
            }
            (false, false) => {}
        }

        let s = ColumnStats::from_sorted(&s_sorted);
        let t = ColumnStats::from_sorted(&t_sorted);

        let mut failures = String::new();
        for ((name, sv), (_, tv)) in s.named().into_iter().zip(t.named()) {
            let Some(pct) = Self::pct_difference(sv, tv) else {
                continue;
            };
            if pct > self.threshold_pct {
                let _ = write!(failures, "{name} {sv} vs {tv} ({pct:.2}%); ");
            }
        }

        let ks = Self::ks_distance(&s_sorted, &t_sorted);
        if let Some(max_ks) = self.max_ks_distance {
            if ks > max_ks {
                let _ = write!(failures, "ks distance {ks:.4} > {max_ks}; ");
            }
        }

        if failures.is_empty() {
            Evaluation::matched(format!(
                "mean {:.4} vs {:.4}, stddev {:.4} vs {:.4}, ks {ks:.4}",
                s.mean, t.mean, s.stddev, t.stddev
            ))
        } else {
            Evaluation::mismatch(format!(
                "exceeds {}%: {}",
                self.threshold_pct,
                failures.trim_end_matches("; ")
            ))
        }
    }
}
