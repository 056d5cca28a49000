//! Temporal comparison.

use super::ValidationStrategy;
use crate::core::{Anomaly, Evaluation, Value};
use crate::prelude::*;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Configuration of the date-time strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateTimeConfig {
    /// Reject naive timestamps; the run's setting when unset.
    pub timezone_aware: Option<bool>,
    /// Maximum allowed distance between the two instants.
    pub tolerance: Duration,
}

impl DateTimeConfig {
    /// Comparison within `secs` seconds.
    pub fn within_secs(secs: u64) -> Self {
        Self {
            tolerance: Duration::from_secs(secs),
            ..Self::default()
        }
    }

    pub fn timezone_aware(mut self, aware: bool) -> Self {
        self.timezone_aware = Some(aware);
        self
    }
}

/// A parsed temporal value.
enum Instant {
    Zoned(DateTime<Utc>),
    Naive(NaiveDateTime),
}

/// Compares two instants within a tolerance.
#[derive(Debug, Clone)]
pub struct DateTimeStrategy {
    timezone_aware: bool,
    tolerance: chrono::Duration,
}

impl DateTimeStrategy {
    pub fn new(config: &DateTimeConfig, default_timezone_aware: bool) -> Result<Self> {
        let tolerance = chrono::Duration::from_std(config.tolerance).map_err(|e| {
            ReconcileError::configuration(format!("date-time tolerance out of range: {e}"))
        })?;
        Ok(Self {
            timezone_aware: config.timezone_aware.unwrap_or(default_timezone_aware),
            tolerance,
        })
    }

    fn parse(value: &Value) -> Option<Instant> {
        match value {
            Value::Timestamp(ts) => Some(Instant::Zoned(ts.with_timezone(&Utc))),
            Value::NaiveTimestamp(ts) => Some(Instant::Naive(*ts)),
            Value::Text(s) => {
                let s = s.trim();
                if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                    return Some(Instant::Zoned(ts.with_timezone(&Utc)));
                }
                NAIVE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                    .map(Instant::Naive)
            }
            _ => None,
        }
    }

    /// Normalizes an instant to UTC, rejecting naive values when zones are required.
    fn normalize(&self, instant: Instant) -> std::result::Result<DateTime<Utc>, NaiveDateTime> {
        match instant {
            Instant::Zoned(ts) => Ok(ts),
            Instant::Naive(ts) if self.timezone_aware => Err(ts),
            Instant::Naive(ts) => Ok(ts.and_utc()),
        }
    }
}

impl ValidationStrategy for DateTimeStrategy {
    fn name(&self) -> &str {
        "date_time"
    }

    fn evaluate(&self, source: &Value, target: &Value) -> Evaluation {
        if source.is_null() && target.is_null() {
            return Evaluation::matched("both null");
        }
        if source.is_null() || target.is_null() {
            return Evaluation::mismatch("null vs timestamp");
        }

        let (s, t) = match (Self::parse(source), Self::parse(target)) {
            (Some(s), Some(t)) => (s, t),
            _ => {
                return Evaluation::anomaly(
                    Anomaly::TypeMismatch,
                    format!(
                        "type error: cannot read {} / {} as timestamps",
                        source.type_name(),
                        target.type_name()
                    ),
                )
            }
        };

        let (s, t) = match (self.normalize(s), self.normalize(t)) {
            (Ok(s), Ok(t)) => (s, t),
            (Err(naive), _) | (_, Err(naive)) => {
                return Evaluation::anomaly(
                    Anomaly::NaiveTimestamp,
                    format!("naive timestamp {naive} rejected: zone-aware comparison required"),
                )
            }
        };

        let delta = if s >= t { s - t } else { t - s };
        let detail = format!(
            "difference {:.3}s, tolerance {:.3}s",
            delta.num_milliseconds() as f64 / 1000.0,
            self.tolerance.num_milliseconds() as f64 / 1000.0
        );
        Evaluation::from_bool(delta <= self.tolerance, detail)
    }
}
