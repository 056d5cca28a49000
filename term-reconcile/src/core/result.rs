//! Verdicts and per-comparison results.

use super::value::{RowId, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome classification of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// The values are equal under the configured strategy.
    Match,
    /// The values differ under the configured strategy.
    Mismatch,
    /// The target has a row with no counterpart in the source.
    MissingSource,
    /// The source has a row with no counterpart in the target.
    MissingTarget,
}

impl Verdict {
    /// Returns true if this is a `Match` verdict.
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match)
    }

    /// Returns true for either missing-row verdict.
    pub fn is_missing(&self) -> bool {
        matches!(self, Verdict::MissingSource | Verdict::MissingTarget)
    }

    /// The wire name used by formatters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Match => "MATCH",
            Verdict::Mismatch => "MISMATCH",
            Verdict::MissingSource => "MISSING_SOURCE",
            Verdict::MissingTarget => "MISSING_TARGET",
        }
    }

    /// Parses a wire name back into a verdict.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MATCH" => Some(Verdict::Match),
            "MISMATCH" => Some(Verdict::Mismatch),
            "MISSING_SOURCE" => Some(Verdict::MissingSource),
            "MISSING_TARGET" => Some(Verdict::MissingTarget),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two compared result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    /// The verdict recorded for a row that exists only on this side.
    pub fn missing_verdict(&self) -> Verdict {
        match self {
            Side::Source => Verdict::MissingTarget,
            Side::Target => Verdict::MissingSource,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal anomalies recorded alongside a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    /// The values are of a type the strategy cannot compare.
    TypeMismatch,
    /// A categorical value is outside the allowed category set.
    UnknownCategory,
    /// A naive timestamp was supplied where a zoned instant is required.
    NaiveTimestamp,
    /// The row repeats an alignment key already seen in the same batch.
    DuplicateKey,
    /// The row has absent or null key columns and cannot be aligned.
    UnmatchableRow,
}

impl Anomaly {
    /// The wire name used by formatters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Anomaly::TypeMismatch => "type_mismatch",
            Anomaly::UnknownCategory => "unknown_category",
            Anomaly::NaiveTimestamp => "naive_timestamp",
            Anomaly::DuplicateKey => "duplicate_key",
            Anomaly::UnmatchableRow => "unmatchable_row",
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict of one child of a composite strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildVerdict {
    pub strategy: String,
    pub verdict: Verdict,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<Anomaly>,
}

/// What a strategy returns for one pair of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub detail: String,
    pub anomaly: Option<Anomaly>,
    pub children: Vec<ChildVerdict>,
}

impl Evaluation {
    /// A matching evaluation.
    pub fn matched(detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Match,
            detail: detail.into(),
            anomaly: None,
            children: Vec::new(),
        }
    }

    /// A mismatching evaluation.
    pub fn mismatch(detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Mismatch,
            detail: detail.into(),
            anomaly: None,
            children: Vec::new(),
        }
    }

    /// A mismatch caused by an anomaly.
    pub fn anomaly(anomaly: Anomaly, detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Mismatch,
            detail: detail.into(),
            anomaly: Some(anomaly),
            children: Vec::new(),
        }
    }

    /// Match or mismatch depending on `ok`.
    pub fn from_bool(ok: bool, detail: impl Into<String>) -> Self {
        if ok {
            Self::matched(detail)
        } else {
            Self::mismatch(detail)
        }
    }
}

/// Whether a result describes a single row or a whole batch of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultScope {
    Row,
    Column,
}

impl ResultScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultScope::Row => "row",
            ResultScope::Column => "column",
        }
    }
}

/// The immutable record of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Sequence number of the aligned pair this result belongs to.
    ///
    /// `None` for column-scope results.
    pub pair: Option<u64>,
    /// Batch in which the result was produced.
    pub batch: u64,
    pub scope: ResultScope,
    pub row_id: RowId,
    /// Compared column; `None` for missing-row results.
    pub column: Option<String>,
    pub source_value: Option<Value>,
    pub target_value: Option<Value>,
    pub verdict: Verdict,
    pub strategy: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<Anomaly>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildVerdict>,
}

impl ValidationResult {
    /// Returns true if the verdict is `Match`.
    pub fn is_match(&self) -> bool {
        self.verdict.is_match()
    }
}
