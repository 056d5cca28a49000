//! Row and value types shared by every row source and strategy.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A single cell value produced by a row source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// An instant with a known offset.
    Timestamp(DateTime<FixedOffset>),
    /// A wall-clock time with no zone information.
    NaiveTimestamp(NaiveDateTime),
}

impl Value {
    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the numeric value if this is an integer or a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string slice if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::NaiveTimestamp(_) => "naive timestamp",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::NaiveTimestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One row of a result set.
///
/// Column names are shared between all rows of a batch; values are stored in
/// the same order as the names.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from a shared column list and its values.
    ///
    /// Missing trailing values are treated as absent columns.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Convenience constructor from `(name, value)` pairs.
    pub fn from_pairs<I, S, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        let (names, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .unzip();
        Self {
            columns: names.into(),
            values,
        }
    }

    /// Returns the value of a column, or `None` if the row has no such column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Iterates `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Number of values in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row carries no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One component of an [`AlignmentKey`].
///
/// Floats with an integral value are normalized to integers so that an
/// `INTEGER` key on one side aligns with a `DOUBLE` key on the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum KeyPart {
    Bool(bool),
    Int(i64),
    /// Bit pattern of a non-integral float.
    Float(u64),
    Text(String),
    /// Microseconds since the epoch, UTC.
    Instant(i64),
    /// Microseconds since the epoch of a naive wall-clock time.
    Naive(i64),
}

impl KeyPart {
    /// Builds a key part from a value. Returns `None` for nulls, which cannot
    /// take part in alignment.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(v) => Some(KeyPart::Bool(*v)),
            Value::Int(v) => Some(KeyPart::Int(*v)),
            Value::Float(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    Some(KeyPart::Int(*v as i64))
                } else if v.is_nan() {
                    Some(KeyPart::Float(f64::NAN.to_bits()))
                } else {
                    Some(KeyPart::Float(v.to_bits()))
                }
            }
            Value::Text(v) => Some(KeyPart::Text(v.clone())),
            Value::Timestamp(v) => Some(KeyPart::Instant(v.timestamp_micros())),
            Value::NaiveTimestamp(v) => Some(KeyPart::Naive(v.and_utc().timestamp_micros())),
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Bool(v) => write!(f, "{v}"),
            KeyPart::Int(v) => write!(f, "{v}"),
            KeyPart::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            KeyPart::Text(v) => write!(f, "{v}"),
            KeyPart::Instant(micros) | KeyPart::Naive(micros) => {
                match DateTime::from_timestamp_micros(*micros) {
                    Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
                    None => write!(f, "{micros}"),
                }
            }
        }
    }
}

/// An ordered tuple of key column values identifying a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlignmentKey(pub Vec<KeyPart>);

impl AlignmentKey {
    /// Extracts the key of `row` for the given key columns.
    ///
    /// Returns `None` when any key column is absent from the row or null.
    pub fn extract(row: &Row, columns: &[String]) -> Option<Self> {
        columns
            .iter()
            .map(|column| row.get(column).and_then(KeyPart::from_value))
            .collect::<Option<Vec<_>>>()
            .map(AlignmentKey)
    }

    /// Key components in column order.
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }
}

impl fmt::Display for AlignmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Identifies the row (or batch) a result refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RowId {
    /// Row matched by its alignment key.
    Key(AlignmentKey),
    /// Row matched by its ordinal position in the result set.
    Ordinal(u64),
    /// Row that could not be keyed; ordinal within its own side's result set.
    Unkeyed(u64),
    /// Column-level result attached to a whole batch.
    Batch(u64),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Key(key) => write!(f, "{key}"),
            RowId::Ordinal(n) => write!(f, "#{n}"),
            RowId::Unkeyed(n) => write!(f, "unkeyed#{n}"),
            RowId::Batch(n) => write!(f, "batch#{n}"),
        }
    }
}
