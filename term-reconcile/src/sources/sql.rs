//! SQL queries over a DataFusion session.

use super::{FetchedBatch, RowCursor, RowSource};
use crate::core::{Row, Value};
use crate::prelude::*;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use datafusion::arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Date64Array, Decimal128Array, Float32Array,
    Float64Array, Int16Array, Int32Array, Int64Array, Int8Array, LargeStringArray, StringArray,
    StringViewArray, TimestampMicrosecondArray, TimestampMillisecondArray,
    TimestampNanosecondArray, TimestampSecondArray, UInt16Array, UInt32Array, UInt64Array,
    UInt8Array,
};
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::display::{ArrayFormatter, FormatOptions};
use datafusion::execution::SendableRecordBatchStream;
use datafusion::prelude::SessionContext;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, instrument};

const SOURCE_TYPE: &str = "sql";

/// Runs SQL against a DataFusion [`SessionContext`] and streams the result.
///
/// Arrow record batches are converted into [`Row`]s and re-sliced to the
/// requested batch size. The cursor reads one row ahead, so exhaustion is
/// reported on the fetch that returns the last rows.
///
/// # Examples
///
/// ```rust,no_run
/// use datafusion::prelude::SessionContext;
/// use term_reconcile::sources::{RowSource, SqlSource};
///
/// # async fn example() -> term_reconcile::prelude::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.sql("CREATE TABLE t AS VALUES (1, 'a'), (2, 'b')").await?;
/// let source = SqlSource::new(ctx);
/// let mut cursor = source.open("SELECT * FROM t ORDER BY column1").await?;
/// let batch = cursor.fetch_batch(10).await?;
/// assert_eq!(batch.rows.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqlSource {
    ctx: SessionContext,
    label: String,
}

impl std::fmt::Debug for SqlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSource")
            .field("label", &self.label)
            .field("session_id", &self.ctx.session_id())
            .finish()
    }
}

impl SqlSource {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            label: "datafusion".to_string(),
        }
    }

    /// Sets the label used in descriptions and error messages.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The session queries run against.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Registers an in-memory record batch as a table.
    pub fn register_batch(&self, name: &str, batch: RecordBatch) -> Result<()> {
        self.ctx.register_batch(name, batch)?;
        Ok(())
    }
}

#[async_trait]
impl RowSource for SqlSource {
    #[instrument(skip(self), fields(source = %self.label))]
    async fn open(&self, query: &str) -> Result<Box<dyn RowCursor>> {
        let df = self.ctx.sql(query).await.map_err(|e| {
            ReconcileError::data_source_with_source(
                SOURCE_TYPE,
                format!("{}: failed to plan query", self.label),
                Box::new(e),
            )
        })?;
        let columns: Arc<[String]> = df
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect::<Vec<_>>()
            .into();
        let stream = df.execute_stream().await.map_err(|e| {
            ReconcileError::data_source_with_source(
                SOURCE_TYPE,
                format!("{}: failed to execute query", self.label),
                Box::new(e),
            )
        })?;
        debug!(columns = columns.len(), "Opened SQL cursor");

        Ok(Box::new(SqlCursor {
            label: self.label.clone(),
            columns,
            stream: Some(stream),
            buffer: VecDeque::new(),
        }))
    }

    fn description(&self) -> String {
        format!("SQL source '{}'", self.label)
    }
}

/// Cursor over a DataFusion record batch stream.
struct SqlCursor {
    label: String,
    columns: Arc<[String]>,
    /// `None` once the stream is finished or the cursor is closed.
    stream: Option<SendableRecordBatchStream>,
    buffer: VecDeque<Row>,
}

impl SqlCursor {
    /// Pulls record batches until more than `size` rows are buffered or the stream ends.
    async fn fill(&mut self, size: usize) -> Result<()> {
        while self.buffer.len() <= size {
            let Some(stream) = self.stream.as_mut() else {
                break;
            };
            match stream.next().await {
                Some(Ok(batch)) => {
                    let rows = batch_to_rows(&batch, &self.columns)?;
                    self.buffer.extend(rows);
                }
                Some(Err(e)) => {
                    return Err(ReconcileError::data_source_with_source(
                        SOURCE_TYPE,
                        format!("{}: failed to fetch record batch", self.label),
                        Box::new(e),
                    ))
                }
                None => self.stream = None,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RowCursor for SqlCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    #[instrument(skip(self), fields(source = %self.label))]
    async fn fetch_batch(&mut self, size: usize) -> Result<FetchedBatch> {
        self.fill(size).await?;
        let take = size.min(self.buffer.len());
        let rows: Vec<Row> = self.buffer.drain(..take).collect();
        let exhausted = self.stream.is_none() && self.buffer.is_empty();
        Ok(FetchedBatch::new(rows, exhausted))
    }

    async fn close(&mut self) -> Result<()> {
        self.stream = None;
        self.buffer.clear();
        Ok(())
    }
}

/// Converts every row of a record batch.
fn batch_to_rows(batch: &RecordBatch, columns: &Arc<[String]>) -> Result<Vec<Row>> {
    let mut rows = Vec::with_capacity(batch.num_rows());
    for idx in 0..batch.num_rows() {
        let values = batch
            .columns()
            .iter()
            .map(|array| value_at(array, idx))
            .collect::<Result<Vec<_>>>()?;
        rows.push(Row::new(Arc::clone(columns), values));
    }
    Ok(rows)
}

macro_rules! downcast {
    ($array:expr, $ty:ty) => {
        $array.as_any().downcast_ref::<$ty>().ok_or_else(|| {
            ReconcileError::Internal(format!(
                "array of type {} is not a {}",
                $array.data_type(),
                stringify!($ty)
            ))
        })?
    };
}

/// Converts one Arrow cell into a [`Value`].
///
/// Types without a dedicated mapping are rendered with Arrow's display
/// formatter and compared as text.
fn value_at(array: &ArrayRef, idx: usize) -> Result<Value> {
    if array.is_null(idx) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        DataType::Boolean => Value::Bool(downcast!(array, BooleanArray).value(idx)),
        DataType::Int8 => Value::Int(downcast!(array, Int8Array).value(idx).into()),
        DataType::Int16 => Value::Int(downcast!(array, Int16Array).value(idx).into()),
        DataType::Int32 => Value::Int(downcast!(array, Int32Array).value(idx).into()),
        DataType::Int64 => Value::Int(downcast!(array, Int64Array).value(idx)),
        DataType::UInt8 => Value::Int(downcast!(array, UInt8Array).value(idx).into()),
        DataType::UInt16 => Value::Int(downcast!(array, UInt16Array).value(idx).into()),
        DataType::UInt32 => Value::Int(downcast!(array, UInt32Array).value(idx).into()),
        DataType::UInt64 => {
            let v = downcast!(array, UInt64Array).value(idx);
            i64::try_from(v).map_or(Value::Float(v as f64), Value::Int)
        }
        DataType::Float32 => Value::Float(downcast!(array, Float32Array).value(idx).into()),
        DataType::Float64 => Value::Float(downcast!(array, Float64Array).value(idx)),
        DataType::Decimal128(_, scale) => {
            let raw = downcast!(array, Decimal128Array).value(idx);
            Value::Float(raw as f64 / 10f64.powi(i32::from(*scale)))
        }
        DataType::Utf8 => Value::Text(downcast!(array, StringArray).value(idx).to_string()),
        DataType::LargeUtf8 => {
            Value::Text(downcast!(array, LargeStringArray).value(idx).to_string())
        }
        DataType::Utf8View => {
            Value::Text(downcast!(array, StringViewArray).value(idx).to_string())
        }
        DataType::Date32 => {
            let days = downcast!(array, Date32Array).value(idx);
            naive(DateTime::from_timestamp(i64::from(days) * 86_400, 0), array, idx)?
        }
        DataType::Date64 => {
            let millis = downcast!(array, Date64Array).value(idx);
            naive(DateTime::from_timestamp_millis(millis), array, idx)?
        }
        DataType::Timestamp(unit, tz) => {
            let instant = match unit {
                TimeUnit::Second => {
                    DateTime::from_timestamp(downcast!(array, TimestampSecondArray).value(idx), 0)
                }
                TimeUnit::Millisecond => DateTime::from_timestamp_millis(
                    downcast!(array, TimestampMillisecondArray).value(idx),
                ),
                TimeUnit::Microsecond => DateTime::from_timestamp_micros(
                    downcast!(array, TimestampMicrosecondArray).value(idx),
                ),
                TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(
                    downcast!(array, TimestampNanosecondArray).value(idx),
                )),
            };
            match tz {
                None => naive(instant, array, idx)?,
                Some(tz) => {
                    let instant = instant.ok_or_else(|| out_of_range(array, idx))?;
                    Value::Timestamp(instant.with_timezone(&zone_offset(tz)))
                }
            }
        }
        _ => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
            Value::Text(formatter.value(idx).to_string())
        }
    };
    Ok(value)
}

fn naive(instant: Option<DateTime<Utc>>, array: &ArrayRef, idx: usize) -> Result<Value> {
    instant
        .map(|dt| Value::NaiveTimestamp(dt.naive_utc()))
        .ok_or_else(|| out_of_range(array, idx))
}

fn out_of_range(array: &ArrayRef, idx: usize) -> ReconcileError {
    ReconcileError::data_source(
        SOURCE_TYPE,
        format!("{} value at row {idx} is out of range", array.data_type()),
    )
}

/// Offset of an Arrow timezone string; named zones are read as UTC.
///
/// The instant is preserved either way; only the offset used for display differs.
fn zone_offset(tz: &str) -> FixedOffset {
    tz.parse::<FixedOffset>().unwrap_or_else(|_| Utc.fix())
}
