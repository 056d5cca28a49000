//! Lock-step pagination over two cursors.

use super::report::FindingKind;
use super::result::Side;
use super::value::Row;
use crate::prelude::*;
use crate::sources::RowCursor;
use tracing::{debug, instrument, warn};

/// One batch from each side.
#[derive(Debug, Clone, Default)]
pub struct BatchPair {
    /// Zero-based batch number.
    pub index: u64,
    pub source: Vec<Row>,
    pub target: Vec<Row>,
    /// Set on the batch in which the row counts of the two sides were first
    /// known to differ.
    pub finding: Option<FindingKind>,
}

impl BatchPair {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.target.is_empty()
    }
}

/// One side of the paginator.
struct PagedCursor {
    side: Side,
    cursor: Box<dyn RowCursor>,
    exhausted: bool,
    rows: u64,
    closed: bool,
}

impl PagedCursor {
    fn new(side: Side, cursor: Box<dyn RowCursor>) -> Self {
        Self {
            side,
            cursor,
            exhausted: false,
            rows: 0,
            closed: false,
        }
    }

    async fn fetch(&mut self, size: usize) -> Result<Vec<Row>> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let batch = self
            .cursor
            .fetch_batch(size)
            .await
            .with_context(|| format!("fetching {} batch", self.side))?;
        if batch.rows.len() > size {
            return Err(ReconcileError::data_source(
                self.side.as_str(),
                format!(
                    "cursor returned {} rows for a batch of {size}",
                    batch.rows.len()
                ),
            ));
        }
        self.rows += batch.rows.len() as u64;
        // an empty fetch also ends the side, whatever the cursor claims
        self.exhausted = batch.exhausted || batch.rows.is_empty();
        Ok(batch.rows)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cursor.close().await
    }
}

/// Produces successive pairs of same-sized batches from a source and a target cursor.
///
/// Pagination ends once both cursors are exhausted. A side that runs out
/// first keeps yielding empty batches so the remaining rows of the other side
/// are still reported.
pub struct BatchPaginator {
    source: PagedCursor,
    target: PagedCursor,
    batch_size: usize,
    concurrent_fetch: bool,
    allow_uneven_exhaustion: bool,
    exhaustion_reported: bool,
    next_index: u64,
}

impl std::fmt::Debug for BatchPaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPaginator")
            .field("batch_size", &self.batch_size)
            .field("next_index", &self.next_index)
            .field("source_rows", &self.source.rows)
            .field("target_rows", &self.target.rows)
            .finish()
    }
}

impl BatchPaginator {
    /// Pages over the given cursors. `batch_size` must be positive.
    pub fn new(source: Box<dyn RowCursor>, target: Box<dyn RowCursor>, batch_size: usize) -> Self {
        Self {
            source: PagedCursor::new(Side::Source, source),
            target: PagedCursor::new(Side::Target, target),
            batch_size: batch_size.max(1),
            concurrent_fetch: false,
            allow_uneven_exhaustion: false,
            exhaustion_reported: false,
            next_index: 0,
        }
    }

    /// Fetches both sides of a batch concurrently.
    pub fn with_concurrent_fetch(mut self, enabled: bool) -> Self {
        self.concurrent_fetch = enabled;
        self
    }

    /// Accepts sides of different lengths without a finding.
    pub fn with_allow_uneven_exhaustion(mut self, allow: bool) -> Self {
        self.allow_uneven_exhaustion = allow;
        self
    }

    pub fn source_columns(&self) -> &[String] {
        self.source.cursor.columns()
    }

    pub fn target_columns(&self) -> &[String] {
        self.target.cursor.columns()
    }

    /// Returns true once both sides are exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.source.exhausted && self.target.exhausted
    }

    /// Rows read so far from `(source, target)`.
    pub fn rows_read(&self) -> (u64, u64) {
        (self.source.rows, self.target.rows)
    }

    /// Fetches the next batch pair, or `None` when both sides are exhausted.
    #[instrument(skip(self), fields(batch.index = self.next_index))]
    pub async fn next_pair(&mut self) -> Result<Option<BatchPair>> {
        if self.is_exhausted() {
            return Ok(None);
        }

        let size = self.batch_size;
        let (source, target) = if self.concurrent_fetch {
            tokio::try_join!(self.source.fetch(size), self.target.fetch(size))?
        } else {
            let source = self.source.fetch(size).await?;
            let target = self.target.fetch(size).await?;
            (source, target)
        };

        let index = self.next_index;
        self.next_index += 1;
        debug!(
            batch.source_rows = source.len(),
            batch.target_rows = target.len(),
            source.exhausted = self.source.exhausted,
            target.exhausted = self.target.exhausted,
            "Fetched batch pair"
        );

        Ok(Some(BatchPair {
            index,
            source,
            target,
            finding: self.check_exhaustion(),
        }))
    }

    /// Reports, once, that one side has fewer rows than the other.
    fn check_exhaustion(&mut self) -> Option<FindingKind> {
        if self.allow_uneven_exhaustion || self.exhaustion_reported {
            return None;
        }
        let exhausted = if self.source.exhausted && self.target.rows > self.source.rows {
            Side::Source
        } else if self.target.exhausted && self.source.rows > self.target.rows {
            Side::Target
        } else {
            return None;
        };
        self.exhaustion_reported = true;
        warn!(
            side = %exhausted,
            source_rows = self.source.rows,
            target_rows = self.target.rows,
            "One side ran out of rows before the other"
        );
        Some(FindingKind::SourceExhaustionMismatch {
            exhausted,
            source_rows: self.source.rows,
            target_rows: self.target.rows,
        })
    }

    /// Closes both cursors, returning the first error.
    pub async fn close(&mut self) -> Result<()> {
        let source = self.source.close().await;
        let target = self.target.close().await;
        source.and(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::sources::{MemorySource, RowSource};

    fn rows(n: i64) -> Vec<Row> {
        (0..n)
            .map(|i| Row::from_pairs([("id", Value::Int(i))]))
            .collect()
    }

    async fn paginator(source: i64, target: i64, size: usize) -> BatchPaginator {
        let mem = MemorySource::new()
            .with_table("s", rows(source))
            .with_table("t", rows(target));
        BatchPaginator::new(
            mem.open("s").await.unwrap(),
            mem.open("t").await.unwrap(),
            size,
        )
    }

    async fn drain(mut p: BatchPaginator) -> Vec<BatchPair> {
        let mut out = Vec::new();
        while let Some(pair) = p.next_pair().await.unwrap() {
            out.push(pair);
        }
        p.close().await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_even_sources() {
        let pairs = drain(paginator(5, 5, 2).await).await;
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2].source.len(), 1);
        assert!(pairs.iter().all(|p| p.finding.is_none()));
        assert_eq!(pairs[2].index, 2);
    }

    #[tokio::test]
    async fn test_uneven_sources_report_once() {
        let pairs = drain(paginator(2, 5, 2).await).await;
        assert_eq!(pairs.len(), 3);
        assert!(pairs[2].source.is_empty());
        assert_eq!(pairs[2].target.len(), 1);

        let findings: Vec<_> = pairs.iter().filter_map(|p| p.finding.clone()).collect();
        assert_eq!(findings.len(), 1);
        assert!(matches!(
            findings[0],
            FindingKind::SourceExhaustionMismatch {
                exhausted: Side::Source,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_uneven_allowed() {
        let p = paginator(3, 1, 2)
            .await
            .with_allow_uneven_exhaustion(true)
            .with_concurrent_fetch(true);
        let pairs = drain(p).await;
        assert!(pairs.iter().all(|p| p.finding.is_none()));
        let total: usize = pairs.iter().map(|p| p.source.len()).sum();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_empty_sources() {
        let mut p = paginator(0, 0, 10).await;
        let first = p.next_pair().await.unwrap().unwrap();
        assert!(first.is_empty());
        assert!(p.next_pair().await.unwrap().is_none());
        assert_eq!(p.rows_read(), (0, 0));
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let mem = MemorySource::new().with_table("s", rows(10)).fail_after(1);
        let healthy = MemorySource::new().with_table("t", rows(10));
        let mut p = BatchPaginator::new(
            mem.open("s").await.unwrap(),
            healthy.open("t").await.unwrap(),
            3,
        )
        .with_concurrent_fetch(true);
        assert!(p.next_pair().await.is_ok());
        let err = p.next_pair().await.unwrap_err();
        assert!(err.to_string().contains("fetching source batch"));
        p.close().await.unwrap();
    }
}
