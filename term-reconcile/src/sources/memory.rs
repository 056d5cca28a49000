//! In-memory tables.

use super::{FetchedBatch, RowCursor, RowSource};
use crate::core::Row;
use crate::prelude::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A row source over named in-memory tables.
///
/// The query passed to [`RowSource::open`] is the table name. Column names are
/// taken from the first row of the table.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, Arc<[Row]>>,
    fail_after: Option<usize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.insert(name.into(), rows.into());
        self
    }

    /// Makes every cursor fail on the fetch following the first `fetches` fetches.
    ///
    /// Used to exercise source failures mid-run.
    pub fn fail_after(mut self, fetches: usize) -> Self {
        self.fail_after = Some(fetches);
        self
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[async_trait]
impl RowSource for MemorySource {
    #[instrument(skip(self))]
    async fn open(&self, query: &str) -> Result<Box<dyn RowCursor>> {
        let rows = self.tables.get(query).cloned().ok_or_else(|| {
            ReconcileError::data_source("memory", format!("unknown table '{query}'"))
        })?;
        let columns = rows
            .first()
            .map(|row| row.columns().to_vec())
            .unwrap_or_default();
        debug!(rows = rows.len(), "Opened in-memory table");
        Ok(Box::new(MemoryCursor {
            rows,
            columns,
            position: 0,
            fetches: 0,
            fail_after: self.fail_after,
            closed: false,
        }))
    }

    fn description(&self) -> String {
        format!("in-memory source with {} table(s)", self.tables.len())
    }
}

#[derive(Debug)]
struct MemoryCursor {
    rows: Arc<[Row]>,
    columns: Vec<String>,
    position: usize,
    fetches: usize,
    fail_after: Option<usize>,
    closed: bool,
}

#[async_trait]
impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn fetch_batch(&mut self, size: usize) -> Result<FetchedBatch> {
        if self.closed {
            return Err(ReconcileError::data_source("memory", "cursor is closed"));
        }
        if self.fail_after.is_some_and(|limit| self.fetches >= limit) {
            return Err(ReconcileError::data_source(
                "memory",
                format!("injected failure after {} fetches", self.fetches),
            ));
        }
        self.fetches += 1;

        let end = self.position.saturating_add(size).min(self.rows.len());
        let rows = self.rows[self.position..end].to_vec();
        self.position = end;
        Ok(FetchedBatch::new(rows, self.position >= self.rows.len()))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
