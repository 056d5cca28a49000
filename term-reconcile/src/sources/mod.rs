//! Row sources: paged read access to the result set of one query.
//!
//! A [`RowSource`] opens a query and hands back a [`RowCursor`], which the
//! engine drains batch by batch. Three backends are provided:
//!
//! - [`MemorySource`]: named in-memory tables, for tests and embedding
//! - [`SqlSource`]: SQL over a DataFusion [`SessionContext`](datafusion::prelude::SessionContext)
//! - `PostgresSource` (feature `postgres`): a PostgreSQL table read through DataFusion
//!
//! # Examples
//!
//! ```rust
//! use term_reconcile::core::{Row, Value};
//! use term_reconcile::sources::{MemorySource, RowSource};
//!
//! # async fn example() -> term_reconcile::prelude::Result<()> {
//! let source = MemorySource::new().with_table(
//!     "orders",
//!     vec![Row::from_pairs([("id", Value::Int(1))])],
//! );
//! let mut cursor = source.open("orders").await?;
//! let batch = cursor.fetch_batch(100).await?;
//! assert_eq!(batch.rows.len(), 1);
//! assert!(batch.exhausted);
//! cursor.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::core::Row;
use crate::prelude::*;
use async_trait::async_trait;
use std::fmt::Debug;

mod memory;
mod sql;

#[cfg(feature = "postgres")]
mod database;

pub use memory::MemorySource;
pub use sql::SqlSource;

#[cfg(feature = "postgres")]
pub use database::{PostgresConfig, PostgresSource};

/// Rows returned by one fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedBatch {
    /// At most the requested number of rows.
    pub rows: Vec<Row>,
    /// True once the cursor has no rows left. A cursor reports exhaustion on
    /// the fetch that returns its last rows when it can tell, and otherwise on
    /// the first fetch that returns no rows.
    pub exhausted: bool,
}

impl FetchedBatch {
    pub fn new(rows: Vec<Row>, exhausted: bool) -> Self {
        Self { rows, exhausted }
    }

    /// An empty batch from an exhausted cursor.
    pub fn exhausted() -> Self {
        Self {
            rows: Vec::new(),
            exhausted: true,
        }
    }
}

/// A capability providing paged read access to query results.
#[async_trait]
pub trait RowSource: Debug + Send + Sync {
    /// Runs `query` and returns a cursor over its result set.
    async fn open(&self, query: &str) -> Result<Box<dyn RowCursor>>;

    /// Human-readable description used in logs and errors.
    fn description(&self) -> String;
}

/// An open result set, read sequentially.
#[async_trait]
pub trait RowCursor: Send {
    /// Stable column list of the result set.
    fn columns(&self) -> &[String];

    /// Fetches up to `size` rows.
    ///
    /// Once a cursor has reported exhaustion every further call returns an
    /// empty, exhausted batch.
    async fn fetch_batch(&mut self, size: usize) -> Result<FetchedBatch>;

    /// Releases the cursor. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}
