//! # Term Reconcile - Result Set Reconciliation for Rust
//!
//! Term Reconcile compares the result sets of two independently queried data
//! sources, a *source* and a *target*, and reports where they diverge. What
//! counts as "equal enough" is configured per column: exact, numeric within a
//! tolerance, categorical, temporal, null pattern, statistical or regex based.
//!
//! Neither result set is ever loaded in full. Both are read in lock-step
//! batches, rows are aligned by key (or position) and every aligned pair is
//! turned into verdicts that stream into a [`Report`](core::Report).
//!
//! ## Quick Start
//!
//! ```rust
//! use term_reconcile::prelude::*;
//! use term_reconcile::core::{Row, Value};
//! use term_reconcile::sources::MemorySource;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let source = MemorySource::new().with_table(
//!     "payments",
//!     vec![
//!         Row::from_pairs([("id", Value::Int(1)), ("amt", Value::Float(10.0000001))]),
//!         Row::from_pairs([("id", Value::Int(2)), ("amt", Value::Float(5.0))]),
//!     ],
//! );
//! let target = MemorySource::new().with_table(
//!     "payments",
//!     vec![
//!         Row::from_pairs([("id", Value::Int(1)), ("amt", Value::Float(10.0000002))]),
//!         Row::from_pairs([("id", Value::Int(2)), ("amt", Value::Float(5.5))]),
//!     ],
//! );
//!
//! let config = ReconcileConfig::builder("payments")
//!     .tolerance(1e-6)
//!     .key_columns(["id"])
//!     .default_strategy(StrategySpec::numeric())
//!     .build()?;
//!
//! let report = ValidationEngine::new(config)?
//!     .run(&source, "payments", &target, "payments")
//!     .await?;
//!
//! assert_eq!(report.counters().rows_matched, 1);
//! assert_eq!(report.counters().rows_mismatched, 1);
//! assert_eq!(report.counters().missing_rows(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! ### Comparison strategies
//!
//! - **Numeric**: absolute or relative tolerance
//! - **Categorical**: case folding, trimming, value mappings and allowed sets
//! - **DateTime**: instants compared within a duration, optionally zone-strict
//! - **Null**: agreement of nullness, with configurable null tokens
//! - **Pattern**: named regular expressions such as `email` or `uuid`
//! - **Distribution**: per-batch summary statistics and KS distance
//! - **Composite**: any of the above combined with `all` or `any`
//!
//! ### Bounded memory
//!
//! Batches default to 25,000 rows. With keyed alignment, rows that find no
//! counterpart in their batch are carried forward, so the final counters do
//! not depend on the batch size.
//!
//! ### Row sources
//!
//! - In-memory tables
//! - SQL over a DataFusion `SessionContext` (CSV, Parquet, registered batches, ...)
//! - PostgreSQL through `datafusion-table-providers` (feature `postgres`)
//!
//! ## Architecture
//!
//! - **`core`**: data model, paginator, aligner, engine and report
//! - **`strategies`**: comparison strategies and their serializable specs
//! - **`sources`**: row source backends
//! - **`config`**: run configuration, loadable from JSON or the environment
//! - **`formatters`**: JSON, CSV and console output
//! - **`logging`**: `tracing` setup and logging switches

pub mod config;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod security;
pub mod sources;
pub mod strategies;
