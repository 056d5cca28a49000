//! Core reconciliation types and the engine.
//!
//! ## Overview
//!
//! - **[`Value`] / [`Row`]**: the immutable data model shared by every backend
//! - **[`BatchPaginator`]**: reads two cursors in lock-step, one batch at a time
//! - **[`RowAligner`]**: pairs source and target rows by key or position
//! - **[`ValidationEngine`]**: applies strategies to aligned pairs and builds a [`Report`]
//!
//! ## Architecture
//!
//! ```text
//! RowSource (source) ─┐
//!                     ├─► BatchPaginator ─► RowAligner ─► strategies ─► ReportAccumulator ─► Report
//! RowSource (target) ─┘
//! ```
//!
//! Every aligned pair yields either one [`ValidationResult`] per compared
//! column or a single `MISSING_SOURCE` / `MISSING_TARGET` result, so the
//! verdict counts of a report always add up to the number of aligned pairs.

pub mod aligner;
pub mod engine;
pub mod paginator;
pub mod report;
pub mod result;
pub mod value;

pub use aligner::{AlignedPair, AlignmentSpec, Alignment, RowAligner};
pub use engine::{EngineState, ValidationEngine, ALIGNMENT_STRATEGY};
pub use paginator::{BatchPair, BatchPaginator};
pub use report::{
    Finding, FindingKind, Report, ReportAccumulator, ReportCounters, ReportStatus,
};
pub use result::{
    Anomaly, ChildVerdict, Evaluation, ResultScope, Side, ValidationResult, Verdict,
};
pub use value::{AlignmentKey, KeyPart, Row, RowId, Value};
