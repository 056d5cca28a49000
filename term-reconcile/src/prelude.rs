//! Prelude for commonly used types and traits in term-reconcile.

pub use crate::config::ReconcileConfig;
pub use crate::core::{Report, ValidationEngine, Verdict};
pub use crate::error::{ErrorContext, ReconcileError, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::sources::{RowCursor, RowSource};
pub use crate::strategies::StrategySpec;
