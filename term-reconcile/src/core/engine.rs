//! The reconciliation engine.
//!
//! [`ValidationEngine`] drives a [`BatchPaginator`] over two row sources,
//! aligns each batch pair with a [`RowAligner`], applies the configured
//! strategy to every compared column and streams the outcome into a
//! [`ReportAccumulator`].
//!
//! ```text
//! Idle ─► Fetching ─► Aligning ─► Evaluating ─┐
//!            ▲                                │
//!            └────────────────────────────────┘
//!                 (exhausted) ─► Finalizing ─► Done
//!
//!  any state ─► Failed (source cannot be opened or read)
//! ```
//!
//! A failing comparison is never an error. Only a source that cannot be
//! opened or read ends the run early, and even then a [`Report`] marked
//! [`ReportStatus::Incomplete`] is returned.

use super::aligner::{AlignedPair, RowAligner};
use super::paginator::{BatchPair, BatchPaginator};
use super::report::{Finding, Report, ReportAccumulator, ReportStatus};
use super::result::{ResultScope, Side, ValidationResult, Verdict};
use super::value::{Row, RowId, Value};
use crate::config::ReconcileConfig;
use crate::logging::truncate_field;
use crate::prelude::*;
use crate::sources::{RowCursor, RowSource};
use crate::strategies::{ColumnStrategy, Strategy, ValidationStrategy};
use crate::{log_data_op, log_pair, perf_debug};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Strategy name recorded on results that describe row presence rather than values.
pub const ALIGNMENT_STRATEGY: &str = "alignment";

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Idle,
    Fetching,
    Aligning,
    Evaluating,
    Finalizing,
    Done,
    Failed,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Fetching => "fetching",
            EngineState::Aligning => "aligning",
            EngineState::Evaluating => "evaluating",
            EngineState::Finalizing => "finalizing",
            EngineState::Done => "done",
            EngineState::Failed => "failed",
        }
    }

    /// Returns true for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Done | EngineState::Failed)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column compared value by value.
#[derive(Debug)]
struct RowCheck {
    column: String,
    strategy: Arc<dyn ValidationStrategy>,
}

/// A column compared batch by batch.
#[derive(Debug)]
struct ColumnCheck {
    column: String,
    strategy: Arc<dyn ColumnStrategy>,
}

/// What to compare in one run, resolved against the columns of both cursors.
#[derive(Debug, Default)]
struct ComparisonPlan {
    rows: Vec<RowCheck>,
    columns: Vec<ColumnCheck>,
}

/// Compares the result sets of two row sources.
///
/// # Examples
///
/// ```rust
/// use term_reconcile::config::ReconcileConfig;
/// use term_reconcile::core::{Row, ValidationEngine, Value};
/// use term_reconcile::sources::MemorySource;
/// use term_reconcile::strategies::StrategySpec;
///
/// # #[tokio::main]
/// # async fn main() -> term_reconcile::prelude::Result<()> {
/// let source = MemorySource::new().with_table(
///     "orders",
///     vec![Row::from_pairs([("id", Value::Int(1)), ("amount", Value::Float(10.0))])],
/// );
/// let target = MemorySource::new().with_table(
///     "orders",
///     vec![Row::from_pairs([("id", Value::Int(1)), ("amount", Value::Float(10.0))])],
/// );
///
/// let config = ReconcileConfig::builder("orders")
///     .key_columns(["id"])
///     .default_strategy(StrategySpec::numeric())
///     .build()?;
/// let engine = ValidationEngine::new(config)?;
/// let report = engine.run(&source, "orders", &target, "orders").await?;
/// assert!(report.passed());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ValidationEngine {
    config: ReconcileConfig,
    assignments: Vec<(String, Strategy)>,
    default_strategy: Option<Strategy>,
    state: watch::Sender<EngineState>,
}

impl ValidationEngine {
    /// Validates the configuration and builds every strategy.
    ///
    /// All configuration errors surface here, before any source is touched.
    pub fn new(config: ReconcileConfig) -> Result<Self> {
        config.validate()?;
        let ctx = config.build_context();

        let assignments = config
            .columns
            .iter()
            .map(|a| Ok((a.column.clone(), a.strategy.build(&ctx)?)))
            .collect::<Result<Vec<_>>>()?;
        let default_strategy = config
            .default_strategy
            .as_ref()
            .map(|spec| spec.build(&ctx))
            .transpose()?;

        let (state, _) = watch::channel(EngineState::Idle);
        Ok(Self {
            config,
            assignments,
            default_strategy,
            state,
        })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    fn transition(&self, next: EngineState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(engine.state = %next, engine.previous = %previous, "Engine state transition");
        }
    }

    /// Runs a reconciliation to completion.
    pub async fn run(
        &self,
        source: &dyn RowSource,
        source_query: &str,
        target: &dyn RowSource,
        target_query: &str,
    ) -> Result<Report> {
        self.run_inner(source, source_query, target, target_query, None)
            .await
    }

    /// Runs a reconciliation that stops at the next batch boundary once
    /// `cancel` holds `true`. The returned report is marked
    /// [`ReportStatus::Cancelled`].
    pub async fn run_with_cancel(
        &self,
        source: &dyn RowSource,
        source_query: &str,
        target: &dyn RowSource,
        target_query: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<Report> {
        self.run_inner(source, source_query, target, target_query, Some(cancel))
            .await
    }

    #[instrument(skip_all, fields(
        run.name = %self.config.name,
        run.batch_size = self.config.batch_size,
        source = %source.description(),
        target = %target.description()
    ))]
    async fn run_inner(
        &self,
        source: &dyn RowSource,
        source_query: &str,
        target: &dyn RowSource,
        target_query: &str,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<Report> {
        info!(run.name = %self.config.name, "Starting reconciliation");
        self.transition(EngineState::Idle);
        let mut report = ReportAccumulator::new(&self.config.name);

        self.transition(EngineState::Fetching);
        let mut paginator = match self
            .open_cursors(source, source_query, target, target_query)
            .await
        {
            Ok(paginator) => paginator,
            Err(e) => {
                warn!(error = %e, "Could not open row sources");
                self.transition(EngineState::Failed);
                return Ok(report.finish(ReportStatus::Incomplete {
                    reason: e.to_string(),
                }));
            }
        };

        let plan = match self.plan(paginator.source_columns(), paginator.target_columns()) {
            Ok(plan) => plan,
            Err(e) => {
                self.close(&mut paginator).await;
                self.transition(EngineState::Failed);
                return Err(e);
            }
        };
        debug!(
            plan.row_columns = plan.rows.len(),
            plan.column_checks = plan.columns.len(),
            "Resolved comparison plan"
        );

        let mut aligner = RowAligner::new(self.config.alignment.clone()).with_carry_over(true);
        let status = loop {
            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                info!(after_batches = report.batches(), "Reconciliation cancelled");
                break ReportStatus::Cancelled {
                    after_batches: report.batches(),
                };
            }

            self.transition(EngineState::Fetching);
            let batch = match paginator.next_pair().await {
                Ok(Some(batch)) => batch,
                Ok(None) => break ReportStatus::Complete,
                Err(e) => {
                    warn!(error = %e, batches = report.batches(), "Row source failed mid-run");
                    break ReportStatus::Incomplete {
                        reason: e.to_string(),
                    };
                }
            };
            log_data_op!(
                self.config.logging,
                batch.index = batch.index,
                batch.source_rows = batch.source.len(),
                batch.target_rows = batch.target.len(),
                "Fetched batch pair"
            );
            self.process_batch(batch, &plan, &mut aligner, &mut report);
        };

        self.transition(EngineState::Finalizing);
        if status == ReportStatus::Complete {
            let last_batch = report.batches().saturating_sub(1);
            let leftovers = aligner.drain();
            perf_debug!(
                self.config.logging,
                rows = leftovers.len(),
                "Reporting rows without counterpart"
            );
            for pair in leftovers {
                self.evaluate_pair(pair, last_batch, &plan, &mut report);
            }
        } else {
            let (source_pending, target_pending) = aligner.pending();
            perf_debug!(
                self.config.logging,
                source_pending,
                target_pending,
                "Discarding rows held for later batches"
            );
        }
        self.close(&mut paginator).await;

        let report = report.finish(status);
        self.transition(match report.status() {
            ReportStatus::Incomplete { .. } => EngineState::Failed,
            _ => EngineState::Done,
        });
        info!(
            run.name = %self.config.name,
            report.status = report.summary_status(),
            report.pairs = report.counters().total_pairs,
            report.matched = report.counters().rows_matched,
            report.mismatched = report.counters().rows_mismatched,
            report.missing = report.counters().missing_rows(),
            report.batches = report.batches(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    async fn open_cursors(
        &self,
        source: &dyn RowSource,
        source_query: &str,
        target: &dyn RowSource,
        target_query: &str,
    ) -> Result<BatchPaginator> {
        log_data_op!(self.config.logging, source = %source.description(), "Opening source");
        let source_cursor = source.open(source_query).await.context("opening source")?;

        log_data_op!(self.config.logging, target = %target.description(), "Opening target");
        let target_cursor = match target.open(target_query).await.context("opening target") {
            Ok(cursor) => cursor,
            Err(e) => {
                close_quietly(source_cursor, Side::Source).await;
                return Err(e);
            }
        };

        Ok(
            BatchPaginator::new(source_cursor, target_cursor, self.config.batch_size)
                .with_concurrent_fetch(self.config.concurrent_fetch)
                .with_allow_uneven_exhaustion(self.config.allow_uneven_exhaustion),
        )
    }

    async fn close(&self, paginator: &mut BatchPaginator) {
        if let Err(e) = paginator.close().await {
            warn!(error = %e, "Failed to close row source cursor");
        }
    }

    /// Resolves which strategy applies to which column.
    ///
    /// Explicit assignments come first, in configuration order, followed by
    /// every other column present on both sides under the default strategy.
    /// A side reporting no columns at all has an unknown schema and is not
    /// checked.
    fn plan(&self, source_columns: &[String], target_columns: &[String]) -> Result<ComparisonPlan> {
        let require = |column: &str| -> Result<()> {
            for (side, columns) in [(Side::Source, source_columns), (Side::Target, target_columns)] {
                if !columns.is_empty() && !columns.iter().any(|c| c == column) {
                    return Err(ReconcileError::ColumnNotFound {
                        column: column.to_string(),
                        side: side.to_string(),
                    });
                }
            }
            Ok(())
        };

        for key in self.config.alignment.key_columns() {
            require(key)?;
        }

        let mut plan = ComparisonPlan::default();
        let mut taken: HashSet<&str> = self
            .config
            .alignment
            .key_columns()
            .iter()
            .map(String::as_str)
            .collect();

        for (column, strategy) in &self.assignments {
            require(column)?;
            taken.insert(column.as_str());
            plan.push(column, strategy);
        }

        if let Some(default) = &self.default_strategy {
            let candidates = if source_columns.is_empty() {
                target_columns
            } else {
                source_columns
            };
            for column in candidates {
                let shared = target_columns.is_empty() || target_columns.contains(column);
                if shared && !taken.contains(column.as_str()) {
                    plan.push(column, default);
                }
            }
        }
        Ok(plan)
    }

    fn process_batch(
        &self,
        batch: BatchPair,
        plan: &ComparisonPlan,
        aligner: &mut RowAligner,
        report: &mut ReportAccumulator,
    ) {
        let BatchPair {
            index,
            source,
            target,
            finding,
        } = batch;
        let (source_len, target_len) = (source.len(), target.len());

        if let Some(kind) = finding {
            report.record_finding(Finding { batch: index, kind });
        }

        // column checks look at the batch as fetched, before alignment
        let column_results: Vec<ValidationResult> = if source_len + target_len > 0 {
            plan.columns
                .iter()
                .map(|check| column_check(check, index, &source, &target))
                .collect()
        } else {
            Vec::new()
        };

        self.transition(EngineState::Aligning);
        let alignment = aligner.align(source, target);
        for kind in alignment.findings {
            report.record_finding(Finding { batch: index, kind });
        }

        self.transition(EngineState::Evaluating);
        for pair in alignment.pairs {
            self.evaluate_pair(pair, index, plan, report);
        }
        for result in column_results {
            if !result.is_match() {
                log_pair!(
                    self.config.logging,
                    batch = index,
                    column = result.column.as_deref().unwrap_or_default(),
                    detail = %result.detail,
                    "Column check failed"
                );
            }
            report.record_column_check(result);
        }
        report.record_batch(source_len, target_len);
        perf_debug!(
            self.config.logging,
            batch.index = index,
            pending = ?aligner.pending(),
            matched = report.counters().rows_matched,
            "Batch evaluated"
        );
    }

    fn evaluate_pair(
        &self,
        pair: AlignedPair,
        batch: u64,
        plan: &ComparisonPlan,
        report: &mut ReportAccumulator,
    ) {
        let id = report.next_pair_id();
        let results = match (&pair.source, &pair.target) {
            (Some(source), Some(target)) if plan.rows.is_empty() => vec![ValidationResult {
                pair: Some(id),
                batch,
                scope: ResultScope::Row,
                row_id: pair.row_id.clone(),
                column: None,
                source_value: None,
                target_value: None,
                verdict: Verdict::Match,
                strategy: ALIGNMENT_STRATEGY.to_string(),
                detail: format!(
                    "row present on both sides ({} / {} columns)",
                    source.len(),
                    target.len()
                ),
                anomaly: None,
                children: Vec::new(),
            }],
            (Some(source), Some(target)) => plan
                .rows
                .iter()
                .map(|check| {
                    let source_value = source.get(&check.column).cloned().unwrap_or(Value::Null);
                    let target_value = target.get(&check.column).cloned().unwrap_or(Value::Null);
                    let eval = check.strategy.evaluate(&source_value, &target_value);
                    ValidationResult {
                        pair: Some(id),
                        batch,
                        scope: ResultScope::Row,
                        row_id: pair.row_id.clone(),
                        column: Some(check.column.clone()),
                        source_value: Some(source_value),
                        target_value: Some(target_value),
                        verdict: eval.verdict,
                        strategy: check.strategy.name().to_string(),
                        detail: eval.detail,
                        anomaly: eval.anomaly,
                        children: eval.children,
                    }
                })
                .collect(),
            _ => vec![missing_result(id, batch, &pair)],
        };

        if self.config.logging.log_pair_details {
            let max = self.config.logging.max_field_length;
            for result in results.iter().filter(|r| !r.is_match()) {
                log_pair!(
                    self.config.logging,
                    pair = id,
                    row = %result.row_id,
                    column = result.column.as_deref().unwrap_or_default(),
                    verdict = %result.verdict,
                    source_value = %display_value(result.source_value.as_ref(), max),
                    target_value = %display_value(result.target_value.as_ref(), max),
                    detail = %truncate_field(&result.detail, max),
                    "Pair diverged"
                );
            }
        }
        report.record_pair(results);
    }
}

fn missing_result(id: u64, batch: u64, pair: &AlignedPair) -> ValidationResult {
    let (verdict, side) = match pair.missing_verdict() {
        Some(Verdict::MissingSource) => (Verdict::MissingSource, Side::Target),
        _ => (Verdict::MissingTarget, Side::Source),
    };
    let detail = match pair.anomaly {
        Some(anomaly) => format!("row present in {side} only ({anomaly})"),
        None => format!("row present in {side} only"),
    };
    ValidationResult {
        pair: Some(id),
        batch,
        scope: ResultScope::Row,
        row_id: pair.row_id.clone(),
        column: None,
        source_value: None,
        target_value: None,
        verdict,
        strategy: ALIGNMENT_STRATEGY.to_string(),
        detail,
        anomaly: pair.anomaly,
        children: Vec::new(),
    }
}

fn column_check(
    check: &ColumnCheck,
    batch: u64,
    source: &[Row],
    target: &[Row],
) -> ValidationResult {
    let values = |rows: &[Row]| -> Vec<Value> {
        rows.iter()
            .map(|row| row.get(&check.column).cloned().unwrap_or(Value::Null))
            .collect()
    };
    let eval = check
        .strategy
        .evaluate_column(&values(source), &values(target));
    ValidationResult {
        pair: None,
        batch,
        scope: ResultScope::Column,
        row_id: RowId::Batch(batch),
        column: Some(check.column.clone()),
        source_value: None,
        target_value: None,
        verdict: eval.verdict,
        strategy: check.strategy.name().to_string(),
        detail: eval.detail,
        anomaly: eval.anomaly,
        children: eval.children,
    }
}

fn display_value(value: Option<&Value>, max: usize) -> String {
    match value {
        Some(value) => truncate_field(&value.to_string(), max),
        None => "-".to_string(),
    }
}

async fn close_quietly(mut cursor: Box<dyn RowCursor>, side: Side) {
    if let Err(e) = cursor.close().await {
        warn!(error = %e, %side, "Failed to close cursor");
    }
}

impl ComparisonPlan {
    fn push(&mut self, column: &str, strategy: &Strategy) {
        match strategy {
            Strategy::Row(s) => self.rows.push(RowCheck {
                column: column.to_string(),
                strategy: Arc::clone(s),
            }),
            Strategy::Column(s) => self.columns.push(ColumnCheck {
                column: column.to_string(),
                strategy: Arc::clone(s),
            }),
        }
    }
}
