//! The reconciliation report and its aggregate counters.
//!
//! A [`Report`] is produced by a [`ReportAccumulator`] which the engine feeds
//! one aligned pair at a time. Once [`ReportAccumulator::finish`] is called the
//! counters are frozen: `Report` exposes no mutators.

use super::result::{Side, ValidationResult, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate counters of a reconciliation run.
///
/// Counters only depend on the aligned pairs and their results, never on the
/// batch size used to produce them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounters {
    /// Number of aligned pairs (rows compared, including missing rows).
    pub total_pairs: u64,
    /// Pairs present on both sides with every column matching.
    pub rows_matched: u64,
    /// Pairs present on both sides with at least one non-matching column.
    pub rows_mismatched: u64,
    /// Rows present in the target only.
    pub missing_source: u64,
    /// Rows present in the source only.
    pub missing_target: u64,
    /// Row-level results carrying an anomaly.
    pub anomalies: u64,
    /// Row-level mismatches per column.
    pub column_mismatches: BTreeMap<String, u64>,
    /// Failed column-level (batch) checks per column.
    pub column_checks_failed: BTreeMap<String, u64>,
}

impl ReportCounters {
    /// Folds the results of one aligned pair into the counters.
    pub fn add_pair(&mut self, results: &[ValidationResult]) {
        self.total_pairs += 1;

        if results.iter().any(|r| r.verdict == Verdict::MissingSource) {
            self.missing_source += 1;
        } else if results.iter().any(|r| r.verdict == Verdict::MissingTarget) {
            self.missing_target += 1;
        } else if results.iter().all(ValidationResult::is_match) {
            self.rows_matched += 1;
        } else {
            self.rows_mismatched += 1;
        }

        for result in results {
            if result.anomaly.is_some() {
                self.anomalies += 1;
            }
            if result.verdict == Verdict::Mismatch {
                if let Some(column) = &result.column {
                    *self.column_mismatches.entry(column.clone()).or_default() += 1;
                }
            }
        }
    }

    /// Folds one column-level result into the counters.
    pub fn add_column_check(&mut self, result: &ValidationResult) {
        if result.verdict != Verdict::Match {
            let column = result.column.clone().unwrap_or_default();
            *self.column_checks_failed.entry(column).or_default() += 1;
        }
    }

    /// Recomputes counters from a flat sequence of results.
    ///
    /// Row-level results are grouped by their pair sequence number; results
    /// of one pair must be contiguous, as they are in every report.
    pub fn tally<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ValidationResult>,
    {
        let mut counters = Self::default();
        let mut current: Vec<ValidationResult> = Vec::new();

        for result in results {
            match result.pair {
                None => counters.add_column_check(result),
                Some(pair) => {
                    if current.first().is_some_and(|r| r.pair != Some(pair)) {
                        counters.add_pair(&current);
                        current.clear();
                    }
                    current.push(result.clone());
                }
            }
        }
        if !current.is_empty() {
            counters.add_pair(&current);
        }
        counters
    }

    /// Total rows missing on either side.
    pub fn missing_rows(&self) -> u64 {
        self.missing_source + self.missing_target
    }

    /// Total failed column-level checks.
    pub fn failed_column_checks(&self) -> u64 {
        self.column_checks_failed.values().sum()
    }

    /// Fraction of pairs that fully matched (1.0 for an empty run).
    pub fn match_rate(&self) -> f64 {
        if self.total_pairs == 0 {
            1.0
        } else {
            self.rows_matched as f64 / self.total_pairs as f64
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReportStatus {
    /// Both sources were read to exhaustion.
    Complete,
    /// A source failed mid-run; counters reflect the batches evaluated before.
    Incomplete { reason: String },
    /// The caller cancelled the run at a batch boundary.
    Cancelled { after_batches: u64 },
}

/// Batch-level structural findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    /// One source ran out of rows strictly before the other.
    SourceExhaustionMismatch {
        exhausted: Side,
        source_rows: u64,
        target_rows: u64,
    },
    /// An alignment key occurs more than once on one side. Recorded for each
    /// batch that brings a new copy; `occurrences` counts every copy so far.
    DuplicateKey {
        side: Side,
        key: String,
        occurrences: u64,
    },
    /// A row has absent or null key columns.
    UnmatchableRow { side: Side, ordinal: u64 },
}

/// A structural finding attached to the batch in which it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub batch: u64,
    #[serde(flatten)]
    pub kind: FindingKind,
}

/// The accumulated, ordered record of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    name: String,
    started_at: String,
    status: ReportStatus,
    counters: ReportCounters,
    source_rows: u64,
    target_rows: u64,
    batches: u64,
    execution_time_ms: u64,
    findings: Vec<Finding>,
    results: Vec<ValidationResult>,
}

impl Report {
    /// Name of the run.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// RFC 3339 timestamp at which the run started.
    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    pub fn status(&self) -> &ReportStatus {
        &self.status
    }

    /// Returns true if both sources were read to exhaustion.
    pub fn is_complete(&self) -> bool {
        matches!(self.status, ReportStatus::Complete)
    }

    /// Snapshot of the frozen aggregate counters.
    pub fn counters(&self) -> &ReportCounters {
        &self.counters
    }

    /// Iterates results in the order they were produced.
    pub fn results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter()
    }

    /// Number of results.
    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Results whose verdict is not `Match`.
    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_match())
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Rows read from the source.
    pub fn source_rows(&self) -> u64 {
        self.source_rows
    }

    /// Rows read from the target.
    pub fn target_rows(&self) -> u64 {
        self.target_rows
    }

    /// Number of fully evaluated batch pairs.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    /// Returns true if the run completed without any divergence.
    pub fn passed(&self) -> bool {
        self.is_complete()
            && self.counters.rows_mismatched == 0
            && self.counters.missing_rows() == 0
            && self.counters.failed_column_checks() == 0
            && self.findings.is_empty()
    }

    /// `"pass"` or `"fail"`.
    pub fn summary_status(&self) -> &'static str {
        if self.passed() {
            "pass"
        } else {
            "fail"
        }
    }
}

/// Single-writer builder that the engine feeds while a run is in progress.
#[derive(Debug)]
pub struct ReportAccumulator {
    name: String,
    started_at: String,
    started: std::time::Instant,
    counters: ReportCounters,
    source_rows: u64,
    target_rows: u64,
    batches: u64,
    next_pair: u64,
    findings: Vec<Finding>,
    results: Vec<ValidationResult>,
}

impl ReportAccumulator {
    /// Starts a new accumulator for a run called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: chrono::Utc::now().to_rfc3339(),
            started: std::time::Instant::now(),
            counters: ReportCounters::default(),
            source_rows: 0,
            target_rows: 0,
            batches: 0,
            next_pair: 0,
            findings: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Reserves the sequence number for the next aligned pair.
    pub fn next_pair_id(&mut self) -> u64 {
        let id = self.next_pair;
        self.next_pair += 1;
        id
    }

    /// Appends the results of one aligned pair.
    ///
    /// Every pair must contribute at least one result.
    pub fn record_pair(&mut self, results: Vec<ValidationResult>) {
        debug_assert!(!results.is_empty(), "aligned pair without results");
        self.counters.add_pair(&results);
        self.results.extend(results);
    }

    /// Appends one column-level result.
    pub fn record_column_check(&mut self, result: ValidationResult) {
        self.counters.add_column_check(&result);
        self.results.push(result);
    }

    pub fn record_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Marks one batch pair as fully evaluated.
    pub fn record_batch(&mut self, source_rows: usize, target_rows: usize) {
        self.batches += 1;
        self.source_rows += source_rows as u64;
        self.target_rows += target_rows as u64;
    }

    /// Batches evaluated so far.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Counters as they stand now.
    pub fn counters(&self) -> &ReportCounters {
        &self.counters
    }

    /// Freezes the counters and returns the report.
    pub fn finish(self, status: ReportStatus) -> Report {
        Report {
            name: self.name,
            started_at: self.started_at,
            status,
            counters: self.counters,
            source_rows: self.source_rows,
            target_rows: self.target_rows,
            batches: self.batches,
            execution_time_ms: self.started.elapsed().as_millis() as u64,
            findings: self.findings,
            results: self.results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::{Anomaly, ResultScope};
    use crate::core::value::{RowId, Value};

    fn row_result(pair: u64, column: Option<&str>, verdict: Verdict) -> ValidationResult {
        ValidationResult {
            pair: Some(pair),
            batch: 0,
            scope: ResultScope::Row,
            row_id: RowId::Ordinal(pair),
            column: column.map(str::to_string),
            source_value: Some(Value::Int(1)),
            target_value: Some(Value::Int(2)),
            verdict,
            strategy: "numeric".to_string(),
            detail: String::new(),
            anomaly: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_pair_classification() {
        let mut counters = ReportCounters::default();
        counters.add_pair(&[
            row_result(0, Some("a"), Verdict::Match),
            row_result(0, Some("b"), Verdict::Match),
        ]);
        counters.add_pair(&[
            row_result(1, Some("a"), Verdict::Match),
            row_result(1, Some("b"), Verdict::Mismatch),
        ]);
        counters.add_pair(&[row_result(2, None, Verdict::MissingTarget)]);
        counters.add_pair(&[row_result(3, None, Verdict::MissingSource)]);

        assert_eq!(counters.total_pairs, 4);
        assert_eq!(counters.rows_matched, 1);
        assert_eq!(counters.rows_mismatched, 1);
        assert_eq!(counters.missing_target, 1);
        assert_eq!(counters.missing_source, 1);
        assert_eq!(counters.column_mismatches.get("b"), Some(&1));
        assert_eq!(counters.column_mismatches.get("a"), None);
        assert_eq!(
            counters.total_pairs,
            counters.rows_matched
                + counters.rows_mismatched
                + counters.missing_source
                + counters.missing_target
        );
    }

    #[test]
    fn test_tally_matches_incremental_counters() {
        let mut acc = ReportAccumulator::new("tally");
        let first = acc.next_pair_id();
        acc.record_pair(vec![
            row_result(first, Some("a"), Verdict::Mismatch),
            row_result(first, Some("b"), Verdict::Match),
        ]);
        let second = acc.next_pair_id();
        let mut anomalous = row_result(second, None, Verdict::MissingTarget);
        anomalous.anomaly = Some(Anomaly::DuplicateKey);
        acc.record_pair(vec![anomalous]);
        acc.record_column_check(ValidationResult {
            pair: None,
            scope: ResultScope::Column,
            row_id: RowId::Batch(0),
            ..row_result(0, Some("a"), Verdict::Mismatch)
        });

        let report = acc.finish(ReportStatus::Complete);
        let recomputed = ReportCounters::tally(report.results());
        assert_eq!(&recomputed, report.counters());
        assert_eq!(recomputed.anomalies, 1);
        assert_eq!(recomputed.failed_column_checks(), 1);
    }

    #[test]
    fn test_passed_requires_complete_run() {
        let acc = ReportAccumulator::new("empty");
        let report = acc.finish(ReportStatus::Incomplete {
            reason: "connection dropped".to_string(),
        });
        assert!(!report.passed());
        assert_eq!(report.summary_status(), "fail");

        let report = ReportAccumulator::new("empty").finish(ReportStatus::Complete);
        assert!(report.passed());
        assert_eq!(report.counters().match_rate(), 1.0);
    }
}
