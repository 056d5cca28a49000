//! Report formatting and output.
//!
//! A [`Report`] can be rendered as JSON (the whole report, parseable back),
//! CSV (one line per [`ValidationResult`]) or a human-readable console
//! summary. [`ReportHandler`] picks the format from a file extension and
//! writes the report to disk.
//!
//! # Examples
//!
//! ```rust
//! use term_reconcile::formatters::{CsvFormatter, ReportFormatter};
//! # use term_reconcile::core::{ReportAccumulator, ReportStatus};
//! # let report = ReportAccumulator::new("orders").finish(ReportStatus::Complete);
//!
//! let csv = CsvFormatter::new().format(&report).unwrap();
//! let counters = CsvFormatter::parse_counters(&csv).unwrap();
//! assert_eq!(&counters, report.counters());
//! ```

use crate::core::{
    AlignmentKey, Anomaly, KeyPart, Report, ReportCounters, ReportStatus, ResultScope, RowId,
    ValidationResult, Value, Verdict,
};
use crate::prelude::*;
use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Configuration options for formatting reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include individual results
    pub include_results: bool,
    /// Include batch-level findings
    pub include_findings: bool,
    /// Maximum number of results to display (-1 for all)
    pub max_results: i32,
    /// Only list results that did not match
    pub failures_only: bool,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
    /// Whether to include timestamps in output
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_results: true,
            include_findings: true,
            max_results: -1,
            failures_only: false,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Summary counters only.
    pub fn minimal() -> Self {
        Self {
            include_results: false,
            include_findings: false,
            max_results: 0,
            failures_only: true,
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// For CI logs: no colors, the first 50 failures.
    pub fn ci() -> Self {
        Self {
            include_results: true,
            include_findings: true,
            max_results: 50,
            failures_only: true,
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_results(mut self, include: bool) -> Self {
        self.include_results = include;
        self
    }

    pub fn with_max_results(mut self, max: i32) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_failures_only(mut self, failures_only: bool) -> Self {
        self.failures_only = failures_only;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn limit(&self) -> Option<usize> {
        usize::try_from(self.max_results).ok()
    }
}

/// Renders a report into a string.
pub trait ReportFormatter {
    fn format(&self, report: &Report) -> Result<String>;

    /// Formats with explicit options. The default ignores them.
    fn format_with_config(&self, report: &Report, _config: &FormatterConfig) -> Result<String> {
        self.format(report)
    }
}

/// Formats a report as JSON.
///
/// With the default configuration the output holds the complete report and
/// [`JsonFormatter::parse`] restores it.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Parses a report written with the default configuration.
    pub fn parse(json: &str) -> Result<Report> {
        serde_json::from_str(json).map_err(|e| ReconcileError::Parse(format!("invalid report JSON: {e}")))
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report, config: &FormatterConfig) -> Result<String> {
        let mut value = serde_json::to_value(report)?;
        if let Some(fields) = value.as_object_mut() {
            // derived, so not part of the serialized report itself
            fields.insert("summary_status".to_string(), report.summary_status().into());
            if !config.include_timestamps {
                fields.remove("started_at");
            }
            if !config.include_findings {
                fields.remove("findings");
            }
            if !config.include_results {
                fields.remove("results");
            } else if config.failures_only || config.limit().is_some() {
                let kept: Vec<&ValidationResult> = limited(report, config).collect();
                fields.insert("results".to_string(), serde_json::to_value(kept)?);
            }
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(json)
    }
}

/// Column order of the CSV output.
pub const CSV_COLUMNS: [&str; 11] = [
    "pair",
    "batch",
    "scope",
    "row_id",
    "column",
    "source_value",
    "target_value",
    "verdict",
    "strategy",
    "detail",
    "anomaly",
];

/// Formats results as CSV, one line per result, through the Arrow CSV writer.
///
/// Values are written in their display form, so parsing a CSV back recovers
/// verdicts, columns and counters but not typed values.
#[derive(Debug, Clone, Default)]
pub struct CsvFormatter {
    config: FormatterConfig,
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(
            CSV_COLUMNS
                .iter()
                .map(|name| Field::new(*name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ))
    }

    /// Builds the record batch written by [`format`](ReportFormatter::format).
    pub fn to_record_batch<'a, I>(results: I) -> Result<RecordBatch>
    where
        I: IntoIterator<Item = &'a ValidationResult>,
    {
        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); CSV_COLUMNS.len()];
        for r in results {
            let row = [
                r.pair.map(|p| p.to_string()),
                Some(r.batch.to_string()),
                Some(r.scope.as_str().to_string()),
                Some(r.row_id.to_string()),
                r.column.clone(),
                r.source_value.as_ref().map(Value::to_string),
                r.target_value.as_ref().map(Value::to_string),
                Some(r.verdict.as_str().to_string()),
                Some(r.strategy.clone()),
                Some(r.detail.clone()),
                r.anomaly.map(|a| a.as_str().to_string()),
            ];
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
        }

        let arrays: Vec<ArrayRef> = columns
            .into_iter()
            .map(|cells| Arc::new(StringArray::from(cells)) as ArrayRef)
            .collect();
        Ok(RecordBatch::try_new(Self::schema(), arrays)?)
    }

    /// Reads results back from CSV text written by this formatter.
    pub fn parse_results(csv: &str) -> Result<Vec<ValidationResult>> {
        let reader = arrow::csv::ReaderBuilder::new(Self::schema())
            .with_header(true)
            .build(std::io::Cursor::new(csv.as_bytes()))?;

        let mut results = Vec::new();
        for batch in reader {
            let batch = batch?;
            let cols: Vec<_> = (0..CSV_COLUMNS.len())
                .map(|i| batch.column(i).as_string::<i32>())
                .collect();
            for row in 0..batch.num_rows() {
                let cell = |i: usize| -> Option<&str> {
                    let col = cols[i];
                    (!col.is_null(row)).then(|| col.value(row))
                };
                results.push(parse_line(row, &cell)?);
            }
        }
        Ok(results)
    }

    /// Recomputes aggregate counters from CSV text written by this formatter.
    pub fn parse_counters(csv: &str) -> Result<ReportCounters> {
        let results = Self::parse_results(csv)?;
        Ok(ReportCounters::tally(&results))
    }
}

impl ReportFormatter for CsvFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report, config: &FormatterConfig) -> Result<String> {
        let batch = Self::to_record_batch(limited(report, config))?;
        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(Vec::new());
        writer.write(&batch)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| ReconcileError::Internal(format!("CSV output is not UTF-8: {e}")))
    }
}

fn parse_line<'a, F>(line: usize, cell: &F) -> Result<ValidationResult>
where
    F: Fn(usize) -> Option<&'a str>,
{
    let bad = |what: &str, raw: Option<&str>| {
        ReconcileError::Parse(format!(
            "line {}: invalid {what} '{}'",
            line + 1,
            raw.unwrap_or_default()
        ))
    };
    let number = |i: usize, what: &str| -> Result<Option<u64>> {
        cell(i)
            .map(|raw| raw.parse::<u64>().map_err(|_| bad(what, Some(raw))))
            .transpose()
    };

    let pair = number(0, "pair")?;
    let batch = number(1, "batch")?.ok_or_else(|| bad("batch", None))?;
    let scope = match cell(2) {
        Some("row") => ResultScope::Row,
        Some("column") => ResultScope::Column,
        other => return Err(bad("scope", other)),
    };
    let verdict = cell(7)
        .and_then(Verdict::parse)
        .ok_or_else(|| bad("verdict", cell(7)))?;
    let anomaly = match cell(10) {
        None => None,
        Some(raw) => Some(parse_anomaly(raw).ok_or_else(|| bad("anomaly", Some(raw)))?),
    };

    Ok(ValidationResult {
        pair,
        batch,
        scope,
        row_id: parse_row_id(cell(3).unwrap_or_default()),
        column: cell(4).map(str::to_string),
        source_value: cell(5).map(|v| Value::Text(v.to_string())),
        target_value: cell(6).map(|v| Value::Text(v.to_string())),
        verdict,
        strategy: cell(8).unwrap_or_default().to_string(),
        detail: cell(9).unwrap_or_default().to_string(),
        anomaly,
        children: Vec::new(),
    })
}

fn parse_anomaly(raw: &str) -> Option<Anomaly> {
    [
        Anomaly::TypeMismatch,
        Anomaly::UnknownCategory,
        Anomaly::NaiveTimestamp,
        Anomaly::DuplicateKey,
        Anomaly::UnmatchableRow,
    ]
    .into_iter()
    .find(|a| a.as_str() == raw)
}

/// Inverse of `RowId`'s display form. Key parts come back as text.
fn parse_row_id(raw: &str) -> RowId {
    let numbered = |prefix: &str| raw.strip_prefix(prefix).and_then(|n| n.parse::<u64>().ok());
    if let Some(n) = numbered("batch#") {
        RowId::Batch(n)
    } else if let Some(n) = numbered("unkeyed#") {
        RowId::Unkeyed(n)
    } else if let Some(n) = numbered("#") {
        RowId::Ordinal(n)
    } else {
        RowId::Key(AlignmentKey(
            raw.split('|').map(|p| KeyPart::Text(p.to_string())).collect(),
        ))
    }
}

/// Results selected by `failures_only` and `max_results`.
fn limited<'a>(
    report: &'a Report,
    config: &FormatterConfig,
) -> impl Iterator<Item = &'a ValidationResult> {
    let failures_only = config.failures_only;
    report
        .results()
        .filter(move |r| !failures_only || !r.is_match())
        .take(config.limit().unwrap_or(usize::MAX))
}

/// Formats a report for the console.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(&self, config: &FormatterConfig, code: &str, text: &str) -> String {
        if config.use_colors {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn render(&self, report: &Report, config: &FormatterConfig, out: &mut String) -> std::fmt::Result {
        let counters = report.counters();

        writeln!(out)?;
        if report.passed() {
            writeln!(out, "✅ {}", self.paint(config, "32", "Reconciliation PASSED"))?;
        } else {
            writeln!(out, "❌ {}", self.paint(config, "31", "Reconciliation FAILED"))?;
        }
        writeln!(out)?;
        writeln!(out, "Run: {}", report.name())?;
        match report.status() {
            ReportStatus::Complete => writeln!(out, "Status: complete")?,
            ReportStatus::Incomplete { reason } => {
                writeln!(out, "Status: {} ({reason})", self.paint(config, "33", "incomplete"))?
            }
            ReportStatus::Cancelled { after_batches } => writeln!(
                out,
                "Status: {} after {after_batches} batches",
                self.paint(config, "33", "cancelled")
            )?,
        }
        if config.include_timestamps {
            writeln!(out, "Started: {}", report.started_at())?;
        }

        writeln!(out)?;
        writeln!(out, "📊 Summary:")?;
        writeln!(out, "   Source rows: {}", report.source_rows())?;
        writeln!(out, "   Target rows: {}", report.target_rows())?;
        writeln!(out, "   Rows compared: {}", counters.total_pairs)?;
        writeln!(out, "   Matched: {}", counters.rows_matched)?;
        writeln!(out, "   Mismatched: {}", counters.rows_mismatched)?;
        writeln!(out, "   Missing in source: {}", counters.missing_source)?;
        writeln!(out, "   Missing in target: {}", counters.missing_target)?;
        writeln!(out, "   Anomalies: {}", counters.anomalies)?;
        writeln!(out, "   Match Rate: {:.1}%", counters.match_rate() * 100.0)?;
        writeln!(
            out,
            "   Batches: {} in {}ms",
            report.batches(),
            report.execution_time_ms()
        )?;

        if !counters.column_mismatches.is_empty() {
            writeln!(out)?;
            writeln!(out, "📉 Mismatches by column:")?;
            for (column, count) in &counters.column_mismatches {
                writeln!(out, "   {column}: {count}")?;
            }
        }
        if !counters.column_checks_failed.is_empty() {
            writeln!(out)?;
            writeln!(out, "📈 Failed column checks:")?;
            for (column, count) in &counters.column_checks_failed {
                writeln!(out, "   {column}: {count}")?;
            }
        }

        if config.include_findings && !report.findings().is_empty() {
            writeln!(out)?;
            writeln!(out, "⚠️  Findings:")?;
            for finding in report.findings() {
                let kind = serde_json::to_string(&finding.kind).unwrap_or_default();
                writeln!(out, "   batch {}: {kind}", finding.batch)?;
            }
        }

        if config.include_results {
            let shown: Vec<&ValidationResult> = limited(report, config).collect();
            let total = if config.failures_only {
                report.failures().count()
            } else {
                report.result_count()
            };
            if !shown.is_empty() {
                writeln!(out)?;
                writeln!(out, "🔍 Results:")?;
                for r in &shown {
                    let verdict = match r.verdict {
                        Verdict::Match => self.paint(config, "32", r.verdict.as_str()),
                        _ => self.paint(config, "31", r.verdict.as_str()),
                    };
                    write!(out, "   [{verdict}] {}", r.row_id)?;
                    if let Some(column) = &r.column {
                        write!(out, " {column}")?;
                    }
                    write!(out, " ({}): {}", r.strategy, r.detail)?;
                    if let Some(anomaly) = r.anomaly {
                        write!(out, " [{anomaly}]")?;
                    }
                    writeln!(out)?;
                }
            }
            if total > shown.len() {
                writeln!(out)?;
                writeln!(out, "   ... and {} more results", total - shown.len())?;
            }
        }

        writeln!(out)
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &Report) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report, config: &FormatterConfig) -> Result<String> {
        let mut out = String::new();
        self.render(report, config, &mut out)
            .map_err(|e| ReconcileError::Internal(format!("failed to render report: {e}")))?;
        Ok(out)
    }
}

/// Output format of a report file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
    Human,
}

impl ReportFormat {
    /// Chooses the format from a file extension (`.json`, `.csv`, anything else is text).
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => ReportFormat::Json,
            Some("csv") => ReportFormat::Csv,
            _ => ReportFormat::Human,
        }
    }
}

/// Writes reports to files.
#[derive(Debug, Clone)]
pub struct ReportHandler {
    config: FormatterConfig,
}

impl Default for ReportHandler {
    fn default() -> Self {
        Self {
            config: FormatterConfig::default().with_colors(false),
        }
    }
}

impl ReportHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// Renders `report` in the given format.
    pub fn render(&self, report: &Report, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => JsonFormatter::new().format_with_config(report, &self.config),
            ReportFormat::Csv => CsvFormatter::new().format_with_config(report, &self.config),
            ReportFormat::Human => HumanFormatter::new().format_with_config(report, &self.config),
        }
    }

    /// Writes `report` to `path` in the format implied by its extension.
    pub fn write_to(&self, report: &Report, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = ReportFormat::from_path(path);
        let content = self.render(report, format)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(
            path = %path.display(),
            format = ?format,
            results = report.result_count(),
            "Wrote reconciliation report"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FindingKind, ReportAccumulator, Side};

    fn result(pair: u64, column: Option<&str>, verdict: Verdict) -> ValidationResult {
        ValidationResult {
            pair: Some(pair),
            batch: 0,
            scope: ResultScope::Row,
            row_id: RowId::Ordinal(pair),
            column: column.map(str::to_string),
            source_value: Some(Value::Float(1.5)),
            target_value: Some(Value::Text("a, \"quoted\" value".to_string())),
            verdict,
            strategy: "numeric".to_string(),
            detail: "diff=0.5, tolerance=0.1".to_string(),
            anomaly: None,
            children: Vec::new(),
        }
    }

    fn sample_report() -> Report {
        let mut acc = ReportAccumulator::new("orders");
        let first = acc.next_pair_id();
        acc.record_pair(vec![
            result(first, Some("amount"), Verdict::Match),
            result(first, Some("status"), Verdict::Match),
        ]);
        let second = acc.next_pair_id();
        acc.record_pair(vec![
            result(second, Some("amount"), Verdict::Mismatch),
            result(second, Some("status"), Verdict::Match),
        ]);
        let third = acc.next_pair_id();
        let mut missing = result(third, None, Verdict::MissingTarget);
        missing.source_value = None;
        missing.target_value = None;
        missing.row_id = RowId::Unkeyed(7);
        missing.anomaly = Some(Anomaly::UnmatchableRow);
        acc.record_pair(vec![missing]);
        acc.record_column_check(ValidationResult {
            pair: None,
            scope: ResultScope::Column,
            row_id: RowId::Batch(0),
            ..result(0, Some("amount"), Verdict::Mismatch)
        });
        acc.record_finding(crate::core::Finding {
            batch: 0,
            kind: FindingKind::UnmatchableRow {
                side: Side::Source,
                ordinal: 7,
            },
        });
        acc.record_batch(3, 2);
        acc.finish(ReportStatus::Complete)
    }

    #[test]
    fn test_json_round_trip() {
        let report = sample_report();
        let json = JsonFormatter::new().format(&report).unwrap();
        assert!(json.contains("\"summary_status\": \"fail\""));
        let parsed = JsonFormatter::parse(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_json_minimal_drops_results() {
        let json = JsonFormatter::with_config(FormatterConfig::minimal())
            .format(&sample_report())
            .unwrap();
        assert!(!json.contains("\"results\""));
        assert!(!json.contains("\"started_at\""));
        assert!(json.contains("\"counters\""));
    }

    #[test]
    fn test_csv_round_trip_counters() {
        let report = sample_report();
        let csv = CsvFormatter::new().format(&report).unwrap();
        assert!(csv.starts_with("pair,batch,scope,row_id"));
        assert_eq!(csv.lines().count(), report.result_count() + 1);

        let counters = CsvFormatter::parse_counters(&csv).unwrap();
        assert_eq!(&counters, report.counters());

        let results = CsvFormatter::parse_results(&csv).unwrap();
        assert_eq!(results[4].row_id, RowId::Unkeyed(7));
        assert_eq!(results[4].anomaly, Some(Anomaly::UnmatchableRow));
        assert_eq!(results[5].scope, ResultScope::Column);
        assert_eq!(results[5].pair, None);
        assert_eq!(
            results[0].target_value,
            Some(Value::Text("a, \"quoted\" value".to_string()))
        );
    }

    #[test]
    fn test_csv_rejects_bad_verdict() {
        let csv = "pair,batch,scope,row_id,column,source_value,target_value,verdict,strategy,detail,anomaly\n\
                   0,0,row,#0,amount,1,1,SAME,numeric,ok,\n";
        let err = CsvFormatter::parse_results(csv).unwrap_err();
        assert!(err.to_string().contains("invalid verdict"));
    }

    #[test]
    fn test_parse_row_id() {
        assert_eq!(parse_row_id("#3"), RowId::Ordinal(3));
        assert_eq!(parse_row_id("batch#2"), RowId::Batch(2));
        assert_eq!(
            parse_row_id("1|eu"),
            RowId::Key(AlignmentKey(vec![
                KeyPart::Text("1".to_string()),
                KeyPart::Text("eu".to_string())
            ]))
        );
    }

    #[test]
    fn test_human_formatter() {
        let report = sample_report();
        let output = HumanFormatter::with_config(FormatterConfig::default().with_colors(false))
            .format(&report)
            .unwrap();
        assert!(output.contains("Reconciliation FAILED"));
        assert!(output.contains("Run: orders"));
        assert!(output.contains("Mismatched: 1"));
        assert!(output.contains("Missing in target: 1"));
        assert!(output.contains("amount: 1"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_human_formatter_limits_results() {
        let config = FormatterConfig::default()
            .with_colors(false)
            .with_failures_only(true)
            .with_max_results(1);
        let output = HumanFormatter::new()
            .format_with_config(&sample_report(), &config)
            .unwrap();
        assert!(output.contains("[MISMATCH]"));
        assert!(output.contains("... and 2 more results"));
    }

    #[test]
    fn test_report_handler_writes_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let handler = ReportHandler::new();

        let json_path = dir.path().join("results.json");
        handler.write_to(&report, &json_path).unwrap();
        let parsed = JsonFormatter::parse(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.counters(), report.counters());

        let csv_path = dir.path().join("results.CSV");
        handler.write_to(&report, &csv_path).unwrap();
        let counters =
            CsvFormatter::parse_counters(&std::fs::read_to_string(&csv_path).unwrap()).unwrap();
        assert_eq!(&counters, report.counters());

        let txt_path = dir.path().join("results.txt");
        handler.write_to(&report, &txt_path).unwrap();
        assert!(std::fs::read_to_string(&txt_path)
            .unwrap()
            .contains("Reconciliation FAILED"));
    }

    #[test]
    fn test_report_format_from_path() {
        assert_eq!(ReportFormat::from_path(Path::new("a.json")), ReportFormat::Json);
        assert_eq!(ReportFormat::from_path(Path::new("a.csv")), ReportFormat::Csv);
        assert_eq!(ReportFormat::from_path(Path::new("a")), ReportFormat::Human);
    }
}
