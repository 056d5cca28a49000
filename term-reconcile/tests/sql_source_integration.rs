//! Reconciliation runs over DataFusion-backed SQL sources.

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use std::io::Write;
use std::sync::Arc;
use term_reconcile::config::ReconcileConfig;
use term_reconcile::core::{ReportStatus, ValidationEngine, Verdict};
use term_reconcile::sources::SqlSource;
use term_reconcile::strategies::{CategoricalConfig, NumericConfig, StrategySpec};

fn ledger(ids: &[i64], amounts: &[f64], states: &[&str]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("amt", DataType::Float64, false),
        Field::new("state", DataType::Utf8, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids.to_vec())),
            Arc::new(Float64Array::from(amounts.to_vec())),
            Arc::new(StringArray::from(states.to_vec())),
        ],
    )
    .unwrap()
}

fn sql_source(label: &str, batch: RecordBatch) -> SqlSource {
    let source = SqlSource::new(SessionContext::new()).with_label(label);
    source.register_batch("ledger", batch).unwrap();
    source
}

fn ledger_config(batch_size: usize) -> ReconcileConfig {
    ReconcileConfig::builder("ledger")
        .batch_size(batch_size)
        .key_columns(["id"])
        .column("amt", StrategySpec::Numeric(NumericConfig::absolute(0.01)))
        .column(
            "state",
            StrategySpec::Categorical(CategoricalConfig::normalized()),
        )
        .allow_uneven_exhaustion(true)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_registered_batches_reconcile() {
    let source = sql_source(
        "warehouse",
        ledger(
            &[1, 2, 3, 4, 5],
            &[10.0, 20.0, 30.0, 40.0, 50.0],
            &["open", "open", "closed", "open", "closed"],
        ),
    );
    let target = sql_source(
        "lake",
        ledger(
            &[5, 4, 3, 1],
            &[50.0, 40.004, 31.0, 10.0],
            &["CLOSED", " open ", "closed", "open"],
        ),
    );

    for batch_size in [1, 2, 10] {
        let report = ValidationEngine::new(ledger_config(batch_size))
            .unwrap()
            .run(
                &source,
                "SELECT id, amt, state FROM ledger ORDER BY id",
                &target,
                "SELECT id, amt, state FROM ledger",
            )
            .await
            .unwrap();

        assert!(report.is_complete(), "batch size {batch_size}");
        let counters = report.counters();
        assert_eq!(counters.rows_matched, 3, "batch size {batch_size}");
        assert_eq!(counters.rows_mismatched, 1);
        assert_eq!(counters.missing_target, 1);
        assert_eq!(counters.missing_source, 0);
        assert_eq!(counters.column_mismatches.get("amt"), Some(&1));

        let missing = report
            .results()
            .find(|r| r.verdict == Verdict::MissingTarget)
            .unwrap();
        assert_eq!(missing.row_id.to_string(), "2");
    }
}

#[tokio::test]
async fn test_csv_files_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let write_csv = |name: &str, body: &str| {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    };
    let source_path = write_csv("source.csv", "id,amt\n1,1.5\n2,2.5\n3,3.5\n");
    let target_path = write_csv("target.csv", "id,amt\n3,3.5\n2,2.75\n1,1.5\n");

    let source = SqlSource::new(SessionContext::new()).with_label("source csv");
    source
        .context()
        .register_csv(
            "payments",
            source_path.to_str().unwrap(),
            CsvReadOptions::new(),
        )
        .await
        .unwrap();
    let target = SqlSource::new(SessionContext::new()).with_label("target csv");
    target
        .context()
        .register_csv(
            "payments",
            target_path.to_str().unwrap(),
            CsvReadOptions::new(),
        )
        .await
        .unwrap();

    let config = ReconcileConfig::builder("csv")
        .batch_size(2)
        .tolerance(0.1)
        .key_columns(["id"])
        .default_strategy(StrategySpec::numeric())
        .build()
        .unwrap();
    let report = ValidationEngine::new(config)
        .unwrap()
        .run(
            &source,
            "SELECT * FROM payments",
            &target,
            "SELECT * FROM payments",
        )
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.source_rows(), 3);
    assert_eq!(report.target_rows(), 3);
    assert_eq!(report.counters().rows_matched, 2);
    assert_eq!(report.counters().rows_mismatched, 1);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.row_id.to_string(), "2");
    assert_eq!(failure.column.as_deref(), Some("amt"));
}

#[tokio::test]
async fn test_bad_target_query_is_incomplete() {
    let source = sql_source("warehouse", ledger(&[1], &[1.0], &["open"]));
    let target = SqlSource::new(SessionContext::new()).with_label("lake");

    let report = ValidationEngine::new(ledger_config(10))
        .unwrap()
        .run(
            &source,
            "SELECT * FROM ledger",
            &target,
            "SELECT * FROM no_such_table",
        )
        .await
        .unwrap();

    match report.status() {
        ReportStatus::Incomplete { reason } => {
            assert!(reason.contains("opening target"), "{reason}");
            assert!(reason.contains("lake"), "{reason}");
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(report.result_count(), 0);
    assert!(!report.passed());
}
