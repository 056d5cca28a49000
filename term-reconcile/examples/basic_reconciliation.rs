//! Reconciles a warehouse extract against its replica.
//!
//! Both sides are DataFusion sessions over in-memory record batches. Rows
//! are aligned on `order_id`; amounts are compared with a relative tolerance
//! and statuses case-insensitively. The report is printed to the console and
//! written to `validation_results.csv`.

use datafusion::arrow::array::{Float64Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use term_reconcile::formatters::{ReportFormat, ReportHandler};
use term_reconcile::logging::setup::{init_logging, LoggingConfig};
use term_reconcile::prelude::*;
use term_reconcile::sources::SqlSource;
use term_reconcile::strategies::{CategoricalConfig, NumericConfig};

fn orders(ids: Vec<i64>, totals: Vec<f64>, statuses: Vec<&str>) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new("total", DataType::Float64, false),
        Field::new("status", DataType::Utf8, false),
    ]));
    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(Float64Array::from(totals)),
            Arc::new(StringArray::from(statuses)),
        ],
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingConfig::development())
        .map_err(|e| ReconcileError::Internal(format!("logging setup failed: {e}")))?;

    let warehouse = SqlSource::new(SessionContext::new()).with_label("warehouse");
    warehouse.register_batch(
        "orders",
        orders(
            vec![1001, 1002, 1003, 1004],
            vec![99.99, 15.00, 250.00, 42.10],
            vec!["shipped", "pending", "shipped", "cancelled"],
        )?,
    )?;

    let replica = SqlSource::new(SessionContext::new()).with_label("replica");
    replica.register_batch(
        "orders",
        orders(
            vec![1004, 1003, 1001, 1005],
            vec![42.10, 250.02, 99.99, 7.50],
            vec!["CANCELLED", "shipped", "Shipped", "pending"],
        )?,
    )?;

    let config = ReconcileConfig::builder("orders")
        .batch_size(2)
        .key_columns(["order_id"])
        .column("total", StrategySpec::Numeric(NumericConfig::relative(1e-3)))
        .column(
            "status",
            StrategySpec::Categorical(CategoricalConfig::normalized()),
        )
        .allow_uneven_exhaustion(true)
        .build()?;
    let output = config.output_path.clone();

    let report = ValidationEngine::new(config)?
        .run(
            &warehouse,
            "SELECT * FROM orders ORDER BY order_id",
            &replica,
            "SELECT * FROM orders",
        )
        .await?;

    let handler = ReportHandler::new();
    println!("{}", handler.render(&report, ReportFormat::Human)?);
    handler.write_to(&report, &output)?;
    println!("Results written to {}", output.display());

    Ok(())
}
