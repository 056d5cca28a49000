//! Run configuration.
//!
//! A [`ReconcileConfig`] carries every knob of a reconciliation run. It is
//! plain data: it can be built in code, deserialized from JSON, or seeded from
//! environment variables, and it is checked once by [`ReconcileConfig::validate`]
//! before the engine is constructed.
//!
//! # Examples
//!
//! ```rust
//! use term_reconcile::config::ReconcileConfig;
//! use term_reconcile::strategies::{NumericConfig, StrategySpec};
//!
//! let config = ReconcileConfig::builder("orders")
//!     .key_columns(["id"])
//!     .batch_size(10_000)
//!     .column("amount", StrategySpec::Numeric(NumericConfig::absolute(0.01)))
//!     .column("status", StrategySpec::categorical())
//!     .build()
//!     .unwrap();
//! assert_eq!(config.batch_size, 10_000);
//! ```

use crate::core::AlignmentSpec;
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::strategies::{BuildContext, PatternTable, StrategySpec, DEFAULT_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default number of rows fetched from each side per batch.
pub const DEFAULT_BATCH_SIZE: usize = 25_000;

/// Default results file.
pub const DEFAULT_RESULTS_FILE: &str = "validation_results.csv";

pub const ENV_BATCH_SIZE: &str = "VALIDATION_BATCH_SIZE";
pub const ENV_TOLERANCE: &str = "VALIDATION_TOLERANCE";
pub const ENV_RESULTS_FILE: &str = "VALIDATION_RESULTS_FILE";

/// A strategy assigned to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAssignment {
    pub column: String,
    pub strategy: StrategySpec,
}

/// Configuration of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Name recorded on the report.
    pub name: String,
    pub batch_size: usize,
    /// Numeric tolerance used by strategies that do not set their own.
    pub tolerance: f64,
    pub alignment: AlignmentSpec,
    /// Per-column strategies, compared in this order.
    pub columns: Vec<ColumnAssignment>,
    /// Strategy for every other column present on both sides. When unset,
    /// only assigned columns are compared.
    pub default_strategy: Option<StrategySpec>,
    /// Reject naive timestamps in date-time comparisons.
    pub timezone_aware: bool,
    /// Treat empty strings as null in null comparisons.
    pub treat_empty_as_null: bool,
    /// Named regular expressions in addition to the built-ins.
    pub patterns: PatternTable,
    /// Accept sources of different lengths without a finding.
    pub allow_uneven_exhaustion: bool,
    /// Fetch source and target batches concurrently.
    pub concurrent_fetch: bool,
    /// Where the report is written.
    pub output_path: PathBuf,
    pub logging: LogConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            name: "reconciliation".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            tolerance: DEFAULT_TOLERANCE,
            alignment: AlignmentSpec::Positional,
            columns: Vec::new(),
            default_strategy: None,
            timezone_aware: false,
            treat_empty_as_null: false,
            patterns: PatternTable::default(),
            allow_uneven_exhaustion: false,
            concurrent_fetch: false,
            output_path: PathBuf::from(DEFAULT_RESULTS_FILE),
            logging: LogConfig::default(),
        }
    }
}

impl ReconcileConfig {
    pub fn builder(name: impl Into<String>) -> ReconcileConfigBuilder {
        ReconcileConfigBuilder {
            config: ReconcileConfig {
                name: name.into(),
                ..ReconcileConfig::default()
            },
        }
    }

    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ReconcileConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Defaults overridden by `VALIDATION_BATCH_SIZE`, `VALIDATION_TOLERANCE`
    /// and `VALIDATION_RESULTS_FILE`.
    ///
    /// The result carries no strategies yet, so it is not validated; extend it
    /// with [`into_builder`](Self::into_builder).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_BATCH_SIZE) {
            config.batch_size = raw.trim().parse().map_err(|e| {
                ReconcileError::Parse(format!("{ENV_BATCH_SIZE}='{raw}': {e}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_TOLERANCE) {
            config.tolerance = raw.trim().parse().map_err(|e| {
                ReconcileError::Parse(format!("{ENV_TOLERANCE}='{raw}': {e}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_RESULTS_FILE) {
            config.output_path = PathBuf::from(raw);
        }
        Ok(config)
    }

    /// Continues building from this configuration.
    pub fn into_builder(self) -> ReconcileConfigBuilder {
        ReconcileConfigBuilder { config: self }
    }

    /// Run-wide defaults handed to every strategy.
    pub fn build_context(&self) -> BuildContext {
        BuildContext {
            patterns: self.patterns.clone(),
            default_tolerance: self.tolerance,
            timezone_aware: self.timezone_aware,
            treat_empty_as_null: self.treat_empty_as_null,
        }
    }

    /// Performs every setup-time check.
    ///
    /// Strategy specs are built (and discarded) so that malformed strategy
    /// configuration is reported here rather than mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ReconcileError::configuration("batch_size must be > 0"));
        }
        crate::strategies::validate_non_negative("tolerance", self.tolerance)?;
        self.patterns.validate()?;

        let keys = self.alignment.key_columns();
        if matches!(self.alignment, AlignmentSpec::Keyed(_)) && keys.is_empty() {
            return Err(ReconcileError::configuration(
                "keyed alignment requires at least one key column",
            ));
        }
        let mut seen = HashSet::new();
        for key in keys {
            if !seen.insert(key) {
                return Err(ReconcileError::configuration(format!(
                    "key column '{key}' is listed twice"
                )));
            }
        }

        let ctx = self.build_context();
        let mut assigned = HashSet::new();
        for assignment in &self.columns {
            if keys.contains(&assignment.column) {
                return Err(ReconcileError::configuration(format!(
                    "column '{}' is an alignment key and cannot be compared",
                    assignment.column
                )));
            }
            if !assigned.insert(&assignment.column) {
                return Err(ReconcileError::configuration(format!(
                    "column '{}' has more than one strategy",
                    assignment.column
                )));
            }
            assignment.strategy.build(&ctx)?;
        }
        if let Some(default) = &self.default_strategy {
            default.build(&ctx)?;
        }

        if self.columns.is_empty() && self.default_strategy.is_none() {
            return Err(ReconcileError::configuration(
                "no column strategies and no default strategy configured",
            ));
        }
        Ok(())
    }
}

/// Builder for [`ReconcileConfig`]; [`build`](Self::build) validates.
#[derive(Debug, Clone)]
pub struct ReconcileConfigBuilder {
    config: ReconcileConfig,
}

impl ReconcileConfigBuilder {
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn alignment(mut self, alignment: AlignmentSpec) -> Self {
        self.config.alignment = alignment;
        self
    }

    /// Keyed alignment on the given columns.
    pub fn key_columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alignment(AlignmentSpec::keyed(columns))
    }

    /// Assigns a strategy to a column.
    pub fn column(mut self, column: impl Into<String>, strategy: StrategySpec) -> Self {
        self.config.columns.push(ColumnAssignment {
            column: column.into(),
            strategy,
        });
        self
    }

    pub fn default_strategy(mut self, strategy: StrategySpec) -> Self {
        self.config.default_strategy = Some(strategy);
        self
    }

    pub fn timezone_aware(mut self, aware: bool) -> Self {
        self.config.timezone_aware = aware;
        self
    }

    pub fn treat_empty_as_null(mut self, enabled: bool) -> Self {
        self.config.treat_empty_as_null = enabled;
        self
    }

    pub fn pattern(mut self, name: impl Into<String>, regex: impl Into<String>) -> Self {
        self.config.patterns = self.config.patterns.with_pattern(name, regex);
        self
    }

    pub fn allow_uneven_exhaustion(mut self, allow: bool) -> Self {
        self.config.allow_uneven_exhaustion = allow;
        self
    }

    pub fn concurrent_fetch(mut self, enabled: bool) -> Self {
        self.config.concurrent_fetch = enabled;
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    pub fn build(self) -> Result<ReconcileConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::NumericConfig;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(config.batch_size, 25_000);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.output_path, PathBuf::from("validation_results.csv"));
        assert!(!config.allow_uneven_exhaustion);
        assert_eq!(config.alignment, AlignmentSpec::Positional);
    }

    #[test]
    fn test_builder_validates() {
        let err = ReconcileConfig::builder("x")
            .batch_size(0)
            .default_strategy(StrategySpec::numeric())
            .build()
            .unwrap_err();
        assert!(err.is_setup_error());

        let err = ReconcileConfig::builder("x")
            .column("a", StrategySpec::numeric())
            .column("a", StrategySpec::categorical())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than one strategy"));

        let err = ReconcileConfig::builder("x")
            .key_columns(["id"])
            .column("id", StrategySpec::numeric())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("alignment key"));

        assert!(ReconcileConfig::builder("x").build().is_err());
        assert!(ReconcileConfig::builder("x")
            .key_columns(Vec::<String>::new())
            .default_strategy(StrategySpec::numeric())
            .build()
            .is_err());
    }

    #[test]
    fn test_invalid_strategy_fails_validation() {
        let err = ReconcileConfig::builder("x")
            .column("amt", StrategySpec::Numeric(NumericConfig::absolute(f64::NAN)))
            .build()
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));

        let err = ReconcileConfig::builder("x")
            .pattern("broken", "([")
            .default_strategy(StrategySpec::categorical())
            .build()
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidPattern { .. }));

        let err = ReconcileConfig::builder("x")
            .column("email", StrategySpec::pattern("nope"))
            .build()
            .unwrap_err();
        assert!(err.is_setup_error());
    }

    #[test]
    fn test_from_json_str() {
        let config = ReconcileConfig::from_json_str(
            r#"{
                "name": "orders",
                "batch_size": 500,
                "alignment": {"keyed": ["id"]},
                "columns": [
                    {"column": "amount", "strategy": {"type": "numeric", "tolerance": 0.01}},
                    {"column": "email", "strategy": {"type": "pattern", "pattern": "email"}}
                ],
                "treat_empty_as_null": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.name, "orders");
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.alignment, AlignmentSpec::keyed(["id"]));
        assert_eq!(config.columns.len(), 2);
        assert_eq!(config.columns[1].column, "email");
        assert!(config.treat_empty_as_null);
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);

        assert!(matches!(
            ReconcileConfig::from_json_str("{not json"),
            Err(ReconcileError::Serialization(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_strategy": {"type": "numeric"}}"#).unwrap();
        let config = ReconcileConfig::from_file(&path).unwrap();
        assert!(config.default_strategy.is_some());

        assert!(ReconcileConfig::from_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_BATCH_SIZE, "1000"),
            (ENV_TOLERANCE, "0.5"),
            (ENV_RESULTS_FILE, "out.json"),
        ]);
        let lookup = |name: &str| vars.get(name).map(|v| v.to_string());
        let config = ReconcileConfig::from_vars(lookup).unwrap();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.tolerance, 0.5);
        assert_eq!(config.output_path, PathBuf::from("out.json"));

        let config = config
            .into_builder()
            .default_strategy(StrategySpec::numeric())
            .build()
            .unwrap();
        assert_eq!(config.build_context().default_tolerance, 0.5);

        let bad = |name: &str| (name == ENV_BATCH_SIZE).then(|| "many".to_string());
        assert!(matches!(
            ReconcileConfig::from_vars(bad),
            Err(ReconcileError::Parse(_))
        ));
    }
}
