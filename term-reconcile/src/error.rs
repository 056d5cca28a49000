//! Error types for the reconciliation engine.
//!
//! All fallible operations in this crate return [`ReconcileError`]. Errors are
//! reserved for structural problems: a malformed configuration detected before
//! any batch is fetched, or a row source that cannot be opened or read. An
//! ordinary value mismatch is never an error; it is a verdict on a
//! [`ValidationResult`](crate::core::ValidationResult).

use thiserror::Error;

/// The main error type for the reconciliation engine.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Invalid configuration (bad tolerance, conflicting strategy assignment, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A regular expression in the pattern table could not be compiled.
    #[error("Invalid pattern '{name}': {message}")]
    InvalidPattern {
        /// Name of the pattern in the pattern table
        name: String,
        /// Compiler message
        message: String,
    },

    /// A configured column does not exist in the result set of one side.
    #[error("Column '{column}' not found in {side} result set")]
    ColumnNotFound { column: String, side: String },

    /// Error from a row source (open, fetch or close failure).
    #[error("Data source error ({source_type}): {message}")]
    DataSource {
        /// Type of data source (e.g., "memory", "sql", "PostgreSQL")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error when parsing a configuration value or a formatted report.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ReconcileError>`.
pub type Result<T> = std::result::Result<T, ReconcileError>;

impl ReconcileError {
    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns true for errors that are detected before any batch is processed
    /// and therefore prevent a report from being produced at all.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            ReconcileError::Configuration(_)
                | ReconcileError::InvalidPattern { .. }
                | ReconcileError::ColumnNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ReconcileError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            ReconcileError::DataSource {
                source_type,
                message,
                source,
            } => ReconcileError::DataSource {
                source_type,
                message: format!("{}: {message}", f()),
                source,
            },
            ReconcileError::Internal(inner) => ReconcileError::Internal(format!("{}: {inner}", f())),
            other => ReconcileError::Internal(format!("{}: {other}", f())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_configuration_error() {
        let err = ReconcileError::configuration("tolerance must be >= 0");
        assert_eq!(
            err.to_string(),
            "Configuration error: tolerance must be >= 0"
        );
        assert!(err.is_setup_error());
    }

    #[test]
    fn test_data_source_error_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = ReconcileError::data_source_with_source("sql", "fetch failed", Box::new(io));
        assert_eq!(err.to_string(), "Data source error (sql): fetch failed");
        assert!(err.source().is_some());
        assert!(!err.is_setup_error());
    }

    #[test]
    fn test_column_not_found() {
        let err = ReconcileError::ColumnNotFound {
            column: "amount".to_string(),
            side: "target".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Column 'amount' not found in target result set"
        );
    }

    #[test]
    fn test_error_context_keeps_data_source_variant() {
        let failing: Result<()> = Err(ReconcileError::data_source("memory", "table missing"));
        let err = failing.context("opening source").unwrap_err();
        match err {
            ReconcileError::DataSource { message, .. } => {
                assert_eq!(message, "opening source: table missing")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_context_wraps_io() {
        let failing: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = failing.context("writing report").unwrap_err();
        assert!(err.to_string().contains("writing report"));
    }
}
