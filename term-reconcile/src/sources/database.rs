//! PostgreSQL tables read through DataFusion.
//!
//! Tables are registered with `datafusion-table-providers` in a session owned
//! by the source, so queries may filter, join and order PostgreSQL tables
//! with DataFusion SQL and still benefit from pushdown.

use super::{RowCursor, RowSource, SqlSource};
use crate::prelude::*;
use crate::security::SecureString;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use datafusion_table_providers::postgres::PostgresTableFactory;
use datafusion_table_providers::sql::db_connection_pool::postgrespool::PostgresConnectionPool;
use datafusion_table_providers::util::secrets::to_secret_map;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

const SOURCE_TYPE: &str = "PostgreSQL";

/// Connection parameters of a PostgreSQL server.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: SecureString,
    pub sslmode: Option<String>,
}

impl PostgresConfig {
    /// Reads `DB_HOST`, `DB_PORT` (default 5432), `DB_NAME`, `DB_USER` and
    /// `DB_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| {
                ReconcileError::configuration(format!("environment variable {name} is not set"))
            })
        };
        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ReconcileError::Parse(format!("DB_PORT '{raw}': {e}")))?,
            None => 5432,
        };
        Ok(Self {
            host: required("DB_HOST")?,
            port,
            database: required("DB_NAME")?,
            username: required("DB_USER")?,
            password: SecureString::new(required("DB_PASSWORD")?),
            sslmode: lookup("DB_SSLMODE"),
        })
    }

    fn params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("host".to_string(), self.host.clone());
        params.insert("port".to_string(), self.port.to_string());
        params.insert("db".to_string(), self.database.clone());
        params.insert("user".to_string(), self.username.clone());
        params.insert("pass".to_string(), self.password.expose().to_string());
        if let Some(ssl) = &self.sslmode {
            params.insert("sslmode".to_string(), ssl.clone());
        }
        params
    }
}

/// A row source over PostgreSQL tables.
///
/// ```rust,ignore
/// use term_reconcile::sources::{PostgresConfig, PostgresSource};
///
/// let config = PostgresConfig {
///     host: "localhost".to_string(),
///     port: 5432,
///     database: "shop".to_string(),
///     username: "reader".to_string(),
///     password: "secret".into(),
///     sslmode: Some("disable".to_string()),
/// };
/// let source = PostgresSource::connect(config, &["orders"]).await?;
/// let cursor = source.open("SELECT id, amount FROM orders ORDER BY id").await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresSource {
    inner: SqlSource,
    description: String,
}

impl PostgresSource {
    /// Connects to the server and registers `tables` under their own names.
    #[instrument(skip(config), fields(host = %config.host, database = %config.database))]
    pub async fn connect(config: PostgresConfig, tables: &[&str]) -> Result<Self> {
        let pool = PostgresConnectionPool::new(to_secret_map(config.params()))
            .await
            .map_err(|e| {
                ReconcileError::data_source_with_source(
                    SOURCE_TYPE,
                    "failed to create connection pool",
                    Box::new(e),
                )
            })?;
        let factory = PostgresTableFactory::new(Arc::new(pool));

        let ctx = SessionContext::new();
        for table in tables {
            let provider = factory
                .table_provider(TableReference::bare(*table))
                .await
                .map_err(|e| {
                    ReconcileError::data_source(
                        SOURCE_TYPE,
                        format!("failed to create table provider for '{table}': {e}"),
                    )
                })?;
            ctx.register_table(*table, provider).map_err(|e| {
                ReconcileError::data_source_with_source(
                    SOURCE_TYPE,
                    format!("failed to register table '{table}'"),
                    Box::new(e),
                )
            })?;
        }
        info!(tables = tables.len(), "Registered PostgreSQL tables");

        let description = format!(
            "PostgreSQL {}:{}/{}",
            config.host, config.port, config.database
        );
        Ok(Self {
            inner: SqlSource::new(ctx).with_label(description.clone()),
            description,
        })
    }
}

#[async_trait]
impl RowSource for PostgresSource {
    async fn open(&self, query: &str) -> Result<Box<dyn RowCursor>> {
        self.inner.open(query).await
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
