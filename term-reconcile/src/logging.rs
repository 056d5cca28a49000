//! Logging configuration for reconciliation runs.
//!
//! Diagnostics go through `tracing`. [`LogConfig`] travels with a
//! [`ReconcileConfig`](crate::config::ReconcileConfig) and gates the noisier
//! events (one per aligned pair, one per fetch) so that large runs stay cheap.

use serde::{Deserialize, Serialize};
use tracing::Level;

/// Logging switches for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Most verbose level of engine events; noisier events are skipped before
    /// their fields are formatted.
    #[serde(with = "level_serde")]
    pub base_level: Level,
    /// Emit one debug event per non-matching aligned pair.
    pub log_pair_details: bool,
    /// Emit an event per source open and fetch.
    pub log_data_operations: bool,
    /// Maximum length of logged values.
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_pair_details: false,
            log_data_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Everything on, for debugging a reconciliation.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_pair_details: true,
            log_data_operations: true,
            max_field_length: 1024,
        }
    }

    /// Lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_pair_details: false,
            log_data_operations: false,
            max_field_length: 128,
        }
    }

    /// Returns true if events at `level` pass the base level.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.base_level
    }
}

mod level_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Level>().map_err(serde::de::Error::custom)
    }
}

/// Debug logging that skips argument evaluation below the base level.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.enabled(tracing::Level::DEBUG) {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs a non-matching aligned pair when pair details are enabled.
#[macro_export]
macro_rules! log_pair {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_pair_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs a data source operation when data operation logging is enabled.
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations && $config.enabled(tracing::Level::INFO) {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a value to at most `max_length` characters.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    match value.char_indices().nth(max_length) {
        None => value.to_string(),
        Some((end, _)) => format!("{}...(truncated)", &value[..end]),
    }
}

/// Installation of a global `tracing` subscriber.
pub mod setup {
    use tracing::Level;

    /// Subscriber settings.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for everything outside this crate.
        pub level: Level,
        /// Level for `term_reconcile` targets.
        pub crate_level: Level,
        pub json_format: bool,
        /// Overrides the generated filter directive.
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON output, warnings only outside this crate.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                crate_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_crate_level(mut self, level: Level) -> Self {
            self.crate_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// The filter directive used when `RUST_LOG` is unset.
        pub fn env_filter(&self) -> String {
            match &self.env_filter {
                Some(filter) => filter.clone(),
                None => format!(
                    "{},term_reconcile={}",
                    self.level.as_str().to_lowercase(),
                    self.crate_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a registry with an `EnvFilter` and a plain or JSON fmt layer.
    ///
    /// `RUST_LOG` takes precedence over the configured filter. Fails if a
    /// global subscriber is already installed.
    ///
    /// ```rust,no_run
    /// use term_reconcile::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_presets() {
        let default = LogConfig::default();
        assert_eq!(default.base_level, Level::INFO);
        assert!(!default.log_pair_details);
        assert!(default.log_data_operations);

        let verbose = LogConfig::verbose();
        assert_eq!(verbose.base_level, Level::DEBUG);
        assert!(verbose.log_pair_details);

        let production = LogConfig::production();
        assert_eq!(production.base_level, Level::WARN);
        assert!(!production.log_data_operations);
        assert_eq!(production.max_field_length, 128);
    }

    #[test]
    fn test_base_level_gates_events() {
        let default = LogConfig::default();
        assert!(default.enabled(Level::WARN));
        assert!(default.enabled(Level::INFO));
        assert!(!default.enabled(Level::DEBUG));

        assert!(LogConfig::verbose().enabled(Level::DEBUG));
        assert!(!LogConfig::verbose().enabled(Level::TRACE));

        let production = LogConfig::production();
        assert!(production.enabled(Level::ERROR));
        assert!(!production.enabled(Level::INFO));

        let quiet = LogConfig {
            base_level: Level::WARN,
            ..LogConfig::default()
        };
        let mut evaluated = false;
        log_data_op!(quiet, value = {
            evaluated = true;
            1
        }, "skipped");
        perf_debug!(quiet, value = {
            evaluated = true;
            2
        }, "skipped");
        assert!(!evaluated);
    }

    #[test]
    fn test_level_serde() {
        let json = serde_json::to_string(&LogConfig::verbose()).unwrap();
        assert!(json.contains(r#""base_level":"debug""#));
        let back: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LogConfig::verbose());

        let partial: LogConfig = serde_json::from_str(r#"{"base_level": "warn"}"#).unwrap();
        assert_eq!(partial.base_level, Level::WARN);
        assert!(serde_json::from_str::<LogConfig>(r#"{"base_level": "loud"}"#).is_err());
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text", 10),
            "this is a ...(truncated)"
        );
        assert_eq!(truncate_field("héllo", 2), "hé...(truncated)");
    }

    #[test]
    fn test_env_filter() {
        assert_eq!(
            LoggingConfig::default().env_filter(),
            "info,term_reconcile=debug"
        );
        assert_eq!(
            LoggingConfig::default()
                .with_env_filter("warn")
                .env_filter(),
            "warn"
        );
    }
}
