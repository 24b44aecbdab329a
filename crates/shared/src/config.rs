//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger engine tuning.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Whether SQL statements are logged through `tracing`.
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger engine configuration.
///
/// `max_attempts` bounds how many times a whole document transaction is
/// replayed after a concurrency conflict before the conflict is surfaced.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Total attempts (first try included) for conflict-class failures.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff between attempts, multiplied by the attempt number.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Drop cost batches once their remaining quantity reaches zero.
    #[serde(default = "default_prune_exhausted_batches")]
    pub prune_exhausted_batches: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    25
}

fn default_prune_exhausted_batches() -> bool {
    true
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            prune_exhausted_batches: default_prune_exhausted_batches(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones:
    /// `config/default`, `config/{RUN_MODE}`, `STOCKLEDGER__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("STOCKLEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reads a `.env` file if one exists, then loads configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load_with_dotenv() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_config_defaults() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.retry_backoff_ms, 25);
        assert!(cfg.prune_exhausted_batches);
    }

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("STOCKLEDGER__DATABASE__URL", Some("postgres://localhost/stock")),
                ("STOCKLEDGER__LEDGER__MAX_ATTEMPTS", Some("5")),
                ("RUN_MODE", None),
            ],
            || {
                let cfg = AppConfig::load().unwrap();
                assert_eq!(cfg.database.url, "postgres://localhost/stock");
                assert_eq!(cfg.database.max_connections, 10);
                assert_eq!(cfg.ledger.max_attempts, 5);
                assert_eq!(cfg.ledger.retry_backoff_ms, 25);
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_vars(
            [
                ("STOCKLEDGER__DATABASE__URL", None::<&str>),
                ("RUN_MODE", None),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[test]
    fn test_deserialize_partial_ledger_section() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{"database":{"url":"postgres://db"},"ledger":{"prune_exhausted_batches":false}}"#,
        )
        .unwrap();
        assert!(!cfg.ledger.prune_exhausted_batches);
        assert_eq!(cfg.ledger.max_attempts, 3);
        assert_eq!(cfg.database.min_connections, 1);
    }
}
