//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
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
    /// Connection acquire timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    8
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// How many times a conflicting post is retried before giving up.
    #[serde(default = "default_max_post_retries")]
    pub max_post_retries: u32,
    /// Base backoff between post retries, multiplied by the attempt number.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Reject lines that carry both a debit and a credit (or neither).
    #[serde(default)]
    pub require_single_sided_lines: bool,
    /// IANA time zone used to decide what "today" is for reports.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_post_retries: default_max_post_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            require_single_sided_lines: false,
            timezone: default_timezone(),
        }
    }
}

fn default_max_post_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    25
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for local development.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_filter() -> String {
    "tally=debug,tower_http=debug".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `TALLY__*` environment variables (e.g. `TALLY__DATABASE__URL`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment_with_defaults() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", Some("postgres://localhost/tally_test")),
                ("RUN_MODE", Some("test-does-not-exist")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/tally_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.ledger.max_post_retries, 3);
                assert_eq!(config.ledger.retry_backoff_ms, 25);
                assert!(!config.ledger.require_single_sided_lines);
                assert_eq!(config.ledger.timezone, "UTC");
                assert_eq!(config.logging.format, LogFormat::Pretty);
            },
        );
    }

    #[test]
    fn test_environment_overrides_ledger_settings() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", Some("postgres://localhost/tally_test")),
                ("TALLY__LEDGER__MAX_POST_RETRIES", Some("7")),
                ("TALLY__LEDGER__TIMEZONE", Some("Africa/Nairobi")),
                ("TALLY__LOGGING__FORMAT", Some("json")),
                ("RUN_MODE", Some("test-does-not-exist")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ledger.max_post_retries, 7);
                assert_eq!(config.ledger.timezone, "Africa/Nairobi");
                assert_eq!(config.logging.format, LogFormat::Json);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", None::<&str>),
                ("RUN_MODE", Some("test-does-not-exist")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
