//! Configuration handling for the DB Bridge MCP server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::db::executor::DEFAULT_QUERY_TIMEOUT_SECS;
use crate::db::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use crate::db::{ConnectionSettings, RetryPolicy};
use crate::error::{DbError, DbResult};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// DB Bridge MCP server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "db-bridge-mcp")]
#[command(version, about = "MCP bridge for listing tables and executing SQL on a database")]
pub struct Config {
    /// Database connection string (postgres://, mysql:// or sqlite:)
    #[arg(long, value_name = "URL", env = "DB_CONNECTION_STRING")]
    pub connection_string: Option<String>,

    /// Database user, injected into the connection string
    #[arg(long, env = "DB_USER")]
    pub user: Option<String>,

    /// Database password, injected into the connection string
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Retry failed connection attempts (true/false, 1/0, yes/no, on/off)
    #[arg(
        long,
        env = "DB_SELF_HEALING",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub self_healing: bool,

    /// Total connection attempts when self-healing is enabled
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_ATTEMPTS,
        env = "DB_MAX_RETRIES"
    )]
    pub max_retries: u32,

    /// Delay between connection attempts in milliseconds
    #[arg(
        long,
        default_value_t = DEFAULT_RETRY_DELAY_MS,
        env = "DB_RETRY_DELAY_MS"
    )]
    pub retry_delay_ms: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "DB_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "DB_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(
        long,
        env = "MCP_JSON_LOGS",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            connection_string: None,
            user: None,
            password: None,
            self_healing: false,
            max_retries: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Build connection settings from the connection string and credentials.
    pub fn connection_settings(&self) -> DbResult<ConnectionSettings> {
        let connection_string = self.connection_string.as_deref().ok_or_else(|| {
            DbError::configuration(
                "no connection string configured (set --connection-string or DB_CONNECTION_STRING)",
            )
        })?;

        ConnectionSettings::new(
            connection_string,
            self.user.as_deref(),
            self.password.as_deref(),
            self.connect_timeout_duration(),
        )
    }

    /// Connection retry behavior derived from the self-healing flag.
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.self_healing {
            RetryPolicy::self_healing(self.max_retries, self.retry_delay())
        } else {
            RetryPolicy::disabled()
        }
    }

    /// Get the delay between connection attempts as a Duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseType;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.connection_string.is_none());
        assert!(!config.self_healing);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_timeout_durations() {
        let config = Config {
            query_timeout: 60,
            connect_timeout: 15,
            retry_delay_ms: 250,
            ..Config::default()
        };
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(60));
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(15));
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_flags() {
        let config = Config::try_parse_from([
            "db-bridge-mcp",
            "--connection-string",
            "postgres://db.internal:5432/app",
            "--user",
            "scott",
            "--password",
            "tiger",
            "--self-healing",
            "--max-retries",
            "5",
            "--retry-delay-ms",
            "200",
        ])
        .unwrap();

        assert_eq!(
            config.connection_string.as_deref(),
            Some("postgres://db.internal:5432/app")
        );
        assert_eq!(config.user.as_deref(), Some("scott"));
        assert!(config.self_healing);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay_ms, 200);
    }

    #[test]
    fn test_self_healing_accepts_boolish_values() {
        for (value, expected) in [
            ("yes", true),
            ("TRUE", true),
            ("on", true),
            ("0", false),
            ("no", false),
        ] {
            let flag = format!("--self-healing={value}");
            let config = Config::try_parse_from(["db-bridge-mcp", flag.as_str()]).unwrap();
            assert_eq!(config.self_healing, expected, "{value}");
        }

        assert!(Config::try_parse_from(["db-bridge-mcp", "--self-healing=maybe"]).is_err());
    }

    #[test]
    fn test_self_healing_from_numeric_env_value() {
        // SAFETY: every other parse in this module passes the flag explicitly
        unsafe { std::env::set_var("DB_SELF_HEALING", "1") };
        let parsed = Config::try_parse_from(["db-bridge-mcp"]);
        unsafe { std::env::remove_var("DB_SELF_HEALING") };

        let config = parsed.unwrap();
        assert!(config.self_healing);
        assert!(config.retry_policy().self_healing);
    }

    #[test]
    fn test_retry_policy_disabled_by_default() {
        let config = Config {
            max_retries: 7,
            ..Config::default()
        };
        let policy = config.retry_policy();
        assert!(!policy.self_healing);
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn test_retry_policy_self_healing() {
        let config = Config {
            self_healing: true,
            max_retries: 4,
            retry_delay_ms: 50,
            ..Config::default()
        };
        let policy = config.retry_policy();
        assert!(policy.self_healing);
        assert_eq!(policy.attempts(), 4);
        assert_eq!(policy.delay, Duration::from_millis(50));
    }

    #[test]
    fn test_connection_settings_requires_connection_string() {
        let err = Config::default().connection_settings().unwrap_err();
        assert!(matches!(err, DbError::Configuration { .. }));
    }

    #[test]
    fn test_connection_settings_injects_credentials() {
        let config = Config {
            connection_string: Some("mysql://db.internal:3306/sales".to_string()),
            user: Some("scott".to_string()),
            password: Some("tiger".to_string()),
            ..Config::default()
        };
        let settings = config.connection_settings().unwrap();
        assert_eq!(settings.db_type(), DatabaseType::MySQL);
        assert_eq!(settings.connect_timeout(), Duration::from_secs(10));

        let masked = settings.masked_url();
        assert!(masked.contains("scott"));
        assert!(!masked.contains("tiger"));
    }

    #[test]
    fn test_connection_settings_rejects_unknown_scheme() {
        let config = Config {
            connection_string: Some("oracle://db.internal:1521/XE".to_string()),
            ..Config::default()
        };
        assert!(config.connection_settings().is_err());
    }
}
