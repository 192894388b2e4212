//! Single-shot database connections.
//!
//! Every tool call opens its own connection and closes it before returning,
//! so this module deals in plain `sqlx` connections rather than pools. The
//! backend-specific connection types are wrapped in [`DbConnection`] to keep
//! full type support for each driver.

use crate::error::{DbError, DbResult};
use sqlx::{Connection, MySqlConnection, PgConnection, SqliteConnection};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Whether this backend authenticates with a user name and password.
    pub fn uses_credentials(&self) -> bool {
        !matches!(self, Self::SQLite)
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Everything needed to open a connection.
#[derive(Clone)]
pub struct ConnectionSettings {
    /// Contains credentials - never log, use `masked_url` instead
    url: String,
    db_type: DatabaseType,
    connect_timeout: Duration,
}

impl ConnectionSettings {
    /// Build settings from a connection string and optional credentials.
    ///
    /// `user` and `password` override whatever the URL carries. They are
    /// ignored for SQLite, which has no authentication.
    pub fn new(
        connection_string: &str,
        user: Option<&str>,
        password: Option<&str>,
        connect_timeout: Duration,
    ) -> DbResult<Self> {
        let connection_string = connection_string.trim();
        if connection_string.is_empty() {
            return Err(DbError::configuration(
                "DB_CONNECTION_STRING is empty. Provide a postgres://, mysql:// or sqlite: URL",
            ));
        }

        let db_type = DatabaseType::from_connection_string(connection_string).ok_or_else(|| {
            DbError::configuration(
                "Unknown database type in connection string. Supported schemes: postgres://, mysql://, sqlite:",
            )
        })?;

        let url = if db_type.uses_credentials() {
            with_credentials(connection_string, user, password)?
        } else {
            if user.is_some() || password.is_some() {
                debug!("Ignoring DB_USER/DB_PASSWORD for SQLite connection");
            }
            connection_string.to_string()
        };

        Ok(Self {
            url,
            db_type,
            connect_timeout,
        })
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Get a display-safe version of the connection URL (password masked).
    pub fn masked_url(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            _ => self.url.clone(),
        }
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.masked_url())
            .field("db_type", &self.db_type)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Inject user name and password into a server URL.
fn with_credentials(
    connection_string: &str,
    user: Option<&str>,
    password: Option<&str>,
) -> DbResult<String> {
    let mut url = Url::parse(connection_string)
        .map_err(|e| DbError::configuration(format!("Invalid connection URL: {e}")))?;

    if let Some(user) = user.filter(|u| !u.is_empty()) {
        url.set_username(user)
            .map_err(|_| DbError::configuration("Connection URL cannot carry a user name"))?;
    }
    if let Some(password) = password {
        url.set_password(Some(password))
            .map_err(|_| DbError::configuration("Connection URL cannot carry a password"))?;
    }

    Ok(url.to_string())
}

/// Database-specific connection (avoids AnyConnection limitations).
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Open a connection, bounded by the configured connect timeout.
    pub async fn open(settings: &ConnectionSettings) -> DbResult<Self> {
        let url = settings.url.as_str();
        let connect = async {
            match settings.db_type {
                DatabaseType::MySQL => MySqlConnection::connect(url).await.map(Self::MySql),
                DatabaseType::PostgreSQL => PgConnection::connect(url).await.map(Self::Postgres),
                DatabaseType::SQLite => SqliteConnection::connect(url).await.map(Self::SQLite),
            }
        };

        match timeout(settings.connect_timeout, connect).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(DbError::timeout(
                "database connect",
                settings.connect_timeout.as_secs(),
            )),
        }
    }

    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbConnection::MySql(_) => DatabaseType::MySQL,
            DbConnection::Postgres(_) => DatabaseType::PostgreSQL,
            DbConnection::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> DbResult<()> {
        match self {
            DbConnection::MySql(conn) => conn.close().await?,
            DbConnection::Postgres(conn) => conn.close().await?,
            DbConnection::SQLite(conn) => conn.close().await?,
        }
        Ok(())
    }

    /// Close the connection, logging instead of failing.
    ///
    /// Used on every tool exit path so a close error never masks the
    /// outcome of the statement itself.
    pub async fn release(self) {
        let db_type = self.db_type();
        match self.close().await {
            Ok(()) => debug!(db_type = %db_type, "Connection released"),
            Err(e) => warn!(db_type = %db_type, error = %e, "Failed to close connection"),
        }
    }
}
