//! Statement execution engine.
//!
//! This module runs a single statement on an open connection and collects
//! what the driver returns: result rows for queries, an affected-row count
//! for everything else. There is no explicit transaction, so each statement
//! is committed by the server as soon as it completes (autocommit).
//!
//! Each backend gets its own runner module so rows are decoded with the
//! driver's concrete row type.

use crate::db::connection::{DatabaseType, DbConnection};
use crate::db::params::SqlParam;
use crate::db::types::{JsonRow, RowToJson};
use crate::error::{DbError, DbResult};
use futures_util::TryStreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    /// Rows returned by a query, exactly as decoded from the driver
    Rows(Vec<JsonRow>),
    /// Statement without a result set (DDL, DML)
    Affected { rows_affected: u64 },
}

impl StatementOutcome {
    pub fn row_count(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Affected { .. } => 0,
        }
    }
}

/// Fixed catalog query listing the user's tables.
pub fn catalog_query(db_type: DatabaseType) -> &'static str {
    match db_type {
        DatabaseType::PostgreSQL => {
            "SELECT table_name::text AS table_name FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
             ORDER BY table_name"
        }
        DatabaseType::MySQL => {
            "SELECT table_name AS table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
             ORDER BY table_name"
        }
        DatabaseType::SQLite => {
            "SELECT name AS table_name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name"
        }
    }
}

/// Leading keywords of statements that produce a result set.
const QUERY_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "VALUES", "SHOW", "PRAGMA", "EXPLAIN", "DESCRIBE", "DESC", "TABLE",
];

/// Whether a statement is a query, judged by its leading keyword.
///
/// Only consulted when the driver returned no rows, to tell an empty
/// result set apart from a statement that has none.
pub fn is_query_statement(sql: &str) -> bool {
    let mut rest = sql.trim_start();
    loop {
        if let Some(stripped) = rest.strip_prefix("--") {
            rest = stripped.split_once('\n').map(|(_, r)| r).unwrap_or("");
        } else if let Some(stripped) = rest.strip_prefix("/*") {
            rest = stripped.split_once("*/").map(|(_, r)| r).unwrap_or("");
        } else if let Some(stripped) = rest.strip_prefix('(') {
            rest = stripped;
        } else {
            break;
        }
        rest = rest.trim_start();
    }

    let keyword: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    QUERY_KEYWORDS.contains(&keyword.as_str())
}

/// Executes single statements with a per-statement timeout.
pub struct StatementExecutor {
    query_timeout: Duration,
}

impl StatementExecutor {
    /// Create a new executor with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS))
    }

    pub fn with_timeout(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }

    /// Run the catalog query for the connection's backend.
    pub async fn list_tables(&self, conn: &mut DbConnection) -> DbResult<StatementOutcome> {
        let sql = catalog_query(conn.db_type());
        let outcome = self.execute(conn, sql, &[]).await?;
        // The catalog query is a SELECT, so an empty catalog is still a row set
        Ok(match outcome {
            StatementOutcome::Affected { .. } => StatementOutcome::Rows(Vec::new()),
            rows => rows,
        })
    }

    /// Execute a statement and collect its rows or affected-row count.
    pub async fn execute(
        &self,
        conn: &mut DbConnection,
        sql: &str,
        params: &[SqlParam],
    ) -> DbResult<StatementOutcome> {
        let start = Instant::now();

        debug!(
            sql = %sql,
            param_types = ?params.iter().map(SqlParam::type_name).collect::<Vec<_>>(),
            timeout_secs = self.query_timeout.as_secs(),
            "Executing statement"
        );

        let collected = match conn {
            DbConnection::MySql(c) => {
                timeout(self.query_timeout, mysql::run(c, sql, params)).await
            }
            DbConnection::Postgres(c) => {
                timeout(self.query_timeout, postgres::run(c, sql, params)).await
            }
            DbConnection::SQLite(c) => {
                timeout(self.query_timeout, sqlite::run(c, sql, params)).await
            }
        };

        let (rows, rows_affected) = match collected {
            Ok(result) => result?,
            Err(_) => {
                return Err(DbError::timeout(
                    "statement execution",
                    self.query_timeout.as_secs(),
                ));
            }
        };

        let outcome = if !rows.is_empty() || is_query_statement(sql) {
            StatementOutcome::Rows(rows)
        } else {
            StatementOutcome::Affected { rows_affected }
        };

        debug!(
            rows = outcome.row_count(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Statement finished"
        );

        Ok(outcome)
    }
}

impl Default for StatementExecutor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// With no parameters the SQL is sent unprepared, because some statements
// (CREATE PROCEDURE and friends) cannot be prepared.

macro_rules! backend_runner {
    ($module:ident, $conn:ty, $bind:path) => {
        mod $module {
            use super::*;
            use sqlx::{Either, Executor};

            pub async fn run(
                conn: &mut $conn,
                sql: &str,
                params: &[SqlParam],
            ) -> DbResult<(Vec<JsonRow>, u64)> {
                let mut stream = if params.is_empty() {
                    conn.fetch_many(sql)
                } else {
                    let query = params
                        .iter()
                        .fold(sqlx::query(sql), |query, param| $bind(query, param));
                    conn.fetch_many(query)
                };

                let mut rows = Vec::new();
                let mut rows_affected = 0;
                while let Some(item) = stream.try_next().await? {
                    match item {
                        Either::Left(done) => rows_affected += done.rows_affected(),
                        Either::Right(row) => rows.push(row.to_json_map()),
                    }
                }
                Ok((rows, rows_affected))
            }
        }
    };
}

backend_runner!(mysql, sqlx::MySqlConnection, crate::db::params::bind_mysql_param);
backend_runner!(postgres, sqlx::PgConnection, crate::db::params::bind_postgres_param);
backend_runner!(sqlite, sqlx::SqliteConnection, crate::db::params::bind_sqlite_param);
