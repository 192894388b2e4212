//! SQL execution tool.
//!
//! This module implements the `execute_query` MCP tool. Any statement is
//! accepted (queries, DML, DDL); it runs on a fresh connection with
//! autocommit, so changes persist as soon as the call returns.

use crate::db::{Connector, SqlParam, SqlParamInput, StatementExecutor, StatementOutcome};
use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteQueryInput {
    /// The full SQL statement to execute (CREATE, INSERT, SELECT, UPDATE, DELETE, ...)
    pub sql: String,
    /// Positional parameters for placeholders in the SQL (? for MySQL/SQLite, $1, $2... for PostgreSQL)
    #[serde(default)]
    pub params: Vec<SqlParamInput>,
}

pub struct ExecuteToolHandler {
    connector: Arc<Connector>,
    executor: StatementExecutor,
}

impl ExecuteToolHandler {
    pub fn new(connector: Arc<Connector>, executor: StatementExecutor) -> Self {
        Self {
            connector,
            executor,
        }
    }

    pub async fn execute(&self, input: ExecuteQueryInput) -> DbResult<StatementOutcome> {
        if input.sql.trim().is_empty() {
            return Err(DbError::invalid_input("sql must not be empty"));
        }

        let params: Vec<SqlParam> = input.params.into_iter().map(Into::into).collect();
        let start = Instant::now();

        let mut conn = self.connector.acquire().await?;
        let result = self.executor.execute(&mut conn, &input.sql, &params).await;
        conn.release().await;

        let outcome = result?;
        match &outcome {
            StatementOutcome::Rows(rows) => info!(
                rows = rows.len(),
                execution_time_ms = start.elapsed().as_millis() as u64,
                "Query executed"
            ),
            StatementOutcome::Affected { rows_affected } => info!(
                rows_affected = rows_affected,
                execution_time_ms = start.elapsed().as_millis() as u64,
                "Command executed"
            ),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConnectionSettings, RetryPolicy};
    use std::time::Duration;

    #[test]
    fn test_execute_input_defaults() {
        let input: ExecuteQueryInput =
            serde_json::from_str(r#"{"sql": "SELECT table_name FROM user_tables"}"#).unwrap();
        assert_eq!(input.sql, "SELECT table_name FROM user_tables");
        assert!(input.params.is_empty());
    }

    #[test]
    fn test_execute_input_with_params() {
        let input: ExecuteQueryInput = serde_json::from_str(
            r#"{"sql": "INSERT INTO users (name, age) VALUES (?, ?)", "params": ["Alice", 30]}"#,
        )
        .unwrap();
        assert_eq!(input.params.len(), 2);
    }

    #[test]
    fn test_execute_input_requires_sql() {
        assert!(serde_json::from_str::<ExecuteQueryInput>(r#"{"params": []}"#).is_err());
    }

    #[tokio::test]
    async fn test_blank_sql_rejected_before_connecting() {
        // The database is unreachable, so reaching the connector would fail differently
        let settings = ConnectionSettings::new(
            "sqlite:/nonexistent-dir-for-db-bridge/app.db",
            None,
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let connector = Arc::new(Connector::new(settings, RetryPolicy::disabled()));
        let handler = ExecuteToolHandler::new(connector, StatementExecutor::new());

        let err = handler
            .execute(ExecuteQueryInput {
                sql: "   ".to_string(),
                params: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }
}
