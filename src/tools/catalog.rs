//! Table catalog tool.
//!
//! This module implements the `list_tables` MCP tool, which runs a fixed
//! catalog query on a fresh connection.

use crate::db::{Connector, StatementExecutor, StatementOutcome};
use crate::error::DbResult;
use std::sync::Arc;
use tracing::info;

pub struct CatalogToolHandler {
    connector: Arc<Connector>,
    executor: StatementExecutor,
}

impl CatalogToolHandler {
    pub fn new(connector: Arc<Connector>, executor: StatementExecutor) -> Self {
        Self {
            connector,
            executor,
        }
    }

    /// List the tables visible to the configured user.
    pub async fn list_tables(&self) -> DbResult<StatementOutcome> {
        let mut conn = self.connector.acquire().await?;
        let result = self.executor.list_tables(&mut conn).await;
        conn.release().await;

        let outcome = result?;
        info!(tables = outcome.row_count(), "Listed tables");
        Ok(outcome)
    }
}
