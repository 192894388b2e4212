//! MCP service implementation using rmcp.
//!
//! This module defines the BridgeService struct with the two database tools
//! exposed via the MCP protocol. The tool catalog comes from the rmcp
//! `#[tool_router]` macros; dispatch is done by hand so that every call,
//! including one naming an unknown tool, ends in a tool result. Failures are
//! returned as flagged (`isError: true`) text, never as protocol errors.

use crate::db::{Connector, StatementExecutor};
use crate::error::DbError;
use crate::tools::{
    CatalogToolHandler, ExecuteQueryInput, ExecuteToolHandler, render_outcome, text_success,
};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_router,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const LIST_TABLES_TOOL: &str = "list_tables";
pub const EXECUTE_QUERY_TOOL: &str = "execute_query";

#[derive(Clone)]
pub struct BridgeService {
    /// Opens one connection per tool call
    connector: Arc<Connector>,
    /// Statement timeout applied to both tools
    query_timeout: Duration,
    /// Tool router for the MCP tool catalog (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl BridgeService {
    /// Create a new BridgeService instance.
    ///
    /// # Arguments
    ///
    /// * `connector` - Opens database connections, retrying when self-healing is on
    /// * `query_timeout` - Maximum time a single statement may run
    pub fn new(connector: Arc<Connector>, query_timeout: Duration) -> Self {
        Self {
            connector,
            query_timeout,
            tool_router: Self::tool_router(),
        }
    }

    fn executor(&self) -> StatementExecutor {
        StatementExecutor::with_timeout(self.query_timeout)
    }

    /// Route a tool call by name.
    ///
    /// Never fails: unknown tools, malformed arguments and database errors
    /// all come back as flagged tool results.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        debug!(tool = %name, "Dispatching tool call");

        let result = match name {
            LIST_TABLES_TOOL => self.list_tables().await,
            EXECUTE_QUERY_TOOL => {
                let arguments = serde_json::Value::Object(arguments.unwrap_or_default());
                match serde_json::from_value::<ExecuteQueryInput>(arguments) {
                    Ok(input) => self.execute_query(Parameters(input)).await,
                    Err(e) => Ok(DbError::invalid_input(e.to_string()).to_tool_result()),
                }
            }
            _ => Ok(DbError::tool_not_found(name).to_tool_result()),
        };

        let result = result.unwrap_or_else(|e| {
            CallToolResult::error(vec![Content::text(format!("Database Error: {}", e.message))])
        });
        if result.is_error == Some(true) {
            warn!(tool = %name, "Tool call returned an error");
        }
        result
    }
}

#[tool_router]
impl BridgeService {
    #[tool(
        description = "Lists all tables in the database to understand the data structure.\nReturns a JSON array of rows with a table_name column."
    )]
    async fn list_tables(&self) -> Result<CallToolResult, McpError> {
        let handler = CatalogToolHandler::new(self.connector.clone(), self.executor());
        match handler.list_tables().await {
            Ok(outcome) => render_outcome(&outcome)
                .map(text_success)
                .map_err(|e| McpError::internal_error(e.to_string(), None)),
            Err(e) => Ok(e.to_tool_result()),
        }
    }

    #[tool(
        description = "Execute any SQL command (CREATE, INSERT, SELECT, UPDATE, DELETE) on the database.\nChanges are committed immediately (autocommit).\nQueries return a JSON array of rows; other statements return the number of affected rows.\nUse `params` for values instead of inlining them into the SQL."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<ExecuteQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        let handler = ExecuteToolHandler::new(self.connector.clone(), self.executor());
        match handler.execute(input).await {
            Ok(outcome) => render_outcome(&outcome)
                .map(text_success)
                .map_err(|e| McpError::internal_error(e.to_string(), None)),
            Err(e) => Ok(e.to_tool_result()),
        }
    }
}

impl ServerHandler for BridgeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "db-bridge-mcp".to_owned(),
                title: Some("DB Bridge MCP".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Bridge to a single SQL database.\n\
                \n\
                ## Workflow\n\
                1. Call `list_tables` to see which tables exist\n\
                2. Call `execute_query` with the SQL to run\n\
                \n\
                ## Notes\n\
                - Every statement is committed immediately; there are no transactions\n\
                - Pass values through `params` (? placeholders for MySQL/SQLite, $1, $2... for PostgreSQL)\n\
                - Errors come back as text starting with `Database Error:`, sometimes followed by a `Hint:` line"
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.dispatch(&request.name, request.arguments).await)
    }
}
