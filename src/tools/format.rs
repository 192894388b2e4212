//! Output formatting for tool results.
//!
//! Results are returned to the agent as a single JSON text block: the row
//! array for queries, or a short command summary for statements without rows.

use crate::db::StatementOutcome;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

pub const COMMAND_SUCCESS_MESSAGE: &str = "Command executed successfully";

/// Summary returned for statements that produce no rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSummary {
    pub message: &'static str,
    pub rows_affected: u64,
}

/// Render an outcome as JSON text.
pub fn render_outcome(outcome: &StatementOutcome) -> Result<String, serde_json::Error> {
    match outcome {
        StatementOutcome::Rows(rows) => serde_json::to_string(rows),
        StatementOutcome::Affected { rows_affected } => serde_json::to_string(&CommandSummary {
            message: COMMAND_SUCCESS_MESSAGE,
            rows_affected: *rows_affected,
        }),
    }
}

/// Wrap rendered text in a successful tool result.
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}
