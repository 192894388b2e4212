//! MCP tool implementations.
//!
//! This module contains the database tool handlers:
//! - `list_tables`: List the tables of the connected database
//! - `execute_query`: Execute any SQL statement with autocommit
//! - `format`: Rendering of statement outcomes as tool text

pub mod catalog;
pub mod execute;
pub mod format;

pub use catalog::CatalogToolHandler;
pub use execute::{ExecuteQueryInput, ExecuteToolHandler};
pub use format::{CommandSummary, render_outcome, text_success};
