//! DB Bridge MCP Library
//!
//! This library exposes a single SQL database (SQLite, PostgreSQL, MySQL) to
//! AI agents through two MCP tools: listing tables and executing SQL.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::BridgeService;
