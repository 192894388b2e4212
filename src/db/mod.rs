//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Single-shot connections per tool call
//! - Connection acquisition with optional self-healing retry
//! - Statement execution with positional parameters
//! - Type mappings from driver rows to JSON

pub mod connection;
pub mod executor;
pub mod params;
pub mod retry;
pub mod types;

pub use connection::{ConnectionSettings, DatabaseType, DbConnection};
pub use executor::{StatementExecutor, StatementOutcome};
pub use params::{SqlParam, SqlParamInput};
pub use retry::{Connector, RetryPolicy};
pub use types::JsonRow;
