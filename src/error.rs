//! Error types for the DB bridge.
//!
//! Every error is eventually rendered as a flagged tool result, so each variant
//! carries a message an AI assistant can act on. Vendor errors that match a
//! known pattern get a short remediation hint attached.

use rmcp::model::{CallToolResult, Content};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("{message}")]
    Database {
        message: String,
        /// Vendor code or SQLSTATE, e.g. "42P01" for undefined table
        code: Option<String>,
        hint: Option<&'static str>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Connection failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<DbError>,
    },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error, looking up a remediation hint for the vendor code.
    pub fn database(message: impl Into<String>, code: Option<String>) -> Self {
        let message = message.into();
        let hint = remediation_hint(code.as_deref(), &message);
        Self::Database {
            message,
            code,
            hint,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Wrap the last connection failure once every attempt has been used.
    pub fn retries_exhausted(attempts: u32, last_error: DbError) -> Self {
        Self::RetriesExhausted {
            attempts,
            last_error: Box::new(last_error),
        }
    }

    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    ///
    /// Exhausted retries report the suggestion of the last failed attempt.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { hint, .. } => *hint,
            Self::RetriesExhausted { last_error, .. } => last_error.suggestion(),
            _ => None,
        }
    }

    /// Render the error as the text an agent sees in a flagged tool result.
    pub fn to_tool_text(&self) -> String {
        match self.suggestion() {
            Some(hint) => format!("Database Error: {}\nHint: {}", self, hint),
            None => format!("Database Error: {}", self),
        }
    }

    /// Render the error as a flagged (`isError: true`) tool result.
    pub fn to_tool_result(&self) -> CallToolResult {
        CallToolResult::error(vec![Content::text(self.to_tool_text())])
    }
}

/// Map driver errors onto the bridge's taxonomy.
///
/// Server-reported errors keep their vendor code so a hint can be attached.
/// Transport-level failures become connection errors, pointing at the
/// setting most likely to be wrong.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                DbError::database(db_err.message(), db_err.code().map(|c| c.into_owned()))
            }
            sqlx::Error::Configuration(source) => DbError::connection(
                format!("Invalid connection settings: {source}"),
                "Check DB_CONNECTION_STRING, DB_USER and DB_PASSWORD",
            ),
            sqlx::Error::Io(source) => DbError::connection(
                format!("Network error: {source}"),
                "Check that the database server is reachable, or enable DB_SELF_HEALING to retry",
            ),
            sqlx::Error::Tls(source) => DbError::connection(
                format!("TLS handshake failed: {source}"),
                "Check the sslmode/ssl-mode parameters of DB_CONNECTION_STRING",
            ),
            sqlx::Error::Protocol(detail) => DbError::connection(
                format!("Unexpected server response: {detail}"),
                "Check that the URL scheme matches the database server",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Could not read column {index}: {source}"))
            }
            other => DbError::internal(other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Remediation Hints
// =============================================================================

const MISSING_OBJECT_HINT: &str =
    "The table or view does not exist. Call list_tables to see which tables are available.";

const BAD_CREDENTIALS_HINT: &str =
    "The database rejected the credentials. Check DB_USER and DB_PASSWORD.";

/// Vendor codes (SQLSTATE, MySQL error numbers, Oracle ORA- codes).
const MISSING_OBJECT_CODES: &[&str] = &["42P01", "42S02", "1146", "ORA-00942"];
const BAD_CREDENTIALS_CODES: &[&str] = &["28P01", "28000", "1045", "ORA-01017"];

/// Lower-case message fragments for drivers that report no code. Each entry
/// matches when all of its fragments appear in the message.
const MISSING_OBJECT_TEXT: &[&[&str]] = &[
    &["no such table"],
    &["table or view does not exist"],
    &["ora-00942"],
    &["relation \"", "does not exist"],
    &["table '", "doesn't exist"],
];
const BAD_CREDENTIALS_TEXT: &[&str] = &[
    "password authentication failed",
    "access denied",
    "ora-01017",
];

/// Look up a remediation hint for a vendor error.
///
/// The code is checked first; the message is only consulted when the code
/// is absent or unrecognised.
pub fn remediation_hint(code: Option<&str>, message: &str) -> Option<&'static str> {
    if let Some(code) = code.map(str::trim) {
        if MISSING_OBJECT_CODES.contains(&code) {
            return Some(MISSING_OBJECT_HINT);
        }
        if BAD_CREDENTIALS_CODES.contains(&code) {
            return Some(BAD_CREDENTIALS_HINT);
        }
    }

    let lower = message.to_lowercase();
    if BAD_CREDENTIALS_TEXT.iter().any(|p| lower.contains(p)) {
        Some(BAD_CREDENTIALS_HINT)
    } else if names_missing_table(&lower) {
        Some(MISSING_OBJECT_HINT)
    } else {
        None
    }
}

/// Postgres also reports missing columns as `column "x" of relation "t" does
/// not exist`, which must not count as a missing table.
fn names_missing_table(lower: &str) -> bool {
    !lower.starts_with("column ")
        && MISSING_OBJECT_TEXT
            .iter()
            .any(|fragments| fragments.iter().all(|f| lower.contains(f)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_hint_for_missing_table_codes() {
        assert_eq!(
            remediation_hint(Some("42P01"), "relation \"users\" does not exist"),
            Some(MISSING_OBJECT_HINT)
        );
        assert_eq!(
            remediation_hint(Some("1146"), "Table 'shop.users' doesn't exist"),
            Some(MISSING_OBJECT_HINT)
        );
        assert_eq!(
            remediation_hint(Some("ORA-00942"), "table or view does not exist"),
            Some(MISSING_OBJECT_HINT)
        );
    }

    #[test]
    fn test_hint_for_bad_credentials_codes() {
        assert_eq!(
            remediation_hint(Some("28P01"), "password authentication failed for user \"app\""),
            Some(BAD_CREDENTIALS_HINT)
        );
        assert_eq!(
            remediation_hint(Some("1045"), "Access denied for user 'app'@'localhost'"),
            Some(BAD_CREDENTIALS_HINT)
        );
    }

    #[test]
    fn test_hint_from_message_when_code_is_generic() {
        // SQLite reports "no such table" under the generic SQLITE_ERROR code
        assert_eq!(
            remediation_hint(Some("1"), "no such table: orders"),
            Some(MISSING_OBJECT_HINT)
        );
        assert_eq!(
            remediation_hint(None, "ORA-01017: invalid username/password; logon denied"),
            Some(BAD_CREDENTIALS_HINT)
        );
    }

    #[test]
    fn test_no_hint_for_unrecognised_errors() {
        assert_eq!(
            remediation_hint(Some("42601"), "syntax error at or near \"SELEC\""),
            None
        );
        assert_eq!(remediation_hint(None, "near \"FORM\": syntax error"), None);
    }

    #[test]
    fn test_no_table_hint_for_other_missing_objects() {
        assert_eq!(
            remediation_hint(Some("42703"), "column \"nme\" does not exist"),
            None
        );
        assert_eq!(
            remediation_hint(Some("42703"), "column \"nme\" of relation \"users\" does not exist"),
            None
        );
        assert_eq!(
            remediation_hint(Some("3D000"), "database \"shop\" does not exist"),
            None
        );
        assert_eq!(
            remediation_hint(Some("42883"), "function lenght(text) does not exist"),
            None
        );
        // Code-less drivers still get the hint for a missing relation
        assert_eq!(
            remediation_hint(None, "relation \"users\" does not exist"),
            Some(MISSING_OBJECT_HINT)
        );
        assert_eq!(
            remediation_hint(None, "Table 'shop.users' doesn't exist"),
            Some(MISSING_OBJECT_HINT)
        );
    }

    #[test]
    fn test_database_error_attaches_hint() {
        let err = DbError::database("no such table: orders", Some("1".to_string()));
        assert_eq!(err.suggestion(), Some(MISSING_OBJECT_HINT));

        let text = err.to_tool_text();
        assert!(text.starts_with("Database Error: no such table: orders"));
        assert!(text.contains("Hint: The table or view does not exist"));
    }

    #[test]
    fn test_database_error_without_hint_has_single_line() {
        let err = DbError::database("near \"FORM\": syntax error", Some("1".to_string()));
        assert_eq!(err.to_tool_text(), "Database Error: near \"FORM\": syntax error");
    }

    #[test]
    fn test_retries_exhausted_reports_attempts_and_last_error() {
        let last = DbError::connection("Network error: refused", "Check network connectivity");
        let err = DbError::retries_exhausted(3, last);
        let text = err.to_string();
        assert!(text.contains("after 3 attempts"));
        assert!(text.contains("refused"));
        assert_eq!(err.suggestion(), Some("Check network connectivity"));
    }

    #[test]
    fn test_tool_result_is_flagged() {
        let result = DbError::tool_not_found("drop_everything").to_tool_result();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.content.len(), 1);
    }
}
