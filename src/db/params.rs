//! Positional statement parameters.
//!
//! Tool arguments arrive as untyped JSON. They are converted to [`SqlParam`]
//! and bound through the driver's parameter API, so values never end up in
//! the SQL text.

use schemars::JsonSchema;
use serde::Deserialize;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    String(String),
}

impl SqlParam {
    /// Get the type name of this parameter for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

/// Input parameter that can be various JSON scalar types.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SqlParamInput {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// String value
    String(String),
}

impl From<SqlParamInput> for SqlParam {
    fn from(input: SqlParamInput) -> Self {
        match input {
            SqlParamInput::Null => SqlParam::Null,
            SqlParamInput::Bool(v) => SqlParam::Bool(v),
            SqlParamInput::Int(v) => SqlParam::Int(v),
            SqlParamInput::Float(v) => SqlParam::Float(v),
            SqlParamInput::String(v) => SqlParam::String(v),
        }
    }
}

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q SqlParam,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        SqlParam::Null => query.bind(None::<String>),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::String(v) => query.bind(v.as_str()),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q SqlParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        SqlParam::Null => query.bind(None::<String>),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::String(v) => query.bind(v.as_str()),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q SqlParam,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        SqlParam::Null => query.bind(None::<String>),
        SqlParam::Bool(v) => query.bind(*v),
        SqlParam::Int(v) => query.bind(*v),
        SqlParam::Float(v) => query.bind(*v),
        SqlParam::String(v) => query.bind(v.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<SqlParam> {
        serde_json::from_str::<Vec<SqlParamInput>>(json)
            .unwrap()
            .into_iter()
            .map(SqlParam::from)
            .collect()
    }

    #[test]
    fn test_untyped_json_maps_to_typed_params() {
        let params = parse(r#"[null, true, 42, 2.5, "O'Brien"]"#);
        assert_eq!(
            params,
            vec![
                SqlParam::Null,
                SqlParam::Bool(true),
                SqlParam::Int(42),
                SqlParam::Float(2.5),
                SqlParam::String("O'Brien".to_string()),
            ]
        );
    }

    #[test]
    fn test_integers_prefer_int_over_float() {
        assert_eq!(parse("[-7]"), vec![SqlParam::Int(-7)]);
        assert_eq!(parse("[7.0]"), vec![SqlParam::Float(7.0)]);
    }

    #[test]
    fn test_non_scalar_params_rejected() {
        assert!(serde_json::from_str::<Vec<SqlParamInput>>(r#"[{"a": 1}]"#).is_err());
        assert!(serde_json::from_str::<Vec<SqlParamInput>>("[[1, 2]]").is_err());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(SqlParam::Null.type_name(), "null");
        assert_eq!(SqlParam::String("x".into()).type_name(), "string");
    }
}
