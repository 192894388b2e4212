//! Row decoding into JSON.
//!
//! Result rows are relayed to the agent as JSON objects keyed by column name,
//! in select-list order. Each column is first classified into a
//! [`TypeCategory`] from the driver's type name, then decoded by the
//! backend-specific decoder for that category.
//!
//! Values the driver cannot hand over as any candidate Rust type become
//! `null` and are logged at debug level.

use crate::db::connection::DatabaseType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Uuid;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};
use tracing::debug;

/// A decoded result row, columns in select-list order.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Binary,
    Json,
    Temporal,
    /// Decoded as text (varchar, enum, ...). Postgres uuid and interval
    /// values are formatted from their driver types.
    Text,
}

/// Integer type names reported by the MySQL and PostgreSQL drivers.
const INTEGER_TYPES: &[&str] = &[
    "tinyint", "smallint", "mediumint", "int", "integer", "bigint", "int2", "int4", "int8",
    "serial", "bigserial", "smallserial", "oid",
];

impl TypeCategory {
    /// Classify a driver type name.
    pub fn of(type_name: &str, db: DatabaseType) -> Self {
        let name = type_name.to_ascii_lowercase();
        if db == DatabaseType::SQLite {
            return Self::of_sqlite(&name);
        }

        let base = name.trim_end_matches(" unsigned");
        match base {
            "bool" | "boolean" => Self::Boolean,
            "json" | "jsonb" => Self::Json,
            "bytea" => Self::Binary,
            "timestamp" | "timestamptz" | "datetime" | "date" | "time" => Self::Temporal,
            "real" | "float4" | "float8" => Self::Float,
            b if INTEGER_TYPES.contains(&b) => Self::Integer,
            b if b.contains("decimal") || b.contains("numeric") => Self::Decimal,
            b if b.contains("float") || b.contains("double") => Self::Float,
            b if b.contains("blob") || b.contains("binary") => Self::Binary,
            _ => Self::Text,
        }
    }

    /// SQLite column affinity rules, applied in SQLite's own order.
    ///
    /// Dates have no storage class of their own and stay text.
    fn of_sqlite(name: &str) -> Self {
        if name.contains("int") {
            Self::Integer
        } else if name.contains("char") || name.contains("clob") || name.contains("text") {
            Self::Text
        } else if name.contains("blob") {
            Self::Binary
        } else if name.contains("real") || name.contains("floa") || name.contains("doub") {
            Self::Float
        } else if name == "bool" || name == "boolean" {
            Self::Boolean
        } else if name.contains("numeric") || name.contains("decimal") {
            Self::Float
        } else {
            Self::Text
        }
    }
}

/// DECIMAL/NUMERIC as the exact text the server sent.
///
/// Relayed as a JSON string so no precision is lost on the way to the agent.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        TypeCategory::of(ty.name(), DatabaseType::MySQL) == TypeCategory::Decimal
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        <&str as Decode<sqlx::MySql>>::decode(value).map(|s| RawDecimal(s.to_owned()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        TypeCategory::of(ty.name(), DatabaseType::PostgreSQL) == TypeCategory::Decimal
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        <&str as Decode<sqlx::Postgres>>::decode(value).map(|s| RawDecimal(s.to_owned()))
    }
}

/// Encode binary data as JSON: UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_owned()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// NaN and infinities have no JSON number form.
fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn binary_value(v: Vec<u8>) -> JsonValue {
    decode_binary_value(&v)
}

fn naive_datetime_value(v: NaiveDateTime) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn utc_datetime_value(v: DateTime<Utc>) -> JsonValue {
    JsonValue::String(v.to_rfc3339())
}

fn date_value(v: NaiveDate) -> JsonValue {
    JsonValue::String(v.to_string())
}

fn time_value(v: NaiveTime) -> JsonValue {
    JsonValue::String(v.to_string())
}

fn uuid_value(v: Uuid) -> JsonValue {
    JsonValue::String(v.hyphenated().to_string())
}

/// ISO 8601 duration. Months and days are kept apart from the time part
/// because their length depends on the calendar.
fn interval_value(v: PgInterval) -> JsonValue {
    let seconds = v.microseconds as f64 / 1_000_000.0;
    JsonValue::String(format!("P{}M{}DT{}S", v.months, v.days, seconds))
}

/// Try each candidate type in order and convert the first one the driver
/// accepts for the column. SQL NULL becomes `null` for any candidate.
/// Evaluates to `None` when no candidate fits.
macro_rules! decode_first {
    ($row:expr, $idx:expr; $($ty:ty => $to_json:expr),+ $(,)?) => {{
        let mut decoded: Option<JsonValue> = None;
        $(
            if decoded.is_none() {
                if let Ok(value) = $row.try_get::<Option<$ty>, _>($idx) {
                    decoded = Some(value.map($to_json).unwrap_or(JsonValue::Null));
                }
            }
        )+
        decoded
    }};
}

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> JsonRow;
}

macro_rules! impl_row_to_json {
    ($row:ty, $db:expr, $decoder:ident) => {
        impl RowToJson for $row {
            fn to_json_map(&self) -> JsonRow {
                self.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| {
                        let type_name = col.type_info().name();
                        let category = TypeCategory::of(type_name, $db);
                        let value = $decoder::decode_column(self, idx, category).unwrap_or_else(|| {
                            debug!(column = %col.name(), type_name, "Column not decodable, relaying null");
                            JsonValue::Null
                        });
                        (col.name().to_owned(), value)
                    })
                    .collect()
            }
        }
    };
}

impl_row_to_json!(MySqlRow, DatabaseType::MySQL, mysql);
impl_row_to_json!(PgRow, DatabaseType::PostgreSQL, postgres);
impl_row_to_json!(SqliteRow, DatabaseType::SQLite, sqlite);

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> Option<JsonValue> {
        match category {
            // Each integer width only accepts its own column types
            TypeCategory::Integer => decode_first!(row, idx;
                i64 => JsonValue::from,
                u64 => JsonValue::from,
                i32 => JsonValue::from,
                u32 => JsonValue::from,
                i16 => JsonValue::from,
                u16 => JsonValue::from,
                i8 => JsonValue::from,
                u8 => JsonValue::from,
            ),
            TypeCategory::Decimal => decode_first!(row, idx; RawDecimal => |d: RawDecimal| JsonValue::String(d.0)),
            TypeCategory::Boolean => decode_first!(row, idx; bool => JsonValue::Bool, i8 => |v: i8| JsonValue::Bool(v != 0)),
            TypeCategory::Float => decode_first!(row, idx;
                f64 => float_value,
                f32 => |v: f32| float_value(f64::from(v)),
            ),
            TypeCategory::Binary => decode_first!(row, idx; Vec<u8> => binary_value),
            TypeCategory::Json => decode_first!(row, idx; JsonValue => |v: JsonValue| v),
            // MySQL keeps no zone with DATETIME or TIMESTAMP values. TIME values
            // outside 00:00-24:00 have no chrono form and fall through to text
            TypeCategory::Temporal => decode_first!(row, idx;
                NaiveDateTime => naive_datetime_value,
                NaiveDate => date_value,
                NaiveTime => time_value,
                String => JsonValue::String,
            ),
            // Text protocol results may still carry bytes
            TypeCategory::Text => decode_first!(row, idx; String => JsonValue::String, Vec<u8> => binary_value),
        }
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> Option<JsonValue> {
        let decoded = match category {
            TypeCategory::Integer => decode_first!(row, idx;
                i64 => JsonValue::from,
                i32 => JsonValue::from,
                i16 => JsonValue::from,
                sqlx::postgres::types::Oid => |v: sqlx::postgres::types::Oid| JsonValue::from(v.0),
            ),
            TypeCategory::Decimal => decode_first!(row, idx; RawDecimal => |d: RawDecimal| JsonValue::String(d.0)),
            TypeCategory::Boolean => decode_first!(row, idx; bool => JsonValue::Bool),
            TypeCategory::Float => decode_first!(row, idx;
                f64 => float_value,
                f32 => |v: f32| float_value(f64::from(v)),
            ),
            TypeCategory::Binary => decode_first!(row, idx; Vec<u8> => binary_value),
            TypeCategory::Json => decode_first!(row, idx; JsonValue => |v: JsonValue| v),
            TypeCategory::Temporal => decode_first!(row, idx;
                DateTime<Utc> => utc_datetime_value,
                NaiveDateTime => naive_datetime_value,
                NaiveDate => date_value,
                NaiveTime => time_value,
            ),
            TypeCategory::Text => decode_first!(row, idx;
                String => JsonValue::String,
                Uuid => uuid_value,
                PgInterval => interval_value,
            ),
        };
        decoded.or_else(|| server_text(row, idx))
    }

    /// Relay the server's own text rendering of a value no Rust type accepts
    /// (inet, enums, arrays, ranges...). Only values sent in text format have
    /// one; unparameterized statements always receive text.
    fn server_text(row: &PgRow, idx: usize) -> Option<JsonValue> {
        let raw = row.try_get_raw(idx).ok()?;
        if raw.is_null() {
            return Some(JsonValue::Null);
        }
        match raw.format() {
            PgValueFormat::Text => raw.as_str().ok().map(|s| JsonValue::String(s.to_owned())),
            PgValueFormat::Binary => None,
        }
    }
}

mod sqlite {
    use super::*;

    /// SQLite columns are dynamically typed: the declared type is only a
    /// hint, so every category falls back to whatever the stored value is.
    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> Option<JsonValue> {
        let preferred = match category {
            TypeCategory::Integer => decode_first!(row, idx; i64 => JsonValue::from),
            TypeCategory::Float | TypeCategory::Decimal => decode_first!(row, idx; f64 => float_value),
            TypeCategory::Boolean => decode_first!(row, idx; bool => JsonValue::Bool),
            TypeCategory::Binary => decode_first!(row, idx; Vec<u8> => binary_value),
            _ => None,
        };
        preferred.or_else(|| {
            decode_first!(row, idx;
                String => JsonValue::String,
                i64 => JsonValue::from,
                f64 => float_value,
                Vec<u8> => binary_value,
            )
        })
    }
}
