use super::schema::is_json_type;
use super::{FailedToEncodeJsonSnafu, Result};
use crate::sql::sql_gen::column_type::MappedColumn;
use crate::sql::sql_gen::statement::{GenericError, ValueConverter};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use snafu::ResultExt;

const TRINO_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders record values as Trino literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrinoValueConverter;

impl ValueConverter for TrinoValueConverter {
    fn convert_array(
        &self,
        values: &[Value],
        _column: &MappedColumn,
    ) -> std::result::Result<String, GenericError> {
        Ok(convert_array(values)?)
    }

    fn string_parse(
        &self,
        value: &Value,
        column: &MappedColumn,
    ) -> std::result::Result<String, GenericError> {
        Ok(convert_json_or_string(value, &column.type_converted)?)
    }
}

/// Empty arrays become `NULL`; anything else a `JSON '...'` literal.
pub fn convert_array(values: &[Value]) -> Result<String> {
    if values.is_empty() {
        return Ok("NULL".to_string());
    }

    let encoded = serde_json::to_string(values).context(FailedToEncodeJsonSnafu)?;
    Ok(json_literal(&encoded))
}

/// Resolves a scalar or structured value against the column's Trino type.
pub fn convert_json_or_string(value: &Value, type_converted: &str) -> Result<String> {
    if value.is_null() {
        return Ok("NULL".to_string());
    }

    if is_json_type(type_converted) {
        let encoded = match value {
            Value::String(text) if serde_json::from_str::<Value>(text).is_ok() => text.clone(),
            other => serde_json::to_string(other).context(FailedToEncodeJsonSnafu)?,
        };
        return Ok(json_literal(&encoded));
    }

    let literal = match (type_converted.to_uppercase().as_str(), value) {
        ("BIGINT" | "DOUBLE", Value::Number(number)) => number.to_string(),
        ("BIGINT" | "DOUBLE", Value::String(text)) if is_numeric(text) => {
            text.trim().to_string()
        }
        ("BOOLEAN", Value::Bool(flag)) => bool_literal(*flag),
        ("BOOLEAN", Value::String(text)) if text.eq_ignore_ascii_case("true") => {
            bool_literal(true)
        }
        ("BOOLEAN", Value::String(text)) if text.eq_ignore_ascii_case("false") => {
            bool_literal(false)
        }
        ("TIMESTAMP", Value::String(text)) => timestamp_literal(text),
        (_, Value::String(text)) => quote_string(text),
        (_, other) => quote_string(&other.to_string()),
    };

    Ok(literal)
}

fn bool_literal(flag: bool) -> String {
    let literal = if flag { "TRUE" } else { "FALSE" };
    literal.to_string()
}

fn is_numeric(text: &str) -> bool {
    text.trim().parse::<f64>().is_ok_and(f64::is_finite)
}

fn json_literal(encoded: &str) -> String {
    format!("JSON {}", quote_string(encoded))
}

fn timestamp_literal(text: &str) -> String {
    let parsed = DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc).naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"));

    match parsed {
        Ok(ts) => format!(
            "TIMESTAMP {}",
            quote_string(&ts.format(TRINO_TIMESTAMP_FORMAT).to_string())
        ),
        Err(_) => quote_string(text),
    }
}

/// Wraps text in single quotes, doubling any embedded single quote.
#[must_use]
pub fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
