//! Column decoding helpers shared by the libSQL repositories

use chrono::NaiveDate;
use libsql::{Row, Value};

use crate::error::{Error, Result};

pub fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(Error::Database(format!(
            "expected text or null in column {idx}, got {other:?}"
        ))),
    }
}

pub fn optional_integer(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "expected integer or null in column {idx}, got {other:?}"
        ))),
    }
}

pub fn date(row: &Row, idx: i32) -> Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    parse_date(&raw)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|error| Error::Database(format!("invalid stored date '{raw}': {error}")))
}

pub fn text_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

pub fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

/// `(?, ?, ...)` groups for a multi-row `VALUES` clause
pub fn values_placeholders(rows: usize, columns: usize) -> String {
    let group = format!("({})", vec!["?"; columns].join(", "));
    vec![group; rows].join(", ")
}
