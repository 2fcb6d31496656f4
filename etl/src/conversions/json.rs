//! Conversion of workbook JSON values into [`Cell`]s.

use serde_json::Value;

use crate::bail;
use crate::conversions::text::{parse_date, parse_timestamp};
use crate::error::{ErrorKind, EtlResult};
use crate::types::Cell;

/// Converts a JSON value into a cell, recognizing dates and timestamps inside strings.
pub fn json_to_cell(value: &Value) -> EtlResult<Cell> {
    let cell = match value {
        Value::Null => Cell::Null,
        Value::Bool(value) => Cell::Bool(*value),
        Value::Number(number) => match number.as_i64() {
            Some(value) => Cell::I64(value),
            None => match number.as_f64() {
                Some(value) => Cell::F64(value),
                None => bail!(
                    ErrorKind::ConversionError,
                    "Number cannot be represented",
                    format!("`{number}` does not fit in a 64 bit value")
                ),
            },
        },
        Value::String(value) => string_to_cell(value),
        Value::Array(_) | Value::Object(_) => bail!(
            ErrorKind::ConversionError,
            "Nested values are not supported in raw tables",
            format!("`{value}` is not a scalar")
        ),
    };

    Ok(cell)
}

fn string_to_cell(value: &str) -> Cell {
    if let Some(timestamp) = parse_timestamp(value) {
        return Cell::Timestamp(timestamp);
    }

    if let Some(date) = parse_date(value) {
        return Cell::Date(date);
    }

    Cell::String(value.to_string())
}
