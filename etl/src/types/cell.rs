use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

use crate::conversions::text::{parse_date, parse_timestamp};

/// A single value read from a raw table or written to the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// Hashable view of a [`Cell`] used to join and group rows on key columns.
///
/// Whole floats collapse onto integers so that `3.0` and `3` join, matching how spreadsheet
/// exports tend to mix both representations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKey {
    Bool(bool),
    Int(i64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Returns the value as an integer.
    ///
    /// Floats are truncated toward zero and numeric strings are parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::I64(value) => Some(*value),
            Cell::F64(value) if value.is_finite() => Some(value.trunc() as i64),
            Cell::String(value) => {
                let value = value.trim();
                match value.parse::<i64>() {
                    Ok(parsed) => Some(parsed),
                    Err(_) => value
                        .parse::<f64>()
                        .ok()
                        .filter(|parsed| parsed.is_finite())
                        .map(|parsed| parsed.trunc() as i64),
                }
            }
            _ => None,
        }
    }

    /// Returns the value as an integer only when it is one.
    ///
    /// Whole floats are accepted; fractional floats, strings and other cells are not.
    pub fn as_exact_i64(&self) -> Option<i64> {
        match self {
            Cell::I64(value) => Some(*value),
            Cell::F64(value) if value.is_finite() && value.fract() == 0.0 => Some(*value as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::I64(value) => Some(*value as f64),
            Cell::F64(value) => Some(*value),
            Cell::String(value) => value.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Returns the value as a point in time.
    ///
    /// Dates are promoted to midnight and strings are parsed as either a timestamp or a date.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Timestamp(value) => Some(*value),
            Cell::Date(value) => Some(value.and_time(NaiveTime::MIN)),
            Cell::String(value) => parse_timestamp(value)
                .or_else(|| parse_date(value).map(|date| date.and_time(NaiveTime::MIN))),
            _ => None,
        }
    }

    /// Returns the key used to join rows on this value, or [`None`] for nulls.
    pub fn key(&self) -> Option<CellKey> {
        match self {
            Cell::Null => None,
            Cell::Bool(value) => Some(CellKey::Bool(*value)),
            Cell::I64(value) => Some(CellKey::Int(*value)),
            Cell::F64(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(CellKey::Int(*value as i64))
            }
            Cell::F64(value) => Some(CellKey::Text(value.to_string())),
            Cell::String(value) => Some(CellKey::Text(value.clone())),
            Cell::Date(value) => Some(CellKey::Date(*value)),
            Cell::Timestamp(value) => Some(CellKey::Timestamp(*value)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("null"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::I64(value) => write!(f, "{value}"),
            Cell::F64(value) => write!(f, "{value}"),
            Cell::String(value) => f.write_str(value),
            Cell::Date(value) => write!(f, "{value}"),
            Cell::Timestamp(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::I64(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::F64(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::String(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::Timestamp(value)
    }
}

impl<T> From<Option<T>> for Cell
where
    T: Into<Cell>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}
