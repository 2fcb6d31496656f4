use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

use crate::error::{ErrorKind, EtlResult};
use crate::types::{Cell, TableRow};
use crate::{bail, etl_error};

/// The moment a load run happened, as recorded in the `dim_datetime` table.
///
/// The timestamp has second precision because the table stores whole seconds; anything finer
/// would be lost on the round trip through the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeWatermark {
    timestamp: NaiveDateTime,
}

impl TimeWatermark {
    /// Builds a watermark for `datetime`, dropping sub-second precision.
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        let time = NaiveTime::from_hms_opt(datetime.hour(), datetime.minute(), datetime.second())
            .unwrap_or(NaiveTime::MIN);

        Self {
            timestamp: datetime.date().and_time(time),
        }
    }

    /// Builds a watermark from the columns of a stored `dim_datetime` row.
    pub fn from_parts(date: NaiveDate, hour: i64, minute: i64, second: i64) -> EtlResult<Self> {
        let time = u32::try_from(hour)
            .ok()
            .zip(u32::try_from(minute).ok())
            .zip(u32::try_from(second).ok())
            .and_then(|((hour, minute), second)| NaiveTime::from_hms_opt(hour, minute, second));

        let Some(time) = time else {
            bail!(
                ErrorKind::InvalidData,
                "Stored watermark has an invalid time",
                format!("{hour}:{minute}:{second} on {date} is not a valid time of day")
            );
        };

        Ok(Self {
            timestamp: date.and_time(time),
        })
    }

    /// Reads a watermark back from a row laid out like `dim_datetime`.
    pub fn try_from_table_row(row: &TableRow) -> EtlResult<Self> {
        let date = match row.get(0) {
            Cell::Date(date) => *date,
            other => other.as_datetime().map(|datetime| datetime.date()).ok_or_else(|| {
                etl_error!(
                    ErrorKind::InvalidData,
                    "Stored watermark has an invalid date",
                    format!("`{other}` is not a date")
                )
            })?,
        };

        let part = |index: usize, name: &str| {
            row.get(index).as_i64().ok_or_else(|| {
                etl_error!(
                    ErrorKind::InvalidData,
                    "Stored watermark has an invalid time",
                    format!("column `{name}` holds `{}`", row.get(index))
                )
            })
        };

        Self::from_parts(date, part(5, "hour")?, part(6, "minute")?, part(7, "second")?)
    }

    /// Returns the full point in time compared against update columns.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Day of the week, counted from Monday as `0`.
    pub fn weekday(&self) -> u32 {
        self.timestamp.weekday().num_days_from_monday()
    }

    /// Returns the row inserted into `dim_datetime`.
    ///
    /// Columns are `date, year, month, weekday, day, hour, minute, second`.
    pub fn into_table_row(self) -> TableRow {
        let timestamp = self.timestamp;

        TableRow::new(vec![
            Cell::Date(timestamp.date()),
            Cell::I64(i64::from(timestamp.year())),
            Cell::I64(i64::from(timestamp.month())),
            Cell::I64(i64::from(self.weekday())),
            Cell::I64(i64::from(timestamp.day())),
            Cell::I64(i64::from(timestamp.hour())),
            Cell::I64(i64::from(timestamp.minute())),
            Cell::I64(i64::from(timestamp.second())),
        ])
    }
}

impl fmt::Display for TimeWatermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// A watermark as stored in the warehouse, together with its insertion identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredWatermark {
    pub id: i64,
    pub watermark: TimeWatermark,
}
