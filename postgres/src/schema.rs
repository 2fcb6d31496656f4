use std::fmt;
use std::str::FromStr;

use pg_escape::quote_identifier;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a table name does not belong to the warehouse model.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not a warehouse table")]
pub struct UnknownTableError(pub String);

/// A table of the hiring warehouse.
///
/// Names and column orders are fixed; rows handed to the warehouse must follow
/// [`WarehouseTable::column_names`] exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseTable {
    DimDatetime,
    DimDepartment,
    DimUser,
    DimProcess,
    DimVacancy,
    HiringProcessCandidate,
    FactHiringProcess,
}

impl WarehouseTable {
    pub const ALL: [WarehouseTable; 7] = [
        WarehouseTable::DimDatetime,
        WarehouseTable::DimDepartment,
        WarehouseTable::DimUser,
        WarehouseTable::DimProcess,
        WarehouseTable::DimVacancy,
        WarehouseTable::HiringProcessCandidate,
        WarehouseTable::FactHiringProcess,
    ];

    /// Dimensions fed from raw tables, in the order they are loaded.
    pub const DIMENSIONS: [WarehouseTable; 5] = [
        WarehouseTable::DimDepartment,
        WarehouseTable::DimUser,
        WarehouseTable::DimProcess,
        WarehouseTable::DimVacancy,
        WarehouseTable::HiringProcessCandidate,
    ];

    /// Returns `true` for the tables listed in [`WarehouseTable::DIMENSIONS`].
    pub fn is_dimension(&self) -> bool {
        Self::DIMENSIONS.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseTable::DimDatetime => "dim_datetime",
            WarehouseTable::DimDepartment => "dim_department",
            WarehouseTable::DimUser => "dim_user",
            WarehouseTable::DimProcess => "dim_process",
            WarehouseTable::DimVacancy => "dim_vacancy",
            WarehouseTable::HiringProcessCandidate => "hiring_process_candidate",
            WarehouseTable::FactHiringProcess => "fact_hiring_process",
        }
    }

    /// Returns the insertable columns of the table, in row order.
    ///
    /// Generated columns such as `dim_datetime.id` are not part of the list.
    pub fn column_names(&self) -> &'static [&'static str] {
        match self {
            WarehouseTable::DimDatetime => &[
                "date", "year", "month", "weekday", "day", "hour", "minute", "second",
            ],
            WarehouseTable::DimDepartment => &["db_id", "name", "description"],
            WarehouseTable::DimUser => &["db_id", "name", "occupation"],
            WarehouseTable::DimProcess => &[
                "db_id",
                "title",
                "initial_date",
                "finish_date",
                "status",
                "dim_usr_id",
                "description",
                "dim_department_id",
            ],
            WarehouseTable::DimVacancy => &[
                "db_id",
                "title",
                "num_positions",
                "status",
                "location",
                "dim_usr_id",
                "opening_date",
                "closing_date",
            ],
            WarehouseTable::HiringProcessCandidate => &[
                "db_id",
                "name",
                "email",
                "phone",
                "score",
                "apply_date",
                "status",
                "updated_at",
                "fact_hiring_process_id",
            ],
            WarehouseTable::FactHiringProcess => &[
                "met_total_candidates_applied",
                "met_total_candidates_interviewed",
                "met_total_candidates_hired",
                "met_sum_duration_hiring_proces",
                "met_sum_salary_initial",
                "met_total_feedback_positive",
                "met_total_neutral",
                "met_total_negative",
                "dim_process_id",
                "dim_vacancy_id",
                "dim_user_id",
                "dim_date_id",
            ],
        }
    }

    /// Returns the table name quoted for use in SQL statements.
    pub fn quoted(&self) -> String {
        quote_identifier(self.as_str()).into_owned()
    }
}

impl fmt::Display for WarehouseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarehouseTable {
    type Err = UnknownTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WarehouseTable::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| UnknownTableError(s.to_string()))
    }
}
