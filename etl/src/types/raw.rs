use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::types::{Cell, TableRow};
use crate::{bail, etl_error};

/// An operational entity supplied by a raw table provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawEntity {
    Department,
    User,
    Process,
    Vacancy,
    Candidate,
    VacancyCandidate,
    Interview,
    Feedback,
    Hiring,
}

impl RawEntity {
    pub const ALL: [RawEntity; 9] = [
        RawEntity::Department,
        RawEntity::User,
        RawEntity::Process,
        RawEntity::Vacancy,
        RawEntity::Candidate,
        RawEntity::VacancyCandidate,
        RawEntity::Interview,
        RawEntity::Feedback,
        RawEntity::Hiring,
    ];

    pub fn as_static_str(&self) -> &'static str {
        match self {
            RawEntity::Department => "department",
            RawEntity::User => "user",
            RawEntity::Process => "process",
            RawEntity::Vacancy => "vacancy",
            RawEntity::Candidate => "candidate",
            RawEntity::VacancyCandidate => "vacancy_candidate",
            RawEntity::Interview => "interview",
            RawEntity::Feedback => "feedback",
            RawEntity::Hiring => "hiring",
        }
    }

    /// Name of the workbook sheet holding this entity when no override is configured.
    pub fn default_sheet_name(&self) -> &'static str {
        match self {
            RawEntity::Department => "departments",
            RawEntity::User => "users",
            RawEntity::Process => "processes",
            RawEntity::Vacancy => "vacancies",
            RawEntity::Candidate => "candidates",
            RawEntity::VacancyCandidate => "vacancy_candidates",
            RawEntity::Interview => "interviews",
            RawEntity::Feedback => "feedbacks",
            RawEntity::Hiring => "hirings",
        }
    }
}

impl fmt::Display for RawEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_static_str())
    }
}

impl FromStr for RawEntity {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RawEntity::ALL
            .into_iter()
            .find(|entity| entity.as_static_str() == s)
            .ok_or_else(|| {
                etl_error!(
                    ErrorKind::ConfigError,
                    "Unknown raw entity",
                    format!("`{s}` is not one of the raw entities")
                )
            })
    }
}

/// An immutable snapshot of one raw entity table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    entity: RawEntity,
    column_names: Vec<String>,
    rows: Vec<TableRow>,
}

impl RawTable {
    /// Creates a raw table, checking that every row has one cell per column.
    pub fn new(
        entity: RawEntity,
        column_names: Vec<String>,
        rows: Vec<TableRow>,
    ) -> EtlResult<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != column_names.len())
        {
            bail!(
                ErrorKind::InvalidData,
                "Raw row width does not match its columns",
                format!(
                    "row {index} of `{entity}` has {} cells but the table has {} columns",
                    row.len(),
                    column_names.len()
                )
            );
        }

        Ok(Self {
            entity,
            column_names,
            rows,
        })
    }

    pub fn entity(&self) -> RawEntity {
        self.entity
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|column| column == name)
    }

    /// Returns the position of a column that must be present.
    pub fn require_column(&self, name: &str) -> EtlResult<usize> {
        self.column_index(name).ok_or_else(|| {
            etl_error!(
                ErrorKind::SchemaMismatch,
                "Required raw column is missing",
                format!("column `{name}` not found in raw table `{}`", self.entity)
            )
        })
    }

    /// Returns the positions of several required columns, reporting every missing one.
    pub fn require_columns<const N: usize>(&self, names: [&str; N]) -> EtlResult<[usize; N]> {
        let mut indexes = [0; N];
        let mut errors = Vec::new();

        for (slot, name) in indexes.iter_mut().zip(names) {
            match self.require_column(name) {
                Ok(index) => *slot = index,
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(indexes)
    }

    /// Like [`RawTable::require_columns`], but an empty table lacking the columns yields [`None`].
    ///
    /// Spreadsheet exports drop the header of sheets without rows, so an empty sheet cannot
    /// be told apart from a sheet that never had the columns.
    pub fn require_columns_unless_empty<const N: usize>(
        &self,
        names: [&str; N],
    ) -> EtlResult<Option<[usize; N]>> {
        if self.is_empty() && names.iter().any(|name| self.column_index(name).is_none()) {
            return Ok(None);
        }

        self.require_columns(names).map(Some)
    }

    pub fn value(&self, row: usize, column: usize) -> &Cell {
        match self.rows.get(row) {
            Some(row) => row.get(column),
            None => &Cell::Null,
        }
    }
}
