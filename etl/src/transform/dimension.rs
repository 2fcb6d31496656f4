use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EtlResult;
use crate::types::{Cell, CellKey, RawTable, TableRow, WarehouseTable};

/// Renames a raw column to a conformed dimension column.
#[derive(Debug, Clone, Copy)]
struct ColumnMapping {
    raw: &'static str,
    target: &'static str,
}

const fn map(raw: &'static str, target: &'static str) -> ColumnMapping {
    ColumnMapping { raw, target }
}

const DEPARTMENT_COLUMNS: [ColumnMapping; 3] = [
    map("dp_id", "db_id"),
    map("dp_name", "name"),
    map("dp_description", "description"),
];

const USER_COLUMNS: [ColumnMapping; 3] = [
    map("usr_id", "db_id"),
    map("usr_name", "name"),
    map("usr_ocupation", "occupation"),
];

const PROCESS_COLUMNS: [ColumnMapping; 8] = [
    map("pc_id", "db_id"),
    map("pc_title", "title"),
    map("pc_initial_date", "initial_date"),
    map("pc_finish_date", "finish_date"),
    map("pc_status", "status"),
    map("usr_id", "dim_usr_id"),
    map("pc_description", "description"),
    map("dp_id", "dim_department_id"),
];

const VACANCY_COLUMNS: [ColumnMapping; 8] = [
    map("vc_id", "db_id"),
    map("vc_title", "title"),
    map("vc_num_positions", "num_positions"),
    map("vc_status", "status"),
    map("vc_location", "location"),
    map("usr_id", "dim_usr_id"),
    map("vc_opening_date", "opening_date"),
    map("vc_closing_date", "closing_date"),
];

/// Candidate columns read from the candidate table itself.
const CANDIDATE_COLUMNS: [&str; 7] = [
    "cd_id",
    "cd_name",
    "cd_email",
    "cd_phone",
    "cd_score",
    "cd_status",
    "cd_last_update",
];

/// Application columns attached to candidates by the left join.
const APPLICATION_COLUMNS: [&str; 3] = ["cd_id", "vc_cd_insert_date", "vc_id"];

/// Where a column named by an update column lives in a [`Dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionColumn {
    /// A column of the raw table the dimension was mapped from.
    Raw(usize),
    /// A column of the mapped dimension rows.
    Mapped(usize),
}

/// Rows of one conformed dimension, ready to be appended to the warehouse.
///
/// Each row remembers the raw row it was mapped from, so change detection can read raw
/// columns that the dimension does not project.
#[derive(Debug, Clone)]
pub struct Dimension {
    table: WarehouseTable,
    rows: Vec<TableRow>,
    source: Arc<RawTable>,
    source_rows: Vec<usize>,
}

impl Dimension {
    pub fn table(&self) -> WarehouseTable {
        self.table
    }

    pub fn column_names(&self) -> &'static [&'static str] {
        self.table.column_names()
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

    pub fn source(&self) -> &RawTable {
        &self.source
    }

    /// Resolves `name` against the raw columns first and the mapped columns second.
    pub fn resolve_column(&self, name: &str) -> Option<DimensionColumn> {
        if let Some(index) = self.source.column_index(name) {
            return Some(DimensionColumn::Raw(index));
        }

        self.column_names()
            .iter()
            .position(|column| *column == name)
            .map(DimensionColumn::Mapped)
    }

    /// Returns the value of `column` for the dimension row at `row`.
    pub fn value(&self, row: usize, column: DimensionColumn) -> &Cell {
        match column {
            DimensionColumn::Raw(index) => match self.source_rows.get(row) {
                Some(source_row) => self.source.value(*source_row, index),
                None => &Cell::Null,
            },
            DimensionColumn::Mapped(index) => match self.rows.get(row) {
                Some(row) => row.get(index),
                None => &Cell::Null,
            },
        }
    }

    /// Returns the rows whose index satisfies `predicate`, in order.
    pub fn select_rows<F>(&self, mut predicate: F) -> Vec<TableRow>
    where
        F: FnMut(usize) -> bool,
    {
        self.rows
            .iter()
            .enumerate()
            .filter(|(index, _)| predicate(*index))
            .map(|(_, row)| row.clone())
            .collect()
    }
}

pub fn map_departments(raw: Arc<RawTable>) -> EtlResult<Dimension> {
    project(WarehouseTable::DimDepartment, raw, &DEPARTMENT_COLUMNS)
}

pub fn map_users(raw: Arc<RawTable>) -> EtlResult<Dimension> {
    project(WarehouseTable::DimUser, raw, &USER_COLUMNS)
}

pub fn map_processes(raw: Arc<RawTable>) -> EtlResult<Dimension> {
    project(WarehouseTable::DimProcess, raw, &PROCESS_COLUMNS)
}

pub fn map_vacancies(raw: Arc<RawTable>) -> EtlResult<Dimension> {
    project(WarehouseTable::DimVacancy, raw, &VACANCY_COLUMNS)
}

/// Maps candidates, left-joined with their applications on `cd_id`.
///
/// A candidate with several applications yields one row per application; a candidate with
/// none yields a single row whose `apply_date` and `fact_hiring_process_id` are null.
pub fn map_candidates(candidates: Arc<RawTable>, applications: &RawTable) -> EtlResult<Dimension> {
    let [cd_id, name, email, phone, score, status, last_update] =
        candidates.require_columns(CANDIDATE_COLUMNS)?;

    let mut applications_by_candidate: HashMap<CellKey, Vec<(Cell, Cell)>> = HashMap::new();
    if let Some([app_cd_id, insert_date, vc_id]) =
        applications.require_columns_unless_empty(APPLICATION_COLUMNS)?
    {
        for row in applications.rows() {
            if let Some(key) = row.get(app_cd_id).key() {
                applications_by_candidate
                    .entry(key)
                    .or_default()
                    .push((row.get(insert_date).clone(), row.get(vc_id).clone()));
            }
        }
    }

    let no_application = [(Cell::Null, Cell::Null)];
    let mut rows = Vec::with_capacity(candidates.len());
    let mut source_rows = Vec::with_capacity(candidates.len());

    for (index, row) in candidates.rows().iter().enumerate() {
        let matches = row
            .get(cd_id)
            .key()
            .and_then(|key| applications_by_candidate.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&no_application[..]);

        for (apply_date, vacancy_id) in matches {
            rows.push(TableRow::new(vec![
                row.get(cd_id).clone(),
                row.get(name).clone(),
                row.get(email).clone(),
                row.get(phone).clone(),
                row.get(score).clone(),
                apply_date.clone(),
                row.get(status).clone(),
                row.get(last_update).clone(),
                vacancy_id.clone(),
            ]));
            source_rows.push(index);
        }
    }

    Ok(Dimension {
        table: WarehouseTable::HiringProcessCandidate,
        rows,
        source: candidates,
        source_rows,
    })
}

fn project<const N: usize>(
    table: WarehouseTable,
    raw: Arc<RawTable>,
    mappings: &[ColumnMapping; N],
) -> EtlResult<Dimension> {
    let indexes = raw.require_columns(mappings.map(|mapping| mapping.raw))?;

    let rows = raw
        .rows()
        .iter()
        .map(|row| {
            TableRow::new(
                indexes
                    .iter()
                    .map(|index| row.get(*index).clone())
                    .collect(),
            )
        })
        .collect::<Vec<_>>();
    let source_rows = (0..raw.len()).collect();

    Ok(Dimension {
        table,
        rows,
        source: raw,
        source_rows,
    })
}
