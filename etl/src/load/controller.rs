use config::shared::UntrackedTablePolicy;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, info, warn};

use crate::destination::Warehouse;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::transform::Dimension;
use crate::types::{Cell, FactRecord, StoredWatermark, TableRow, TimeWatermark, WarehouseTable};

/// Raw column whose value signals that a dimension row changed, per warehouse table.
///
/// Tables without an entry are untracked and are handled by [`UntrackedTablePolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateColumnMap {
    columns: BTreeMap<WarehouseTable, String>,
}

impl UpdateColumnMap {
    pub fn new(columns: BTreeMap<WarehouseTable, String>) -> Self {
        Self { columns }
    }

    /// Builds the map from configuration keyed by table name.
    ///
    /// Only dimension tables can be tracked; naming any other table is a configuration error.
    pub fn from_config(columns: &BTreeMap<String, String>) -> EtlResult<Self> {
        let mut errors = Vec::new();
        let mut tracked = BTreeMap::new();

        for (table_name, column) in columns {
            match table_name.parse::<WarehouseTable>() {
                Ok(table) if table.is_dimension() => {
                    tracked.insert(table, column.clone());
                }
                Ok(table) => errors.push(etl_error!(
                    ErrorKind::ConfigError,
                    "Update column configured for a non dimension table",
                    format!("`{table}` is loaded by the pipeline itself and cannot be tracked")
                )),
                Err(err) => errors.push(etl_error!(
                    ErrorKind::ConfigError,
                    "Update column configured for an unknown table",
                    format!("`{}` is not a warehouse table", err.0)
                )),
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(Self::new(tracked))
    }

    pub fn column_for(&self, table: WarehouseTable) -> Option<&str> {
        self.columns.get(&table).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WarehouseTable, &str)> {
        self.columns
            .iter()
            .map(|(table, column)| (*table, column.as_str()))
    }
}

impl Default for UpdateColumnMap {
    fn default() -> Self {
        Self::new(
            [
                (WarehouseTable::DimUser, "usr_last_update"),
                (WarehouseTable::DimProcess, "pc_finish_date"),
                (WarehouseTable::DimVacancy, "vc_closing_date"),
                (WarehouseTable::HiringProcessCandidate, "cd_last_update"),
            ]
            .into_iter()
            .map(|(table, column)| (table, column.to_string()))
            .collect(),
        )
    }
}

/// Why a table is loaded with every row instead of a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullLoadReason {
    /// The target table holds no rows.
    EmptyTarget,
    /// The table has no update column and the policy asks for a reload.
    Untracked,
    /// The warehouse has no watermark yet.
    FirstRun,
    /// The configured update column is absent from the dimension.
    MissingTrackingColumn,
    /// The run's watermark row for `dim_datetime`.
    NewWatermark,
    /// Facts are rebuilt and appended on every run that changed a dimension.
    FactRefresh,
}

impl FullLoadReason {
    pub fn as_static_str(&self) -> &'static str {
        match self {
            FullLoadReason::EmptyTarget => "empty_target",
            FullLoadReason::Untracked => "untracked",
            FullLoadReason::FirstRun => "first_run",
            FullLoadReason::MissingTrackingColumn => "missing_tracking_column",
            FullLoadReason::NewWatermark => "new_watermark",
            FullLoadReason::FactRefresh => "fact_refresh",
        }
    }
}

impl fmt::Display for FullLoadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_static_str())
    }
}

/// Where a table stands in a load run.
///
/// A table starts [`TableLoadPhase::Unchecked`], is planned as a full load, a delta load or a
/// no-op, and ends [`TableLoadPhase::Loaded`] or [`TableLoadPhase::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLoadPhase {
    Unchecked,
    FullLoad {
        reason: FullLoadReason,
    },
    /// Only rows whose update column is later than `since` are loaded.
    DeltaLoad {
        since: TimeWatermark,
    },
    /// Nothing to load for this table in this run.
    NoOp,
    Loaded {
        rows: u64,
    },
    /// The warehouse rejected the rows; the run is aborted.
    Failed {
        reason: String,
    },
}

impl TableLoadPhase {
    pub fn as_type(&self) -> TableLoadPhaseType {
        self.into()
    }
}

impl fmt::Display for TableLoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchecked => write!(f, "unchecked"),
            Self::FullLoad { reason } => write!(f, "full_load({reason})"),
            Self::DeltaLoad { since } => write!(f, "delta_load({since})"),
            Self::NoOp => write!(f, "no_op"),
            Self::Loaded { rows } => write!(f, "loaded({rows})"),
            Self::Failed { reason } => write!(f, "failed({reason})"),
        }
    }
}

/// A variant of [`TableLoadPhase`] without the data fields.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TableLoadPhaseType {
    Unchecked,
    FullLoad,
    DeltaLoad,
    NoOp,
    Loaded,
    Failed,
}

impl TableLoadPhaseType {
    /// Returns `true` if no further transition can happen in this run.
    pub fn is_done(&self) -> bool {
        match self {
            Self::Unchecked => false,
            Self::FullLoad => false,
            Self::DeltaLoad => false,
            Self::NoOp => true,
            Self::Loaded => true,
            Self::Failed => true,
        }
    }

    pub fn as_static_str(&self) -> &'static str {
        match self {
            TableLoadPhaseType::Unchecked => "unchecked",
            TableLoadPhaseType::FullLoad => "full_load",
            TableLoadPhaseType::DeltaLoad => "delta_load",
            TableLoadPhaseType::NoOp => "no_op",
            TableLoadPhaseType::Loaded => "loaded",
            TableLoadPhaseType::Failed => "failed",
        }
    }
}

impl<'a> From<&'a TableLoadPhase> for TableLoadPhaseType {
    fn from(phase: &'a TableLoadPhase) -> Self {
        match phase {
            TableLoadPhase::Unchecked => Self::Unchecked,
            TableLoadPhase::FullLoad { .. } => Self::FullLoad,
            TableLoadPhase::DeltaLoad { .. } => Self::DeltaLoad,
            TableLoadPhase::NoOp => Self::NoOp,
            TableLoadPhase::Loaded { .. } => Self::Loaded,
            TableLoadPhase::Failed { .. } => Self::Failed,
        }
    }
}

impl fmt::Display for TableLoadPhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_static_str())
    }
}

/// Outcome of loading one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoadReport {
    pub table: WarehouseTable,
    /// The plan chosen for the table: a full load, a delta load or a no-op.
    pub plan: TableLoadPhase,
    /// The final phase: [`TableLoadPhase::Loaded`], [`TableLoadPhase::NoOp`] or
    /// [`TableLoadPhase::Failed`].
    pub phase: TableLoadPhase,
}

impl TableLoadReport {
    pub fn rows_loaded(&self) -> u64 {
        match self.phase {
            TableLoadPhase::Loaded { rows } => rows,
            _ => 0,
        }
    }

    /// Returns `true` if rows were appended to the table.
    pub fn changed(&self) -> bool {
        self.rows_loaded() > 0
    }
}

/// Reports of the tables loaded so far in a run, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    tables: Vec<TableLoadReport>,
}

impl RunReport {
    pub fn tables(&self) -> &[TableLoadReport] {
        &self.tables
    }

    pub fn get(&self, table: WarehouseTable) -> Option<&TableLoadReport> {
        self.tables.iter().find(|report| report.table == table)
    }

    /// Returns `true` if any dimension received rows.
    pub fn any_dimension_changed(&self) -> bool {
        self.tables
            .iter()
            .any(|report| report.table.is_dimension() && report.changed())
    }

    pub fn into_tables(self) -> Vec<TableLoadReport> {
        self.tables
    }

    fn push(&mut self, report: TableLoadReport) {
        self.tables.push(report);
    }
}

/// Decides per table whether to load everything, a delta or nothing, and appends the rows.
///
/// Tables are loaded one at a time; the first rejected append aborts the run.
#[derive(Debug)]
pub struct LoadController<'a, W> {
    warehouse: &'a W,
    update_columns: &'a UpdateColumnMap,
    untracked_tables: UntrackedTablePolicy,
    previous: Option<StoredWatermark>,
    report: RunReport,
}

impl<'a, W> LoadController<'a, W>
where
    W: Warehouse,
{
    pub fn new(
        warehouse: &'a W,
        update_columns: &'a UpdateColumnMap,
        untracked_tables: UntrackedTablePolicy,
        previous: Option<StoredWatermark>,
    ) -> Self {
        Self {
            warehouse,
            update_columns,
            untracked_tables,
            previous,
            report: RunReport::default(),
        }
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Loads the rows of `dimension` that this run must add to the warehouse.
    pub async fn load_dimension(&mut self, dimension: &Dimension) -> EtlResult<TableLoadReport> {
        let table = dimension.table();
        let plan = self.plan_dimension(dimension).await?;

        let rows = match &plan {
            TableLoadPhase::FullLoad { .. } => dimension.rows().to_vec(),
            TableLoadPhase::DeltaLoad { since } => {
                let since = since.timestamp();
                // The plan only exists when the column resolved.
                let column = self
                    .update_columns
                    .column_for(table)
                    .and_then(|column| dimension.resolve_column(column));

                match column {
                    Some(column) => dimension
                        .select_rows(|row| is_newer(dimension.value(row, column), since)),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        };

        self.append(table, plan, rows).await
    }

    /// Appends the run's watermark row to `dim_datetime`.
    pub async fn load_time_dimension(
        &mut self,
        watermark: TimeWatermark,
    ) -> EtlResult<TableLoadReport> {
        let plan = TableLoadPhase::FullLoad {
            reason: FullLoadReason::NewWatermark,
        };

        self.append(
            WarehouseTable::DimDatetime,
            plan,
            vec![watermark.into_table_row()],
        )
        .await
    }

    /// Appends the rebuilt facts to `fact_hiring_process`.
    pub async fn load_facts(&mut self, facts: Vec<FactRecord>) -> EtlResult<TableLoadReport> {
        let plan = TableLoadPhase::FullLoad {
            reason: FullLoadReason::FactRefresh,
        };
        let rows = facts.into_iter().map(FactRecord::into_table_row).collect();

        self.append(WarehouseTable::FactHiringProcess, plan, rows)
            .await
    }

    async fn plan_dimension(&self, dimension: &Dimension) -> EtlResult<TableLoadPhase> {
        let table = dimension.table();

        if self.warehouse.row_count(table).await? == 0 {
            return Ok(TableLoadPhase::FullLoad {
                reason: FullLoadReason::EmptyTarget,
            });
        }

        let Some(previous) = self.previous else {
            return Ok(TableLoadPhase::FullLoad {
                reason: FullLoadReason::FirstRun,
            });
        };

        let Some(column) = self.update_columns.column_for(table) else {
            return Ok(match self.untracked_tables {
                UntrackedTablePolicy::Always => TableLoadPhase::FullLoad {
                    reason: FullLoadReason::Untracked,
                },
                UntrackedTablePolicy::WhenEmpty => TableLoadPhase::NoOp,
            });
        };

        if dimension.resolve_column(column).is_none() {
            warn!(
                table = %table,
                column,
                "update column not found, falling back to a full load"
            );

            return Ok(TableLoadPhase::FullLoad {
                reason: FullLoadReason::MissingTrackingColumn,
            });
        }

        Ok(TableLoadPhase::DeltaLoad {
            since: previous.watermark,
        })
    }

    async fn append(
        &mut self,
        table: WarehouseTable,
        plan: TableLoadPhase,
        rows: Vec<TableRow>,
    ) -> EtlResult<TableLoadReport> {
        let row_count = rows.len();

        let phase = if rows.is_empty() {
            TableLoadPhase::NoOp
        } else {
            match self.warehouse.append_rows(table, rows).await {
                Ok(rows) => TableLoadPhase::Loaded { rows },
                Err(err) => {
                    let phase = TableLoadPhase::Failed {
                        reason: err.description().to_string(),
                    };
                    error!(
                        table = %table,
                        row_count,
                        mode = %plan,
                        phase = %phase,
                        "table load failed, aborting the run"
                    );
                    self.report.push(TableLoadReport { table, plan, phase });

                    return Err(err);
                }
            }
        };

        info!(
            table = %table,
            row_count,
            mode = %plan,
            phase = %phase,
            "table load finished"
        );

        let report = TableLoadReport { table, plan, phase };
        self.report.push(report.clone());

        Ok(report)
    }
}

/// Returns `true` if a tracking value is strictly later than the watermark.
///
/// Nulls and values that are not a point in time never count as changed.
fn is_newer(value: &Cell, since: chrono::NaiveDateTime) -> bool {
    value.as_datetime().is_some_and(|value| value > since)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::memory::MemoryWarehouse;
    use crate::test_utils::test_warehouse_wrapper::TestWarehouseWrapper;
    use crate::transform::{map_departments, map_processes, map_users};
    use crate::types::{RawEntity, RawTable};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn stored(day: u32) -> StoredWatermark {
        StoredWatermark {
            id: 1,
            watermark: TimeWatermark::from_datetime(at(day)),
        }
    }

    fn processes(finish_dates: &[Cell]) -> Dimension {
        let rows = finish_dates
            .iter()
            .enumerate()
            .map(|(index, finish)| {
                TableRow::new(vec![
                    Cell::I64(index as i64 + 1),
                    Cell::from(format!("Process {index}")),
                    Cell::Timestamp(at(1)),
                    finish.clone(),
                    Cell::from("open"),
                    Cell::I64(1),
                    Cell::Null,
                    Cell::I64(1),
                ])
            })
            .collect();
        let raw = RawTable::new(
            RawEntity::Process,
            [
                "pc_id",
                "pc_title",
                "pc_initial_date",
                "pc_finish_date",
                "pc_status",
                "usr_id",
                "pc_description",
                "dp_id",
            ]
            .map(String::from)
            .to_vec(),
            rows,
        )
        .unwrap();

        map_processes(Arc::new(raw)).unwrap()
    }

    fn departments() -> Dimension {
        let raw = RawTable::new(
            RawEntity::Department,
            ["dp_id", "dp_name", "dp_description"].map(String::from).to_vec(),
            vec![TableRow::new(vec![Cell::I64(1), "Eng".into(), Cell::Null])],
        )
        .unwrap();

        map_departments(Arc::new(raw)).unwrap()
    }

    async fn seed(warehouse: &MemoryWarehouse, dimension: &Dimension) {
        warehouse
            .append_rows(dimension.table(), dimension.rows().to_vec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_target_is_fully_loaded() {
        let warehouse = MemoryWarehouse::new();
        let columns = UpdateColumnMap::default();
        let mut controller = LoadController::new(
            &warehouse,
            &columns,
            UntrackedTablePolicy::WhenEmpty,
            Some(stored(20)),
        );

        let report = controller
            .load_dimension(&processes(&[Cell::Timestamp(at(2)), Cell::Null]))
            .await
            .unwrap();

        assert_eq!(
            report.plan,
            TableLoadPhase::FullLoad {
                reason: FullLoadReason::EmptyTarget
            }
        );
        assert_eq!(report.phase, TableLoadPhase::Loaded { rows: 2 });
        assert!(controller.report().any_dimension_changed());
    }

    #[tokio::test]
    async fn missing_watermark_forces_a_full_load() {
        let warehouse = MemoryWarehouse::new();
        let dimension = processes(&[Cell::Timestamp(at(2))]);
        seed(&warehouse, &dimension).await;

        let columns = UpdateColumnMap::default();
        let mut controller =
            LoadController::new(&warehouse, &columns, UntrackedTablePolicy::WhenEmpty, None);
        let report = controller.load_dimension(&dimension).await.unwrap();

        assert_eq!(
            report.plan,
            TableLoadPhase::FullLoad {
                reason: FullLoadReason::FirstRun
            }
        );
        assert_eq!(report.rows_loaded(), 1);
    }

    #[tokio::test]
    async fn delta_load_keeps_rows_strictly_after_the_watermark() {
        let warehouse = MemoryWarehouse::new();
        seed(&warehouse, &processes(&[Cell::Null])).await;

        let previous = stored(10);
        let dimension = processes(&[
            Cell::Timestamp(at(9)),
            Cell::Timestamp(at(10)),
            Cell::Timestamp(at(11)),
            Cell::Null,
            Cell::from("not a date"),
            // A date alone compares as midnight, before 10:30 on the same day.
            Cell::Date(at(10).date()),
            Cell::from("2024-05-10 10:30:01"),
        ]);

        let columns = UpdateColumnMap::default();
        let mut controller = LoadController::new(
            &warehouse,
            &columns,
            UntrackedTablePolicy::WhenEmpty,
            Some(previous),
        );
        let report = controller.load_dimension(&dimension).await.unwrap();

        assert_eq!(
            report.plan,
            TableLoadPhase::DeltaLoad {
                since: previous.watermark
            }
        );
        assert_eq!(report.phase, TableLoadPhase::Loaded { rows: 2 });

        let stored_rows = warehouse.table_rows(WarehouseTable::DimProcess).await;
        let loaded_ids = stored_rows[1..]
            .iter()
            .map(|row| row.get(0).as_i64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(loaded_ids, vec![3, 7]);
    }

    #[tokio::test]
    async fn unchanged_delta_is_a_no_op() {
        let warehouse = MemoryWarehouse::new();
        let dimension = processes(&[Cell::Timestamp(at(2))]);
        seed(&warehouse, &dimension).await;

        let columns = UpdateColumnMap::default();
        let mut controller = LoadController::new(
            &warehouse,
            &columns,
            UntrackedTablePolicy::WhenEmpty,
            Some(stored(3)),
        );
        let report = controller.load_dimension(&dimension).await.unwrap();

        assert_eq!(report.phase, TableLoadPhase::NoOp);
        assert!(!controller.report().any_dimension_changed());
    }

    #[tokio::test]
    async fn untracked_tables_follow_the_policy() {
        let warehouse = MemoryWarehouse::new();
        let dimension = departments();
        seed(&warehouse, &dimension).await;
        let columns = UpdateColumnMap::default();

        let mut controller = LoadController::new(
            &warehouse,
            &columns,
            UntrackedTablePolicy::WhenEmpty,
            Some(stored(3)),
        );
        let report = controller.load_dimension(&dimension).await.unwrap();
        assert_eq!(report.plan, TableLoadPhase::NoOp);

        let mut controller = LoadController::new(
            &warehouse,
            &columns,
            UntrackedTablePolicy::Always,
            Some(stored(3)),
        );
        let report = controller.load_dimension(&dimension).await.unwrap();
        assert_eq!(
            report.plan,
            TableLoadPhase::FullLoad {
                reason: FullLoadReason::Untracked
            }
        );
        assert_eq!(report.rows_loaded(), 1);
    }

    #[tokio::test]
    async fn missing_tracking_column_falls_back_to_a_full_load() {
        let warehouse = MemoryWarehouse::new();
        let raw = RawTable::new(
            RawEntity::User,
            ["usr_id", "usr_name", "usr_ocupation"].map(String::from).to_vec(),
            vec![TableRow::new(vec![Cell::I64(1), "Ana".into(), "Lead".into()])],
        )
        .unwrap();
        let dimension = map_users(Arc::new(raw)).unwrap();
        seed(&warehouse, &dimension).await;

        let columns = UpdateColumnMap::default();
        let mut controller = LoadController::new(
            &warehouse,
            &columns,
            UntrackedTablePolicy::WhenEmpty,
            Some(stored(3)),
        );
        let report = controller.load_dimension(&dimension).await.unwrap();

        assert_eq!(
            report.plan,
            TableLoadPhase::FullLoad {
                reason: FullLoadReason::MissingTrackingColumn
            }
        );
        assert_eq!(warehouse.table_rows(WarehouseTable::DimUser).await.len(), 2);
    }

    #[tokio::test]
    async fn rejected_append_is_reported_as_failed() {
        let warehouse = TestWarehouseWrapper::wrap(MemoryWarehouse::new());
        warehouse.fail_appends_to(WarehouseTable::DimProcess).await;

        let columns = UpdateColumnMap::default();
        let mut controller =
            LoadController::new(&warehouse, &columns, UntrackedTablePolicy::WhenEmpty, None);
        let err = controller
            .load_dimension(&processes(&[Cell::Null]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailed);

        let report = controller.report().get(WarehouseTable::DimProcess).unwrap();
        assert_eq!(report.phase.as_type(), TableLoadPhaseType::Failed);
        assert!(!controller.report().any_dimension_changed());
    }

    #[test]
    fn update_columns_are_parsed_from_config() {
        let map = UpdateColumnMap::from_config(&config::shared::default_update_columns()).unwrap();
        assert_eq!(map, UpdateColumnMap::default());
        assert_eq!(map.column_for(WarehouseTable::DimDepartment), None);

        let invalid = BTreeMap::from([
            ("dim_datetime".to_string(), "date".to_string()),
            ("dim_candidate".to_string(), "cd_last_update".to_string()),
        ]);
        let err = UpdateColumnMap::from_config(&invalid).unwrap_err();
        assert_eq!(err.kinds(), vec![ErrorKind::ConfigError, ErrorKind::ConfigError]);
    }

    #[test]
    fn phase_types_drop_their_data() {
        let phase = TableLoadPhase::DeltaLoad {
            since: TimeWatermark::from_datetime(at(1)),
        };

        assert_eq!(phase.as_type(), TableLoadPhaseType::DeltaLoad);
        assert!(!phase.as_type().is_done());
        assert_eq!(phase.to_string(), "delta_load(2024-05-01 10:30:00)");
        assert!(TableLoadPhase::Loaded { rows: 3 }.as_type().is_done());
    }
}
