use config::shared::IncrementalConfig;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::destination::Warehouse;
use crate::error::EtlResult;
use crate::failpoints::{
    PIPELINE_BEFORE_FACT_INSERT, PIPELINE_BEFORE_WATERMARK_INSERT, etl_fail_point,
};
use crate::load::{Clock, LoadController, TableLoadReport, UpdateColumnMap, WatermarkResolver};
use crate::source::RawTableProvider;
use crate::transform::{
    Dimension, FactSources, build_facts, map_candidates, map_departments, map_processes,
    map_users, map_vacancies,
};
use crate::types::{FactRecord, RawEntity, RawTable, TimeWatermark};

/// Raw tables of one run.
#[derive(Debug)]
struct RawTables {
    departments: Arc<RawTable>,
    users: Arc<RawTable>,
    processes: Arc<RawTable>,
    vacancies: Arc<RawTable>,
    candidates: Arc<RawTable>,
    vacancy_candidates: Arc<RawTable>,
    interviews: Arc<RawTable>,
    feedbacks: Arc<RawTable>,
    hirings: Arc<RawTable>,
}

impl RawTables {
    fn fact_sources(&self) -> FactSources<'_> {
        FactSources {
            processes: &self.processes,
            vacancies: &self.vacancies,
            vacancy_candidates: &self.vacancy_candidates,
            interviews: &self.interviews,
            feedbacks: &self.feedbacks,
            hirings: &self.hirings,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether any dimension received rows.
    pub changed: bool,
    /// One report per loaded table, in load order.
    pub tables: Vec<TableLoadReport>,
    /// Identifier of the watermark inserted by the run, if any.
    pub watermark_id: Option<i64>,
    pub fact_rows: u64,
}

impl RunSummary {
    pub fn dimension_rows(&self) -> u64 {
        self.tables
            .iter()
            .filter(|report| report.table.is_dimension())
            .map(TableLoadReport::rows_loaded)
            .sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.changed {
            return write!(f, "load succeeded: no dimension changed, nothing loaded");
        }

        let changed = self
            .tables
            .iter()
            .filter(|report| report.table.is_dimension() && report.changed())
            .map(|report| format!("{}={}", report.table, report.rows_loaded()))
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "load succeeded: {} dimension rows ({changed})", self.dimension_rows())?;
        if let Some(watermark_id) = self.watermark_id {
            write!(f, ", watermark {watermark_id}")?;
        }
        write!(f, ", {} fact rows", self.fact_rows)
    }
}

/// Runs one incremental load from a raw table provider into a warehouse.
///
/// Dimensions are loaded first. Only when at least one of them received rows does the run
/// append a new watermark to `dim_datetime` and the rebuilt facts to `fact_hiring_process`.
#[derive(Debug)]
pub struct Pipeline<P, W, C> {
    provider: P,
    warehouse: W,
    clock: C,
    update_columns: UpdateColumnMap,
    config: IncrementalConfig,
}

impl<P, W, C> Pipeline<P, W, C>
where
    P: RawTableProvider,
    W: Warehouse,
    C: Clock,
{
    pub fn new(provider: P, warehouse: W, clock: C, config: IncrementalConfig) -> EtlResult<Self> {
        let update_columns = UpdateColumnMap::from_config(&config.update_columns)?;

        Ok(Self {
            provider,
            warehouse,
            clock,
            update_columns,
            config,
        })
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    pub async fn run(&self) -> EtlResult<RunSummary> {
        info!(
            provider = P::name(),
            warehouse = W::name(),
            "starting load run"
        );

        self.warehouse.check_connection().await?;

        let raw = self.fetch_raw_tables().await?;
        let dimensions = map_dimensions(&raw)?;

        let previous = WatermarkResolver::resolve(&self.warehouse).await?;

        let mut controller = LoadController::new(
            &self.warehouse,
            &self.update_columns,
            self.config.untracked_tables,
            previous,
        );
        for dimension in &dimensions {
            controller.load_dimension(dimension).await?;
        }

        if !controller.report().any_dimension_changed() {
            info!("no dimension changed, skipping watermark and facts");

            return Ok(RunSummary {
                changed: false,
                tables: controller.into_report().into_tables(),
                watermark_id: None,
                fact_rows: 0,
            });
        }

        // Facts are built before the watermark is written so that invalid raw data cannot leave
        // a watermark without facts. Their date id is set once the watermark is stored.
        let facts = build_facts(&raw.fact_sources(), 0)?;

        etl_fail_point(PIPELINE_BEFORE_WATERMARK_INSERT)?;

        let watermark = TimeWatermark::from_datetime(self.clock.now());
        controller.load_time_dimension(watermark).await?;
        let stored = WatermarkResolver::resolve_inserted(&self.warehouse, watermark).await?;

        let facts = facts
            .into_iter()
            .map(|fact| FactRecord {
                dim_date_id: stored.id,
                ..fact
            })
            .collect::<Vec<_>>();

        etl_fail_point(PIPELINE_BEFORE_FACT_INSERT)?;

        let fact_report = controller.load_facts(facts).await?;

        let summary = RunSummary {
            changed: true,
            tables: controller.into_report().into_tables(),
            watermark_id: Some(stored.id),
            fact_rows: fact_report.rows_loaded(),
        };
        info!(
            watermark = %watermark,
            watermark_id = stored.id,
            fact_rows = summary.fact_rows,
            "load run finished"
        );

        Ok(summary)
    }

    async fn fetch_raw_tables(&self) -> EtlResult<RawTables> {
        Ok(RawTables {
            departments: self.fetch(RawEntity::Department).await?,
            users: self.fetch(RawEntity::User).await?,
            processes: self.fetch(RawEntity::Process).await?,
            vacancies: self.fetch(RawEntity::Vacancy).await?,
            candidates: self.fetch(RawEntity::Candidate).await?,
            vacancy_candidates: self.fetch(RawEntity::VacancyCandidate).await?,
            interviews: self.fetch(RawEntity::Interview).await?,
            feedbacks: self.fetch(RawEntity::Feedback).await?,
            hirings: self.fetch(RawEntity::Hiring).await?,
        })
    }

    async fn fetch(&self, entity: RawEntity) -> EtlResult<Arc<RawTable>> {
        let table = self.provider.get_table(entity).await?;
        info!(entity = %entity, row_count = table.len(), "fetched raw table");

        Ok(Arc::new(table))
    }
}

/// Maps the five dimensions in load order.
///
/// Every mapping runs before the first append so that a schema mismatch in any raw table
/// aborts the run with the warehouse untouched.
fn map_dimensions(raw: &RawTables) -> EtlResult<Vec<Dimension>> {
    let results = [
        map_departments(raw.departments.clone()),
        map_users(raw.users.clone()),
        map_processes(raw.processes.clone()),
        map_vacancies(raw.vacancies.clone()),
        map_candidates(raw.candidates.clone(), &raw.vacancy_candidates),
    ];

    let mut dimensions = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(dimension) => dimensions.push(dimension),
            Err(err) => errors.push(err),
        }
    }

    if !errors.is_empty() {
        return Err(errors.into());
    }

    Ok(dimensions)
}
