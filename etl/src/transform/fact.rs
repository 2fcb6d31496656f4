use std::collections::HashMap;
use tracing::warn;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{Cell, CellKey, FactRecord, RawTable};

const SECONDS_PER_DAY: i64 = 86_400;

/// Feedback type codes as recorded in the `fd_type` column.
const FEEDBACK_POSITIVE: i64 = 1;
const FEEDBACK_NEGATIVE: i64 = 2;
const FEEDBACK_NEUTRAL: i64 = 3;

/// The raw tables the fact table is derived from.
#[derive(Debug, Clone, Copy)]
pub struct FactSources<'a> {
    pub processes: &'a RawTable,
    pub vacancies: &'a RawTable,
    pub vacancy_candidates: &'a RawTable,
    pub interviews: &'a RawTable,
    pub feedbacks: &'a RawTable,
    pub hirings: &'a RawTable,
}

/// Per vacancy aggregates; vacancies missing from a source keep zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct VacancyMetrics {
    applied: i64,
    interviewed: i64,
    hired: i64,
    salary: f64,
    positive: i64,
    negative: i64,
    neutral: i64,
}

/// Builds one fact row per process and vacancy pairing, tagged with the watermark `date_id`.
///
/// Processes and vacancies are inner-joined on `pc_id`. Rows come out in process order, then
/// vacancy order; a process matching several vacancies yields one row per vacancy.
pub fn build_facts(sources: &FactSources<'_>, date_id: i64) -> EtlResult<Vec<FactRecord>> {
    let [pc_id, initial_date, finish_date, usr_id] = sources.processes.require_columns([
        "pc_id",
        "pc_initial_date",
        "pc_finish_date",
        "usr_id",
    ])?;
    let [vc_id, vacancy_pc_id] = sources.vacancies.require_columns(["vc_id", "pc_id"])?;

    let metrics = aggregate_vacancy_metrics(sources)?;

    let mut vacancies_by_process: HashMap<CellKey, Vec<usize>> = HashMap::new();
    for (index, row) in sources.vacancies.rows().iter().enumerate() {
        if let Some(key) = row.get(vacancy_pc_id).key() {
            vacancies_by_process.entry(key).or_default().push(index);
        }
    }

    let mut facts = Vec::new();
    for process in sources.processes.rows() {
        let Some(vacancy_rows) = process
            .get(pc_id)
            .key()
            .and_then(|key| vacancies_by_process.get(&key))
        else {
            continue;
        };

        let process_id = integer_key(process.get(pc_id), "pc_id")?;
        let duration = duration_in_days(process.get(initial_date), process.get(finish_date));
        if duration < 0 {
            warn!(
                process_id,
                duration, "process finishes before it starts, keeping negative duration"
            );
        }
        let user_id = process.get(usr_id).as_i64().unwrap_or(0);

        for vacancy_row in vacancy_rows {
            let vacancy = &sources.vacancies.rows()[*vacancy_row];
            let vacancy_key = vacancy.get(vc_id).key();
            let vacancy_metrics = vacancy_key
                .as_ref()
                .and_then(|key| metrics.get(key))
                .copied()
                .unwrap_or_default();

            facts.push(FactRecord {
                met_total_candidates_applied: vacancy_metrics.applied,
                met_total_candidates_interviewed: vacancy_metrics.interviewed,
                met_total_candidates_hired: vacancy_metrics.hired,
                met_sum_duration_hiring_proces: duration,
                met_sum_salary_initial: vacancy_metrics.salary.trunc() as i64,
                met_total_feedback_positive: vacancy_metrics.positive,
                met_total_neutral: vacancy_metrics.neutral,
                met_total_negative: vacancy_metrics.negative,
                dim_process_id: process_id,
                dim_vacancy_id: integer_key(vacancy.get(vc_id), "vc_id")?,
                dim_user_id: user_id,
                dim_date_id: date_id,
            });
        }
    }

    Ok(facts)
}

fn aggregate_vacancy_metrics(
    sources: &FactSources<'_>,
) -> EtlResult<HashMap<CellKey, VacancyMetrics>> {
    let mut metrics: HashMap<CellKey, VacancyMetrics> = HashMap::new();

    for_each_vacancy_row(sources.vacancy_candidates, [], |key, _| {
        metrics.entry(key).or_default().applied += 1;
        Ok(())
    })?;

    for_each_vacancy_row(sources.interviews, [], |key, _| {
        metrics.entry(key).or_default().interviewed += 1;
        Ok(())
    })?;

    for_each_vacancy_row(sources.hirings, ["hr_initial_salary"], |key, [salary]| {
        let entry = metrics.entry(key).or_default();
        entry.hired += 1;
        match salary {
            Cell::Null => {}
            value => match value.as_f64() {
                Some(salary) => entry.salary += salary,
                None => bail!(
                    ErrorKind::InvalidData,
                    "Initial salary is not numeric",
                    format!("`hr_initial_salary` holds `{value}`")
                ),
            },
        }
        Ok(())
    })?;

    for_each_vacancy_row(sources.feedbacks, ["fd_type"], |key, [feedback_type]| {
        let entry = metrics.entry(key).or_default();
        match feedback_type.as_exact_i64() {
            Some(FEEDBACK_POSITIVE) => entry.positive += 1,
            Some(FEEDBACK_NEGATIVE) => entry.negative += 1,
            Some(FEEDBACK_NEUTRAL) => entry.neutral += 1,
            _ => bail!(
                ErrorKind::InvalidData,
                "Unknown feedback type",
                format!("`fd_type` holds `{feedback_type}`, expected 1, 2 or 3")
            ),
        }
        Ok(())
    })?;

    Ok(metrics)
}

/// Calls `f` with the `vc_id` key and the `extra` column values of every row of `table`.
///
/// Rows without a vacancy key are skipped. An empty table lacking the columns contributes
/// nothing; a non-empty one is a schema mismatch.
fn for_each_vacancy_row<const N: usize, F>(
    table: &RawTable,
    extra: [&str; N],
    mut f: F,
) -> EtlResult<()>
where
    F: FnMut(CellKey, [&Cell; N]) -> EtlResult<()>,
{
    let Some(vc_id) = table.require_columns_unless_empty(["vc_id"])? else {
        return Ok(());
    };
    let Some(extra) = table.require_columns_unless_empty(extra)? else {
        return Ok(());
    };

    for row in table.rows() {
        if let Some(key) = row.get(vc_id[0]).key() {
            f(key, extra.map(|index| row.get(index)))?;
        }
    }

    Ok(())
}

/// Whole days from `initial` to `finish`, rounding down; zero when either is missing.
fn duration_in_days(initial: &Cell, finish: &Cell) -> i64 {
    match (initial.as_datetime(), finish.as_datetime()) {
        (Some(initial), Some(finish)) => {
            (finish - initial).num_seconds().div_euclid(SECONDS_PER_DAY)
        }
        _ => 0,
    }
}

fn integer_key(value: &Cell, column: &str) -> EtlResult<i64> {
    match value.as_exact_i64() {
        Some(key) => Ok(key),
        None => bail!(
            ErrorKind::InvalidData,
            "Key column is not an integer",
            format!("`{column}` holds `{value}`")
        ),
    }
}
