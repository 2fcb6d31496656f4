use crate::types::{Cell, TableRow};

/// One row of `fact_hiring_process`: the metrics of a process and vacancy pairing.
///
/// Every metric is an integer; absent aggregation results are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactRecord {
    pub met_total_candidates_applied: i64,
    pub met_total_candidates_interviewed: i64,
    pub met_total_candidates_hired: i64,
    pub met_sum_duration_hiring_proces: i64,
    pub met_sum_salary_initial: i64,
    pub met_total_feedback_positive: i64,
    pub met_total_neutral: i64,
    pub met_total_negative: i64,
    pub dim_process_id: i64,
    pub dim_vacancy_id: i64,
    pub dim_user_id: i64,
    pub dim_date_id: i64,
}

impl FactRecord {
    /// Total feedback rows counted for the vacancy, across all three categories.
    pub fn total_feedback(&self) -> i64 {
        self.met_total_feedback_positive + self.met_total_negative + self.met_total_neutral
    }

    /// Returns the row in the column order of `fact_hiring_process`.
    pub fn into_table_row(self) -> TableRow {
        TableRow::new(
            [
                self.met_total_candidates_applied,
                self.met_total_candidates_interviewed,
                self.met_total_candidates_hired,
                self.met_sum_duration_hiring_proces,
                self.met_sum_salary_initial,
                self.met_total_feedback_positive,
                self.met_total_neutral,
                self.met_total_negative,
                self.dim_process_id,
                self.dim_vacancy_id,
                self.dim_user_id,
                self.dim_date_id,
            ]
            .into_iter()
            .map(Cell::I64)
            .collect(),
        )
    }
}
