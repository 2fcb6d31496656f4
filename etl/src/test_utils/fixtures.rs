use chrono::{NaiveDate, NaiveDateTime};

use crate::source::memory::MemoryProvider;
use crate::types::{Cell, RawEntity, RawTable, TableRow};

pub fn datetime(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .expect("valid fixture datetime")
}

pub fn date(year: i32, month: u32, day: u32) -> Cell {
    Cell::Date(NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date"))
}

/// Builds a raw table, panicking when a row does not match the columns.
pub fn raw_table(entity: RawEntity, columns: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
    RawTable::new(
        entity,
        columns.iter().map(|column| column.to_string()).collect(),
        rows.into_iter().map(TableRow::new).collect(),
    )
    .expect("fixture rows must match their columns")
}

const PROCESS_COLUMNS: [&str; 8] = [
    "pc_id",
    "pc_title",
    "pc_initial_date",
    "pc_finish_date",
    "pc_status",
    "usr_id",
    "pc_description",
    "dp_id",
];

/// Raw tables of a small hiring operation.
///
/// - 2 departments and 2 users.
/// - 3 processes (`pc_id` 1 to 3), each with one vacancy (`vc_id` 10, 20 and 30).
/// - 7 candidates: five applied to vacancy 10, one to vacancy 20, one never applied.
/// - Vacancy 10 has 2 interviews, feedback types `[1, 1, 2]` and 1 hire earning 4500.75.
///
/// Every update column holds the `updated_at` moment given to [`HiringData::new`].
#[derive(Debug, Clone)]
pub struct HiringData {
    pub departments: RawTable,
    pub users: RawTable,
    pub processes: RawTable,
    pub vacancies: RawTable,
    pub candidates: RawTable,
    pub vacancy_candidates: RawTable,
    pub interviews: RawTable,
    pub feedbacks: RawTable,
    pub hirings: RawTable,
}

impl HiringData {
    pub fn new(updated_at: NaiveDateTime) -> Self {
        let updated = Cell::Timestamp(updated_at);

        let departments = raw_table(
            RawEntity::Department,
            &["dp_id", "dp_name", "dp_description"],
            vec![
                vec![Cell::I64(1), "Engineering".into(), "Product engineering".into()],
                vec![Cell::I64(2), "People".into(), Cell::Null],
            ],
        );

        let users = raw_table(
            RawEntity::User,
            &["usr_id", "usr_name", "usr_ocupation", "usr_last_update"],
            vec![
                vec![Cell::I64(1), "Ana".into(), "Recruiter".into(), updated.clone()],
                vec![Cell::I64(2), "Bruno".into(), "Hiring manager".into(), updated.clone()],
            ],
        );

        let vacancies = raw_table(
            RawEntity::Vacancy,
            &[
                "vc_id",
                "vc_title",
                "vc_num_positions",
                "vc_status",
                "vc_location",
                "usr_id",
                "vc_opening_date",
                "vc_closing_date",
                "pc_id",
            ],
            [
                (10, "Backend engineer", 2, 1),
                (20, "Product designer", 1, 2),
                (30, "People partner", 1, 3),
            ]
            .into_iter()
            .map(|(vc_id, title, positions, pc_id)| {
                vec![
                    Cell::I64(vc_id),
                    title.into(),
                    Cell::I64(positions),
                    "open".into(),
                    "Remote".into(),
                    Cell::I64(1),
                    date(2024, 1, 2),
                    updated.clone(),
                    Cell::I64(pc_id),
                ]
            })
            .collect(),
        );

        let candidates = raw_table(
            RawEntity::Candidate,
            &[
                "cd_id",
                "cd_name",
                "cd_email",
                "cd_phone",
                "cd_score",
                "cd_status",
                "cd_last_update",
            ],
            (100..107)
                .map(|cd_id| {
                    vec![
                        Cell::I64(cd_id),
                        format!("Candidate {cd_id}").into(),
                        format!("candidate{cd_id}@example.com").into(),
                        Cell::Null,
                        Cell::F64(7.5),
                        "active".into(),
                        updated.clone(),
                    ]
                })
                .collect(),
        );

        let vacancy_candidates = raw_table(
            RawEntity::VacancyCandidate,
            &["cd_id", "vc_cd_insert_date", "vc_id"],
            [(100, 10), (101, 10), (102, 10), (103, 10), (104, 10), (105, 20)]
                .into_iter()
                .map(|(cd_id, vc_id)| vec![Cell::I64(cd_id), date(2024, 1, 5), Cell::I64(vc_id)])
                .collect(),
        );

        let interviews = raw_table(
            RawEntity::Interview,
            &["it_id", "vc_id", "cd_id"],
            vec![
                vec![Cell::I64(1), Cell::I64(10), Cell::I64(100)],
                vec![Cell::I64(2), Cell::I64(10), Cell::I64(101)],
            ],
        );

        let feedbacks = raw_table(
            RawEntity::Feedback,
            &["fd_id", "vc_id", "cd_id", "fd_type"],
            vec![
                vec![Cell::I64(1), Cell::I64(10), Cell::I64(100), Cell::I64(1)],
                vec![Cell::I64(2), Cell::I64(10), Cell::I64(101), Cell::I64(1)],
                vec![Cell::I64(3), Cell::I64(10), Cell::I64(102), Cell::I64(2)],
            ],
        );

        let hirings = raw_table(
            RawEntity::Hiring,
            &["hr_id", "vc_id", "cd_id", "hr_initial_salary"],
            vec![vec![
                Cell::I64(1),
                Cell::I64(10),
                Cell::I64(100),
                Cell::F64(4500.75),
            ]],
        );

        Self {
            departments,
            users,
            processes: processes(&[updated.clone(), updated.clone(), updated]),
            vacancies,
            candidates,
            vacancy_candidates,
            interviews,
            feedbacks,
            hirings,
        }
    }

    /// Replaces the processes with one process per finish date, numbered from `1`.
    pub fn with_process_finish_dates(mut self, finish_dates: &[Cell]) -> Self {
        self.processes = processes(finish_dates);
        self
    }

    pub fn tables(&self) -> [&RawTable; 9] {
        [
            &self.departments,
            &self.users,
            &self.processes,
            &self.vacancies,
            &self.candidates,
            &self.vacancy_candidates,
            &self.interviews,
            &self.feedbacks,
            &self.hirings,
        ]
    }

    /// Registers every table in `provider`, replacing the tables it held.
    pub async fn register(&self, provider: &MemoryProvider) {
        for table in self.tables() {
            provider.insert_table(table.clone()).await;
        }
    }

    pub async fn provider(&self) -> MemoryProvider {
        let provider = MemoryProvider::new();
        self.register(&provider).await;

        provider
    }
}

fn processes(finish_dates: &[Cell]) -> RawTable {
    let rows = finish_dates
        .iter()
        .enumerate()
        .map(|(index, finish)| {
            let pc_id = index as i64 + 1;
            vec![
                Cell::I64(pc_id),
                format!("Hiring process {pc_id}").into(),
                date(2024, 1, 1),
                finish.clone(),
                "open".into(),
                Cell::I64(1 + index as i64 % 2),
                Cell::Null,
                Cell::I64(1),
            ]
        })
        .collect();

    raw_table(RawEntity::Process, &PROCESS_COLUMNS, rows)
}
