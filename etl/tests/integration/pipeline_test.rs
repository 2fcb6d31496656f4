use chrono::{Duration, NaiveDateTime};
use config::shared::{IncrementalConfig, UntrackedTablePolicy};
use etl::destination::Warehouse;
use etl::destination::memory::MemoryWarehouse;
use etl::error::ErrorKind;
use etl::load::{FixedClock, FullLoadReason, TableLoadPhase};
use etl::pipeline::{Pipeline, RunSummary};
use etl::source::memory::MemoryProvider;
use etl::test_utils::fixtures::{HiringData, datetime, raw_table};
use etl::test_utils::test_warehouse_wrapper::TestWarehouseWrapper;
use etl::types::{Cell, RawEntity, TableRow, TimeWatermark, WarehouseTable};
use telemetry::init_test_tracing;

type TestWarehouse = TestWarehouseWrapper<MemoryWarehouse>;

fn updated_at() -> NaiveDateTime {
    datetime(2024, 3, 1, 8)
}

fn first_run_at() -> NaiveDateTime {
    datetime(2024, 3, 1, 12)
}

fn warehouse() -> TestWarehouse {
    TestWarehouseWrapper::wrap(MemoryWarehouse::new())
}

async fn run_at(
    provider: &MemoryProvider,
    warehouse: &TestWarehouse,
    now: NaiveDateTime,
    config: IncrementalConfig,
) -> etl::error::EtlResult<RunSummary> {
    let pipeline = Pipeline::new(
        provider.clone(),
        warehouse.clone(),
        FixedClock::new(now),
        config,
    )?;

    pipeline.run().await
}

async fn row_counts(warehouse: &TestWarehouse) -> Vec<(WarehouseTable, u64)> {
    let mut counts = Vec::new();
    for table in WarehouseTable::ALL {
        counts.push((table, warehouse.row_count(table).await.unwrap()));
    }

    counts
}

fn integers(row: &TableRow) -> Vec<i64> {
    row.values()
        .iter()
        .map(|cell| cell.as_i64().unwrap())
        .collect()
}

fn plan_of(summary: &RunSummary, table: WarehouseTable) -> TableLoadPhase {
    summary
        .tables
        .iter()
        .find(|report| report.table == table)
        .map(|report| report.plan.clone())
        .unwrap()
}

#[tokio::test]
async fn first_run_loads_every_table() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();

    let summary = run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap();

    assert!(summary.changed);
    assert_eq!(summary.watermark_id, Some(1));
    assert_eq!(summary.fact_rows, 3);
    for table in WarehouseTable::DIMENSIONS {
        assert_eq!(
            plan_of(&summary, table),
            TableLoadPhase::FullLoad {
                reason: FullLoadReason::EmptyTarget
            },
            "{table}"
        );
    }
    assert_eq!(
        row_counts(&warehouse).await,
        vec![
            (WarehouseTable::DimDatetime, 1),
            (WarehouseTable::DimDepartment, 2),
            (WarehouseTable::DimUser, 2),
            (WarehouseTable::DimProcess, 3),
            (WarehouseTable::DimVacancy, 3),
            (WarehouseTable::HiringProcessCandidate, 7),
            (WarehouseTable::FactHiringProcess, 3),
        ]
    );
    assert_eq!(
        summary.to_string(),
        "load succeeded: 17 dimension rows (dim_department=2, dim_user=2, dim_process=3, \
         dim_vacancy=3, hiring_process_candidate=7), watermark 1, 3 fact rows"
    );

    let watermark = warehouse
        .latest_watermark()
        .await
        .unwrap()
        .unwrap()
        .watermark;
    assert_eq!(watermark, TimeWatermark::from_datetime(first_run_at()));
}

#[tokio::test]
async fn facts_aggregate_each_vacancy() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();

    run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap();

    let facts = warehouse
        .wrapped()
        .table_rows(WarehouseTable::FactHiringProcess)
        .await
        .iter()
        .map(integers)
        .collect::<Vec<_>>();

    // Processes start on 2024-01-01 and finish on 2024-03-01 at 08:00, 60 whole days later.
    assert_eq!(
        facts,
        vec![
            vec![5, 2, 1, 60, 4500, 2, 0, 1, 1, 10, 1, 1],
            vec![1, 0, 0, 60, 0, 0, 0, 0, 2, 20, 2, 1],
            vec![0, 0, 0, 60, 0, 0, 0, 0, 3, 30, 1, 1],
        ]
    );
    for fact in &facts {
        assert!(fact[..8].iter().all(|metric| *metric >= 0));
    }
}

#[tokio::test]
async fn rerun_with_unchanged_input_is_a_no_op() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();

    run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap();
    let counts_after_first_run = row_counts(&warehouse).await;

    let summary = run_at(
        &provider,
        &warehouse,
        first_run_at() + Duration::hours(1),
        IncrementalConfig::default(),
    )
    .await
    .unwrap();

    assert!(!summary.changed);
    assert_eq!(summary.watermark_id, None);
    assert_eq!(summary.fact_rows, 0);
    assert!(
        summary
            .tables
            .iter()
            .all(|report| report.phase == TableLoadPhase::NoOp)
    );
    assert_eq!(row_counts(&warehouse).await, counts_after_first_run);
    assert_eq!(
        summary.to_string(),
        "load succeeded: no dimension changed, nothing loaded"
    );
}

#[tokio::test]
async fn delta_load_only_takes_rows_changed_after_the_watermark() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();
    let watermark = first_run_at();

    run_at(&provider, &warehouse, watermark, IncrementalConfig::default())
        .await
        .unwrap();

    HiringData::new(updated_at())
        .with_process_finish_dates(&[
            Cell::Timestamp(watermark - Duration::days(1)),
            Cell::Timestamp(watermark + Duration::days(1)),
            Cell::Null,
        ])
        .register(&provider)
        .await;

    let summary = run_at(
        &provider,
        &warehouse,
        watermark + Duration::days(2),
        IncrementalConfig::default(),
    )
    .await
    .unwrap();

    assert!(summary.changed);
    assert_eq!(
        plan_of(&summary, WarehouseTable::DimProcess),
        TableLoadPhase::DeltaLoad {
            since: TimeWatermark::from_datetime(watermark)
        }
    );
    assert_eq!(
        plan_of(&summary, WarehouseTable::DimDepartment),
        TableLoadPhase::NoOp
    );
    assert_eq!(summary.dimension_rows(), 1);
    assert_eq!(summary.watermark_id, Some(2));

    // Only the process finishing after the watermark was added, and it is newer than it.
    let processes = warehouse
        .wrapped()
        .table_rows(WarehouseTable::DimProcess)
        .await;
    assert_eq!(processes.len(), 4);
    let added = &processes[3];
    assert_eq!(added.get(0).as_i64(), Some(2));
    assert!(added.get(3).as_datetime().unwrap() > watermark);

    // Facts are rebuilt for every pairing and tagged with the new watermark.
    let facts = warehouse
        .wrapped()
        .table_rows(WarehouseTable::FactHiringProcess)
        .await;
    assert_eq!(facts.len(), 6);
    assert!(facts[3..].iter().all(|fact| fact.get(11).as_i64() == Some(2)));
}

#[tokio::test]
async fn failed_append_aborts_the_run() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();
    warehouse.fail_appends_to(WarehouseTable::DimProcess).await;

    let err = run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LoadFailed);
    assert_eq!(
        warehouse.append_calls().await,
        vec![
            (WarehouseTable::DimDepartment, 2),
            (WarehouseTable::DimUser, 2),
            (WarehouseTable::DimProcess, 3),
        ]
    );
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::DimDatetime)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::FactHiringProcess)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn missing_watermark_reloads_populated_dimensions() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();

    // The first run loads the dimensions but cannot record its watermark.
    warehouse.fail_appends_to(WarehouseTable::DimDatetime).await;
    let err = run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadFailed);
    assert_eq!(
        warehouse.row_count(WarehouseTable::DimUser).await.unwrap(),
        2
    );

    warehouse.heal().await;
    let summary = run_at(
        &provider,
        &warehouse,
        first_run_at() + Duration::hours(1),
        IncrementalConfig::default(),
    )
    .await
    .unwrap();

    // Without a watermark every dimension is loaded again, duplicating the earlier rows.
    for table in WarehouseTable::DIMENSIONS {
        assert_eq!(
            plan_of(&summary, table),
            TableLoadPhase::FullLoad {
                reason: FullLoadReason::FirstRun
            },
            "{table}"
        );
    }
    assert_eq!(
        warehouse.row_count(WarehouseTable::DimUser).await.unwrap(),
        4
    );
    assert_eq!(summary.watermark_id, Some(1));
}

#[tokio::test]
async fn unreachable_warehouse_is_reported_before_any_work() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();
    warehouse.make_unreachable().await;

    let err = run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::WarehouseConnectionFailed);
    assert!(warehouse.append_calls().await.is_empty());
}

#[tokio::test]
async fn missing_raw_columns_abort_before_loading() {
    init_test_tracing();
    let mut data = HiringData::new(updated_at());
    data.users = raw_table(
        RawEntity::User,
        &["usr_id", "usr_last_update"],
        vec![vec![Cell::I64(1), Cell::Timestamp(updated_at())]],
    );
    let provider = data.provider().await;
    let warehouse = warehouse();

    let err = run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.kinds(),
        vec![ErrorKind::SchemaMismatch, ErrorKind::SchemaMismatch]
    );
    assert!(warehouse.append_calls().await.is_empty());
}

#[tokio::test]
async fn missing_raw_table_aborts_the_run() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    provider.remove_table(RawEntity::Hiring).await;
    let warehouse = warehouse();

    let err = run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    assert!(warehouse.append_calls().await.is_empty());
}

#[tokio::test]
async fn invalid_feedback_type_leaves_no_watermark() {
    init_test_tracing();
    let mut data = HiringData::new(updated_at());
    data.feedbacks = raw_table(
        RawEntity::Feedback,
        &["vc_id", "fd_type"],
        vec![vec![Cell::I64(10), Cell::I64(9)]],
    );
    let provider = data.provider().await;
    let warehouse = warehouse();

    let err = run_at(
        &provider,
        &warehouse,
        first_run_at(),
        IncrementalConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::DimDatetime)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn untracked_tables_can_always_be_reloaded() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();
    let config = IncrementalConfig {
        untracked_tables: UntrackedTablePolicy::Always,
        ..IncrementalConfig::default()
    };

    run_at(&provider, &warehouse, first_run_at(), config.clone())
        .await
        .unwrap();
    let summary = run_at(
        &provider,
        &warehouse,
        first_run_at() + Duration::hours(1),
        config,
    )
    .await
    .unwrap();

    assert_eq!(
        plan_of(&summary, WarehouseTable::DimDepartment),
        TableLoadPhase::FullLoad {
            reason: FullLoadReason::Untracked
        }
    );
    assert!(summary.changed);
    assert_eq!(summary.watermark_id, Some(2));
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::DimDepartment)
            .await
            .unwrap(),
        4
    );
}

#[tokio::test]
async fn missing_tracking_column_falls_back_to_a_full_load() {
    init_test_tracing();
    let provider = HiringData::new(updated_at()).provider().await;
    let warehouse = warehouse();
    let mut config = IncrementalConfig::default();
    config
        .update_columns
        .insert("dim_user".to_string(), "usr_updated_at".to_string());

    run_at(&provider, &warehouse, first_run_at(), config.clone())
        .await
        .unwrap();
    let summary = run_at(
        &provider,
        &warehouse,
        first_run_at() + Duration::hours(1),
        config,
    )
    .await
    .unwrap();

    assert_eq!(
        plan_of(&summary, WarehouseTable::DimUser),
        TableLoadPhase::FullLoad {
            reason: FullLoadReason::MissingTrackingColumn
        }
    );
    assert_eq!(
        plan_of(&summary, WarehouseTable::DimProcess),
        TableLoadPhase::DeltaLoad {
            since: TimeWatermark::from_datetime(first_run_at())
        }
    );
    assert_eq!(summary.dimension_rows(), 2);
}

#[tokio::test]
async fn unknown_tracked_table_is_a_config_error() {
    let mut config = IncrementalConfig::default();
    config
        .update_columns
        .insert("dim_applicant".to_string(), "updated_at".to_string());

    let err = Pipeline::new(
        MemoryProvider::new(),
        MemoryWarehouse::new(),
        FixedClock::new(first_run_at()),
        config,
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConfigError);
}
