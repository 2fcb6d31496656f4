use chrono::{NaiveDate, NaiveDateTime};
use config::shared::{BatchConfig, PgConnectionConfig};
use etl::destination::Warehouse;
use etl::destination::postgres::PostgresWarehouse;
use etl::error::ErrorKind;
use etl::types::{Cell, TableRow, TimeWatermark, WarehouseTable};
use postgres::test_utils::{
    create_pg_database, create_warehouse_tables, drop_pg_database, local_pg_connection_config,
};
use sqlx::PgPool;
use telemetry::init_test_tracing;

async fn spawn_warehouse(max_size: usize) -> (PgConnectionConfig, PgPool, PostgresWarehouse) {
    init_test_tracing();

    let config = local_pg_connection_config();
    let pool = create_pg_database(&config).await;
    create_warehouse_tables(&pool).await;
    let warehouse = PostgresWarehouse::new(pool.clone(), &BatchConfig { max_size });

    (config, pool, warehouse)
}

fn department(db_id: Cell, description: Cell) -> TableRow {
    TableRow::new(vec![db_id, "Department".into(), description])
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(hour, 15, 30)
        .unwrap()
}

#[tokio::test]
async fn chunked_appends_commit_together() {
    let (config, pool, warehouse) = spawn_warehouse(2).await;
    warehouse.check_connection().await.unwrap();

    let rows = (1..=5)
        .map(|db_id| {
            let description = if db_id % 2 == 0 {
                Cell::Null
            } else {
                "Hiring team".into()
            };
            department(Cell::I64(db_id), description)
        })
        .collect::<Vec<_>>();

    let appended = warehouse
        .append_rows(WarehouseTable::DimDepartment, rows)
        .await
        .unwrap();
    assert_eq!(appended, 5);
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::DimDepartment)
            .await
            .unwrap(),
        5
    );

    let nulls: i64 =
        sqlx::query_scalar("select count(*) from dim_department where description is null")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(nulls, 2);

    // The third chunk is rejected; the two chunks before it are rolled back with it.
    let mut rows = (6..=10)
        .map(|db_id| department(Cell::I64(db_id), Cell::Null))
        .collect::<Vec<_>>();
    rows[4] = department("not a key".into(), Cell::Null);

    let err = warehouse
        .append_rows(WarehouseTable::DimDepartment, rows)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LoadFailed);
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::DimDepartment)
            .await
            .unwrap(),
        5
    );

    pool.close().await;
    drop_pg_database(&config).await;
}

#[tokio::test]
async fn latest_watermark_is_the_last_inserted_row() {
    let (config, pool, warehouse) = spawn_warehouse(1000).await;

    assert_eq!(warehouse.latest_watermark().await.unwrap(), None);

    let later = TimeWatermark::from_datetime(at(2, 10));
    let earlier = TimeWatermark::from_datetime(at(1, 9));
    for watermark in [later, earlier] {
        warehouse
            .append_rows(WarehouseTable::DimDatetime, vec![watermark.into_table_row()])
            .await
            .unwrap();
    }

    let latest = warehouse.latest_watermark().await.unwrap().unwrap();
    assert_eq!(latest.watermark, earlier);
    assert_eq!(latest.watermark.timestamp(), at(1, 9));

    let first_id: i64 = sqlx::query_scalar("select min(id)::int8 from dim_datetime")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(latest.id > first_id);

    pool.close().await;
    drop_pg_database(&config).await;
}

#[tokio::test]
async fn rows_of_the_wrong_width_are_rejected_before_any_insert() {
    let (config, pool, warehouse) = spawn_warehouse(1000).await;

    let err = warehouse
        .append_rows(
            WarehouseTable::DimUser,
            vec![TableRow::new(vec![Cell::I64(1), "Ana".into()])],
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LoadFailed);
    assert_eq!(warehouse.row_count(WarehouseTable::DimUser).await.unwrap(), 0);

    pool.close().await;
    drop_pg_database(&config).await;
}
