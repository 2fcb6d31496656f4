use config::shared::{IncrementalConfig, SourceConfig};
use etl::destination::Warehouse;
use etl::destination::memory::MemoryWarehouse;
use etl::error::ErrorKind;
use etl::load::FixedClock;
use etl::pipeline::Pipeline;
use etl::source::json::JsonWorkbookProvider;
use etl::test_utils::fixtures::datetime;
use etl::types::WarehouseTable;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use telemetry::init_test_tracing;

fn workbook() -> Value {
    json!({
        "Departamentos": [
            { "dp_id": 1, "dp_name": "Engineering", "dp_description": null }
        ],
        "users": [
            { "usr_id": 1, "usr_name": "Ana", "usr_ocupation": "Recruiter", "usr_last_update": "2024-02-20 09:15:00" }
        ],
        "processes": [
            {
                "pc_id": 1, "pc_title": "Backend hiring", "pc_initial_date": "2024-01-01",
                "pc_finish_date": "2024-02-15", "pc_status": "closed", "usr_id": 1,
                "pc_description": "Two backend engineers", "dp_id": 1
            }
        ],
        "vacancies": [
            {
                "vc_id": 10, "vc_title": "Backend engineer", "vc_num_positions": 2.0,
                "vc_status": "closed", "vc_location": "Remote", "usr_id": 1,
                "vc_opening_date": "2024-01-02", "vc_closing_date": "2024-02-10", "pc_id": 1.0
            }
        ],
        "candidates": [
            {
                "cd_id": 100, "cd_name": "Carla", "cd_email": "carla@example.com",
                "cd_phone": "555-0100", "cd_score": 8.5, "cd_status": "hired",
                "cd_last_update": "2024-02-12T10:00:00"
            },
            {
                "cd_id": 101, "cd_name": "Davi", "cd_email": "davi@example.com",
                "cd_score": 6, "cd_status": "rejected", "cd_last_update": "2024-02-11T10:00:00"
            }
        ],
        "vacancy_candidates": [
            { "cd_id": 100, "vc_cd_insert_date": "2024-01-05", "vc_id": 10 },
            { "cd_id": 101, "vc_cd_insert_date": "2024-01-06", "vc_id": 10 }
        ],
        "interviews": [
            { "it_id": 1, "vc_id": 10, "cd_id": 100 }
        ],
        "feedbacks": [
            { "fd_id": 1, "vc_id": 10, "cd_id": 100, "fd_type": 1 },
            { "fd_id": 2, "vc_id": 10, "cd_id": 101, "fd_type": 3 }
        ],
        "hirings": []
    })
}

#[tokio::test]
async fn workbook_on_disk_feeds_a_full_run() {
    init_test_tracing();
    let path = std::env::temp_dir().join(format!(
        "hiring_workbook_{}.json",
        std::process::id()
    ));
    tokio::fs::write(&path, workbook().to_string())
        .await
        .unwrap();

    let config = SourceConfig {
        path: path.clone(),
        sheets: BTreeMap::from([("department".to_string(), "Departamentos".to_string())]),
    };
    let provider = JsonWorkbookProvider::open(&config).await.unwrap();
    let warehouse = MemoryWarehouse::new();

    let summary = Pipeline::new(
        provider,
        warehouse.clone(),
        FixedClock::new(datetime(2024, 3, 1, 12)),
        IncrementalConfig::default(),
    )
    .unwrap()
    .run()
    .await
    .unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    assert_eq!(summary.dimension_rows(), 6);
    assert_eq!(summary.fact_rows, 1);

    let facts = warehouse.table_rows(WarehouseTable::FactHiringProcess).await;
    let fact = facts[0]
        .values()
        .iter()
        .map(|cell| cell.as_i64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(fact, vec![2, 1, 0, 45, 0, 1, 1, 0, 1, 10, 1, 1]);

    // Davi has no phone; the key is missing from his row and is stored as null.
    let candidates = warehouse
        .table_rows(WarehouseTable::HiringProcessCandidate)
        .await;
    assert!(candidates[1].get(3).is_null());
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::DimDepartment)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn workbook_without_a_sheet_is_a_schema_mismatch() {
    let mut workbook = workbook();
    workbook.as_object_mut().unwrap().remove("interviews");
    let provider = JsonWorkbookProvider::from_value("memory.json", workbook).unwrap();

    let err = Pipeline::new(
        provider,
        MemoryWarehouse::new(),
        FixedClock::new(datetime(2024, 3, 1, 12)),
        IncrementalConfig::default(),
    )
    .unwrap()
    .run()
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
}
