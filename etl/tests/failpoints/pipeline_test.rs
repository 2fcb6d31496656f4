use config::shared::IncrementalConfig;
use etl::destination::Warehouse;
use etl::destination::memory::MemoryWarehouse;
use etl::error::ErrorKind;
use etl::failpoints::{PIPELINE_BEFORE_FACT_INSERT, PIPELINE_BEFORE_WATERMARK_INSERT};
use etl::load::{FixedClock, FullLoadReason, TableLoadPhase};
use etl::pipeline::Pipeline;
use etl::test_utils::failpoints::PipelineFailScenario;
use etl::test_utils::fixtures::{HiringData, datetime};
use etl::types::WarehouseTable;
use telemetry::init_test_tracing;

// Both scenarios share global failpoints, so they run as a single test.
#[tokio::test]
async fn crash_between_dimension_and_tail_loads_is_not_atomic() {
    init_test_tracing();
    let provider = HiringData::new(datetime(2024, 3, 1, 8)).provider().await;
    let warehouse = MemoryWarehouse::new();
    let pipeline_at = |hour| {
        Pipeline::new(
            provider.clone(),
            warehouse.clone(),
            FixedClock::new(datetime(2024, 3, 1, hour)),
            IncrementalConfig::default(),
        )
        .unwrap()
    };

    // A crash before the watermark insert leaves the dimensions committed without a watermark.
    {
        let _scenario = PipelineFailScenario::setup().fail(PIPELINE_BEFORE_WATERMARK_INSERT);

        let err = pipeline_at(12).run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InjectedFailure);
    }
    assert_eq!(
        warehouse.row_count(WarehouseTable::DimProcess).await.unwrap(),
        3
    );
    assert_eq!(warehouse.latest_watermark().await.unwrap(), None);

    // The next run cannot tell which rows were loaded and loads everything again.
    let summary = pipeline_at(13).run().await.unwrap();
    assert_eq!(
        summary.tables[0].plan,
        TableLoadPhase::FullLoad {
            reason: FullLoadReason::FirstRun
        }
    );
    assert_eq!(
        warehouse.row_count(WarehouseTable::DimProcess).await.unwrap(),
        6
    );

    // A crash after the watermark insert leaves a watermark without facts.
    warehouse.clear().await;
    {
        let _scenario = PipelineFailScenario::setup().fail(PIPELINE_BEFORE_FACT_INSERT);

        let err = pipeline_at(14).run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InjectedFailure);
    }
    assert!(warehouse.latest_watermark().await.unwrap().is_some());
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::FactHiringProcess)
            .await
            .unwrap(),
        0
    );

    // The watermark hides the unchanged dimensions, so the facts are not rebuilt either.
    let summary = pipeline_at(15).run().await.unwrap();
    assert!(!summary.changed);
    assert_eq!(
        warehouse
            .row_count(WarehouseTable::FactHiringProcess)
            .await
            .unwrap(),
        0
    );
}
