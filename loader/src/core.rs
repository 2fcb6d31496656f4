use config::shared::{
    BatchConfig, IncrementalConfig, LoaderConfig, PgConnectionConfig, SourceConfig,
    WarehouseConfig,
};
use etl::destination::Warehouse;
use etl::destination::memory::MemoryWarehouse;
use etl::destination::postgres::PostgresWarehouse;
use etl::load::SystemClock;
use etl::pipeline::{Pipeline, RunSummary};
use etl::source::RawTableProvider;
use etl::source::json::JsonWorkbookProvider;
use tracing::{debug, info};

use crate::error::LoaderResult;

/// Runs a single load with the provided configuration.
///
/// Opens the workbook named by the source config and loads it into the configured warehouse.
pub async fn run_loader(loader_config: LoaderConfig) -> LoaderResult<RunSummary> {
    info!("starting loader");

    log_config(&loader_config);

    let provider = JsonWorkbookProvider::open(&loader_config.source).await?;

    // One arm per warehouse keeps the pipeline statically dispatched.
    let summary = match &loader_config.warehouse {
        WarehouseConfig::Memory => {
            let warehouse = MemoryWarehouse::new();
            run_pipeline(provider, warehouse, loader_config.load).await?
        }
        WarehouseConfig::Postgres { connection } => {
            let warehouse =
                PostgresWarehouse::connect(connection, &loader_config.load.batch).await?;
            run_pipeline(provider, warehouse, loader_config.load).await?
        }
    };

    info!(changed = summary.changed, "loader completed");

    Ok(summary)
}

async fn run_pipeline<P, W>(
    provider: P,
    warehouse: W,
    load_config: IncrementalConfig,
) -> LoaderResult<RunSummary>
where
    P: RawTableProvider,
    W: Warehouse,
{
    let pipeline = Pipeline::new(provider, warehouse, SystemClock, load_config)?;
    let summary = pipeline.run().await?;

    Ok(summary)
}

fn log_config(config: &LoaderConfig) {
    log_source_config(&config.source);
    log_warehouse_config(&config.warehouse);
    log_incremental_config(&config.load);
}

fn log_source_config(config: &SourceConfig) {
    debug!(
        path = %config.path.display(),
        sheet_overrides = config.sheets.len(),
        "source workbook config"
    );
}

fn log_warehouse_config(config: &WarehouseConfig) {
    match config {
        WarehouseConfig::Memory => {
            debug!("using memory warehouse config");
        }
        WarehouseConfig::Postgres { connection } => {
            log_pg_connection_config(connection);
        }
    }
}

fn log_pg_connection_config(config: &PgConnectionConfig) {
    debug!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        "warehouse postgres connection config",
    );
}

fn log_incremental_config(config: &IncrementalConfig) {
    for (table, column) in &config.update_columns {
        debug!(table, column, "tracked update column");
    }
    debug!(untracked_tables = ?config.untracked_tables, "untracked table policy");
    log_batch_config(&config.batch);
}

fn log_batch_config(config: &BatchConfig) {
    debug!(max_size = config.max_size, "batch config");
}
