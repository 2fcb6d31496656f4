use config::shared::{BatchConfig, PgConnectionConfig};
use postgres::warehouse::{
    begin_append, connect_to_warehouse, count_rows, fetch_latest_datetime_row,
    insert_statement_prefix, ping,
};
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{error, info};

use crate::destination::Warehouse;
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::types::{Cell, StoredWatermark, TableRow, TimeWatermark, WarehouseTable};
use crate::{bail, etl_error};

/// Warehouse stored in a Postgres database.
///
/// Each [`Warehouse::append_rows`] call runs in its own transaction. Rows are inserted with
/// multi-row `INSERT` statements of at most `max_batch_size` rows each.
#[derive(Debug, Clone)]
pub struct PostgresWarehouse {
    pool: PgPool,
    max_batch_size: usize,
}

impl PostgresWarehouse {
    /// Connects to the warehouse described by `config`.
    pub async fn connect(config: &PgConnectionConfig, batch: &BatchConfig) -> EtlResult<Self> {
        let pool = connect_to_warehouse(config).await.map_err(|err| {
            etl_error!(
                ErrorKind::WarehouseConnectionFailed,
                "Failed to connect to the warehouse",
                format!("{}:{}/{}", config.host, config.port, config.name),
                source: err
            )
        })?;

        Ok(Self::new(pool, batch))
    }

    pub fn new(pool: PgPool, batch: &BatchConfig) -> Self {
        Self {
            pool,
            max_batch_size: batch.max_size.max(1),
        }
    }

    async fn insert_in_transaction(&self, table: WarehouseTable, rows: &[TableRow]) -> EtlResult<()> {
        let prefix = insert_statement_prefix(table);
        let mut transaction = begin_append(&self.pool).await?;

        for chunk in rows.chunks(self.max_batch_size) {
            let mut builder = QueryBuilder::<Postgres>::new(&prefix);
            builder.push_values(chunk, |mut separated, row| {
                for cell in row.values() {
                    push_cell(&mut separated, cell);
                }
            });

            builder.build().execute(&mut *transaction).await?;
        }

        transaction.commit().await?;

        Ok(())
    }
}

impl Warehouse for PostgresWarehouse {
    fn name() -> &'static str {
        "postgres"
    }

    async fn check_connection(&self) -> EtlResult<()> {
        ping(&self.pool).await.map_err(|err| {
            etl_error!(
                ErrorKind::WarehouseConnectionFailed,
                "Warehouse is unreachable",
                source: err
            )
        })
    }

    async fn row_count(&self, table: WarehouseTable) -> EtlResult<u64> {
        let count = count_rows(&self.pool, table).await?;

        Ok(count.max(0) as u64)
    }

    async fn append_rows(&self, table: WarehouseTable, rows: Vec<TableRow>) -> EtlResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let width = table.column_names().len();
        if let Some(row) = rows.iter().find(|row| row.len() != width) {
            bail!(
                ErrorKind::LoadFailed,
                "Row does not match the warehouse table",
                format!(
                    "table `{table}` expects {width} columns, got a row with {} while appending {} rows",
                    row.len(),
                    rows.len()
                )
            );
        }

        if let Err(err) = self.insert_in_transaction(table, &rows).await {
            error!(table = %table, row_count = rows.len(), error = %err.description(), "warehouse rejected rows");

            return Err(load_failed(table, rows.len(), err));
        }

        info!(table = %table, row_count = rows.len(), "appended rows to warehouse");

        Ok(rows.len() as u64)
    }

    async fn latest_watermark(&self) -> EtlResult<Option<StoredWatermark>> {
        let Some(row) = fetch_latest_datetime_row(&self.pool).await? else {
            return Ok(None);
        };

        let watermark = TimeWatermark::from_parts(row.date, row.hour, row.minute, row.second)?;

        Ok(Some(StoredWatermark {
            id: row.id,
            watermark,
        }))
    }
}

/// Pushes `cell` as a bound parameter, or as a literal `NULL` since untyped null binds
/// cannot be inferred by Postgres in a multi-row `VALUES` list.
fn push_cell(separated: &mut Separated<'_, '_, Postgres, &'static str>, cell: &Cell) {
    match cell {
        Cell::Null => {
            separated.push("NULL");
        }
        Cell::Bool(value) => {
            separated.push_bind(*value);
        }
        Cell::I64(value) => {
            separated.push_bind(*value);
        }
        Cell::F64(value) => {
            separated.push_bind(*value);
        }
        Cell::String(value) => {
            separated.push_bind(value.clone());
        }
        Cell::Date(value) => {
            separated.push_bind(*value);
        }
        Cell::Timestamp(value) => {
            separated.push_bind(*value);
        }
    }
}

fn load_failed(table: WarehouseTable, row_count: usize, err: EtlError) -> EtlError {
    let kind = match err.kind() {
        ErrorKind::WarehouseConnectionFailed => ErrorKind::WarehouseConnectionFailed,
        _ => ErrorKind::LoadFailed,
    };

    etl_error!(
        kind,
        "Failed to append rows to the warehouse",
        format!("table `{table}`, {row_count} rows: {}", err.detail().unwrap_or_default()),
        source: err
    )
}
