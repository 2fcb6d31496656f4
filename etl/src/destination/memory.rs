use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bail;
use crate::destination::Warehouse;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{StoredWatermark, TableRow, TimeWatermark, WarehouseTable};

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<WarehouseTable, Vec<TableRow>>,
    /// Generated identifiers of the `dim_datetime` rows, parallel to their rows.
    datetime_ids: Vec<i64>,
}

/// In-memory warehouse for tests and dry runs.
///
/// Rows live in memory and are lost when the process ends. `dim_datetime` rows receive
/// sequential identifiers starting at `1`, like a serial column. Clones share the same
/// storage, so a test can keep a handle and inspect what a pipeline wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the rows stored in `table`.
    pub async fn table_rows(&self, table: WarehouseTable) -> Vec<TableRow> {
        let inner = self.inner.lock().await;
        inner.tables.get(&table).cloned().unwrap_or_default()
    }

    /// Returns the identifiers assigned to `dim_datetime` rows, in insertion order.
    pub async fn datetime_ids(&self) -> Vec<i64> {
        let inner = self.inner.lock().await;
        inner.datetime_ids.clone()
    }

    /// Removes every stored row.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.tables.clear();
        inner.datetime_ids.clear();
    }
}

impl Warehouse for MemoryWarehouse {
    fn name() -> &'static str {
        "memory"
    }

    async fn check_connection(&self) -> EtlResult<()> {
        Ok(())
    }

    async fn row_count(&self, table: WarehouseTable) -> EtlResult<u64> {
        let inner = self.inner.lock().await;
        let count = inner.tables.get(&table).map(Vec::len).unwrap_or(0);

        Ok(count as u64)
    }

    async fn append_rows(&self, table: WarehouseTable, rows: Vec<TableRow>) -> EtlResult<u64> {
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

        let mut inner = self.inner.lock().await;
        let appended = rows.len() as u64;

        if table == WarehouseTable::DimDatetime {
            let first_id = inner.datetime_ids.last().copied().unwrap_or(0) + 1;
            inner
                .datetime_ids
                .extend((0..rows.len() as i64).map(|offset| first_id + offset));
        }
        inner.tables.entry(table).or_default().extend(rows);

        info!(table = %table, row_count = appended, "appended rows to memory warehouse");

        Ok(appended)
    }

    async fn latest_watermark(&self) -> EtlResult<Option<StoredWatermark>> {
        let inner = self.inner.lock().await;

        let row = inner
            .tables
            .get(&WarehouseTable::DimDatetime)
            .and_then(|rows| rows.last());
        let (Some(row), Some(id)) = (row, inner.datetime_ids.last()) else {
            debug!("memory warehouse has no watermark");
            return Ok(None);
        };

        Ok(Some(StoredWatermark {
            id: *id,
            watermark: TimeWatermark::try_from_table_row(row)?,
        }))
    }
}
