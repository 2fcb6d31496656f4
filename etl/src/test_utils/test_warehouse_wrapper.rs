use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::bail;
use crate::destination::Warehouse;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{StoredWatermark, TableRow, WarehouseTable};

#[derive(Debug, Default)]
struct Inner {
    append_calls: Vec<(WarehouseTable, usize)>,
    failing_tables: HashSet<WarehouseTable>,
    unreachable: bool,
}

/// Test wrapper around a [`Warehouse`] that records appends and can be told to fail.
///
/// The wrapped warehouse should share its storage between clones, like
/// [`crate::destination::memory::MemoryWarehouse`], so the test can inspect what was written.
#[derive(Debug, Clone)]
pub struct TestWarehouseWrapper<W> {
    wrapped: W,
    inner: Arc<RwLock<Inner>>,
}

impl<W> TestWarehouseWrapper<W> {
    pub fn wrap(warehouse: W) -> Self {
        Self {
            wrapped: warehouse,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub fn wrapped(&self) -> &W {
        &self.wrapped
    }

    /// Makes every later append to `table` fail with [`ErrorKind::LoadFailed`].
    pub async fn fail_appends_to(&self, table: WarehouseTable) {
        self.inner.write().await.failing_tables.insert(table);
    }

    /// Makes the connection check fail with [`ErrorKind::WarehouseConnectionFailed`].
    pub async fn make_unreachable(&self) {
        self.inner.write().await.unreachable = true;
    }

    /// Removes every injected failure.
    pub async fn heal(&self) {
        let mut inner = self.inner.write().await;
        inner.failing_tables.clear();
        inner.unreachable = false;
    }

    /// Returns the table and row count of every append call that reached the wrapper.
    pub async fn append_calls(&self) -> Vec<(WarehouseTable, usize)> {
        self.inner.read().await.append_calls.clone()
    }
}

impl<W> Warehouse for TestWarehouseWrapper<W>
where
    W: Warehouse + Send + Sync,
{
    fn name() -> &'static str {
        W::name()
    }

    async fn check_connection(&self) -> EtlResult<()> {
        if self.inner.read().await.unreachable {
            bail!(
                ErrorKind::WarehouseConnectionFailed,
                "Warehouse is unreachable",
                "connection failure injected by the test"
            );
        }

        self.wrapped.check_connection().await
    }

    async fn row_count(&self, table: WarehouseTable) -> EtlResult<u64> {
        self.wrapped.row_count(table).await
    }

    async fn append_rows(&self, table: WarehouseTable, rows: Vec<TableRow>) -> EtlResult<u64> {
        let should_fail = {
            let mut inner = self.inner.write().await;
            inner.append_calls.push((table, rows.len()));
            inner.failing_tables.contains(&table)
        };

        if should_fail {
            bail!(
                ErrorKind::LoadFailed,
                "Failed to append rows to the warehouse",
                format!("table `{table}`, {} rows: failure injected by the test", rows.len())
            );
        }

        self.wrapped.append_rows(table, rows).await
    }

    async fn latest_watermark(&self) -> EtlResult<Option<StoredWatermark>> {
        self.wrapped.latest_watermark().await
    }
}
