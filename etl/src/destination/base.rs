use std::future::Future;

use crate::error::EtlResult;
use crate::types::{StoredWatermark, TableRow, WarehouseTable};

/// Sink receiving dimension, time and fact rows.
///
/// [`Warehouse`] implementations persist rows into the fixed warehouse tables. Rows are
/// laid out in the column order returned by [`WarehouseTable::column_names`].
///
/// An [`Warehouse::append_rows`] call must be atomic: either every row of the call is stored
/// or none is. Nothing is promised across calls, so a failure between two calls leaves the
/// earlier ones committed.
pub trait Warehouse {
    /// Returns the name of the warehouse, used in logs.
    fn name() -> &'static str;

    /// Verifies that the warehouse can be reached.
    fn check_connection(&self) -> impl Future<Output = EtlResult<()>> + Send;

    /// Returns the number of rows currently stored in `table`.
    fn row_count(&self, table: WarehouseTable) -> impl Future<Output = EtlResult<u64>> + Send;

    /// Appends `rows` to `table` in a single atomic operation and returns the number stored.
    fn append_rows(
        &self,
        table: WarehouseTable,
        rows: Vec<TableRow>,
    ) -> impl Future<Output = EtlResult<u64>> + Send;

    /// Returns the most recently inserted `dim_datetime` row, or [`None`] when there is none.
    ///
    /// Rows are ordered by insertion, not by the moment they describe.
    fn latest_watermark(&self) -> impl Future<Output = EtlResult<Option<StoredWatermark>>> + Send;
}
