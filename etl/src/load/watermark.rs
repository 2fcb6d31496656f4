use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use crate::bail;
use crate::destination::Warehouse;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{StoredWatermark, TimeWatermark};

/// Source of the moment recorded as a run's watermark.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stopped at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    now: NaiveDateTime,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }
}

/// Reads the watermark left in `dim_datetime` by the previous run.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatermarkResolver;

impl WatermarkResolver {
    /// Returns the most recently inserted watermark, or [`None`] when the warehouse has never
    /// completed a run.
    ///
    /// Watermarks are ordered by insertion, so a clock going backwards between runs does not
    /// resurrect an older cutoff.
    pub async fn resolve<W: Warehouse>(warehouse: &W) -> EtlResult<Option<StoredWatermark>> {
        let latest = warehouse.latest_watermark().await?;

        match &latest {
            Some(stored) => info!(
                watermark = %stored.watermark,
                watermark_id = stored.id,
                "resolved previous watermark"
            ),
            None => info!("warehouse has no watermark, treating this as the first run"),
        }

        Ok(latest)
    }

    /// Resolves the watermark that was just inserted and checks it is the expected one.
    ///
    /// The identifier returned here is the foreign key of the facts built in the same run.
    pub async fn resolve_inserted<W: Warehouse>(
        warehouse: &W,
        inserted: TimeWatermark,
    ) -> EtlResult<StoredWatermark> {
        let Some(stored) = warehouse.latest_watermark().await? else {
            bail!(
                ErrorKind::InvalidState,
                "Inserted watermark could not be read back",
                format!("`dim_datetime` is empty after inserting {inserted}")
            );
        };

        if stored.watermark != inserted {
            bail!(
                ErrorKind::InvalidState,
                "Latest watermark is not the one just inserted",
                format!(
                    "expected {inserted}, found {} with id {}",
                    stored.watermark, stored.id
                )
            );
        }

        debug!(watermark = %stored.watermark, watermark_id = stored.id, "resolved inserted watermark");

        Ok(stored)
    }
}
