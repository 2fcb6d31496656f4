use std::future::Future;

use crate::error::EtlResult;
use crate::types::{RawEntity, RawTable};

/// Supplies the raw operational tables a load run starts from.
///
/// Each call returns a fresh snapshot; the pipeline fetches every [`RawEntity`] once per run
/// and never writes back to the provider.
pub trait RawTableProvider {
    /// Returns the name of the provider, used in logs.
    fn name() -> &'static str;

    /// Returns the table holding `entity`.
    ///
    /// A table that the provider cannot find is an [`crate::error::ErrorKind::SchemaMismatch`].
    fn get_table(&self, entity: RawEntity) -> impl Future<Output = EtlResult<RawTable>> + Send;
}
