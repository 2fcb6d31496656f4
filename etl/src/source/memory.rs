use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::source::RawTableProvider;
use crate::types::{RawEntity, RawTable};

/// Raw table provider backed by tables registered in memory.
///
/// Clones share the same tables, so a test can replace a table between two runs of a
/// pipeline that owns another clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    tables: Arc<Mutex<HashMap<RawEntity, RawTable>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `table` under its entity, replacing any previous table.
    pub async fn insert_table(&self, table: RawTable) {
        let mut tables = self.tables.lock().await;
        tables.insert(table.entity(), table);
    }

    pub async fn remove_table(&self, entity: RawEntity) -> Option<RawTable> {
        let mut tables = self.tables.lock().await;
        tables.remove(&entity)
    }
}

impl RawTableProvider for MemoryProvider {
    fn name() -> &'static str {
        "memory"
    }

    async fn get_table(&self, entity: RawEntity) -> EtlResult<RawTable> {
        let tables = self.tables.lock().await;

        match tables.get(&entity) {
            Some(table) => Ok(table.clone()),
            None => bail!(
                ErrorKind::SchemaMismatch,
                "Raw table is missing",
                format!("no table registered for entity `{entity}`")
            ),
        }
    }
}
