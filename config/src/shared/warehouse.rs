use serde::Deserialize;

use crate::shared::{PgConnectionConfig, ValidationError};

/// Configuration of the warehouse the loader writes into.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid accidentally
/// leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseConfig {
    /// In-memory warehouse, discarded when the process exits.
    #[default]
    Memory,
    /// Postgres warehouse.
    Postgres {
        /// Connection settings of the warehouse database.
        connection: PgConnectionConfig,
    },
}

impl WarehouseConfig {
    /// Validates the warehouse configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            WarehouseConfig::Memory => Ok(()),
            WarehouseConfig::Postgres { connection } => connection.validate(),
        }
    }
}
