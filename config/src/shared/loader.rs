use serde::Deserialize;

use crate::Config;
use crate::shared::{IncrementalConfig, SourceConfig, ValidationError, WarehouseConfig};

/// Complete configuration of the loader binary.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid accidentally
/// leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// Where raw tables are read from.
    pub source: SourceConfig,
    /// Where dimension and fact rows are written to.
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    /// Incremental load settings.
    #[serde(default)]
    pub load: IncrementalConfig,
}

impl LoaderConfig {
    /// Validates the complete loader configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.warehouse.validate()?;
        self.load.validate()
    }
}

impl Config for LoaderConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
