use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::{BatchConfig, ValidationError};

/// Decides what happens to dimensions without an update column once the warehouse is populated.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UntrackedTablePolicy {
    /// Load untracked dimensions only on the first run or while their target table is empty.
    #[default]
    WhenEmpty,
    /// Reload untracked dimensions in full on every run.
    Always,
}

/// Configuration of the incremental load controller.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IncrementalConfig {
    /// Raw column used to detect changed rows, keyed by warehouse table name.
    ///
    /// Tables missing from the map are untracked.
    #[serde(default = "default_update_columns")]
    pub update_columns: BTreeMap<String, String>,
    /// Policy applied to untracked tables.
    #[serde(default)]
    pub untracked_tables: UntrackedTablePolicy,
    /// Insert batching settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl IncrementalConfig {
    /// Validates the incremental load settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some((table, _)) = self
            .update_columns
            .iter()
            .find(|(_, column)| column.trim().is_empty())
        {
            return Err(ValidationError::InvalidFieldValue {
                field: format!("load.update_columns.{table}"),
                constraint: "must not be empty".to_string(),
            });
        }

        self.batch.validate()
    }
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            update_columns: default_update_columns(),
            untracked_tables: UntrackedTablePolicy::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// Returns the update column of every tracked dimension table.
pub fn default_update_columns() -> BTreeMap<String, String> {
    [
        ("dim_user", "usr_last_update"),
        ("dim_process", "pc_finish_date"),
        ("dim_vacancy", "vc_closing_date"),
        ("hiring_process_candidate", "cd_last_update"),
    ]
    .into_iter()
    .map(|(table, column)| (table.to_string(), column.to_string()))
    .collect()
}
