use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::shared::ValidationError;

/// Configuration of the raw table source.
///
/// The source is a workbook exported as JSON: one top-level key per sheet, each holding
/// an array of row objects.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Path to the JSON workbook.
    pub path: PathBuf,
    /// Sheet name overrides keyed by raw entity name (`department`, `user`, ...).
    ///
    /// Entities without an override are read from the sheet named after the entity.
    #[serde(default)]
    pub sheets: BTreeMap<String, String>,
}

impl SourceConfig {
    /// Validates source configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "source.path".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        if let Some((entity, _)) = self.sheets.iter().find(|(_, sheet)| sheet.trim().is_empty()) {
            return Err(ValidationError::InvalidFieldValue {
                field: format!("source.sheets.{entity}"),
                constraint: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
