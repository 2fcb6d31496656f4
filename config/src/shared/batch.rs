use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Batch configuration for warehouse inserts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Maximum number of rows sent in a single insert statement.
    ///
    /// All statements of one table load still share a single transaction.
    #[serde(default = "default_batch_max_size")]
    pub max_size: usize,
}

impl BatchConfig {
    /// Default maximum number of rows per insert statement.
    pub const DEFAULT_MAX_SIZE: usize = 1000;

    /// Validates batch configuration settings.
    ///
    /// Ensures max_size is non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_size == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "load.batch.max_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: default_batch_max_size(),
        }
    }
}

fn default_batch_max_size() -> usize {
    BatchConfig::DEFAULT_MAX_SIZE
}
