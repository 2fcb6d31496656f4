use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use config::shared::SourceConfig;

use crate::conversions::json::json_to_cell;
use crate::error::{ErrorKind, EtlResult};
use crate::source::RawTableProvider;
use crate::types::{Cell, RawEntity, RawTable, TableRow};
use crate::{bail, etl_error};

/// Raw table provider reading a workbook exported as JSON.
///
/// The workbook is an object mapping sheet names to arrays of row objects:
///
/// ```json
/// { "departments": [ { "dp_id": 1, "dp_name": "Engineering", "dp_description": "..." } ] }
/// ```
///
/// The columns of a sheet are the union of the keys of its rows, in first-seen order. Keys
/// missing from a row are null.
#[derive(Debug, Clone)]
pub struct JsonWorkbookProvider {
    path: PathBuf,
    sheets: Arc<Map<String, Value>>,
    sheet_names: BTreeMap<RawEntity, String>,
}

impl JsonWorkbookProvider {
    /// Reads and parses the workbook configured in `config`.
    pub async fn open(config: &SourceConfig) -> EtlResult<Self> {
        let mut sheet_names = BTreeMap::new();
        for (entity, sheet) in &config.sheets {
            sheet_names.insert(entity.parse::<RawEntity>()?, sheet.clone());
        }

        let bytes = tokio::fs::read(&config.path).await.map_err(|err| {
            etl_error!(
                ErrorKind::SourceConnectionFailed,
                "Workbook could not be read",
                format!("failed to read `{}`", config.path.display()),
                source: err
            )
        })?;

        let sheets = Self::parse(&config.path, &bytes)?;

        info!(
            path = %config.path.display(),
            sheets = sheets.len(),
            "opened json workbook"
        );

        Ok(Self {
            path: config.path.clone(),
            sheets: Arc::new(sheets),
            sheet_names,
        })
    }

    /// Builds a provider from an already parsed workbook, using the default sheet names.
    pub fn from_value(path: impl Into<PathBuf>, workbook: Value) -> EtlResult<Self> {
        let path = path.into();
        let Value::Object(sheets) = workbook else {
            bail!(
                ErrorKind::InvalidData,
                "Workbook must be a JSON object",
                format!("`{}` does not map sheet names to rows", path.display())
            );
        };

        Ok(Self {
            path,
            sheets: Arc::new(sheets),
            sheet_names: BTreeMap::new(),
        })
    }

    fn parse(path: &Path, bytes: &[u8]) -> EtlResult<Map<String, Value>> {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(sheets) => Ok(sheets),
            _ => bail!(
                ErrorKind::InvalidData,
                "Workbook must be a JSON object",
                format!("`{}` does not map sheet names to rows", path.display())
            ),
        }
    }

    fn sheet_name(&self, entity: RawEntity) -> &str {
        self.sheet_names
            .get(&entity)
            .map(String::as_str)
            .unwrap_or_else(|| entity.default_sheet_name())
    }

    fn sheet_to_table(entity: RawEntity, sheet_name: &str, rows: &[Value]) -> EtlResult<RawTable> {
        let mut column_names: Vec<String> = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let Value::Object(row) = row else {
                bail!(
                    ErrorKind::InvalidData,
                    "Workbook row must be a JSON object",
                    format!("row {index} of sheet `{sheet_name}` is `{row}`")
                );
            };

            for key in row.keys() {
                if !column_names.iter().any(|column| column == key) {
                    column_names.push(key.clone());
                }
            }
        }

        let mut table_rows = Vec::with_capacity(rows.len());
        for row in rows.iter().filter_map(Value::as_object) {
            let values = column_names
                .iter()
                .map(|column| row.get(column).map_or(Ok(Cell::Null), json_to_cell))
                .collect::<EtlResult<Vec<_>>>()?;

            table_rows.push(TableRow::new(values));
        }

        RawTable::new(entity, column_names, table_rows)
    }
}

impl RawTableProvider for JsonWorkbookProvider {
    fn name() -> &'static str {
        "json_workbook"
    }

    async fn get_table(&self, entity: RawEntity) -> EtlResult<RawTable> {
        let sheet_name = self.sheet_name(entity);

        let Some(sheet) = self.sheets.get(sheet_name) else {
            bail!(
                ErrorKind::SchemaMismatch,
                "Workbook sheet is missing",
                format!(
                    "sheet `{sheet_name}` for entity `{entity}` not found in `{}`",
                    self.path.display()
                )
            );
        };

        let Value::Array(rows) = sheet else {
            bail!(
                ErrorKind::InvalidData,
                "Workbook sheet must be an array of rows",
                format!("sheet `{sheet_name}` is not an array")
            );
        };

        let table = Self::sheet_to_table(entity, sheet_name, rows)?;

        debug!(
            entity = %entity,
            sheet = sheet_name,
            row_count = table.len(),
            "read raw table from workbook"
        );

        Ok(table)
    }
}
