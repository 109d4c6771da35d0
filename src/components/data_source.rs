//! Data sources: where data-fetcher nodes read their tables from.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, instrument};

use crate::error::BoxError;
use crate::time_utils::parse_instant;
use crate::types::{ColumnData, DataTable, ExecutionWindow, properties};

/// What a data-fetcher node asks its data source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
  /// A named table, restricted to rows whose `time_column` lies in the execution window.
  Table { name: String, time_column: String },
  /// A source-specific query string, passed through untouched.
  Query { query: String },
}

/// A provider of tabular data.
#[async_trait]
pub trait DataSource: Send + Sync {
  fn name(&self) -> &str;

  async fn fetch(
    &self,
    request: &FetchRequest,
    window: &ExecutionWindow,
  ) -> Result<DataTable, BoxError>;
}

/// Tables held in memory. Queries are not supported.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
  tables: HashMap<String, DataTable>,
}

impl InMemoryDataSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_table(mut self, name: impl Into<String>, table: DataTable) -> Self {
    self.tables.insert(name.into(), table);
    self
  }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
  fn name(&self) -> &str {
    "memory"
  }

  #[instrument(level = "trace", skip(self))]
  async fn fetch(
    &self,
    request: &FetchRequest,
    window: &ExecutionWindow,
  ) -> Result<DataTable, BoxError> {
    match request {
      FetchRequest::Table { name, time_column } => {
        let table = self
          .tables
          .get(name)
          .ok_or_else(|| format!("unknown table '{}'", name))?;
        if !table.contains(time_column) {
          return Ok(table.clone());
        }
        Ok(table.filter_time_range(time_column, window.start(), window.end())?)
      }
      FetchRequest::Query { .. } => Err("in-memory data source does not support queries".into()),
    }
  }
}

/// CSV files on disk, one file per table name.
///
/// The time column holds epoch milliseconds or RFC 3339 timestamps. Columns whose non-empty
/// cells all parse as numbers become floating point columns; everything else stays text.
#[derive(Debug, Clone, Default)]
pub struct CsvDataSource {
  tables: HashMap<String, CsvTable>,
}

#[derive(Debug, Clone)]
struct CsvTable {
  path: PathBuf,
  granularity: Option<String>,
}

impl CsvDataSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_table(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    self.tables.insert(
      name.into(),
      CsvTable {
        path: path.into(),
        granularity: None,
      },
    );
    self
  }

  /// Sets the `granularity` property attached to tables read for `name`.
  pub fn with_granularity(mut self, name: &str, granularity: impl Into<String>) -> Self {
    if let Some(table) = self.tables.get_mut(name) {
      table.granularity = Some(granularity.into());
    }
    self
  }

  pub fn table_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }
}

#[async_trait]
impl DataSource for CsvDataSource {
  fn name(&self) -> &str {
    "csv"
  }

  #[instrument(level = "trace", skip(self))]
  async fn fetch(
    &self,
    request: &FetchRequest,
    window: &ExecutionWindow,
  ) -> Result<DataTable, BoxError> {
    let (name, time_column) = match request {
      FetchRequest::Table { name, time_column } => (name, time_column),
      FetchRequest::Query { .. } => return Err("csv data source does not support queries".into()),
    };
    let entry = self
      .tables
      .get(name)
      .ok_or_else(|| format!("unknown table '{}'", name))?;
    let bytes = tokio::fs::read(&entry.path)
      .await
      .map_err(|e| format!("reading {}: {}", entry.path.display(), e))?;
    let mut table = parse_csv(&bytes, time_column)?;
    debug!(table = %name, rows = table.num_rows(), "csv table loaded");
    if let Some(granularity) = &entry.granularity {
      table = table.with_property(properties::GRANULARITY, granularity.clone());
    }
    if !table.contains(time_column) {
      return Ok(table);
    }
    Ok(table.filter_time_range(time_column, window.start(), window.end())?)
  }
}

/// Parses CSV bytes with a header row into a table.
pub(crate) fn parse_csv(bytes: &[u8], time_column: &str) -> Result<DataTable, BoxError> {
  let mut reader = csv::Reader::from_reader(bytes);
  let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
  let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
  for record in reader.records() {
    let record = record?;
    for (i, column) in cells.iter_mut().enumerate() {
      column.push(record.get(i).unwrap_or("").trim().to_string());
    }
  }
  let columns = headers
    .into_iter()
    .zip(cells)
    .map(|(name, values)| -> Result<(String, ColumnData), BoxError> {
      let data = if name == time_column {
        ColumnData::Int64(
          values
            .iter()
            .map(|v| parse_timestamp(v))
            .collect::<Result<_, _>>()?,
        )
      } else {
        infer_column(values)
      };
      Ok((name, data))
    })
    .collect::<Result<Vec<_>, _>>()?;
  Ok(DataTable::from_columns(columns)?)
}

fn parse_timestamp(value: &str) -> Result<Option<i64>, BoxError> {
  if value.is_empty() {
    return Ok(None);
  }
  Ok(Some(parse_instant(value)?))
}

fn infer_column(values: Vec<String>) -> ColumnData {
  let numeric = values
    .iter()
    .all(|v| v.is_empty() || v.parse::<f64>().is_ok());
  if numeric {
    ColumnData::Float64(values.iter().map(|v| v.parse::<f64>().ok()).collect())
  } else {
    ColumnData::Utf8(
      values
        .into_iter()
        .map(|v| if v.is_empty() { None } else { Some(v) })
        .collect(),
    )
  }
}
