//! Tabular time-series data exchanged between nodes, backed by an Arrow `RecordBatch`.

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{PipelineError, Result};

/// Well-known table property keys.
pub mod properties {
  pub const GRANULARITY: &str = "granularity";
  pub const MIN_TIME_MILLIS: &str = "minTimeMillis";
  pub const MAX_TIME_MILLIS: &str = "maxTimeMillis";
}

/// Owned column values, used to build and read tables without touching Arrow arrays directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
  Int64(Vec<Option<i64>>),
  Float64(Vec<Option<f64>>),
  Boolean(Vec<Option<bool>>),
  Utf8(Vec<Option<String>>),
}

impl ColumnData {
  pub fn len(&self) -> usize {
    match self {
      ColumnData::Int64(v) => v.len(),
      ColumnData::Float64(v) => v.len(),
      ColumnData::Boolean(v) => v.len(),
      ColumnData::Utf8(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn data_type(&self) -> DataType {
    match self {
      ColumnData::Int64(_) => DataType::Int64,
      ColumnData::Float64(_) => DataType::Float64,
      ColumnData::Boolean(_) => DataType::Boolean,
      ColumnData::Utf8(_) => DataType::Utf8,
    }
  }

  fn to_array(&self) -> ArrayRef {
    match self {
      ColumnData::Int64(v) => Arc::new(Int64Array::from(v.clone())),
      ColumnData::Float64(v) => Arc::new(Float64Array::from(v.clone())),
      ColumnData::Boolean(v) => Arc::new(BooleanArray::from(v.clone())),
      ColumnData::Utf8(v) => Arc::new(StringArray::from(v.clone())),
    }
  }

  /// Picks rows by index, in the given order.
  pub fn take(&self, indices: &[usize]) -> ColumnData {
    let indices: Vec<Option<usize>> = indices.iter().copied().map(Some).collect();
    self.take_opt(&indices)
  }

  /// Like [ColumnData::take]; a `None` index yields a null row (left-join semantics).
  pub fn take_opt(&self, indices: &[Option<usize>]) -> ColumnData {
    fn pick<T: Clone>(v: &[Option<T>], indices: &[Option<usize>]) -> Vec<Option<T>> {
      indices
        .iter()
        .map(|i| i.and_then(|i| v.get(i).cloned().flatten()))
        .collect()
    }
    match self {
      ColumnData::Int64(v) => ColumnData::Int64(pick(v, indices)),
      ColumnData::Float64(v) => ColumnData::Float64(pick(v, indices)),
      ColumnData::Boolean(v) => ColumnData::Boolean(pick(v, indices)),
      ColumnData::Utf8(v) => ColumnData::Utf8(pick(v, indices)),
    }
  }

  fn json_value(&self, row: usize) -> serde_json::Value {
    use serde_json::Value;
    match self {
      ColumnData::Int64(v) => v[row].map(Value::from).unwrap_or(Value::Null),
      ColumnData::Float64(v) => v[row]
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null),
      ColumnData::Boolean(v) => v[row].map(Value::Bool).unwrap_or(Value::Null),
      ColumnData::Utf8(v) => v[row].clone().map(Value::String).unwrap_or(Value::Null),
    }
  }
}

/// A table plus free-form string properties (granularity, time limits, ...).
#[derive(Debug, Clone)]
pub struct DataTable {
  batch: RecordBatch,
  properties: BTreeMap<String, String>,
}

impl DataTable {
  pub fn new(batch: RecordBatch) -> Self {
    Self {
      batch,
      properties: BTreeMap::new(),
    }
  }

  /// A table with no columns and no rows.
  pub fn empty() -> Self {
    Self::new(RecordBatch::new_empty(Arc::new(Schema::empty())))
  }

  /// Builds a table from named columns. All columns must have the same length.
  pub fn from_columns(columns: Vec<(String, ColumnData)>) -> Result<Self> {
    if columns.is_empty() {
      return Ok(Self::empty());
    }
    let fields: Vec<Field> = columns
      .iter()
      .map(|(name, data)| Field::new(name.as_str(), data.data_type(), true))
      .collect();
    let arrays: Vec<ArrayRef> = columns.iter().map(|(_, data)| data.to_array()).collect();
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    Ok(Self::new(batch))
  }

  pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.properties.insert(key.into(), value.into());
    self
  }

  pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
    self.properties = properties;
    self
  }

  pub fn batch(&self) -> &RecordBatch {
    &self.batch
  }

  pub fn properties(&self) -> &BTreeMap<String, String> {
    &self.properties
  }

  pub fn property(&self, key: &str) -> Option<&str> {
    self.properties.get(key).map(String::as_str)
  }

  pub fn num_rows(&self) -> usize {
    self.batch.num_rows()
  }

  pub fn is_empty(&self) -> bool {
    self.num_rows() == 0
  }

  pub fn column_names(&self) -> Vec<String> {
    self
      .batch
      .schema()
      .fields()
      .iter()
      .map(|f| f.name().clone())
      .collect()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.batch.column_by_name(name).is_some()
  }

  fn array(&self, name: &str) -> Result<&ArrayRef> {
    self.batch.column_by_name(name).ok_or_else(|| {
      PipelineError::DataTable(arrow::error::ArrowError::SchemaError(format!(
        "column '{}' not found",
        name
      )))
    })
  }

  fn cast_to(&self, name: &str, to: &DataType) -> Result<ArrayRef> {
    Ok(cast(self.array(name)?.as_ref(), to)?)
  }

  /// Column values as integers (cast when stored with another numeric type).
  pub fn longs(&self, name: &str) -> Result<Vec<Option<i64>>> {
    let array = self.cast_to(name, &DataType::Int64)?;
    let ints = downcast::<Int64Array>(&array, name)?;
    Ok(ints.iter().collect())
  }

  pub fn doubles(&self, name: &str) -> Result<Vec<Option<f64>>> {
    let array = self.cast_to(name, &DataType::Float64)?;
    let floats = downcast::<Float64Array>(&array, name)?;
    Ok(floats.iter().collect())
  }

  pub fn booleans(&self, name: &str) -> Result<Vec<Option<bool>>> {
    let array = self.cast_to(name, &DataType::Boolean)?;
    let bools = downcast::<BooleanArray>(&array, name)?;
    Ok(bools.iter().collect())
  }

  pub fn strings(&self, name: &str) -> Result<Vec<Option<String>>> {
    let array = self.cast_to(name, &DataType::Utf8)?;
    let strings = downcast::<StringArray>(&array, name)?;
    Ok(strings.iter().map(|s| s.map(str::to_string)).collect())
  }

  /// Reads a column back into owned values, keeping its storage type where supported.
  pub fn column(&self, name: &str) -> Result<ColumnData> {
    match self.array(name)?.data_type() {
      DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
        Ok(ColumnData::Int64(self.longs(name)?))
      }
      DataType::Boolean => Ok(ColumnData::Boolean(self.booleans(name)?)),
      DataType::Utf8 | DataType::LargeUtf8 => Ok(ColumnData::Utf8(self.strings(name)?)),
      _ => Ok(ColumnData::Float64(self.doubles(name)?)),
    }
  }

  pub fn columns(&self) -> Result<Vec<(String, ColumnData)>> {
    self
      .column_names()
      .into_iter()
      .map(|name| {
        let data = self.column(&name)?;
        Ok((name, data))
      })
      .collect()
  }

  /// Keeps the rows at `indices`, in that order. Properties are preserved.
  pub fn take_rows(&self, indices: &[usize]) -> Result<DataTable> {
    let columns = self
      .columns()?
      .into_iter()
      .map(|(name, data)| (name, data.take(indices)))
      .collect();
    Ok(DataTable::from_columns(columns)?.with_properties(self.properties.clone()))
  }

  /// Rows ordered by an integer column, nulls last. Stable for equal keys.
  pub fn sorted_by(&self, time_column: &str) -> Result<DataTable> {
    let keys = self.longs(time_column)?;
    let mut indices: Vec<usize> = (0..keys.len()).collect();
    indices.sort_by_key(|&i| (keys[i].is_none(), keys[i]));
    self.take_rows(&indices)
  }

  /// Rows whose `time_column` value falls in `[start, end)`.
  pub fn filter_time_range(&self, time_column: &str, start: i64, end: i64) -> Result<DataTable> {
    let keys = self.longs(time_column)?;
    let indices: Vec<usize> = keys
      .iter()
      .enumerate()
      .filter(|(_, t)| t.is_some_and(|t| t >= start && t < end))
      .map(|(i, _)| i)
      .collect();
    self.take_rows(&indices)
  }

  /// Row-oriented JSON rendering, used by the CLI and the execution log.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let columns = self.columns()?;
    let rows = (0..self.num_rows())
      .map(|row| {
        let obj: serde_json::Map<String, serde_json::Value> = columns
          .iter()
          .map(|(name, data)| (name.clone(), data.json_value(row)))
          .collect();
        serde_json::Value::Object(obj)
      })
      .collect();
    Ok(serde_json::Value::Array(rows))
  }
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a T> {
  array.as_any().downcast_ref::<T>().ok_or_else(|| {
    PipelineError::DataTable(arrow::error::ArrowError::CastError(format!(
      "column '{}' has unexpected type {}",
      name,
      array.data_type()
    )))
  })
}
