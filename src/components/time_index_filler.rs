//! Completes a timeseries onto a regular time index.
//!
//! The index runs from the min time limit (rounded up to the granularity) to the max time
//! limit (exclusive), one row per granularity step. Source rows are left-joined onto it and the
//! resulting nulls are replaced with the configured method. Rows before and after the start of
//! the detection window are filled independently, so lookback data never bleeds into the
//! detection period.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::BoxError;
use crate::time_utils::{ceil_to, floor_to, period_millis};
use crate::types::{ColumnData, DataTable, ExecutionWindow, Params, properties};

/// How a time limit of the index is inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLimitInference {
  /// From the data: first timestamp for the min, last timestamp plus one for the max.
  FromData,
  /// The matching bound of the detection window.
  FromDetectionTime,
  /// The matching bound of the detection window minus the lookback.
  FromDetectionTimeWithLookback,
}

impl FromStr for TimeLimitInference {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, String> {
    match s.trim().to_uppercase().as_str() {
      "FROM_DATA" => Ok(Self::FromData),
      "FROM_DETECTION_TIME" => Ok(Self::FromDetectionTime),
      "FROM_DETECTION_TIME_WITH_LOOKBACK" => Ok(Self::FromDetectionTimeWithLookback),
      other => Err(format!("unknown time limit inference '{}'", other)),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillNullMethod {
  KeepNull,
  #[default]
  FillWithZeroes,
  FillForward,
  FillBackward,
}

impl FromStr for FillNullMethod {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, String> {
    match s.trim().to_uppercase().as_str() {
      "KEEP_NULL" => Ok(Self::KeepNull),
      "FILL_WITH_ZEROES" => Ok(Self::FillWithZeroes),
      "FILL_FORWARD" => Ok(Self::FillForward),
      "FILL_BACKWARD" => Ok(Self::FillBackward),
      other => Err(format!("unknown fill null method '{}'", other)),
    }
  }
}

/// Filler settings, read from the component spec of an index-filler node.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIndexFillerSpec {
  pub timestamp: String,
  /// ISO-8601 period. Falls back to the table's `granularity` property.
  pub monitoring_granularity: Option<String>,
  pub fill_null_method: FillNullMethod,
  pub min_time_inference: Option<TimeLimitInference>,
  pub max_time_inference: Option<TimeLimitInference>,
  /// ISO-8601 period used by [TimeLimitInference::FromDetectionTimeWithLookback].
  pub lookback: Option<String>,
}

impl Default for TimeIndexFillerSpec {
  fn default() -> Self {
    Self {
      timestamp: "timestamp".to_string(),
      monitoring_granularity: None,
      fill_null_method: FillNullMethod::default(),
      min_time_inference: None,
      max_time_inference: None,
      lookback: None,
    }
  }
}

impl TimeIndexFillerSpec {
  /// Parses `timestamp`, `monitoringGranularity`, `fillNullMethod`, `minTimeInference`,
  /// `maxTimeInference` and `lookback`. Periods are checked here so bad specs fail early.
  pub fn from_params(params: &Params) -> Result<Self, String> {
    let text = |key: &str| -> Result<Option<String>, String> {
      match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(format!("'{}' must be a string, got {}", key, other)),
      }
    };
    let mut spec = TimeIndexFillerSpec::default();
    if let Some(timestamp) = text("timestamp")? {
      spec.timestamp = timestamp;
    }
    spec.monitoring_granularity = text("monitoringGranularity")?;
    if let Some(method) = text("fillNullMethod")? {
      spec.fill_null_method = method.parse()?;
    }
    spec.min_time_inference = text("minTimeInference")?.map(|s| s.parse()).transpose()?;
    spec.max_time_inference = text("maxTimeInference")?.map(|s| s.parse()).transpose()?;
    spec.lookback = text("lookback")?;

    if let Some(granularity) = &spec.monitoring_granularity {
      period_millis(granularity).map_err(|e| e.to_string())?;
    }
    if let Some(lookback) = &spec.lookback {
      period_millis(lookback).map_err(|e| e.to_string())?;
    }
    let needs_lookback = [spec.min_time_inference, spec.max_time_inference]
      .contains(&Some(TimeLimitInference::FromDetectionTimeWithLookback));
    if needs_lookback && spec.lookback.is_none() {
      return Err("FROM_DETECTION_TIME_WITH_LOOKBACK requires a lookback period".to_string());
    }
    Ok(spec)
  }

  fn has_custom_limits(&self) -> bool {
    self.lookback.is_some() || self.min_time_inference.is_some() || self.max_time_inference.is_some()
  }
}

#[derive(Debug, Clone)]
pub struct TimeIndexFiller {
  spec: TimeIndexFillerSpec,
}

impl TimeIndexFiller {
  pub fn new(spec: TimeIndexFillerSpec) -> Self {
    Self { spec }
  }

  pub fn spec(&self) -> &TimeIndexFillerSpec {
    &self.spec
  }

  /// Returns `table` re-indexed on the regular time index, nulls filled. Properties are kept.
  pub fn fill_index(&self, window: &ExecutionWindow, table: &DataTable) -> Result<DataTable, BoxError> {
    let time_column = self.spec.timestamp.as_str();
    if !table.contains(time_column) {
      return Err(format!("time column '{}' not found", time_column).into());
    }
    let granularity = self.granularity(table)?;
    let sorted = table.sorted_by(time_column)?;
    let times = sorted.longs(time_column)?;
    let (min_time, max_time) = self.time_limits(window, table, &times)?;

    let index = build_index(min_time, max_time, granularity);
    let mut row_of: HashMap<i64, usize> = HashMap::with_capacity(times.len());
    for (row, time) in times.iter().enumerate() {
      if let Some(t) = time {
        row_of.entry(*t).or_insert(row);
      }
    }
    let picks: Vec<Option<usize>> = index.iter().map(|t| row_of.get(t).copied()).collect();
    // Rows before the window start are filled separately from the detection period.
    let split = index.partition_point(|&t| t < window.start());

    let mut columns = vec![(time_column.to_string(), ColumnData::Int64(index.iter().copied().map(Some).collect()))];
    for (name, data) in sorted.columns()? {
      if name == time_column {
        continue;
      }
      let mut joined = data.take_opt(&picks);
      fill_nulls(&mut joined, self.spec.fill_null_method, 0, split);
      fill_nulls(&mut joined, self.spec.fill_null_method, split, index.len());
      columns.push((name, joined));
    }
    Ok(DataTable::from_columns(columns)?.with_properties(table.properties().clone()))
  }

  fn granularity(&self, table: &DataTable) -> Result<i64, BoxError> {
    let period = self
      .spec
      .monitoring_granularity
      .as_deref()
      .or_else(|| table.property(properties::GRANULARITY))
      .ok_or("no monitoringGranularity configured and no granularity property on the table")?;
    Ok(period_millis(period)?)
  }

  fn time_limits(
    &self,
    window: &ExecutionWindow,
    table: &DataTable,
    sorted_times: &[Option<i64>],
  ) -> Result<(i64, i64), BoxError> {
    if !self.spec.has_custom_limits() {
      let min = table.property(properties::MIN_TIME_MILLIS);
      let max = table.property(properties::MAX_TIME_MILLIS);
      if let (Some(min), Some(max)) = (min, max) {
        let min = min.parse::<i64>().map_err(|e| format!("invalid {}: {}", properties::MIN_TIME_MILLIS, e))?;
        let max = max.parse::<i64>().map_err(|e| format!("invalid {}: {}", properties::MAX_TIME_MILLIS, e))?;
        return Ok((min, max));
      }
    }
    let lookback = match &self.spec.lookback {
      Some(p) => period_millis(p)?,
      None => 0,
    };
    let first = sorted_times.iter().flatten().next().copied();
    let last = sorted_times.iter().flatten().last().copied();

    let min = match self.spec.min_time_inference.unwrap_or(TimeLimitInference::FromData) {
      TimeLimitInference::FromData => first.unwrap_or(window.start()),
      TimeLimitInference::FromDetectionTime => window.start(),
      TimeLimitInference::FromDetectionTimeWithLookback => window.start() - lookback,
    };
    let max = match self.spec.max_time_inference.unwrap_or(TimeLimitInference::FromDetectionTime) {
      TimeLimitInference::FromData => last.map(|t| t + 1).unwrap_or(window.end()),
      TimeLimitInference::FromDetectionTime => window.end(),
      TimeLimitInference::FromDetectionTimeWithLookback => window.end() - lookback,
    };
    Ok((min, max))
  }
}

/// Aligned timestamps in `[min, max)`.
fn build_index(min: i64, max: i64, granularity: i64) -> Vec<i64> {
  if max <= min {
    return Vec::new();
  }
  let first = ceil_to(min, granularity);
  let last = floor_to(max - 1, granularity);
  let mut index = Vec::new();
  let mut t = first;
  while t <= last {
    index.push(t);
    t += granularity;
  }
  index
}

fn fill_nulls(data: &mut ColumnData, method: FillNullMethod, from: usize, to: usize) {
  match data {
    ColumnData::Int64(v) => fill_segment(&mut v[from..to], method, 0),
    ColumnData::Float64(v) => fill_segment(&mut v[from..to], method, 0.0),
    ColumnData::Boolean(v) => fill_segment(&mut v[from..to], method, false),
    ColumnData::Utf8(v) => {
      // Zero has no meaning for text.
      if method != FillNullMethod::FillWithZeroes {
        fill_segment(&mut v[from..to], method, String::new());
      }
    }
  }
}

fn fill_segment<T: Clone>(values: &mut [Option<T>], method: FillNullMethod, zero: T) {
  match method {
    FillNullMethod::KeepNull => {}
    FillNullMethod::FillWithZeroes => {
      for v in values.iter_mut().filter(|v| v.is_none()) {
        *v = Some(zero.clone());
      }
    }
    FillNullMethod::FillForward => {
      let mut last: Option<T> = None;
      for v in values.iter_mut() {
        match v {
          Some(x) => last = Some(x.clone()),
          None => *v = last.clone(),
        }
      }
    }
    FillNullMethod::FillBackward => {
      let mut next: Option<T> = None;
      for v in values.iter_mut().rev() {
        match v {
          Some(x) => next = Some(x.clone()),
          None => *v = next.clone(),
        }
      }
    }
  }
}
