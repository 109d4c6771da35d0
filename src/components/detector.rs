//! Detector components used by anomaly-detector nodes.

use std::collections::BTreeMap;

use crate::error::BoxError;
use crate::types::{ColumnData, DataTable, ExecutionWindow, Params};

/// Column names of the table a detector returns.
pub mod columns {
  pub const TIME: &str = "timestamp";
  pub const CURRENT: &str = "current";
  /// Baseline (expected) value.
  pub const VALUE: &str = "value";
  pub const LOWER_BOUND: &str = "lower_bound";
  pub const UPPER_BOUND: &str = "upper_bound";
  pub const ANOMALY: &str = "anomaly";
}

/// Turns the node's table inputs into a detection table with the [columns] layout.
pub trait AnomalyDetector: Send + Sync {
  fn run_detection(
    &self,
    window: &ExecutionWindow,
    inputs: &BTreeMap<String, DataTable>,
  ) -> Result<DataTable, BoxError>;
}

/// Flags rows whose metric falls outside `[min, max]`. Registered as `THRESHOLD`.
///
/// Reads the input named `current`, or the only input when there is exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdDetector {
  min: Option<f64>,
  max: Option<f64>,
  timestamp: String,
  metric: String,
}

impl ThresholdDetector {
  pub const CURRENT_INPUT: &'static str = "current";

  pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
    Self {
      min,
      max,
      timestamp: columns::TIME.to_string(),
      metric: "value".to_string(),
    }
  }

  /// Reads `min`, `max`, `timestamp` and `metric` from a component spec.
  pub fn from_spec(spec: &Params) -> Result<Self, BoxError> {
    let number = |key: &str| -> Result<Option<f64>, BoxError> {
      match spec.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
          .as_f64()
          .map(Some)
          .ok_or_else(|| format!("'{}' must be a number, got {}", key, v).into()),
      }
    };
    let text = |key: &str, default: &str| -> String {
      spec
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
    };
    let min = number("min")?;
    let max = number("max")?;
    if let (Some(lo), Some(hi)) = (min, max) {
      if lo > hi {
        return Err(format!("min {} is greater than max {}", lo, hi).into());
      }
    }
    Ok(Self {
      min,
      max,
      timestamp: text("timestamp", columns::TIME),
      metric: text("metric", "value"),
    })
  }

  fn is_anomaly(&self, value: Option<f64>) -> bool {
    match value {
      Some(v) => self.min.is_some_and(|lo| v < lo) || self.max.is_some_and(|hi| v > hi),
      None => false,
    }
  }
}

impl AnomalyDetector for ThresholdDetector {
  fn run_detection(
    &self,
    window: &ExecutionWindow,
    inputs: &BTreeMap<String, DataTable>,
  ) -> Result<DataTable, BoxError> {
    let table = match inputs.get(Self::CURRENT_INPUT) {
      Some(t) => t,
      None if inputs.len() == 1 => inputs.values().next().ok_or("no input table")?,
      None => {
        return Err(
          format!(
            "expected an input named '{}' or exactly one input, got {}",
            Self::CURRENT_INPUT,
            inputs.len()
          )
          .into(),
        );
      }
    };
    let times = table.longs(&self.timestamp)?;
    let values = table.doubles(&self.metric)?;
    let rows: Vec<usize> = times
      .iter()
      .enumerate()
      .filter(|(_, t)| t.is_some_and(|t| window.contains(t)))
      .map(|(i, _)| i)
      .collect();

    let current: Vec<Option<f64>> = rows.iter().map(|&i| values[i]).collect();
    let anomaly = current.iter().map(|v| Some(self.is_anomaly(*v))).collect();
    let n = rows.len();
    let out = DataTable::from_columns(vec![
      (
        columns::TIME.to_string(),
        ColumnData::Int64(rows.iter().map(|&i| times[i]).collect()),
      ),
      (columns::CURRENT.to_string(), ColumnData::Float64(current.clone())),
      (columns::VALUE.to_string(), ColumnData::Float64(current)),
      (columns::LOWER_BOUND.to_string(), ColumnData::Float64(vec![self.min; n])),
      (columns::UPPER_BOUND.to_string(), ColumnData::Float64(vec![self.max; n])),
      (columns::ANOMALY.to_string(), ColumnData::Boolean(anomaly)),
    ])?;
    Ok(out.with_properties(table.properties().clone()))
  }
}
