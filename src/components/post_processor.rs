//! Post-processors: rewrite or label the findings of upstream detections.

use std::sync::Arc;

use crate::error::BoxError;
use crate::types::{AnomalyFinding, AnomalyLabel, ExecutionWindow, OutputMap, Params};

/// Receives every input of a post-processor node at once and returns the results to publish,
/// keyed like the inputs.
pub trait AnomalyPostProcessor: Send + Sync {
  /// Type name, recorded on the labels the post-processor attaches.
  fn name(&self) -> &str;

  fn post_process(&self, window: &ExecutionWindow, results: OutputMap) -> Result<OutputMap, BoxError>;
}

/// Labels findings whose current value falls outside `[min, max]`. Registered as `THRESHOLD`.
///
/// Findings without a current value are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdPostProcessor {
  min: Option<f64>,
  max: Option<f64>,
  value_name: String,
  ignore: bool,
}

impl ThresholdPostProcessor {
  pub const NAME: &'static str = "THRESHOLD";

  pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
    Self {
      min,
      max,
      value_name: "value".to_string(),
      ignore: true,
    }
  }

  /// Reads `min`, `max`, `valueName` and `ignore` (default true) from a component spec.
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
    let ignore = match spec.get("ignore") {
      None | Some(serde_json::Value::Null) => true,
      Some(v) => v
        .as_bool()
        .ok_or_else(|| format!("'ignore' must be a boolean, got {}", v))?,
    };
    Ok(Self {
      min: number("min")?,
      max: number("max")?,
      value_name: spec
        .get("valueName")
        .and_then(|v| v.as_str())
        .unwrap_or("value")
        .to_string(),
      ignore,
    })
  }

  fn is_outside(&self, value: f64) -> bool {
    self.min.is_some_and(|lo| value < lo) || self.max.is_some_and(|hi| value > hi)
  }

  fn label_name(&self) -> String {
    let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    format!(
      "{} outside [{}, {}]",
      self.value_name,
      bound(self.min),
      bound(self.max)
    )
  }

  fn label(&self, finding: &mut AnomalyFinding) {
    if !finding.avg_current_val.is_some_and(|v| self.is_outside(v)) {
      return;
    }
    let mut label = AnomalyLabel::new(self.label_name()).ignored(self.ignore);
    if let Some(lo) = self.min {
      label = label.with_metadata("min", lo);
    }
    if let Some(hi) = self.max {
      label = label.with_metadata("max", hi);
    }
    finding.labels.push(label);
  }
}

impl AnomalyPostProcessor for ThresholdPostProcessor {
  fn name(&self) -> &str {
    Self::NAME
  }

  fn post_process(&self, _: &ExecutionWindow, results: OutputMap) -> Result<OutputMap, BoxError> {
    Ok(
      results
        .into_iter()
        .map(|(key, value)| {
          let labelled = value.map_anomalies(&mut |finding: &mut AnomalyFinding| self.label(finding));
          (key, Arc::new(labelled))
        })
        .collect(),
    )
  }
}
