//! Detection findings produced by detector nodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DataTable;

/// One anomalous interval reported by a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyFinding {
  pub start_time: i64,
  pub end_time: i64,
  pub avg_current_val: Option<f64>,
  pub avg_baseline_val: Option<f64>,
  pub alert_id: Option<i64>,
  pub metric: Option<String>,
  pub dataset: Option<String>,
  pub source: Option<String>,
  /// Name of the enumeration item of the fork-join branch that produced the finding.
  pub enumeration_item: Option<String>,
  /// Labels attached by post-processor nodes.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub labels: Vec<AnomalyLabel>,
}

impl AnomalyFinding {
  pub fn new(start_time: i64, end_time: i64) -> Self {
    Self {
      start_time,
      end_time,
      avg_current_val: None,
      avg_baseline_val: None,
      alert_id: None,
      metric: None,
      dataset: None,
      source: None,
      enumeration_item: None,
      labels: Vec::new(),
    }
  }

  /// True when some label asks for the finding to be ignored.
  pub fn is_ignored(&self) -> bool {
    self.labels.iter().any(|l| l.ignore)
  }
}

/// A mark left on a finding by a post-processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyLabel {
  pub name: String,
  /// Post-processor node that attached the label.
  pub source_node_name: Option<String>,
  /// Post-processor type that attached the label.
  pub source_post_processor: Option<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub metadata: BTreeMap<String, serde_json::Value>,
  /// The finding should not be reported.
  #[serde(default)]
  pub ignore: bool,
}

impl AnomalyLabel {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      source_node_name: None,
      source_post_processor: None,
      metadata: BTreeMap::new(),
      ignore: false,
    }
  }

  pub fn ignored(mut self, ignore: bool) -> Self {
    self.ignore = ignore;
    self
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.metadata.insert(key.into(), value.into());
    self
  }
}

/// Output of a detector node: the findings plus the annotated timeseries.
#[derive(Debug, Clone)]
pub struct DetectionResult {
  pub anomalies: Vec<AnomalyFinding>,
  pub timeseries: Option<DataTable>,
}
