//! Anomaly detector: runs a detector component over the node's table inputs and turns flagged
//! rows into findings.
//!
//! Params: `type` (a detector registered in the component registry), `component` (the detector
//! spec, which must carry `monitoringGranularity`), and optional `anomaly.metric`,
//! `anomaly.dataset` and `anomaly.source` copied onto every finding.

use async_trait::async_trait;
use tracing::info;

use super::{COMPONENT_PARAM, Operator, OperatorBase, component_spec};
use crate::components::{AnomalyDetector, columns};
use crate::error::{PipelineError, Result};
use crate::plan::OperatorContext;
use crate::time_utils::period_millis;
use crate::types::{AnomalyFinding, DataTable, DetectionResult, NodeResult, Params};

pub const ANOMALY_DETECTOR_OUTPUT_KEY: &str = "output_AnomalyDetectorResult";

const TYPE_PARAM: &str = "type";
const GRANULARITY_KEY: &str = "monitoringGranularity";

/// Detector type and granularity, checked when the plan node is initialized.
fn detector_settings(node: &str, params: &Params) -> Result<(String, Params, i64)> {
  let kind = params
    .get(TYPE_PARAM)
    .and_then(|v| v.as_str())
    .ok_or_else(|| PipelineError::MissingParameter {
      node: node.to_string(),
      param: TYPE_PARAM.to_string(),
    })?;
  let spec = component_spec(node, params)?;
  let granularity = spec
    .get(GRANULARITY_KEY)
    .and_then(|v| v.as_str())
    .ok_or_else(|| PipelineError::MissingParameter {
      node: node.to_string(),
      param: format!("{}.{}", COMPONENT_PARAM, GRANULARITY_KEY),
    })?;
  let granularity = period_millis(granularity).map_err(|e| PipelineError::InvalidParameter {
    node: node.to_string(),
    param: format!("{}.{}", COMPONENT_PARAM, GRANULARITY_KEY),
    reason: e.to_string(),
  })?;
  Ok((kind.to_string(), spec, granularity))
}

#[derive(Default)]
pub struct AnomalyDetectorOperator {
  base: OperatorBase,
  detector: Option<Box<dyn AnomalyDetector>>,
  granularity: i64,
}

impl AnomalyDetectorOperator {
  fn finding_template(&self) -> AnomalyFinding {
    let text = |key: &str| self.base.param_str(key).map(String::from);
    let context = self.base.context().ok();
    AnomalyFinding {
      alert_id: context.and_then(|c| c.pipeline.alert_id),
      metric: text("anomaly.metric"),
      dataset: text("anomaly.dataset"),
      source: text("anomaly.source"),
      enumeration_item: context
        .and_then(|c| c.enumeration_item())
        .map(|item| item.label()),
      ..AnomalyFinding::new(0, 0)
    }
  }

  /// One finding per flagged row. A finding ends at the next row's timestamp, or one
  /// granularity after its own for the last row.
  fn build_result(&self, detection: DataTable) -> Result<DetectionResult> {
    if detection.is_empty() {
      return Ok(DetectionResult {
        anomalies: Vec::new(),
        timeseries: Some(detection),
      });
    }
    let sorted = detection.sorted_by(columns::TIME)?;
    let n = sorted.num_rows();
    let times = sorted.longs(columns::TIME)?;
    let flags = sorted.booleans(columns::ANOMALY)?;
    let optional = |column: &str| -> Result<Vec<Option<f64>>> {
      if sorted.contains(column) {
        sorted.doubles(column)
      } else {
        Ok(vec![None; n])
      }
    };
    let current = optional(columns::CURRENT)?;
    let baseline = optional(columns::VALUE)?;

    let template = self.finding_template();
    let mut anomalies = Vec::new();
    for row in 0..n {
      let (Some(true), Some(start)) = (flags[row], times[row]) else {
        continue;
      };
      let end = times
        .get(row + 1)
        .copied()
        .flatten()
        .unwrap_or(start + self.granularity);
      anomalies.push(AnomalyFinding {
        start_time: start,
        end_time: end,
        avg_current_val: current[row],
        avg_baseline_val: baseline[row],
        ..template.clone()
      });
    }
    Ok(DetectionResult {
      anomalies,
      timeseries: Some(sorted),
    })
  }
}

#[async_trait]
impl Operator for AnomalyDetectorOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "AnomalyDetectorOperator"
  }

  fn validate_params(node: &str, params: &Params) -> Result<()> {
    detector_settings(node, params).map(|_| ())
  }

  fn init(&mut self, context: OperatorContext) -> Result<()> {
    self.base.init(context)?;
    let name = self.base.name().to_string();
    let (kind, spec, granularity) = detector_settings(&name, self.base.params())?;
    let detector = self
      .base
      .resources()?
      .components
      .build_detector(&kind, &spec)
      .map_err(|e| PipelineError::InvalidParameter {
        node: name,
        param: COMPONENT_PARAM.to_string(),
        reason: e.to_string(),
      })?;
    self.detector = Some(detector);
    self.granularity = granularity;
    Ok(())
  }

  async fn compute(&mut self) -> Result<()> {
    let name = self.base.name().to_string();
    let detector = self.detector.as_ref().ok_or_else(|| PipelineError::NotInitialized {
      node: name.clone(),
    })?;
    let tables = self.base.table_inputs();
    let detection = detector
      .run_detection(&self.base.window(), &tables)
      .map_err(|e| PipelineError::execution(&name, e))?;
    let result = self.build_result(detection)?;
    info!(node = %name, anomalies = result.anomalies.len(), "detection finished");
    self
      .base
      .set_output(ANOMALY_DETECTOR_OUTPUT_KEY, NodeResult::Detection(result))
  }
}
