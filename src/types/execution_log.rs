//! DTOs for execution.log.json: record of which plan nodes ran during a pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ExecutionWindow;

/// Current log format version.
pub const EXECUTION_LOG_VERSION: u32 = 1;

/// One executed plan node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
  /// 1-based step index, in execution order.
  pub step: u32,
  pub node: String,
  pub node_type: String,
  pub operator: String,
  pub started_at: DateTime<Utc>,
  pub duration_ms: u64,
  /// Output names published by the node (after aliasing).
  pub output_keys: Vec<String>,
  /// Error message when the node failed.
  pub error: Option<String>,
  /// Fork-join node this step ran under, for enumerator and branch steps.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fork_join: Option<String>,
  /// Branch index under `fork_join`. None for the enumerator.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub branch: Option<usize>,
}

impl ExecutionStep {
  /// Tags a step run by `fork_join`. Steps already tagged by a nested fork-join keep their tag.
  pub fn within(mut self, fork_join: &str, branch: Option<usize>) -> Self {
    if self.fork_join.is_none() {
      self.fork_join = Some(fork_join.to_string());
      self.branch = branch;
    }
    self
  }
}

/// Root structure for execution.log.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
  pub version: u32,
  pub run_id: Uuid,
  pub alert_id: Option<i64>,
  pub window: ExecutionWindow,
  pub started_at: DateTime<Utc>,
  /// None while the run is in progress.
  pub finished_at: Option<DateTime<Utc>>,
  /// "running", "success" or "failed".
  pub final_status: String,
  pub steps: Vec<ExecutionStep>,
}

impl ExecutionLog {
  pub fn start(alert_id: Option<i64>, window: ExecutionWindow) -> Self {
    Self {
      version: EXECUTION_LOG_VERSION,
      run_id: Uuid::new_v4(),
      alert_id,
      window,
      started_at: Utc::now(),
      finished_at: None,
      final_status: "running".to_string(),
      steps: vec![],
    }
  }

  pub fn finish(&mut self, success: bool) {
    self.finished_at = Some(Utc::now());
    self.final_status = if success { "success" } else { "failed" }.to_string();
  }

  pub fn record(&mut self, mut step: ExecutionStep) {
    step.step = self.steps.len() as u32 + 1;
    self.steps.push(step);
  }

  /// Top-level nodes that succeeded, in execution order.
  pub fn completed_nodes(&self) -> Vec<&str> {
    self
      .steps
      .iter()
      .filter(|s| s.error.is_none() && s.fork_join.is_none())
      .map(|s| s.node.as_str())
      .collect()
  }

  /// Steps run under `fork_join`, in execution order.
  pub fn fork_join_steps(&self, fork_join: &str) -> Vec<&ExecutionStep> {
    self
      .steps
      .iter()
      .filter(|s| s.fork_join.as_deref() == Some(fork_join))
      .collect()
  }
}
