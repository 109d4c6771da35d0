//! Pipeline runner: build a plan graph from descriptors, execute it, record an execution log.
//!
//! - [run_pipeline]: one run of one alert over one detection window.
//! - [PipelineRun]: the log of the run plus its outputs or the error that stopped it.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::executor::PlanExecutor;
use crate::plan::{PipelineContext, PlanGraph, SharedResources};
use crate::registry::NodeRegistry;
use crate::types::{
  AnomalyFinding, ExecutionLog, ExecutionWindow, OutputMap, PlanNodeDescriptor, collect_anomalies,
  output_map_to_json,
};

/// What to run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
  pub alert_id: Option<i64>,
  pub window: ExecutionWindow,
  pub nodes: Vec<PlanNodeDescriptor>,
  /// Node whose outputs are the result of the run. When unset every node not driven by a
  /// fork-join is executed.
  pub terminal: Option<String>,
}

impl PipelineRequest {
  pub fn new(window: ExecutionWindow, nodes: Vec<PlanNodeDescriptor>) -> Self {
    Self {
      alert_id: None,
      window,
      nodes,
      terminal: None,
    }
  }

  pub fn with_alert_id(mut self, alert_id: i64) -> Self {
    self.alert_id = Some(alert_id);
    self
  }

  pub fn with_terminal(mut self, terminal: impl Into<String>) -> Self {
    self.terminal = Some(terminal.into());
    self
  }
}

/// Outputs of a successful run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutputs {
  /// Outputs of every executed node, by node name.
  pub outputs: BTreeMap<String, Arc<OutputMap>>,
  /// Outputs of the terminal node, when one was requested.
  pub terminal: Option<Arc<OutputMap>>,
}

impl PipelineOutputs {
  /// Findings of the terminal node, or of every executed node when there is none.
  pub fn anomalies(&self) -> Vec<AnomalyFinding> {
    match &self.terminal {
      Some(outputs) => collect_anomalies(outputs),
      None => self.outputs.values().flat_map(|o| collect_anomalies(o)).collect(),
    }
  }

  pub fn to_json(&self) -> Result<serde_json::Value> {
    let mut nodes = serde_json::Map::new();
    for (name, outputs) in &self.outputs {
      nodes.insert(name.clone(), output_map_to_json(outputs)?);
    }
    let terminal = match &self.terminal {
      Some(outputs) => output_map_to_json(outputs)?,
      None => serde_json::Value::Null,
    };
    Ok(serde_json::json!({
      "nodes": nodes,
      "terminal": terminal,
      "anomalies": self.anomalies(),
    }))
  }
}

/// A finished run: always has a log, and either outputs or the error that stopped it.
#[derive(Debug)]
pub struct PipelineRun {
  pub log: ExecutionLog,
  pub result: Result<PipelineOutputs>,
}

impl PipelineRun {
  pub fn into_result(self) -> Result<PipelineOutputs> {
    self.result
  }

  pub fn is_success(&self) -> bool {
    self.result.is_ok()
  }
}

/// Builds the plan graph for `request` and executes it.
#[instrument(level = "trace", skip(registry, resources, request), fields(alert_id = ?request.alert_id))]
pub async fn run_pipeline(
  registry: &NodeRegistry,
  resources: SharedResources,
  request: PipelineRequest,
) -> PipelineRun {
  let PipelineRequest {
    alert_id,
    window,
    nodes,
    terminal,
  } = request;
  let mut log = ExecutionLog::start(alert_id, window);
  info!(run_id = %log.run_id, window = %window, nodes = nodes.len(), "pipeline starting");

  let pipeline = PipelineContext::new(window, resources).with_alert_id(alert_id);
  let graph = match PlanGraph::build(nodes, pipeline, registry) {
    Ok(graph) => graph,
    Err(e) => {
      warn!(run_id = %log.run_id, error = %e, "pipeline construction failed");
      log.finish(false);
      return PipelineRun { log, result: Err(e) };
    }
  };

  let mut executor = PlanExecutor::new(graph);
  let outcome = match &terminal {
    Some(name) => executor.execute_node(name).await.map(Some),
    None => executor.execute_all().await.map(|_| None),
  };
  let (results, steps) = executor.into_parts();
  for step in steps {
    log.record(step);
  }
  log.finish(outcome.is_ok());

  let result = outcome.map(|terminal| PipelineOutputs {
    outputs: results.into_iter().collect(),
    terminal,
  });
  match &result {
    Ok(outputs) => info!(
      run_id = %log.run_id,
      steps = log.steps.len(),
      anomalies = outputs.anomalies().len(),
      "pipeline completed"
    ),
    Err(e) => warn!(run_id = %log.run_id, steps = log.steps.len(), error = %e, "pipeline failed"),
  }
  PipelineRun { log, result }
}
