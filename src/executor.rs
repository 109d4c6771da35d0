//! Pull-based execution of a plan graph.
//!
//! Executing a node first executes every node its inputs come from, then builds and runs the
//! node's operator with those inputs. Outputs are memoized per executor, so a node feeding
//! several others runs once.

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::error::{PipelineError, Result};
use crate::plan::{PlanGraph, PlanNode};
use crate::types::{ExecutionStep, InputMap, OutputMap};

pub struct PlanExecutor {
  graph: Arc<PlanGraph>,
  results: HashMap<String, Arc<OutputMap>>,
  steps: Vec<ExecutionStep>,
}

impl PlanExecutor {
  pub fn new(graph: Arc<PlanGraph>) -> Self {
    Self {
      graph,
      results: HashMap::new(),
      steps: Vec::new(),
    }
  }

  pub fn graph(&self) -> &Arc<PlanGraph> {
    &self.graph
  }

  /// Outputs of every node executed so far.
  pub fn results(&self) -> &HashMap<String, Arc<OutputMap>> {
    &self.results
  }

  /// Steps recorded so far, in execution order. A fork-join's enumerator and branch steps come
  /// right before its own.
  pub fn steps(&self) -> &[ExecutionStep] {
    &self.steps
  }

  pub fn into_parts(self) -> (HashMap<String, Arc<OutputMap>>, Vec<ExecutionStep>) {
    (self.results, self.steps)
  }

  /// Executes `name` and, first, everything upstream of it.
  #[instrument(level = "trace", skip(self))]
  pub async fn execute_node(&mut self, name: &str) -> Result<Arc<OutputMap>> {
    let mut path = Vec::new();
    self.execute_recursive(name.to_string(), &mut path).await
  }

  /// Executes every node that is not driven by a fork-join, in declaration order.
  pub async fn execute_all(&mut self) -> Result<()> {
    let owned = self.graph.owned_sub_nodes();
    let names: Vec<String> = self
      .graph
      .node_names()
      .into_iter()
      .filter(|n| !owned.contains(*n))
      .map(String::from)
      .collect();
    for name in names {
      self.execute_node(&name).await?;
    }
    Ok(())
  }

  fn execute_recursive<'a>(
    &'a mut self,
    name: String,
    path: &'a mut Vec<String>,
  ) -> BoxFuture<'a, Result<Arc<OutputMap>>> {
    async move {
      if let Some(done) = self.results.get(&name) {
        return Ok(done.clone());
      }
      if path.contains(&name) {
        return Err(PipelineError::CycleDetected { node: name });
      }
      let graph = self.graph.clone();
      let node = graph.require(&name)?;
      let descriptor = node.base().context()?.descriptor.clone();

      path.push(name.clone());
      let mut inputs = InputMap::new();
      for input in &descriptor.inputs {
        let upstream = self
          .execute_recursive(input.source_plan_node.clone(), path)
          .await?;
        let value = upstream
          .get(&input.source_output_key)
          .ok_or_else(|| PipelineError::MissingInput {
            node: name.clone(),
            input: format!("{}.{}", input.source_plan_node, input.source_output_key),
          })?;
        inputs.insert(input.target_property.clone(), value.clone());
      }
      path.pop();

      let outputs = Arc::new(self.run_operator(node, inputs).await?);
      self.results.insert(name, outputs.clone());
      Ok(outputs)
    }
    .boxed()
  }

  async fn run_operator(&mut self, node: &dyn PlanNode, inputs: InputMap) -> Result<OutputMap> {
    let started_at = Utc::now();
    let timer = Instant::now();
    let mut operator_name = "";
    let mut nested = Vec::new();
    let outcome = async {
      let mut operator = node.build_operator(inputs)?;
      operator_name = operator.operator_name();
      let executed = operator.execute().await;
      nested = operator.take_nested_steps();
      executed?;
      Ok::<_, PipelineError>(operator.outputs()?.clone())
    }
    .await;
    let duration_ms = timer.elapsed().as_millis() as u64;
    for step in nested {
      self.push_step(step);
    }
    self.push_step(ExecutionStep {
      step: 0,
      node: node.name().to_string(),
      node_type: node.node_type().to_string(),
      operator: operator_name.to_string(),
      started_at,
      duration_ms,
      output_keys: outcome
        .as_ref()
        .map(|o: &OutputMap| o.keys().cloned().collect())
        .unwrap_or_default(),
      error: outcome.as_ref().err().map(|e: &PipelineError| e.to_string()),
      fork_join: None,
      branch: None,
    });
    match &outcome {
      Ok(outputs) => info!(
        node = %node.name(),
        node_type = %node.node_type(),
        duration_ms,
        outputs = outputs.len(),
        "node executed"
      ),
      Err(e) => info!(node = %node.name(), duration_ms, error = %e, "node failed"),
    }
    outcome
  }

  fn push_step(&mut self, mut step: ExecutionStep) {
    step.step = self.steps.len() as u32 + 1;
    self.steps.push(step);
  }
}
