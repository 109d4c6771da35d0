//! The operator contract: one execution of one plan node.
//!
//! An operator is built per execution, initialized once, executed at most once, and then only
//! read. Outputs written during execution become visible when execution succeeds and never
//! change afterwards.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::plan::{OperatorContext, PlanNodeContext, SharedResources};
use crate::types::{
  DataTable, ExecutionStep, ExecutionWindow, InputMap, NodeResult, OutputMap, Params,
};

/// Lifecycle of an operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperatorState {
  #[default]
  Constructed,
  Initialized,
  Executing,
  Executed,
  Failed,
}

#[async_trait]
pub trait Operator: Send {
  fn base(&self) -> &OperatorBase;

  fn base_mut(&mut self) -> &mut OperatorBase;

  fn operator_name(&self) -> &'static str;

  /// Checks a node's params when its plan node is initialized, before any execution.
  fn validate_params(_node: &str, _params: &Params) -> Result<()>
  where
    Self: Sized,
  {
    Ok(())
  }

  fn init(&mut self, context: OperatorContext) -> Result<()> {
    self.base_mut().init(context)
  }

  /// The operator's work. Publishes results through [OperatorBase::set_output].
  async fn compute(&mut self) -> Result<()>;

  /// Steps of the plan executions this operator ran itself, drained. Only a fork-join has any.
  fn take_nested_steps(&mut self) -> Vec<ExecutionStep> {
    Vec::new()
  }

  /// Runs [Operator::compute] once. Outputs are published only if it succeeds.
  async fn execute(&mut self) -> Result<()> {
    self.base_mut().begin_execution()?;
    let name = self.base().name().to_string();
    let started = Instant::now();
    match self.compute().await {
      Ok(()) => {
        self.base_mut().complete();
        debug!(
          node = %name,
          operator = self.operator_name(),
          outputs = self.base().output_count(),
          elapsed_ms = started.elapsed().as_millis() as u64,
          "operator executed"
        );
        Ok(())
      }
      Err(e) => {
        self.base_mut().fail();
        warn!(node = %name, operator = self.operator_name(), error = %e, "operator failed");
        Err(e.in_node(&name))
      }
    }
  }

  fn outputs(&self) -> Result<&OutputMap> {
    self.base().outputs()
  }

  fn output(&self, key: &str) -> Result<Option<&Arc<NodeResult>>> {
    Ok(self.outputs()?.get(key))
  }

  fn name(&self) -> &str {
    self.base().name()
  }
}

/// State shared by every operator: binding, inputs, output aliasing and the lifecycle.
#[derive(Debug, Default)]
pub struct OperatorBase {
  state: OperatorState,
  context: Option<PlanNodeContext>,
  window: ExecutionWindow,
  params: Params,
  inputs: InputMap,
  /// Output key -> published name, from the descriptor's output declarations.
  output_names: HashMap<String, String>,
  pending: OutputMap,
}

impl OperatorBase {
  pub fn init(&mut self, context: OperatorContext) -> Result<()> {
    let name = context.node.name().to_string();
    if self.state != OperatorState::Constructed {
      return Err(PipelineError::AlreadyInitialized { node: name });
    }
    let window = context.node.window();
    self.window = ExecutionWindow::new(window.start(), window.end())?;
    self.output_names = context
      .node
      .descriptor
      .outputs
      .iter()
      .map(|o| (o.output_key.clone(), o.output_name.clone()))
      .collect();
    self.params = context.params;
    self.inputs = context.inputs;
    self.context = Some(context.node);
    self.state = OperatorState::Initialized;
    Ok(())
  }

  pub fn state(&self) -> OperatorState {
    self.state
  }

  pub fn name(&self) -> &str {
    self.context.as_ref().map(|c| c.name()).unwrap_or("")
  }

  pub fn context(&self) -> Result<&PlanNodeContext> {
    self.context.as_ref().ok_or_else(|| PipelineError::NotInitialized {
      node: self.name().to_string(),
    })
  }

  pub fn resources(&self) -> Result<&SharedResources> {
    Ok(self.context()?.resources())
  }

  pub fn window(&self) -> ExecutionWindow {
    self.window
  }

  pub fn params(&self) -> &Params {
    &self.params
  }

  pub fn param_str(&self, key: &str) -> Option<&str> {
    self.params.get(key).and_then(|v| v.as_str())
  }

  pub fn require_param_str(&self, key: &str) -> Result<&str> {
    self.param_str(key).ok_or_else(|| PipelineError::MissingParameter {
      node: self.name().to_string(),
      param: key.to_string(),
    })
  }

  pub fn inputs(&self) -> &InputMap {
    &self.inputs
  }

  pub fn input(&self, key: &str) -> Option<&Arc<NodeResult>> {
    self.inputs.get(key)
  }

  pub fn require_input(&self, key: &str) -> Result<&Arc<NodeResult>> {
    self.input(key).ok_or_else(|| PipelineError::MissingInput {
      node: self.name().to_string(),
      input: key.to_string(),
    })
  }

  /// Every table input, keyed by input name. Non-table inputs are skipped.
  pub fn table_inputs(&self) -> BTreeMap<String, DataTable> {
    self
      .inputs
      .iter()
      .filter_map(|(k, v)| v.as_table().map(|t| (k.clone(), t.clone())))
      .collect()
  }

  /// Name an output key is published under.
  pub fn output_name<'a>(&'a self, key: &'a str) -> &'a str {
    self.output_names.get(key).map(String::as_str).unwrap_or(key)
  }

  /// Stores an output under its published name. Only allowed while executing.
  pub fn set_output(&mut self, key: &str, value: NodeResult) -> Result<()> {
    self.set_output_shared(key, Arc::new(value))
  }

  pub fn set_output_shared(&mut self, key: &str, value: Arc<NodeResult>) -> Result<()> {
    match self.state {
      OperatorState::Executing => {
        let name = self.output_name(key).to_string();
        self.pending.insert(name, value);
        Ok(())
      }
      OperatorState::Executed | OperatorState::Failed => Err(PipelineError::AlreadyExecuted {
        node: self.name().to_string(),
      }),
      OperatorState::Constructed | OperatorState::Initialized => Err(PipelineError::NotExecuted {
        node: self.name().to_string(),
      }),
    }
  }

  pub(crate) fn begin_execution(&mut self) -> Result<()> {
    match self.state {
      OperatorState::Initialized => {
        self.state = OperatorState::Executing;
        Ok(())
      }
      OperatorState::Constructed => Err(PipelineError::NotInitialized {
        node: self.name().to_string(),
      }),
      _ => Err(PipelineError::AlreadyExecuted {
        node: self.name().to_string(),
      }),
    }
  }

  pub(crate) fn complete(&mut self) {
    self.state = OperatorState::Executed;
  }

  pub(crate) fn fail(&mut self) {
    self.pending.clear();
    self.state = OperatorState::Failed;
  }

  fn output_count(&self) -> usize {
    self.pending.len()
  }

  /// The published outputs. Available only after a successful execution.
  pub fn outputs(&self) -> Result<&OutputMap> {
    match self.state {
      OperatorState::Executed => Ok(&self.pending),
      _ => Err(PipelineError::NotExecuted {
        node: self.name().to_string(),
      }),
    }
  }
}
