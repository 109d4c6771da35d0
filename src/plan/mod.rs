//! Plan nodes: the validated, initialized form of a descriptor, and factories of operators.
//!
//! A plan node is created by the [crate::registry::NodeRegistry] from its type tag, bound to a
//! [PlanNodeContext] by `init`, and then asked for a fresh operator each time the node runs.
//! Plan nodes are cloneable as trait objects so a whole graph can be copied for a fork-join
//! branch; a clone starts unbound and is re-initialized against the copy.

mod context;
mod graph;
mod nodes;

pub use context::{OperatorContext, PipelineContext, PlanNodeContext, SharedResources};
pub use graph::PlanGraph;
pub use nodes::{
  AnomalyDetectorPlanNode, CombinerPlanNode, DataFetcherPlanNode, EchoPlanNode, EnumeratorPlanNode,
  EventTriggerPlanNode, ForkJoinPlanNode, IndexFillerPlanNode, OperatorPlanNode,
  PostProcessorPlanNode, SqlExecutionPlanNode,
};

use dyn_clone::DynClone;

use crate::error::{PipelineError, Result};
use crate::operators::Operator;
use crate::templating::resolve_params;
use crate::types::{InputMap, Params, PlanNodeDescriptor};

/// Type tags of the built-in plan nodes.
pub mod node_types {
  pub const ECHO: &str = "Echo";
  pub const ENUMERATOR: &str = "Enumerator";
  pub const COMBINER: &str = "Combiner";
  pub const FORK_JOIN: &str = "ForkJoin";
  pub const DATA_FETCHER: &str = "DataFetcher";
  pub const ANOMALY_DETECTOR: &str = "AnomalyDetector";
  pub const SQL_EXECUTION: &str = "SqlExecution";
  pub const INDEX_FILLER: &str = "IndexFiller";
  pub const EVENT_TRIGGER: &str = "EventTrigger";
  pub const POST_PROCESSOR: &str = "PostProcessor";
}

/// A node of a plan graph.
pub trait PlanNode: DynClone + Send + Sync {
  /// Binds the node. Called exactly once, before any operator is built.
  fn init(&mut self, context: PlanNodeContext) -> Result<()>;

  fn base(&self) -> &PlanNodeBase;

  /// A new operator for one execution, initialized with `inputs`.
  fn build_operator(&self, inputs: InputMap) -> Result<Box<dyn Operator>>;

  fn name(&self) -> &str {
    self.base().name()
  }

  fn node_type(&self) -> &str {
    self.base().node_type()
  }

  /// Nodes this node runs itself (a fork-join's enumerator, root and combiner).
  fn sub_plan_nodes(&self) -> Vec<String> {
    Vec::new()
  }
}

dyn_clone::clone_trait_object!(PlanNode);

/// State every plan node carries: its binding and its resolved params.
#[derive(Debug, Default)]
pub struct PlanNodeBase {
  context: Option<PlanNodeContext>,
  params: Params,
}

/// Clones start unbound; a copied node is re-initialized against its own graph.
impl Clone for PlanNodeBase {
  fn clone(&self) -> Self {
    Self::default()
  }
}

impl PlanNodeBase {
  pub fn init(&mut self, context: PlanNodeContext) -> Result<()> {
    if let Some(existing) = &self.context {
      return Err(PipelineError::AlreadyInitialized {
        node: existing.name().to_string(),
      });
    }
    self.params = match context.enumeration_item() {
      Some(item) => resolve_params(&context.descriptor.params, &item.params),
      None => context.descriptor.params.clone(),
    };
    self.context = Some(context);
    Ok(())
  }

  pub fn is_initialized(&self) -> bool {
    self.context.is_some()
  }

  pub fn context(&self) -> Result<&PlanNodeContext> {
    self.context.as_ref().ok_or_else(|| PipelineError::NotInitialized {
      node: "<unbound plan node>".to_string(),
    })
  }

  pub fn descriptor(&self) -> Option<&PlanNodeDescriptor> {
    self.context.as_ref().map(|c| c.descriptor.as_ref())
  }

  pub fn name(&self) -> &str {
    self.descriptor().map(|d| d.name.as_str()).unwrap_or("")
  }

  pub fn node_type(&self) -> &str {
    self.descriptor().map(|d| d.node_type.as_str()).unwrap_or("")
  }

  /// Params after placeholder resolution.
  pub fn params(&self) -> &Params {
    &self.params
  }

  pub fn operator_context(&self, inputs: InputMap) -> Result<OperatorContext> {
    Ok(OperatorContext {
      node: self.context()?.clone(),
      params: self.params.clone(),
      inputs,
    })
  }

  /// Initializes `operator` for this node. Failures name the node.
  pub fn build<O: Operator + 'static>(&self, mut operator: O, inputs: InputMap) -> Result<Box<dyn Operator>> {
    let context = self.operator_context(inputs)?;
    operator
      .init(context)
      .map_err(|e| PipelineError::OperatorConstruction {
        node: self.name().to_string(),
        source: Box::new(e),
      })?;
    Ok(Box::new(operator))
  }
}
