//! What plan nodes and operators are bound to: the run's window and shared resources, the node's
//! descriptor, and the graph the node belongs to.

use std::fmt;
use std::sync::{Arc, Weak};

use super::PlanGraph;
use crate::components::{ComponentRegistry, DataSource, SqlEngine};
use crate::config::EngineConfig;
use crate::error::{PipelineError, Result};
use crate::types::{EnumerationItem, ExecutionWindow, InputMap, Params, PlanNodeDescriptor};

/// Resources shared by every node of a run (and of every fork-join branch of it).
#[derive(Clone)]
pub struct SharedResources {
  pub config: Arc<EngineConfig>,
  pub components: Arc<ComponentRegistry>,
  pub data_source: Option<Arc<dyn DataSource>>,
  pub sql_engine: Option<Arc<dyn SqlEngine>>,
}

impl Default for SharedResources {
  fn default() -> Self {
    Self {
      config: Arc::new(EngineConfig::default()),
      components: Arc::new(ComponentRegistry::with_builtins()),
      data_source: None,
      sql_engine: None,
    }
  }
}

impl SharedResources {
  pub fn with_config(mut self, config: EngineConfig) -> Self {
    self.config = Arc::new(config);
    self
  }

  pub fn with_components(mut self, components: Arc<ComponentRegistry>) -> Self {
    self.components = components;
    self
  }

  pub fn with_data_source(mut self, source: Arc<dyn DataSource>) -> Self {
    self.data_source = Some(source);
    self
  }

  pub fn with_sql_engine(mut self, engine: Arc<dyn SqlEngine>) -> Self {
    self.sql_engine = Some(engine);
    self
  }
}

impl fmt::Debug for SharedResources {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SharedResources")
      .field("config", &self.config)
      .field("components", &self.components)
      .field("data_source", &self.data_source.as_ref().map(|s| s.name().to_string()))
      .field("sql_engine", &self.sql_engine.is_some())
      .finish()
  }
}

/// Run-wide settings every node of one graph shares.
#[derive(Debug, Clone)]
pub struct PipelineContext {
  pub window: ExecutionWindow,
  pub resources: SharedResources,
  pub alert_id: Option<i64>,
  /// Set on the graph copies made for fork-join branches.
  pub enumeration_item: Option<EnumerationItem>,
}

impl PipelineContext {
  pub fn new(window: ExecutionWindow, resources: SharedResources) -> Self {
    Self {
      window,
      resources,
      alert_id: None,
      enumeration_item: None,
    }
  }

  pub fn with_alert_id(mut self, alert_id: Option<i64>) -> Self {
    self.alert_id = alert_id;
    self
  }

  /// Same run, bound to one enumeration item.
  pub fn for_item(&self, item: Option<EnumerationItem>) -> Self {
    Self {
      enumeration_item: item,
      ..self.clone()
    }
  }
}

/// Binding of one plan node.
#[derive(Debug, Clone)]
pub struct PlanNodeContext {
  pub descriptor: Arc<PlanNodeDescriptor>,
  pub pipeline: PipelineContext,
  /// The graph owning the node. Weak: the graph owns its nodes.
  pub graph: Weak<PlanGraph>,
}

impl PlanNodeContext {
  pub fn new(descriptor: Arc<PlanNodeDescriptor>, pipeline: PipelineContext, graph: Weak<PlanGraph>) -> Self {
    Self {
      descriptor,
      pipeline,
      graph,
    }
  }

  /// A context with no owning graph, for nodes used on their own.
  pub fn detached(descriptor: PlanNodeDescriptor, pipeline: PipelineContext) -> Self {
    Self::new(Arc::new(descriptor), pipeline, Weak::new())
  }

  pub fn name(&self) -> &str {
    &self.descriptor.name
  }

  pub fn window(&self) -> ExecutionWindow {
    self.pipeline.window
  }

  pub fn resources(&self) -> &SharedResources {
    &self.pipeline.resources
  }

  pub fn enumeration_item(&self) -> Option<&EnumerationItem> {
    self.pipeline.enumeration_item.as_ref()
  }

  /// The owning graph, while it is alive.
  pub fn plan_graph(&self) -> Result<Arc<PlanGraph>> {
    self.graph.upgrade().ok_or_else(|| PipelineError::MissingResource {
      node: self.name().to_string(),
      resource: "plan graph",
    })
  }
}

/// What an operator is initialized with.
#[derive(Debug, Clone)]
pub struct OperatorContext {
  pub node: PlanNodeContext,
  /// The node's params with enumeration placeholders resolved.
  pub params: Params,
  pub inputs: InputMap,
}
