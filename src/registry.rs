//! Node registry: type tag -> plan node factory.
//!
//! The registry is the only place that knows concrete plan node types. Building a node looks the
//! descriptor's type tag up, creates a fresh node and initializes it against its context.
//! Extra node types arrive through [NodeRegistry::register] or a [NodePlugin].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument};

use crate::config::DuplicatePolicy;
use crate::error::{PipelineError, Result};
use crate::plan::{
  AnomalyDetectorPlanNode, CombinerPlanNode, DataFetcherPlanNode, EchoPlanNode, EnumeratorPlanNode,
  EventTriggerPlanNode, ForkJoinPlanNode, IndexFillerPlanNode, PlanNode, PlanNodeContext,
  PostProcessorPlanNode, SqlExecutionPlanNode, node_types,
};

/// Creates an uninitialized plan node.
pub type PlanNodeFactory = Arc<dyn Fn() -> Box<dyn PlanNode> + Send + Sync>;

/// A bundle of node types registered together.
pub trait NodePlugin: Send + Sync {
  fn name(&self) -> &str;

  fn node_types(&self) -> Vec<(String, PlanNodeFactory)>;
}

pub struct NodeRegistry {
  factories: RwLock<HashMap<String, PlanNodeFactory>>,
  on_duplicate: DuplicatePolicy,
}

impl std::fmt::Debug for NodeRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NodeRegistry")
      .field("type_tags", &self.type_tags())
      .field("on_duplicate", &self.on_duplicate)
      .finish()
  }
}

impl Default for NodeRegistry {
  fn default() -> Self {
    Self::with_builtins(DuplicatePolicy::default())
  }
}

fn factory<N: PlanNode + Default + 'static>() -> PlanNodeFactory {
  Arc::new(|| Box::new(N::default()) as Box<dyn PlanNode>)
}

impl NodeRegistry {
  /// An empty registry.
  pub fn new(on_duplicate: DuplicatePolicy) -> Self {
    Self {
      factories: RwLock::new(HashMap::new()),
      on_duplicate,
    }
  }

  /// A registry with every built-in node type.
  pub fn with_builtins(on_duplicate: DuplicatePolicy) -> Self {
    let registry = Self::new(on_duplicate);
    let builtins: [(&str, PlanNodeFactory); 10] = [
      (node_types::ECHO, factory::<EchoPlanNode>()),
      (node_types::ENUMERATOR, factory::<EnumeratorPlanNode>()),
      (node_types::COMBINER, factory::<CombinerPlanNode>()),
      (node_types::FORK_JOIN, factory::<ForkJoinPlanNode>()),
      (node_types::DATA_FETCHER, factory::<DataFetcherPlanNode>()),
      (node_types::ANOMALY_DETECTOR, factory::<AnomalyDetectorPlanNode>()),
      (node_types::SQL_EXECUTION, factory::<SqlExecutionPlanNode>()),
      (node_types::INDEX_FILLER, factory::<IndexFillerPlanNode>()),
      (node_types::EVENT_TRIGGER, factory::<EventTriggerPlanNode>()),
      (node_types::POST_PROCESSOR, factory::<PostProcessorPlanNode>()),
    ];
    let mut factories = registry
      .factories
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    for (tag, f) in builtins {
      factories.insert(tag.to_string(), f);
    }
    drop(factories);
    registry
  }

  pub fn on_duplicate(&self) -> DuplicatePolicy {
    self.on_duplicate
  }

  /// Registers `factory` under `type_tag`. A tag that is already taken is rejected or replaced
  /// according to the registry's [DuplicatePolicy].
  pub fn register(&self, type_tag: &str, factory: PlanNodeFactory) -> Result<()> {
    let mut factories = self
      .factories
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    if factories.contains_key(type_tag) {
      match self.on_duplicate {
        DuplicatePolicy::Reject => {
          return Err(PipelineError::DuplicateNodeType {
            type_tag: type_tag.to_string(),
          });
        }
        DuplicatePolicy::Overwrite => {
          info!(type_tag = %type_tag, "replacing registered plan node type");
        }
      }
    }
    factories.insert(type_tag.to_string(), factory);
    debug!(type_tag = %type_tag, "plan node type registered");
    Ok(())
  }

  /// Registers a node type constructed with `Default`.
  pub fn register_node<N: PlanNode + Default + 'static>(&self, type_tag: &str) -> Result<()> {
    self.register(type_tag, factory::<N>())
  }

  /// Registers every node type of `plugin`. Stops at the first rejected tag.
  pub fn load_plugin(&self, plugin: &dyn NodePlugin) -> Result<usize> {
    let types = plugin.node_types();
    let count = types.len();
    for (tag, f) in types {
      self.register(&tag, f)?;
    }
    info!(plugin = %plugin.name(), node_types = count, "plugin loaded");
    Ok(count)
  }

  pub fn contains(&self, type_tag: &str) -> bool {
    self
      .factories
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(type_tag)
  }

  /// Registered type tags, sorted.
  pub fn type_tags(&self) -> Vec<String> {
    let mut tags: Vec<String> = self
      .factories
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .keys()
      .cloned()
      .collect();
    tags.sort();
    tags
  }

  /// Creates and initializes the plan node described by `context`.
  #[instrument(level = "trace", skip(self, context), fields(node = %context.name()))]
  pub fn build(&self, context: PlanNodeContext) -> Result<Box<dyn PlanNode>> {
    let type_tag = context.descriptor.node_type.clone();
    let factory = self
      .factories
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&type_tag)
      .cloned()
      .ok_or_else(|| PipelineError::UnknownNodeType {
        type_tag: type_tag.clone(),
      })?;
    let name = context.name().to_string();
    let mut node = factory();
    node
      .init(context)
      .map_err(|e| PipelineError::NodeInitialization {
        node: name,
        source: Box::new(e),
      })?;
    Ok(node)
  }
}
