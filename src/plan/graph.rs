//! The set of initialized plan nodes of one run (or of one fork-join branch).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use tracing::{debug, instrument};

use super::{PipelineContext, PlanNode, PlanNodeContext};
use crate::error::{PipelineError, Result};
use crate::registry::NodeRegistry;
use crate::types::{EnumerationItem, PlanNodeDescriptor};

/// Plan nodes by name. Every node holds a weak reference back to the graph, which is how a
/// fork-join node finds its enumerator, root and combiner.
pub struct PlanGraph {
  nodes: HashMap<String, Box<dyn PlanNode>>,
  /// Descriptors in declaration order.
  descriptors: Vec<Arc<PlanNodeDescriptor>>,
  pipeline: PipelineContext,
}

impl std::fmt::Debug for PlanGraph {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PlanGraph")
      .field("nodes", &self.node_names())
      .field("window", &self.pipeline.window)
      .field("enumeration_item", &self.pipeline.enumeration_item)
      .finish()
  }
}

impl PlanGraph {
  /// Validates the descriptors and builds every node through `registry`.
  #[instrument(level = "trace", skip(descriptors, pipeline, registry))]
  pub fn build(
    descriptors: Vec<PlanNodeDescriptor>,
    pipeline: PipelineContext,
    registry: &NodeRegistry,
  ) -> Result<Arc<PlanGraph>> {
    validate_descriptors(&descriptors)?;
    let descriptors: Vec<Arc<PlanNodeDescriptor>> = descriptors.into_iter().map(Arc::new).collect();
    let graph = Self::assemble(&descriptors, pipeline, |ctx| registry.build(ctx))?;
    graph.validate_sub_plan_nodes()?;
    debug!(nodes = graph.len(), "plan graph built");
    Ok(graph)
  }

  /// A copy of this graph for one fork-join branch: every node is cloned and re-initialized
  /// against the copy, with params resolved against `item`. The original is not touched.
  pub fn deep_clone(&self, item: Option<EnumerationItem>) -> Result<Arc<PlanGraph>> {
    let pipeline = self.pipeline.for_item(item);
    Self::assemble(&self.descriptors, pipeline, |ctx| {
      let name = ctx.name().to_string();
      let mut node = self
        .nodes
        .get(&name)
        .ok_or_else(|| PipelineError::UnknownNode { name: name.clone() })?
        .clone();
      node.init(ctx).map_err(|e| PipelineError::NodeInitialization {
        node: name,
        source: Box::new(e),
      })?;
      Ok(node)
    })
  }

  fn assemble(
    descriptors: &[Arc<PlanNodeDescriptor>],
    pipeline: PipelineContext,
    mut make: impl FnMut(PlanNodeContext) -> Result<Box<dyn PlanNode>>,
  ) -> Result<Arc<PlanGraph>> {
    let mut failure = None;
    let graph = Arc::new_cyclic(|weak: &Weak<PlanGraph>| {
      let mut nodes = HashMap::with_capacity(descriptors.len());
      for descriptor in descriptors {
        let ctx = PlanNodeContext::new(descriptor.clone(), pipeline.clone(), weak.clone());
        match make(ctx) {
          Ok(node) => {
            nodes.insert(descriptor.name.clone(), node);
          }
          Err(e) => {
            failure = Some(e);
            break;
          }
        }
      }
      PlanGraph {
        nodes,
        descriptors: descriptors.to_vec(),
        pipeline,
      }
    });
    match failure {
      Some(e) => Err(e),
      None => Ok(graph),
    }
  }

  fn validate_sub_plan_nodes(&self) -> Result<()> {
    for descriptor in &self.descriptors {
      let node = self.require(&descriptor.name)?;
      for sub in node.sub_plan_nodes() {
        if !self.nodes.contains_key(&sub) {
          return Err(PipelineError::NodeInitialization {
            node: descriptor.name.clone(),
            source: Box::new(PipelineError::UnknownNode { name: sub }),
          });
        }
        if sub == descriptor.name {
          return Err(PipelineError::CycleDetected { node: sub });
        }
      }
      let sub_nodes = node.sub_plan_nodes();
      if !sub_nodes.is_empty() && self.reaches(sub_nodes, &descriptor.name) {
        return Err(PipelineError::CycleDetected {
          node: descriptor.name.clone(),
        });
      }
    }
    Ok(())
  }

  /// Whether `target` is among `start`, their upstream nodes, or the nodes their fork-joins
  /// drive, transitively.
  fn reaches(&self, start: Vec<String>, target: &str) -> bool {
    let mut seen = HashSet::new();
    let mut stack = start;
    while let Some(name) = stack.pop() {
      if name == target {
        return true;
      }
      if !seen.insert(name.clone()) {
        continue;
      }
      if let Some(descriptor) = self.descriptor(&name) {
        stack.extend(descriptor.upstream_nodes().into_iter().map(String::from));
      }
      if let Some(node) = self.get(&name) {
        stack.extend(node.sub_plan_nodes());
      }
    }
    false
  }

  pub fn get(&self, name: &str) -> Option<&(dyn PlanNode + 'static)> {
    self.nodes.get(name).map(|n| n.as_ref())
  }

  pub fn require(&self, name: &str) -> Result<&(dyn PlanNode + 'static)> {
    self.get(name).ok_or_else(|| PipelineError::UnknownNode {
      name: name.to_string(),
    })
  }

  pub fn descriptor(&self, name: &str) -> Option<&PlanNodeDescriptor> {
    self
      .descriptors
      .iter()
      .find(|d| d.name == name)
      .map(|d| d.as_ref())
  }

  /// Node names in declaration order.
  pub fn node_names(&self) -> Vec<&str> {
    self.descriptors.iter().map(|d| d.name.as_str()).collect()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn pipeline(&self) -> &PipelineContext {
    &self.pipeline
  }

  /// Nodes run by some fork-join rather than on their own: the fork-join's enumerator, root and
  /// combiner, plus everything upstream of them.
  pub fn owned_sub_nodes(&self) -> HashSet<String> {
    let mut owned = HashSet::new();
    let mut stack: Vec<String> = self
      .descriptors
      .iter()
      .filter_map(|d| self.get(&d.name))
      .flat_map(|n| n.sub_plan_nodes())
      .collect();
    while let Some(name) = stack.pop() {
      if !owned.insert(name.clone()) {
        continue;
      }
      if let Some(descriptor) = self.descriptor(&name) {
        stack.extend(descriptor.upstream_nodes().into_iter().map(String::from));
      }
    }
    owned
  }
}

fn validate_descriptors(descriptors: &[PlanNodeDescriptor]) -> Result<()> {
  let mut names = HashSet::with_capacity(descriptors.len());
  for descriptor in descriptors {
    if !names.insert(descriptor.name.as_str()) {
      return Err(PipelineError::DuplicateNodeName {
        name: descriptor.name.clone(),
      });
    }
  }
  for descriptor in descriptors {
    for input in &descriptor.inputs {
      if !names.contains(input.source_plan_node.as_str()) {
        return Err(PipelineError::NodeInitialization {
          node: descriptor.name.clone(),
          source: Box::new(PipelineError::UnknownNode {
            name: input.source_plan_node.clone(),
          }),
        });
      }
    }
  }
  Ok(())
}
