//! Declarative description of one plan node, as rendered from an alert template.

use serde::{Deserialize, Serialize};

use super::Params;

/// Wires one upstream output into a parameter of this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBean {
  /// Name of the node producing the value.
  pub source_plan_node: String,
  /// Key under which the source node published the value.
  pub source_output_key: String,
  /// Name under which this node sees the value.
  pub target_property: String,
}

/// Renames one of the node's internal output keys for this graph instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputBean {
  pub output_key: String,
  pub output_name: String,
}

/// A plan node as it appears in the graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNodeDescriptor {
  pub name: String,
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default)]
  pub params: Params,
  #[serde(default)]
  pub inputs: Vec<InputBean>,
  #[serde(default)]
  pub outputs: Vec<OutputBean>,
}

impl PlanNodeDescriptor {
  pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      node_type: node_type.into(),
      params: Params::new(),
      inputs: vec![],
      outputs: vec![],
    }
  }

  pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.params.insert(key.into(), value.into());
    self
  }

  pub fn with_input(
    mut self,
    source_plan_node: impl Into<String>,
    source_output_key: impl Into<String>,
    target_property: impl Into<String>,
  ) -> Self {
    self.inputs.push(InputBean {
      source_plan_node: source_plan_node.into(),
      source_output_key: source_output_key.into(),
      target_property: target_property.into(),
    });
    self
  }

  pub fn with_output(mut self, output_key: impl Into<String>, output_name: impl Into<String>) -> Self {
    self.outputs.push(OutputBean {
      output_key: output_key.into(),
      output_name: output_name.into(),
    });
    self
  }

  /// Names of the nodes this node reads from, in declaration order, without repeats.
  pub fn upstream_nodes(&self) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for input in &self.inputs {
      if !names.contains(&input.source_plan_node.as_str()) {
        names.push(&input.source_plan_node);
      }
    }
    names
  }
}
