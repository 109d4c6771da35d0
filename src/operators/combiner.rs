//! Combiner: flattens the per-branch outputs of a fork-join into one map.
//!
//! Branch `i`'s output `key` is published as `"{i}.{key}"`. With `merged: true` the whole map is
//! published as one [NodeResult::Combined] under `output_Combiner` instead, so a single downstream
//! input can take every branch at once.

use async_trait::async_trait;

use super::{Operator, OperatorBase};
use crate::error::{PipelineError, Result};
use crate::types::{NodeResult, OutputMap, Params};

pub const COMBINER_INPUT_KEY: &str = "input_Combiner";
pub const COMBINER_OUTPUT_KEY: &str = "output_Combiner";
pub const COMBINER_MERGED_PARAM: &str = "merged";

fn merged_param(node: &str, params: &Params) -> Result<bool> {
  match params.get(COMBINER_MERGED_PARAM) {
    None | Some(serde_json::Value::Null) => Ok(false),
    Some(serde_json::Value::Bool(merged)) => Ok(*merged),
    Some(other) => Err(PipelineError::InvalidParameter {
      node: node.to_string(),
      param: COMBINER_MERGED_PARAM.to_string(),
      reason: format!("expected a boolean, got {}", other),
    }),
  }
}

/// Prefixes every key of branch `i` with `"{i}."`.
pub fn combine(branches: &[OutputMap]) -> OutputMap {
  branches
    .iter()
    .enumerate()
    .flat_map(|(i, outputs)| {
      outputs
        .iter()
        .map(move |(key, value)| (format!("{}.{}", i, key), value.clone()))
    })
    .collect()
}

#[derive(Default)]
pub struct CombinerOperator {
  base: OperatorBase,
}

#[async_trait]
impl Operator for CombinerOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "CombinerOperator"
  }

  fn validate_params(node: &str, params: &Params) -> Result<()> {
    merged_param(node, params).map(|_| ())
  }

  async fn compute(&mut self) -> Result<()> {
    let input = self.base.require_input(COMBINER_INPUT_KEY)?.clone();
    let branches = input
      .as_fork_join()
      .ok_or_else(|| PipelineError::InvalidParameter {
        node: self.base.name().to_string(),
        param: COMBINER_INPUT_KEY.to_string(),
        reason: format!("expected fork-join branches, got {}", input.kind()),
      })?;
    let combined = combine(branches);
    if merged_param(self.base.name(), self.base.params())? {
      return self
        .base
        .set_output(COMBINER_OUTPUT_KEY, NodeResult::Combined(combined));
    }
    for (key, value) in combined {
      self.base.set_output_shared(&key, value)?;
    }
    Ok(())
  }
}
