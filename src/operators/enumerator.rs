//! Enumerator: publishes the parameter sets a fork-join fans out over.
//!
//! `items` is a JSON array; each element is either `{name?, params: {...}}` or a bare object
//! of params.

use async_trait::async_trait;
use tracing::debug;

use super::{Operator, OperatorBase};
use crate::error::{PipelineError, Result};
use crate::types::{EnumerationItem, NodeResult, Params};

pub const ENUMERATOR_OUTPUT_KEY: &str = "output_EnumeratorResult";
pub const ENUMERATOR_ITEMS_PARAM: &str = "items";

#[derive(Default)]
pub struct EnumeratorOperator {
  base: OperatorBase,
}

fn parse_items(node: &str, params: &Params) -> Result<Vec<EnumerationItem>> {
  let invalid = |reason: String| PipelineError::InvalidParameter {
    node: node.to_string(),
    param: ENUMERATOR_ITEMS_PARAM.to_string(),
    reason,
  };
  let items = params
    .get(ENUMERATOR_ITEMS_PARAM)
    .ok_or_else(|| PipelineError::MissingParameter {
      node: node.to_string(),
      param: ENUMERATOR_ITEMS_PARAM.to_string(),
    })?
    .as_array()
    .ok_or_else(|| invalid("expected an array".to_string()))?;
  items
    .iter()
    .enumerate()
    .map(|(i, v)| {
      EnumerationItem::from_value(v).ok_or_else(|| invalid(format!("item {} is not an object", i)))
    })
    .collect()
}

#[async_trait]
impl Operator for EnumeratorOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "EnumeratorOperator"
  }

  fn validate_params(node: &str, params: &Params) -> Result<()> {
    parse_items(node, params).map(|_| ())
  }

  async fn compute(&mut self) -> Result<()> {
    let items = parse_items(self.base.name(), self.base.params())?;
    debug!(node = %self.base.name(), items = items.len(), "enumerated");
    self
      .base
      .set_output(ENUMERATOR_OUTPUT_KEY, NodeResult::Enumeration(items))
  }
}
