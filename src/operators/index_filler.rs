//! Index filler: completes every table input onto a regular time index.
//!
//! Each input is published under its own input name. Filler settings come from the `component`
//! param (or the params themselves when there is no `component`).

use async_trait::async_trait;

use super::{Operator, OperatorBase, component_spec};
use crate::components::{TimeIndexFiller, TimeIndexFillerSpec};
use crate::error::{PipelineError, Result};
use crate::plan::OperatorContext;
use crate::types::{NodeResult, Params};

fn filler_spec(node: &str, params: &Params) -> Result<TimeIndexFillerSpec> {
  let spec = match params.get(super::COMPONENT_PARAM) {
    Some(_) => component_spec(node, params)?,
    None => params.clone(),
  };
  TimeIndexFillerSpec::from_params(&spec).map_err(|reason| PipelineError::InvalidParameter {
    node: node.to_string(),
    param: super::COMPONENT_PARAM.to_string(),
    reason,
  })
}

#[derive(Default)]
pub struct IndexFillerOperator {
  base: OperatorBase,
  filler: Option<TimeIndexFiller>,
}

#[async_trait]
impl Operator for IndexFillerOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "IndexFillerOperator"
  }

  fn validate_params(node: &str, params: &Params) -> Result<()> {
    filler_spec(node, params).map(|_| ())
  }

  fn init(&mut self, context: OperatorContext) -> Result<()> {
    self.base.init(context)?;
    self.filler = Some(TimeIndexFiller::new(filler_spec(
      self.base.name(),
      self.base.params(),
    )?));
    Ok(())
  }

  async fn compute(&mut self) -> Result<()> {
    let name = self.base.name().to_string();
    let filler = self.filler.as_ref().ok_or_else(|| PipelineError::NotInitialized {
      node: name.clone(),
    })?;
    let window = self.base.window();
    let mut filled = Vec::with_capacity(self.base.inputs().len());
    for (input, value) in self.base.inputs() {
      let table = value.as_table().ok_or_else(|| PipelineError::InvalidParameter {
        node: name.clone(),
        param: input.clone(),
        reason: format!("expected a table, got {}", value.kind()),
      })?;
      let table = filler
        .fill_index(&window, table)
        .map_err(|e| PipelineError::execution(&name, e))?;
      filled.push((input.clone(), table));
    }
    for (input, table) in filled {
      self.base.set_output(&input, NodeResult::Table(table))?;
    }
    Ok(())
  }
}
