//! Event trigger: hands every table input to a trigger component, then closes it.
//!
//! Params: `type` (a trigger registered in the component registry) and an optional `component`
//! spec. Publishes no outputs.

use async_trait::async_trait;

use super::{Operator, OperatorBase, component_spec};
use crate::components::EventTrigger;
use crate::error::{PipelineError, Result};
use crate::plan::OperatorContext;
use crate::types::Params;

const TYPE_PARAM: &str = "type";

#[derive(Default)]
pub struct EventTriggerOperator {
  base: OperatorBase,
  trigger: Option<Box<dyn EventTrigger>>,
}

#[async_trait]
impl Operator for EventTriggerOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "EventTriggerOperator"
  }

  fn validate_params(node: &str, params: &Params) -> Result<()> {
    if params.get(TYPE_PARAM).and_then(|v| v.as_str()).is_none() {
      return Err(PipelineError::MissingParameter {
        node: node.to_string(),
        param: TYPE_PARAM.to_string(),
      });
    }
    component_spec(node, params).map(|_| ())
  }

  fn init(&mut self, context: OperatorContext) -> Result<()> {
    self.base.init(context)?;
    let name = self.base.name().to_string();
    let kind = self.base.require_param_str(TYPE_PARAM)?;
    let spec = component_spec(&name, self.base.params())?;
    let trigger = self
      .base
      .resources()?
      .components
      .build_trigger(kind, &spec)
      .map_err(|e| PipelineError::InvalidParameter {
        node: name,
        param: TYPE_PARAM.to_string(),
        reason: e.to_string(),
      })?;
    self.trigger = Some(trigger);
    Ok(())
  }

  async fn compute(&mut self) -> Result<()> {
    let name = self.base.name().to_string();
    let window = self.base.window();
    let trigger = self.trigger.as_mut().ok_or_else(|| PipelineError::NotInitialized {
      node: name.clone(),
    })?;
    for (input, table) in self.base.table_inputs() {
      trigger
        .trigger(&window, &input, &table)
        .map_err(|e| PipelineError::execution(&name, e))?;
    }
    trigger.close().map_err(|e| PipelineError::execution(&name, e))
  }
}
