//! Echo: publishes a piece of text, either its `input_Echo` input or its `text` param.

use async_trait::async_trait;

use super::{Operator, OperatorBase};
use crate::error::{PipelineError, Result};
use crate::templating::render;
use crate::types::NodeResult;

pub const ECHO_INPUT_KEY: &str = "input_Echo";
pub const ECHO_OUTPUT_KEY: &str = "output_Echo";
pub const ECHO_TEXT_PARAM: &str = "text";

#[derive(Default)]
pub struct EchoOperator {
  base: OperatorBase,
}

#[async_trait]
impl Operator for EchoOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "EchoOperator"
  }

  async fn compute(&mut self) -> Result<()> {
    let text = match self.base.input(ECHO_INPUT_KEY) {
      Some(input) => input
        .as_echo()
        .map(String::from)
        .ok_or_else(|| PipelineError::InvalidParameter {
          node: self.base.name().to_string(),
          param: ECHO_INPUT_KEY.to_string(),
          reason: format!("expected an echo result, got {}", input.kind()),
        })?,
      None => self
        .base
        .params()
        .get(ECHO_TEXT_PARAM)
        .map(render)
        .unwrap_or_default(),
    };
    self.base.set_output(ECHO_OUTPUT_KEY, NodeResult::Echo(text))
  }
}
