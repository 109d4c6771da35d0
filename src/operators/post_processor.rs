//! Post-processor: hands every input to a registered post-processor and republishes what it
//! returns under the input names.
//!
//! Params: `type` (a post-processor registered in the component registry) and an optional
//! `component` spec. Labels the post-processor attaches are stamped with this node's name and the
//! post-processor's type.

use async_trait::async_trait;
use tracing::debug;

use super::{Operator, OperatorBase, component_spec};
use crate::components::AnomalyPostProcessor;
use crate::error::{PipelineError, Result};
use crate::plan::OperatorContext;
use crate::types::{AnomalyFinding, Params};

const TYPE_PARAM: &str = "type";

fn stamp(finding: &mut AnomalyFinding, node: &str, post_processor: &str) {
  for label in &mut finding.labels {
    label.source_node_name.get_or_insert_with(|| node.to_string());
    label
      .source_post_processor
      .get_or_insert_with(|| post_processor.to_string());
  }
}

#[derive(Default)]
pub struct PostProcessorOperator {
  base: OperatorBase,
  processor: Option<Box<dyn AnomalyPostProcessor>>,
}

#[async_trait]
impl Operator for PostProcessorOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "PostProcessorOperator"
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
    let processor = self
      .base
      .resources()?
      .components
      .build_post_processor(kind, &spec)
      .map_err(|e| PipelineError::InvalidParameter {
        node: name,
        param: TYPE_PARAM.to_string(),
        reason: e.to_string(),
      })?;
    self.processor = Some(processor);
    Ok(())
  }

  async fn compute(&mut self) -> Result<()> {
    let name = self.base.name().to_string();
    let window = self.base.window();
    let processor = self.processor.as_ref().ok_or_else(|| PipelineError::NotInitialized {
      node: name.clone(),
    })?;
    let results = processor
      .post_process(&window, self.base.inputs().clone())
      .map_err(|e| PipelineError::execution(&name, e))?;
    let source = processor.name().to_string();
    debug!(node = %name, post_processor = %source, results = results.len(), "post-processed");
    for (key, value) in results {
      let stamped = value.map_anomalies(&mut |finding: &mut AnomalyFinding| {
        stamp(finding, &name, &source)
      });
      self.base.set_output(&key, stamped)?;
    }
    Ok(())
  }
}
