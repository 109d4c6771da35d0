//! Operators: the executable side of plan nodes.
//!
//! Every built-in plan node type has an operator here. Operators publish their results under
//! fixed output keys; a node's descriptor may rename them.

mod anomaly_detector;
mod combiner;
mod data_fetcher;
mod echo;
mod enumerator;
mod event_trigger;
mod fork_join;
mod index_filler;
#[cfg(test)]
mod index_filler_test;
mod operator;
#[cfg(test)]
mod operator_test;
mod post_processor;
#[cfg(test)]
mod post_processor_test;
mod sql_execution;
#[cfg(test)]
pub(crate) mod test_support;

pub use anomaly_detector::{ANOMALY_DETECTOR_OUTPUT_KEY, AnomalyDetectorOperator};
pub use combiner::{
  COMBINER_INPUT_KEY, COMBINER_MERGED_PARAM, COMBINER_OUTPUT_KEY, CombinerOperator, combine,
};
pub use data_fetcher::{DATA_FETCHER_OUTPUT_KEY, DataFetcherOperator};
pub use echo::{ECHO_INPUT_KEY, ECHO_OUTPUT_KEY, ECHO_TEXT_PARAM, EchoOperator};
pub use enumerator::{ENUMERATOR_ITEMS_PARAM, ENUMERATOR_OUTPUT_KEY, EnumeratorOperator};
pub use event_trigger::EventTriggerOperator;
pub use fork_join::{
  FORK_JOIN_COMBINER_PARAM, FORK_JOIN_ENUMERATOR_PARAM, FORK_JOIN_ROOT_PARAM, ForkJoinOperator,
  ForkJoinTargets,
};
pub use index_filler::IndexFillerOperator;
pub use operator::{Operator, OperatorBase, OperatorState};
pub use post_processor::PostProcessorOperator;
pub use sql_execution::{SQL_EXECUTION_OUTPUT_KEY, SqlExecutionOperator};

use crate::error::{PipelineError, Result};
use crate::types::Params;

/// Param holding a component spec (detector, trigger, filler settings).
pub const COMPONENT_PARAM: &str = "component";

/// The `component` param as an object; absent means empty.
pub(crate) fn component_spec(node: &str, params: &Params) -> Result<Params> {
  match params.get(COMPONENT_PARAM) {
    None | Some(serde_json::Value::Null) => Ok(Params::new()),
    Some(serde_json::Value::Object(spec)) => Ok(spec.clone()),
    Some(other) => Err(PipelineError::InvalidParameter {
      node: node.to_string(),
      param: COMPONENT_PARAM.to_string(),
      reason: format!("expected an object, got {}", other),
    }),
  }
}
