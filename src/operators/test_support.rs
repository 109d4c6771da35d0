//! Helpers for driving operators outside a plan graph in tests.

use serde_json::Value;

use super::Operator;
use crate::error::Result;
use crate::plan::{OperatorContext, PipelineContext, PlanNodeContext, SharedResources};
use crate::types::{ColumnData, DataTable, ExecutionWindow, InputMap, Params, PlanNodeDescriptor};

pub(crate) fn pipeline(resources: SharedResources) -> PipelineContext {
  PipelineContext::new(ExecutionWindow::new(0, 10_000).unwrap(), resources)
}

pub(crate) fn params(value: Value) -> Params {
  value.as_object().cloned().expect("params must be an object")
}

pub(crate) fn operator_context(
  descriptor: PlanNodeDescriptor,
  pipeline: PipelineContext,
  inputs: InputMap,
) -> OperatorContext {
  let params = descriptor.params.clone();
  OperatorContext {
    node: PlanNodeContext::detached(descriptor, pipeline),
    params,
    inputs,
  }
}

/// Initializes and executes a fresh `O` for `descriptor`.
pub(crate) async fn run<O: Operator + Default>(
  descriptor: PlanNodeDescriptor,
  pipeline: PipelineContext,
  inputs: InputMap,
) -> Result<O> {
  let mut operator = O::default();
  operator.init(operator_context(descriptor, pipeline, inputs))?;
  operator.execute().await?;
  Ok(operator)
}

/// `timestamp` / `value` table.
pub(crate) fn series(points: &[(i64, f64)]) -> DataTable {
  DataTable::from_columns(vec![
    (
      "timestamp".to_string(),
      ColumnData::Int64(points.iter().map(|(t, _)| Some(*t)).collect()),
    ),
    (
      "value".to_string(),
      ColumnData::Float64(points.iter().map(|(_, v)| Some(*v)).collect()),
    ),
  ])
  .unwrap()
}
