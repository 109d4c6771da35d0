//! Tests for `index_filler`.

use serde_json::json;
use std::sync::Arc;

use super::test_support::{params, pipeline, run, series};
use super::{IndexFillerOperator, Operator};
use crate::error::PipelineError;
use crate::plan::SharedResources;
use crate::types::{InputMap, NodeResult, PlanNodeDescriptor};

#[tokio::test]
async fn each_input_is_filled_under_its_own_name() {
  let mut inputs = InputMap::new();
  inputs.insert(
    "current".to_string(),
    Arc::new(NodeResult::Table(series(&[(0, 1.0), (3000, 4.0)]))),
  );
  let descriptor = PlanNodeDescriptor::new("filler", "IndexFiller").with_param(
    "component",
    json!({"monitoringGranularity": "PT1S", "maxTimeInference": "FROM_DATA"}),
  );
  let op: IndexFillerOperator = run(descriptor, pipeline(SharedResources::default()), inputs)
    .await
    .unwrap();
  let table = op
    .output("current")
    .unwrap()
    .and_then(|r| r.as_table().cloned())
    .unwrap();
  assert_eq!(
    table.longs("timestamp").unwrap(),
    vec![Some(0), Some(1000), Some(2000), Some(3000)]
  );
  assert_eq!(
    table.doubles("value").unwrap(),
    vec![Some(1.0), Some(0.0), Some(0.0), Some(4.0)]
  );
}

#[tokio::test]
async fn non_table_input_is_rejected() {
  let mut inputs = InputMap::new();
  inputs.insert("current".to_string(), Arc::new(NodeResult::Echo("x".to_string())));
  let descriptor = PlanNodeDescriptor::new("filler", "IndexFiller")
    .with_param("monitoringGranularity", "PT1S");
  let err = run::<IndexFillerOperator>(descriptor, pipeline(SharedResources::default()), inputs)
    .await
    .err()
    .unwrap();
  assert!(matches!(err, PipelineError::Execution { ref node, .. } if node == "filler"));
}

#[test]
fn invalid_spec_is_rejected_up_front() {
  let bad = params(json!({"component": {"fillNullMethod": "INTERPOLATE"}}));
  assert!(matches!(
    IndexFillerOperator::validate_params("filler", &bad),
    Err(PipelineError::InvalidParameter { .. })
  ));
  let not_object = params(json!({"component": "PT1H"}));
  assert!(IndexFillerOperator::validate_params("filler", &not_object).is_err());
}
