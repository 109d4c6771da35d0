//! Tests for `post_processor`.

use serde_json::json;
use std::sync::Arc;

use super::test_support::{operator_context, params, pipeline, run};
use super::{Operator, PostProcessorOperator};
use crate::components::{AnomalyPostProcessor, ComponentRegistry};
use crate::error::{BoxError, PipelineError};
use crate::plan::SharedResources;
use crate::types::{
  AnomalyFinding, AnomalyLabel, DetectionResult, ExecutionWindow, InputMap, NodeResult, OutputMap,
  Params, PlanNodeDescriptor,
};

const LABELLER: &str = "Labeller";

/// Replaces the labels of every finding with one ignore label named by `labelName`.
struct Labeller {
  label_name: String,
}

impl AnomalyPostProcessor for Labeller {
  fn name(&self) -> &str {
    LABELLER
  }

  fn post_process(&self, _: &ExecutionWindow, results: OutputMap) -> Result<OutputMap, BoxError> {
    Ok(
      results
        .into_iter()
        .map(|(key, value)| {
          let labelled = value.map_anomalies(&mut |finding: &mut AnomalyFinding| {
            finding.labels = vec![
              AnomalyLabel::new(self.label_name.clone())
                .ignored(true)
                .with_metadata("testKey", "testValue"),
            ];
          });
          (key, Arc::new(labelled))
        })
        .collect(),
    )
  }
}

fn resources() -> SharedResources {
  let components = ComponentRegistry::with_builtins();
  components.register_post_processor(
    LABELLER,
    Arc::new(|spec: &Params| -> Result<Box<dyn AnomalyPostProcessor>, BoxError> {
      let label_name = spec
        .get("labelName")
        .and_then(|v| v.as_str())
        .ok_or("labelName is required")?;
      Ok(Box::new(Labeller {
        label_name: label_name.to_string(),
      }))
    }),
  );
  SharedResources::default().with_components(Arc::new(components))
}

fn descriptor() -> PlanNodeDescriptor {
  PlanNodeDescriptor::new("labels", "PostProcessor")
    .with_param("type", LABELLER)
    .with_param("component", json!({"labelName": "testLabel"}))
}

fn detection(count: usize) -> Arc<NodeResult> {
  Arc::new(NodeResult::Detection(DetectionResult {
    anomalies: (0..count as i64).map(|i| AnomalyFinding::new(i, i + 1)).collect(),
    timeseries: None,
  }))
}

fn assert_labelled(result: &NodeResult) {
  for finding in result.anomalies().unwrap().iter() {
    assert_eq!(finding.labels.len(), 1);
    let label = &finding.labels[0];
    assert_eq!(label.name, "testLabel");
    assert_eq!(label.source_node_name.as_deref(), Some("labels"));
    assert_eq!(label.source_post_processor.as_deref(), Some(LABELLER));
    assert_eq!(label.metadata.len(), 1);
    assert_eq!(label.metadata["testKey"], json!("testValue"));
    assert!(label.ignore);
  }
}

#[tokio::test]
async fn labels_every_detection_input_under_its_own_name() {
  let mut inputs = InputMap::new();
  inputs.insert("detectionResult0".to_string(), detection(0));
  inputs.insert("detectionResult1".to_string(), detection(1));
  inputs.insert("detectionResult2".to_string(), detection(2));
  let op: PostProcessorOperator = run(descriptor(), pipeline(resources()), inputs)
    .await
    .unwrap();
  let outputs = op.outputs().unwrap();
  assert_eq!(outputs.len(), 3);
  for (name, count) in [("detectionResult0", 0), ("detectionResult1", 1), ("detectionResult2", 2)] {
    let result = &outputs[name];
    assert_eq!(result.anomalies().unwrap().len(), count);
    assert_labelled(result);
  }
}

#[tokio::test]
async fn labels_findings_inside_a_merged_combiner_map() {
  let mut merged = OutputMap::new();
  merged.insert("0.output_AnomalyDetectorResult".to_string(), detection(1));
  merged.insert("1.output_AnomalyDetectorResult".to_string(), detection(2));
  let mut inputs = InputMap::new();
  inputs.insert("combinerResult1".to_string(), Arc::new(NodeResult::Combined(merged)));
  let op: PostProcessorOperator = run(descriptor(), pipeline(resources()), inputs)
    .await
    .unwrap();
  let outputs = op.outputs().unwrap();
  assert_eq!(outputs.len(), 1);
  let result = &outputs["combinerResult1"];
  assert_eq!(result.kind(), "combined");
  assert_eq!(result.anomalies().unwrap().len(), 3);
  assert_labelled(result);
}

#[tokio::test]
async fn labels_already_stamped_keep_their_source() {
  let mut finding = AnomalyFinding::new(0, 1);
  let mut earlier = AnomalyLabel::new("earlier");
  earlier.source_node_name = Some("first".to_string());
  finding.labels.push(earlier);
  let mut inputs = InputMap::new();
  inputs.insert(
    "current".to_string(),
    Arc::new(NodeResult::Detection(DetectionResult {
      anomalies: vec![AnomalyFinding {
        avg_current_val: Some(99.0),
        ..finding
      }],
      timeseries: None,
    })),
  );
  let descriptor = PlanNodeDescriptor::new("second", "PostProcessor")
    .with_param("type", "threshold")
    .with_param("component", json!({"max": 10}));
  let op: PostProcessorOperator = run(descriptor, pipeline(SharedResources::default()), inputs)
    .await
    .unwrap();
  let anomalies = op.outputs().unwrap()["current"].anomalies().unwrap().into_owned();
  let sources: Vec<Option<&str>> = anomalies[0]
    .labels
    .iter()
    .map(|l| l.source_node_name.as_deref())
    .collect();
  assert_eq!(sources, vec![Some("first"), Some("second")]);
  assert_eq!(anomalies[0].labels[1].source_post_processor.as_deref(), Some("THRESHOLD"));
  assert!(anomalies[0].is_ignored());
}

#[test]
fn unknown_post_processor_fails_init() {
  let descriptor = PlanNodeDescriptor::new("labels", "PostProcessor").with_param("type", "COLD_START");
  let mut op = PostProcessorOperator::default();
  let err = op
    .init(operator_context(descriptor, pipeline(SharedResources::default()), InputMap::new()))
    .unwrap_err();
  assert!(matches!(err, PipelineError::InvalidParameter { ref param, .. } if param == "type"));
}

#[test]
fn type_is_required() {
  assert!(PostProcessorOperator::validate_params("labels", &params(json!({}))).is_err());
  assert!(
    PostProcessorOperator::validate_params("labels", &params(json!({"type": "THRESHOLD"}))).is_ok()
  );
  assert!(
    PostProcessorOperator::validate_params("labels", &params(json!({"type": "THRESHOLD", "component": 3})))
      .is_err()
  );
}
