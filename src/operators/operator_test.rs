//! Tests for `operator`.

use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::Arc;

use super::test_support::{operator_context, pipeline};
use super::{Operator, OperatorBase, OperatorState};
use crate::error::{PipelineError, Result};
use crate::plan::SharedResources;
use crate::types::{InputMap, NodeResult, PlanNodeDescriptor};

/// Publishes one echo per configured key; fails when `fail` is set.
#[derive(Default)]
struct Publisher {
  base: OperatorBase,
  keys: Vec<String>,
  fail: bool,
}

#[async_trait]
impl Operator for Publisher {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "Publisher"
  }

  async fn compute(&mut self) -> Result<()> {
    for key in self.keys.clone() {
      self.base.set_output(&key, NodeResult::Echo(key.clone()))?;
    }
    if self.fail {
      return Err(PipelineError::MissingInput {
        node: self.base.name().to_string(),
        input: "anything".to_string(),
      });
    }
    Ok(())
  }
}

fn publisher(descriptor: PlanNodeDescriptor, keys: &[&str], fail: bool) -> Publisher {
  let mut op = Publisher {
    keys: keys.iter().map(|k| k.to_string()).collect(),
    fail,
    ..Publisher::default()
  };
  op.init(operator_context(
    descriptor,
    pipeline(SharedResources::default()),
    InputMap::new(),
  ))
  .unwrap();
  op
}

#[tokio::test]
async fn outputs_are_published_after_success() {
  let mut op = publisher(PlanNodeDescriptor::new("p", "Publisher"), &["a", "b"], false);
  assert_eq!(op.base().state(), OperatorState::Initialized);
  assert!(matches!(op.outputs(), Err(PipelineError::NotExecuted { .. })));
  op.execute().await.unwrap();
  assert_eq!(op.base().state(), OperatorState::Executed);
  let outputs = op.outputs().unwrap();
  assert_eq!(outputs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[tokio::test]
async fn second_execute_is_rejected_and_outputs_unchanged() {
  let mut op = publisher(PlanNodeDescriptor::new("p", "Publisher"), &["a"], false);
  op.execute().await.unwrap();
  let err = op.execute().await.unwrap_err();
  assert!(matches!(err, PipelineError::AlreadyExecuted { ref node } if node == "p"));
  assert_eq!(op.outputs().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_execution_publishes_nothing() {
  let mut op = publisher(PlanNodeDescriptor::new("p", "Publisher"), &["a"], true);
  let err = op.execute().await.unwrap_err();
  assert!(matches!(err, PipelineError::Execution { ref node, .. } if node == "p"));
  assert_eq!(op.base().state(), OperatorState::Failed);
  assert!(op.outputs().is_err());
}

#[tokio::test]
async fn execute_before_init_is_rejected() {
  let mut op = Publisher::default();
  let err = op.execute().await.unwrap_err();
  assert!(matches!(err, PipelineError::NotInitialized { .. }));
}

#[test]
fn init_twice_is_rejected() {
  let mut op = publisher(PlanNodeDescriptor::new("p", "Publisher"), &[], false);
  let err = op
    .init(operator_context(
      PlanNodeDescriptor::new("p", "Publisher"),
      pipeline(SharedResources::default()),
      InputMap::new(),
    ))
    .unwrap_err();
  assert!(matches!(err, PipelineError::AlreadyInitialized { .. }));
}

#[test]
fn set_output_outside_execution_is_rejected() {
  let mut op = publisher(PlanNodeDescriptor::new("p", "Publisher"), &[], false);
  let err = op
    .base_mut()
    .set_output("x", NodeResult::Echo("x".to_string()))
    .unwrap_err();
  assert!(matches!(err, PipelineError::NotExecuted { .. }));
}

#[tokio::test]
async fn inputs_are_exposed_by_target_property() {
  let mut inputs = InputMap::new();
  inputs.insert("left".to_string(), Arc::new(NodeResult::Echo("l".to_string())));
  let mut op = Publisher::default();
  op.init(operator_context(
    PlanNodeDescriptor::new("p", "Publisher"),
    pipeline(SharedResources::default()),
    inputs,
  ))
  .unwrap();
  assert_eq!(op.base().input("left").and_then(|r| r.as_echo()), Some("l"));
  assert!(matches!(
    op.base().require_input("right"),
    Err(PipelineError::MissingInput { .. })
  ));
}

proptest! {
  #[test]
  fn outputs_follow_the_alias_table(
    keys in proptest::collection::btree_set("[a-z]{1,6}", 1..6),
    renamed in proptest::collection::vec(any::<bool>(), 6),
  ) {
    let keys: Vec<String> = keys.into_iter().collect();
    let mut descriptor = PlanNodeDescriptor::new("p", "Publisher");
    for (key, rename) in keys.iter().zip(&renamed) {
      if *rename {
        descriptor = descriptor.with_output(key.clone(), format!("{}_alias", key));
      }
    }
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let mut op = publisher(descriptor, &key_refs, false);
    tokio_test::block_on(op.execute()).unwrap();
    let outputs = op.outputs().unwrap();
    prop_assert_eq!(outputs.len(), keys.len());
    for (key, rename) in keys.iter().zip(&renamed) {
      let published = if *rename { format!("{}_alias", key) } else { key.clone() };
      let value = outputs.get(&published).and_then(|r| r.as_echo().map(String::from));
      prop_assert_eq!(value, Some(key.clone()));
    }
  }
}
