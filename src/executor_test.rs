//! Tests for `executor`.

use serde_json::json;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::executor::PlanExecutor;
use crate::plan::{PipelineContext, PlanGraph, SharedResources};
use crate::registry::NodeRegistry;
use crate::types::{ExecutionWindow, PlanNodeDescriptor};

fn graph(nodes: Vec<PlanNodeDescriptor>) -> Arc<PlanGraph> {
  let pipeline = PipelineContext::new(ExecutionWindow::new(0, 1_000).unwrap(), SharedResources::default());
  PlanGraph::build(nodes, pipeline, &NodeRegistry::default()).unwrap()
}

fn greeting_chain() -> Vec<PlanNodeDescriptor> {
  vec![
    PlanNodeDescriptor::new("a", "Echo")
      .with_param("text", "hello")
      .with_output("output_Echo", "greeting"),
    PlanNodeDescriptor::new("b", "Echo").with_input("a", "greeting", "input_Echo"),
    PlanNodeDescriptor::new("c", "Echo").with_input("b", "output_Echo", "input_Echo"),
  ]
}

#[tokio::test]
async fn upstream_nodes_run_first_and_feed_inputs() {
  let mut executor = PlanExecutor::new(graph(greeting_chain()));
  let outputs = executor.execute_node("c").await.unwrap();
  assert_eq!(outputs["output_Echo"].as_echo(), Some("hello"));

  let order: Vec<&str> = executor.steps().iter().map(|s| s.node.as_str()).collect();
  assert_eq!(order, vec!["a", "b", "c"]);
  assert_eq!(executor.results()["a"].keys().collect::<Vec<_>>(), vec!["greeting"]);
}

#[tokio::test]
async fn outputs_are_memoized_per_executor() {
  let mut executor = PlanExecutor::new(graph(greeting_chain()));
  let first = executor.execute_node("b").await.unwrap();
  let again = executor.execute_node("b").await.unwrap();
  assert!(Arc::ptr_eq(&first, &again));
  executor.execute_node("c").await.unwrap();
  assert_eq!(executor.steps().len(), 3);
}

#[tokio::test]
async fn shared_upstream_runs_once() {
  let nodes = vec![
    PlanNodeDescriptor::new("src", "Echo").with_param("text", "x"),
    PlanNodeDescriptor::new("left", "Echo").with_input("src", "output_Echo", "input_Echo"),
    PlanNodeDescriptor::new("right", "Echo").with_input("src", "output_Echo", "input_Echo"),
  ];
  let mut executor = PlanExecutor::new(graph(nodes));
  executor.execute_all().await.unwrap();
  let runs_of_src = executor.steps().iter().filter(|s| s.node == "src").count();
  assert_eq!(runs_of_src, 1);
  assert_eq!(executor.results().len(), 3);
}

#[tokio::test]
async fn cycles_are_detected() {
  let nodes = vec![
    PlanNodeDescriptor::new("a", "Echo").with_input("b", "output_Echo", "input_Echo"),
    PlanNodeDescriptor::new("b", "Echo").with_input("a", "output_Echo", "input_Echo"),
  ];
  let err = PlanExecutor::new(graph(nodes))
    .execute_node("a")
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::CycleDetected { ref node } if node == "a"));
}

#[tokio::test]
async fn missing_upstream_key_names_source_and_key() {
  let nodes = vec![
    PlanNodeDescriptor::new("a", "Echo").with_param("text", "hi"),
    PlanNodeDescriptor::new("b", "Echo").with_input("a", "nope", "input_Echo"),
  ];
  let err = PlanExecutor::new(graph(nodes))
    .execute_node("b")
    .await
    .unwrap_err();
  match err {
    PipelineError::MissingInput { node, input } => {
      assert_eq!(node, "b");
      assert_eq!(input, "a.nope");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn unknown_node_is_an_error() {
  let err = PlanExecutor::new(graph(greeting_chain()))
    .execute_node("zzz")
    .await
    .unwrap_err();
  assert!(matches!(err, PipelineError::UnknownNode { .. }));
}

#[tokio::test]
async fn failed_node_is_recorded_as_a_step() {
  let nodes = vec![PlanNodeDescriptor::new("fetch", "DataFetcher").with_param("table", "t")];
  let mut executor = PlanExecutor::new(graph(nodes));
  assert!(executor.execute_node("fetch").await.is_err());
  let step = &executor.steps()[0];
  assert_eq!(step.node, "fetch");
  assert_eq!(step.node_type, "DataFetcher");
  assert!(step.error.as_deref().unwrap_or_default().contains("data source"));
  assert!(executor.results().is_empty());
}

#[tokio::test]
async fn execute_all_leaves_fork_join_sub_nodes_to_the_fork_join() {
  let nodes = vec![
    PlanNodeDescriptor::new("enum", "Enumerator").with_param("items", json!([{"x": "a"}, {"x": "b"}])),
    PlanNodeDescriptor::new("root", "Echo").with_param("text", "${x}"),
    PlanNodeDescriptor::new("combiner", "Combiner"),
    PlanNodeDescriptor::new("fork", "ForkJoin")
      .with_param("enumerator", "enum")
      .with_param("root", "root")
      .with_param("combiner", "combiner"),
  ];
  let mut executor = PlanExecutor::new(graph(nodes));
  executor.execute_all().await.unwrap();
  let executed: Vec<&str> = executor
    .steps()
    .iter()
    .filter(|s| s.fork_join.is_none())
    .map(|s| s.node.as_str())
    .collect();
  assert_eq!(executed, vec!["fork"]);
  let nested: Vec<(&str, Option<&str>, Option<usize>)> = executor
    .steps()
    .iter()
    .map(|s| (s.node.as_str(), s.fork_join.as_deref(), s.branch))
    .collect();
  assert_eq!(
    nested,
    vec![
      ("enum", Some("fork"), None),
      ("root", Some("fork"), Some(0)),
      ("root", Some("fork"), Some(1)),
      ("fork", None, None),
    ]
  );
  let numbers: Vec<u32> = executor.steps().iter().map(|s| s.step).collect();
  assert_eq!(numbers, vec![1, 2, 3, 4]);
  let fork = &executor.results()["fork"];
  assert_eq!(fork["0.output_Echo"].as_echo(), Some("a"));
  assert_eq!(fork["1.output_Echo"].as_echo(), Some("b"));
}
