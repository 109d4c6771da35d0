//! Tests for `error`.

use super::error::PipelineError;
use std::time::Duration;

#[test]
fn in_node_wraps_plain_errors() {
  let err = PipelineError::MissingInput {
    node: "detector".to_string(),
    input: "current".to_string(),
  }
  .in_node("detector");
  match err {
    PipelineError::Execution { node, source } => {
      assert_eq!(node, "detector");
      assert!(source.to_string().contains("current"));
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn in_node_keeps_fork_join_errors() {
  let err = PipelineError::ForkJoinTimeout {
    node: "fork".to_string(),
    branch: 2,
    timeout: Duration::from_secs(10),
  }
  .in_node("outer");
  assert!(matches!(err, PipelineError::ForkJoinTimeout { ref node, branch: 2, .. } if node == "fork"));
}

#[test]
fn execution_accepts_string_sources() {
  let err = PipelineError::execution("fetch", "backend unavailable");
  assert_eq!(err.to_string(), "plan node 'fetch' failed: backend unavailable");
}

#[test]
fn construction_errors_are_classified() {
  assert!(
    PipelineError::UnknownNodeType {
      type_tag: "Nope".to_string()
    }
    .is_construction_error()
  );
  assert!(PipelineError::InvalidWindow { start: 2, end: 1 }.is_construction_error());
  assert!(!PipelineError::execution("n", "boom").is_construction_error());
  assert!(
    !PipelineError::AlreadyExecuted {
      node: "n".to_string()
    }
    .is_construction_error()
  );
}
