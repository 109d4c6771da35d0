//! Error taxonomy for building and running detection pipelines.
//!
//! Construction-time errors (unknown type tag, bad descriptor, bad window, missing parameter) are
//! raised before any node executes. Execution-time errors carry the name of the failing node.
//! Fork-join failures name the fork-join node and the branch index. Misuse errors flag operators
//! driven outside their single-use lifecycle.

use std::time::Duration;

/// Boxed error returned by external collaborators (data sources, detectors, SQL engines).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the engine.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Everything that can go wrong while building or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
  #[error("unknown plan node type '{type_tag}'")]
  UnknownNodeType { type_tag: String },

  #[error("plan node type '{type_tag}' is already registered")]
  DuplicateNodeType { type_tag: String },

  #[error("failed to initialize plan node '{node}': {source}")]
  NodeInitialization {
    node: String,
    #[source]
    source: Box<PipelineError>,
  },

  #[error("failed to build operator for plan node '{node}': {source}")]
  OperatorConstruction {
    node: String,
    #[source]
    source: Box<PipelineError>,
  },

  #[error("invalid execution window: start {start} is after end {end}")]
  InvalidWindow { start: i64, end: i64 },

  #[error("plan node '{node}' is missing required parameter '{param}'")]
  MissingParameter { node: String, param: String },

  #[error("plan node '{node}' has invalid parameter '{param}': {reason}")]
  InvalidParameter {
    node: String,
    param: String,
    reason: String,
  },

  #[error("plan node '{node}' is missing input '{input}'")]
  MissingInput { node: String, input: String },

  #[error("duplicate plan node name '{name}'")]
  DuplicateNodeName { name: String },

  #[error("unknown plan node '{name}'")]
  UnknownNode { name: String },

  #[error("dependency cycle detected at plan node '{node}'")]
  CycleDetected { node: String },

  #[error("plan node '{node}' requires resource '{resource}' which is not configured")]
  MissingResource { node: String, resource: &'static str },

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("data table error: {0}")]
  DataTable(#[from] arrow::error::ArrowError),

  #[error("plan node '{node}' failed: {source}")]
  Execution {
    node: String,
    #[source]
    source: BoxError,
  },

  #[error("fork-join '{node}' branch {branch} failed: {source}")]
  ForkJoinBranch {
    node: String,
    branch: usize,
    #[source]
    source: BoxError,
  },

  #[error("fork-join '{node}' branch {branch} did not complete within {timeout:?}")]
  ForkJoinTimeout {
    node: String,
    branch: usize,
    timeout: Duration,
  },

  #[error("operator '{node}' was already executed")]
  AlreadyExecuted { node: String },

  #[error("operator '{node}' has not been executed")]
  NotExecuted { node: String },

  #[error("operator '{node}' has not been initialized")]
  NotInitialized { node: String },

  #[error("'{node}' is already initialized")]
  AlreadyInitialized { node: String },
}

impl PipelineError {
  /// Attaches the failing node's name unless the error already names a node at execution level.
  pub fn in_node(self, node: &str) -> PipelineError {
    match self {
      e @ (PipelineError::Execution { .. }
      | PipelineError::ForkJoinBranch { .. }
      | PipelineError::ForkJoinTimeout { .. }
      | PipelineError::AlreadyExecuted { .. }
      | PipelineError::NotExecuted { .. }
      | PipelineError::NotInitialized { .. }
      | PipelineError::AlreadyInitialized { .. }) => e,
      other => PipelineError::Execution {
        node: node.to_string(),
        source: Box::new(other),
      },
    }
  }

  /// Wraps an external collaborator failure as an execution error of `node`.
  pub fn execution(node: &str, source: impl Into<BoxError>) -> PipelineError {
    PipelineError::Execution {
      node: node.to_string(),
      source: source.into(),
    }
  }

  /// True for errors raised before any node executed.
  pub fn is_construction_error(&self) -> bool {
    matches!(
      self,
      PipelineError::UnknownNodeType { .. }
        | PipelineError::DuplicateNodeType { .. }
        | PipelineError::NodeInitialization { .. }
        | PipelineError::OperatorConstruction { .. }
        | PipelineError::InvalidWindow { .. }
        | PipelineError::MissingParameter { .. }
        | PipelineError::InvalidParameter { .. }
        | PipelineError::DuplicateNodeName { .. }
        | PipelineError::UnknownNode { .. }
        | PipelineError::CycleDetected { .. }
        | PipelineError::MissingResource { .. }
        | PipelineError::Config(_)
    )
  }
}
