//! # detection-pipeline
//!
//! Execution engine for anomaly-detection pipelines described as graphs of plan nodes.
//!
//! ## Architecture
//!
//! - A pipeline is a list of [PlanNodeDescriptor]s: a name, a type tag, params and the wiring
//!   of upstream outputs into inputs.
//! - The [NodeRegistry] turns each descriptor into a [plan::PlanNode]; together they form a
//!   [PlanGraph].
//! - Executing a node pulls its upstream nodes first ([PlanExecutor]), then builds a one-shot
//!   [operators::Operator] and runs it.
//! - A fork-join node runs a sub-plan once per enumeration item on an isolated copy of the graph
//!   and merges the branches with a combiner.
//!
//! Leaf operators talk to the outside world through the traits in [components]: data sources,
//! SQL engines, detectors, event triggers and post-processors.

pub mod components;
pub mod config;
pub mod error;
#[cfg(test)]
mod error_test;
pub mod execution_log_io;
pub mod executor;
#[cfg(test)]
mod executor_test;
pub mod operators;
pub mod plan;
pub mod pool;
#[cfg(test)]
mod pool_test;
pub mod registry;
pub mod runner;
pub mod templating;
pub mod time_utils;
pub mod types;

pub use config::EngineConfig;
pub use error::{BoxError, PipelineError, Result};
pub use executor::PlanExecutor;
pub use plan::{PipelineContext, PlanGraph, SharedResources};
pub use registry::{NodePlugin, NodeRegistry, PlanNodeFactory};
pub use runner::{PipelineOutputs, PipelineRequest, PipelineRun, run_pipeline};
pub use types::{ExecutionWindow, NodeResult, OutputMap, PlanNodeDescriptor};
