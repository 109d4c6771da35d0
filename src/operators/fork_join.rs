//! Fork-join: runs a root node once per enumeration item, each time on an isolated copy of the
//! plan graph, then merges the branch outputs with a combiner node.
//!
//! Branches run on a pool of `forkJoin.parallelism` tasks. Results are collected in enumeration
//! order; each branch gets `forkJoin.branchTimeoutMs` from the moment the join starts waiting
//! on it. The first failure or timeout fails the whole fork-join and the pool is shut down on
//! every path.
//!
//! Steps of the enumerator and of every joined branch are handed back to the caller's executor,
//! tagged with this node's name and the branch index.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::combiner::COMBINER_INPUT_KEY;
use super::{Operator, OperatorBase};
use crate::error::{PipelineError, Result};
use crate::executor::PlanExecutor;
use crate::plan::{OperatorContext, PlanGraph};
use crate::pool::{BranchPool, BranchWait};
use crate::types::{EnumerationItem, ExecutionStep, InputMap, NodeResult, OutputMap, Params};

pub const FORK_JOIN_ENUMERATOR_PARAM: &str = "enumerator";
pub const FORK_JOIN_ROOT_PARAM: &str = "root";
pub const FORK_JOIN_COMBINER_PARAM: &str = "combiner";

/// Names of the three nodes a fork-join drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkJoinTargets {
  pub enumerator: String,
  pub root: String,
  pub combiner: String,
}

impl ForkJoinTargets {
  pub fn from_params(node: &str, params: &Params) -> Result<Self> {
    let target = |param: &str| -> Result<String> {
      match params.get(param).and_then(|v| v.as_str()).map(str::trim) {
        Some(name) if name == node => Err(PipelineError::InvalidParameter {
          node: node.to_string(),
          param: param.to_string(),
          reason: "a fork-join cannot drive itself".to_string(),
        }),
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(PipelineError::MissingParameter {
          node: node.to_string(),
          param: param.to_string(),
        }),
      }
    };
    Ok(Self {
      enumerator: target(FORK_JOIN_ENUMERATOR_PARAM)?,
      root: target(FORK_JOIN_ROOT_PARAM)?,
      combiner: target(FORK_JOIN_COMBINER_PARAM)?,
    })
  }
}

#[derive(Default)]
pub struct ForkJoinOperator {
  base: OperatorBase,
  targets: Option<ForkJoinTargets>,
  graph: Option<Arc<PlanGraph>>,
  pool: Option<BranchPool>,
  branch_timeout: Duration,
  steps: Vec<ExecutionStep>,
}

impl ForkJoinOperator {
  fn not_initialized(&self) -> PipelineError {
    PipelineError::NotInitialized {
      node: self.base.name().to_string(),
    }
  }
}

#[async_trait]
impl Operator for ForkJoinOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "ForkJoinOperator"
  }

  fn validate_params(node: &str, params: &Params) -> Result<()> {
    ForkJoinTargets::from_params(node, params).map(|_| ())
  }

  fn init(&mut self, context: OperatorContext) -> Result<()> {
    self.base.init(context)?;
    let node = self.base.context()?;
    let targets = ForkJoinTargets::from_params(node.name(), self.base.params())?;
    let graph = node.plan_graph()?;
    for name in [&targets.enumerator, &targets.root, &targets.combiner] {
      graph.require(name)?;
    }
    let config = &node.resources().config.fork_join;
    self.pool = Some(BranchPool::new(config.parallelism));
    self.branch_timeout = config.branch_timeout();
    self.targets = Some(targets);
    self.graph = Some(graph);
    Ok(())
  }

  async fn compute(&mut self) -> Result<()> {
    let name = self.base.name().to_string();
    let targets = self.targets.clone().ok_or_else(|| self.not_initialized())?;
    let graph = self.graph.clone().ok_or_else(|| self.not_initialized())?;
    let mut pool = self.pool.take().ok_or_else(|| self.not_initialized())?;

    let fanned = fan_out(
      &name,
      &targets,
      &graph,
      &mut pool,
      self.branch_timeout,
      &mut self.steps,
    )
    .await;
    pool.shutdown().await;
    let branches = fanned?;

    let mut inputs = InputMap::new();
    inputs.insert(
      COMBINER_INPUT_KEY.to_string(),
      Arc::new(NodeResult::ForkJoin(branches)),
    );
    let mut combiner = graph.require(&targets.combiner)?.build_operator(inputs)?;
    combiner.execute().await?;
    let combined = combiner.outputs()?.clone();
    info!(node = %name, outputs = combined.len(), "fork-join combined");
    for (key, value) in combined {
      self.base.set_output_shared(&key, value)?;
    }
    Ok(())
  }

  fn take_nested_steps(&mut self) -> Vec<ExecutionStep> {
    std::mem::take(&mut self.steps)
  }
}

async fn enumerate(
  name: &str,
  targets: &ForkJoinTargets,
  graph: &Arc<PlanGraph>,
  steps: &mut Vec<ExecutionStep>,
) -> Result<Vec<EnumerationItem>> {
  let mut executor = PlanExecutor::new(graph.clone());
  let executed = executor.execute_node(&targets.enumerator).await;
  let (_, enumerator_steps) = executor.into_parts();
  steps.extend(enumerator_steps.into_iter().map(|s| s.within(name, None)));
  executed?
    .values()
    .find_map(|r| r.as_enumeration())
    .map(<[EnumerationItem]>::to_vec)
    .ok_or_else(|| PipelineError::InvalidParameter {
      node: name.to_string(),
      param: FORK_JOIN_ENUMERATOR_PARAM.to_string(),
      reason: format!("'{}' produced no enumeration", targets.enumerator),
    })
}

async fn fan_out(
  name: &str,
  targets: &ForkJoinTargets,
  graph: &Arc<PlanGraph>,
  pool: &mut BranchPool,
  timeout: Duration,
  steps: &mut Vec<ExecutionStep>,
) -> Result<Vec<OutputMap>> {
  let items = enumerate(name, targets, graph, steps).await?;
  info!(
    node = %name,
    branches = items.len(),
    parallelism = pool.size(),
    "fork-join fanning out"
  );

  let mut handles = Vec::with_capacity(items.len());
  for item in items {
    let branch = graph.deep_clone(Some(item))?;
    let root = targets.root.clone();
    handles.push(pool.submit(async move {
      let mut executor = PlanExecutor::new(branch);
      let outcome = executor
        .execute_node(&root)
        .await
        .map(|outputs| outputs.as_ref().clone());
      (outcome, executor.into_parts().1)
    }));
  }

  let mut branches = Vec::with_capacity(handles.len());
  for (branch, mut handle) in handles.into_iter().enumerate() {
    match handle.wait(timeout).await {
      BranchWait::Done((outcome, branch_steps)) => {
        steps.extend(branch_steps.into_iter().map(|s| s.within(name, Some(branch))));
        match outcome {
          Ok(outputs) => {
            debug!(node = %name, branch, outputs = outputs.len(), "branch joined");
            branches.push(outputs);
          }
          Err(e) => {
            return Err(PipelineError::ForkJoinBranch {
              node: name.to_string(),
              branch,
              source: Box::new(e),
            });
          }
        }
      }
      BranchWait::Dropped => {
        return Err(PipelineError::ForkJoinBranch {
          node: name.to_string(),
          branch,
          source: "branch ended without a result".into(),
        });
      }
      BranchWait::TimedOut => {
        return Err(PipelineError::ForkJoinTimeout {
          node: name.to_string(),
          branch,
          timeout,
        });
      }
    }
  }
  Ok(branches)
}
