//! Built-in plan node types.

use std::marker::PhantomData;

use super::{PlanNode, PlanNodeBase, PlanNodeContext};
use crate::error::Result;
use crate::operators::{
  AnomalyDetectorOperator, CombinerOperator, DataFetcherOperator, EchoOperator, EnumeratorOperator,
  EventTriggerOperator, ForkJoinOperator, ForkJoinTargets, IndexFillerOperator, Operator,
  PostProcessorOperator, SqlExecutionOperator,
};
use crate::types::InputMap;

/// Plan node for any operator that needs nothing beyond its params: validates the params at
/// init and builds a default `O` per execution.
pub struct OperatorPlanNode<O> {
  base: PlanNodeBase,
  _operator: PhantomData<fn() -> O>,
}

impl<O> Default for OperatorPlanNode<O> {
  fn default() -> Self {
    Self {
      base: PlanNodeBase::default(),
      _operator: PhantomData,
    }
  }
}

impl<O> Clone for OperatorPlanNode<O> {
  fn clone(&self) -> Self {
    Self {
      base: self.base.clone(),
      _operator: PhantomData,
    }
  }
}

impl<O: Operator + Default + 'static> PlanNode for OperatorPlanNode<O> {
  fn init(&mut self, context: PlanNodeContext) -> Result<()> {
    self.base.init(context)?;
    O::validate_params(self.base.name(), self.base.params())
  }

  fn base(&self) -> &PlanNodeBase {
    &self.base
  }

  fn build_operator(&self, inputs: InputMap) -> Result<Box<dyn Operator>> {
    self.base.build(O::default(), inputs)
  }
}

pub type EchoPlanNode = OperatorPlanNode<EchoOperator>;
pub type EnumeratorPlanNode = OperatorPlanNode<EnumeratorOperator>;
pub type CombinerPlanNode = OperatorPlanNode<CombinerOperator>;
pub type DataFetcherPlanNode = OperatorPlanNode<DataFetcherOperator>;
pub type AnomalyDetectorPlanNode = OperatorPlanNode<AnomalyDetectorOperator>;
pub type SqlExecutionPlanNode = OperatorPlanNode<SqlExecutionOperator>;
pub type IndexFillerPlanNode = OperatorPlanNode<IndexFillerOperator>;
pub type EventTriggerPlanNode = OperatorPlanNode<EventTriggerOperator>;
pub type PostProcessorPlanNode = OperatorPlanNode<PostProcessorOperator>;

/// Fans a root node out over the items of an enumerator and merges the branches with a
/// combiner. The three nodes are named by the `enumerator`, `root` and `combiner` params.
#[derive(Clone, Default)]
pub struct ForkJoinPlanNode {
  base: PlanNodeBase,
  targets: Option<ForkJoinTargets>,
}

impl ForkJoinPlanNode {
  pub fn targets(&self) -> Option<&ForkJoinTargets> {
    self.targets.as_ref()
  }
}

impl PlanNode for ForkJoinPlanNode {
  fn init(&mut self, context: PlanNodeContext) -> Result<()> {
    self.base.init(context)?;
    self.targets = Some(ForkJoinTargets::from_params(self.base.name(), self.base.params())?);
    Ok(())
  }

  fn base(&self) -> &PlanNodeBase {
    &self.base
  }

  fn build_operator(&self, inputs: InputMap) -> Result<Box<dyn Operator>> {
    self.base.build(ForkJoinOperator::default(), inputs)
  }

  fn sub_plan_nodes(&self) -> Vec<String> {
    self
      .targets
      .as_ref()
      .map(|t| vec![t.enumerator.clone(), t.root.clone(), t.combiner.clone()])
      .unwrap_or_default()
  }
}
