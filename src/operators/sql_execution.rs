//! SQL execution: runs the `sql` param over the node's table inputs with the run's SQL engine.

use async_trait::async_trait;

use super::{Operator, OperatorBase};
use crate::error::{PipelineError, Result};
use crate::types::{NodeResult, Params};

pub const SQL_EXECUTION_OUTPUT_KEY: &str = "output_SqlExecution";

const SQL_PARAM: &str = "sql";

#[derive(Default)]
pub struct SqlExecutionOperator {
  base: OperatorBase,
}

#[async_trait]
impl Operator for SqlExecutionOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "SqlExecutionOperator"
  }

  fn validate_params(node: &str, params: &Params) -> Result<()> {
    match params.get(SQL_PARAM).and_then(|v| v.as_str()) {
      Some(sql) if !sql.trim().is_empty() => Ok(()),
      _ => Err(PipelineError::MissingParameter {
        node: node.to_string(),
        param: SQL_PARAM.to_string(),
      }),
    }
  }

  async fn compute(&mut self) -> Result<()> {
    let name = self.base.name().to_string();
    let sql = self.base.require_param_str(SQL_PARAM)?.to_string();
    let engine = self
      .base
      .resources()?
      .sql_engine
      .clone()
      .ok_or_else(|| PipelineError::MissingResource {
        node: name.clone(),
        resource: "sql engine",
      })?;
    let tables = self.base.table_inputs();
    let table = engine
      .execute(&sql, &tables)
      .await
      .map_err(|e| PipelineError::execution(&name, e))?;
    self
      .base
      .set_output(SQL_EXECUTION_OUTPUT_KEY, NodeResult::Table(table))
  }
}
