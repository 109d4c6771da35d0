//! Data fetcher: reads a table from the run's data source.
//!
//! Params: `table` (with optional `timeColumn`, default `timestamp`) or `query`.

use async_trait::async_trait;
use tracing::debug;

use super::{Operator, OperatorBase};
use crate::components::FetchRequest;
use crate::error::{PipelineError, Result};
use crate::types::{NodeResult, Params};

pub const DATA_FETCHER_OUTPUT_KEY: &str = "output_DataFetcher";

const TABLE_PARAM: &str = "table";
const QUERY_PARAM: &str = "query";
const TIME_COLUMN_PARAM: &str = "timeColumn";
const DEFAULT_TIME_COLUMN: &str = "timestamp";

fn fetch_request(node: &str, params: &Params) -> Result<FetchRequest> {
  let text = |key: &str| params.get(key).and_then(|v| v.as_str());
  match (text(TABLE_PARAM), text(QUERY_PARAM)) {
    (Some(name), _) => Ok(FetchRequest::Table {
      name: name.to_string(),
      time_column: text(TIME_COLUMN_PARAM).unwrap_or(DEFAULT_TIME_COLUMN).to_string(),
    }),
    (None, Some(query)) => Ok(FetchRequest::Query {
      query: query.to_string(),
    }),
    (None, None) => Err(PipelineError::MissingParameter {
      node: node.to_string(),
      param: format!("{} or {}", TABLE_PARAM, QUERY_PARAM),
    }),
  }
}

#[derive(Default)]
pub struct DataFetcherOperator {
  base: OperatorBase,
}

#[async_trait]
impl Operator for DataFetcherOperator {
  fn base(&self) -> &OperatorBase {
    &self.base
  }

  fn base_mut(&mut self) -> &mut OperatorBase {
    &mut self.base
  }

  fn operator_name(&self) -> &'static str {
    "DataFetcherOperator"
  }

  fn validate_params(node: &str, params: &Params) -> Result<()> {
    fetch_request(node, params).map(|_| ())
  }

  async fn compute(&mut self) -> Result<()> {
    let name = self.base.name().to_string();
    let request = fetch_request(&name, self.base.params())?;
    let source = self
      .base
      .resources()?
      .data_source
      .clone()
      .ok_or_else(|| PipelineError::MissingResource {
        node: name.clone(),
        resource: "data source",
      })?;
    let table = source
      .fetch(&request, &self.base.window())
      .await
      .map_err(|e| PipelineError::execution(&name, e))?;
    debug!(node = %name, source = source.name(), rows = table.num_rows(), "fetched");
    self
      .base
      .set_output(DATA_FETCHER_OUTPUT_KEY, NodeResult::Table(table))
  }
}
