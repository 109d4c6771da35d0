//! SQL engines used by SQL-execution nodes.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::BoxError;
use crate::types::DataTable;

/// Runs a SQL statement over the node's table inputs, each registered under its input name.
#[async_trait]
pub trait SqlEngine: Send + Sync {
  async fn execute(
    &self,
    sql: &str,
    tables: &BTreeMap<String, DataTable>,
  ) -> Result<DataTable, BoxError>;
}
