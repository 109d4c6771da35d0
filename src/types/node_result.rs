//! Values exchanged between plan nodes.
//!
//! A result is produced once by an operator and then only read. It is shared as
//! `Arc<NodeResult>` between the producing operator and every consumer.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{AnomalyFinding, DataTable, DetectionResult, EnumerationItem};
use crate::error::Result;

/// Outputs (or inputs) of one node, keyed by output name.
pub type OutputMap = BTreeMap<String, Arc<NodeResult>>;

/// Inputs of one node, keyed by the target property declared in its descriptor.
pub type InputMap = BTreeMap<String, Arc<NodeResult>>;

#[derive(Debug, Clone)]
pub enum NodeResult {
  /// Tabular data, e.g. from a data fetcher or an index filler.
  Table(DataTable),
  /// Findings of a detector.
  Detection(DetectionResult),
  /// Scalar echoed by an echo node.
  Echo(String),
  /// Parameter sets of an enumerator, one per fork-join branch.
  Enumeration(Vec<EnumerationItem>),
  /// Per-branch output maps of a fork-join, in enumeration order.
  ForkJoin(Vec<OutputMap>),
  /// A combiner's merged map, published as one value.
  Combined(OutputMap),
}

impl NodeResult {
  /// Detection findings carried by this result, if it carries any. A merged map carries the
  /// findings of its entries, in key order.
  pub fn anomalies(&self) -> Option<Cow<'_, [AnomalyFinding]>> {
    match self {
      NodeResult::Detection(d) => Some(Cow::Borrowed(&d.anomalies)),
      NodeResult::Combined(entries) => Some(Cow::Owned(collect_anomalies(entries))),
      _ => None,
    }
  }

  /// A copy with `f` applied to every finding, including those inside a merged map.
  pub fn map_anomalies(&self, f: &mut dyn FnMut(&mut AnomalyFinding)) -> NodeResult {
    match self {
      NodeResult::Detection(d) => {
        let mut d = d.clone();
        d.anomalies.iter_mut().for_each(|a| f(a));
        NodeResult::Detection(d)
      }
      NodeResult::Combined(entries) => NodeResult::Combined(
        entries
          .iter()
          .map(|(key, value)| (key.clone(), Arc::new(value.map_anomalies(f))))
          .collect(),
      ),
      other => other.clone(),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      NodeResult::Table(_) => "table",
      NodeResult::Detection(_) => "detection",
      NodeResult::Echo(_) => "echo",
      NodeResult::Enumeration(_) => "enumeration",
      NodeResult::ForkJoin(_) => "fork_join",
      NodeResult::Combined(_) => "combined",
    }
  }

  pub fn as_table(&self) -> Option<&DataTable> {
    match self {
      NodeResult::Table(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_echo(&self) -> Option<&str> {
    match self {
      NodeResult::Echo(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_enumeration(&self) -> Option<&[EnumerationItem]> {
    match self {
      NodeResult::Enumeration(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_fork_join(&self) -> Option<&[OutputMap]> {
    match self {
      NodeResult::ForkJoin(branches) => Some(branches),
      _ => None,
    }
  }

  pub fn as_combined(&self) -> Option<&OutputMap> {
    match self {
      NodeResult::Combined(entries) => Some(entries),
      _ => None,
    }
  }

  /// JSON rendering for the CLI and logs.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    use serde_json::json;
    Ok(match self {
      NodeResult::Table(t) => json!({ "table": t.to_json()? }),
      NodeResult::Detection(d) => json!({
        "anomalies": d.anomalies,
        "timeseries": match &d.timeseries {
          Some(t) => t.to_json()?,
          None => serde_json::Value::Null,
        },
      }),
      NodeResult::Echo(s) => json!({ "echo": s }),
      NodeResult::Enumeration(items) => json!({ "enumeration": items }),
      NodeResult::ForkJoin(branches) => {
        let rendered = branches
          .iter()
          .map(output_map_to_json)
          .collect::<Result<Vec<_>>>()?;
        json!({ "branches": rendered })
      }
      NodeResult::Combined(entries) => json!({ "combined": output_map_to_json(entries)? }),
    })
  }
}

/// Renders an output map as a JSON object.
pub fn output_map_to_json(outputs: &OutputMap) -> Result<serde_json::Value> {
  let mut obj = serde_json::Map::new();
  for (key, value) in outputs {
    obj.insert(key.clone(), value.to_json()?);
  }
  Ok(serde_json::Value::Object(obj))
}

/// Collects every detection finding in an output map, in key order.
pub fn collect_anomalies(outputs: &OutputMap) -> Vec<AnomalyFinding> {
  outputs
    .values()
    .filter_map(|r| r.anomalies())
    .flat_map(|a| a.into_owned())
    .collect()
}
