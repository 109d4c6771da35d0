//! One parameter set produced by an enumerator; each becomes a fork-join branch.

use serde::{Deserialize, Serialize};

use super::Params;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumerationItem {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub params: Params,
}

impl EnumerationItem {
  pub fn new(name: Option<String>, params: Params) -> Self {
    Self { name, params }
  }

  /// Accepts `{name?, params: {...}}` or a bare parameter object.
  pub fn from_value(value: &serde_json::Value) -> Option<Self> {
    let obj = value.as_object()?;
    match obj.get("params").and_then(|p| p.as_object()) {
      Some(params) => Some(Self {
        name: obj.get("name").and_then(|n| n.as_str()).map(String::from),
        params: params.clone(),
      }),
      None => Some(Self {
        name: None,
        params: obj.clone(),
      }),
    }
  }

  /// Display label: the name when set, otherwise the compact JSON of the params.
  pub fn label(&self) -> String {
    self
      .name
      .clone()
      .unwrap_or_else(|| serde_json::Value::Object(self.params.clone()).to_string())
  }
}
