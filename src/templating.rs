//! `${key}` placeholder resolution in node parameters.
//!
//! Fork-join branches bind each plan node to an enumeration item; placeholders in the node's
//! string parameters are resolved against that item's params when the node is initialized.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::types::Params;

static PLACEHOLDER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder pattern is valid"));

/// Resolves every placeholder in `params` against `values`.
///
/// A string that is exactly one placeholder takes the raw JSON value; placeholders embedded in
/// longer strings are interpolated as text. Unknown placeholders are left untouched.
pub fn resolve_params(params: &Params, values: &Params) -> Params {
  params
    .iter()
    .map(|(k, v)| (k.clone(), resolve_value(v, values)))
    .collect()
}

pub fn resolve_value(value: &Value, values: &Params) -> Value {
  match value {
    Value::String(s) => resolve_string(s, values),
    Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, values)).collect()),
    Value::Object(obj) => Value::Object(resolve_params(obj, values)),
    other => other.clone(),
  }
}

fn resolve_string(s: &str, values: &Params) -> Value {
  if let Some(caps) = PLACEHOLDER.captures(s) {
    let whole = caps.get(0).map(|m| m.as_str());
    if whole == Some(s) {
      if let Some(v) = values.get(&caps[1]) {
        return v.clone();
      }
    }
  }
  let replaced = PLACEHOLDER.replace_all(s, |caps: &Captures| match values.get(&caps[1]) {
    Some(v) => render(v),
    None => caps[0].to_string(),
  });
  Value::String(replaced.into_owned())
}

/// Text form of a JSON value: strings verbatim, everything else as compact JSON.
pub fn render(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// True if the string still contains a placeholder.
pub fn has_placeholder(s: &str) -> bool {
  PLACEHOLDER.is_match(s)
}
