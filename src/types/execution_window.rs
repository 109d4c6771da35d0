//! Half-open detection interval in epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, Result};

/// `[start, end)` in epoch milliseconds. `start <= end` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawWindow")]
pub struct ExecutionWindow {
  start: i64,
  end: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWindow {
  start: i64,
  end: i64,
}

impl TryFrom<RawWindow> for ExecutionWindow {
  type Error = PipelineError;

  fn try_from(raw: RawWindow) -> Result<Self> {
    ExecutionWindow::new(raw.start, raw.end)
  }
}

impl ExecutionWindow {
  pub fn new(start: i64, end: i64) -> Result<Self> {
    if start > end {
      return Err(PipelineError::InvalidWindow { start, end });
    }
    Ok(Self { start, end })
  }

  pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
    Self::new(start.timestamp_millis(), end.timestamp_millis())
  }

  pub fn start(&self) -> i64 {
    self.start
  }

  pub fn end(&self) -> i64 {
    self.end
  }

  pub fn duration_millis(&self) -> i64 {
    self.end - self.start
  }

  pub fn contains(&self, millis: i64) -> bool {
    millis >= self.start && millis < self.end
  }

  pub fn start_datetime(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(self.start)
  }

  pub fn end_datetime(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(self.end)
  }
}

impl fmt::Display for ExecutionWindow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.start_datetime(), self.end_datetime()) {
      (Some(s), Some(e)) => write!(f, "[{}, {})", s.to_rfc3339(), e.to_rfc3339()),
      _ => write!(f, "[{}, {})", self.start, self.end),
    }
  }
}
