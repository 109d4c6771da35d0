//! Event triggers: side-effecting sinks fed by event-trigger nodes.

use tracing::info;

use crate::error::BoxError;
use crate::types::{DataTable, ExecutionWindow};

/// Receives every table input of an event-trigger node, then is closed once.
pub trait EventTrigger: Send + Sync {
  fn trigger(
    &mut self,
    window: &ExecutionWindow,
    input: &str,
    table: &DataTable,
  ) -> Result<(), BoxError>;

  fn close(&mut self) -> Result<(), BoxError> {
    Ok(())
  }
}

/// Logs a summary line per table. Registered as `LOG`.
#[derive(Debug, Clone, Default)]
pub struct LoggingTrigger {
  label: String,
  events: usize,
}

impl LoggingTrigger {
  pub fn new(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      events: 0,
    }
  }

  pub fn events(&self) -> usize {
    self.events
  }
}

impl EventTrigger for LoggingTrigger {
  fn trigger(
    &mut self,
    window: &ExecutionWindow,
    input: &str,
    table: &DataTable,
  ) -> Result<(), BoxError> {
    self.events += 1;
    info!(
      trigger = %self.label,
      input = %input,
      rows = table.num_rows(),
      window = %window,
      "event triggered"
    );
    Ok(())
  }

  fn close(&mut self) -> Result<(), BoxError> {
    info!(trigger = %self.label, events = self.events, "event trigger closed");
    Ok(())
  }
}
