//! Named factories for detector, event-trigger and post-processor components.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{
  AnomalyDetector, AnomalyPostProcessor, EventTrigger, LoggingTrigger, ThresholdDetector,
  ThresholdPostProcessor,
};
use crate::error::BoxError;
use crate::types::Params;

pub type DetectorFactory =
  Arc<dyn Fn(&Params) -> Result<Box<dyn AnomalyDetector>, BoxError> + Send + Sync>;
pub type TriggerFactory =
  Arc<dyn Fn(&Params) -> Result<Box<dyn EventTrigger>, BoxError> + Send + Sync>;
pub type PostProcessorFactory =
  Arc<dyn Fn(&Params) -> Result<Box<dyn AnomalyPostProcessor>, BoxError> + Send + Sync>;

/// Component type names are case-insensitive (`threshold` and `THRESHOLD` are the same).
#[derive(Default)]
pub struct ComponentRegistry {
  detectors: RwLock<HashMap<String, DetectorFactory>>,
  triggers: RwLock<HashMap<String, TriggerFactory>>,
  post_processors: RwLock<HashMap<String, PostProcessorFactory>>,
}

impl std::fmt::Debug for ComponentRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ComponentRegistry")
      .field("detectors", &self.detector_types())
      .field("triggers", &self.trigger_types())
      .field("post_processors", &self.post_processor_types())
      .finish()
  }
}

fn key(name: &str) -> String {
  name.trim().to_uppercase()
}

impl ComponentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry with the `THRESHOLD` detector, the `LOG` trigger and the `THRESHOLD`
  /// post-processor.
  pub fn with_builtins() -> Self {
    let registry = Self::new();
    registry.register_detector(
      "THRESHOLD",
      Arc::new(|spec: &Params| -> Result<Box<dyn AnomalyDetector>, BoxError> {
        Ok(Box::new(ThresholdDetector::from_spec(spec)?))
      }),
    );
    registry.register_trigger(
      "LOG",
      Arc::new(|spec: &Params| -> Result<Box<dyn EventTrigger>, BoxError> {
        let label = spec.get("label").and_then(|v| v.as_str()).unwrap_or("log");
        Ok(Box::new(LoggingTrigger::new(label)))
      }),
    );
    registry.register_post_processor(
      ThresholdPostProcessor::NAME,
      Arc::new(|spec: &Params| -> Result<Box<dyn AnomalyPostProcessor>, BoxError> {
        Ok(Box::new(ThresholdPostProcessor::from_spec(spec)?))
      }),
    );
    registry
  }

  /// Registers (or replaces) a detector type.
  pub fn register_detector(&self, name: &str, factory: DetectorFactory) {
    self
      .detectors
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key(name), factory);
  }

  /// Registers (or replaces) a trigger type.
  pub fn register_trigger(&self, name: &str, factory: TriggerFactory) {
    self
      .triggers
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key(name), factory);
  }

  /// Registers (or replaces) a post-processor type.
  pub fn register_post_processor(&self, name: &str, factory: PostProcessorFactory) {
    self
      .post_processors
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key(name), factory);
  }

  pub fn build_detector(&self, name: &str, spec: &Params) -> Result<Box<dyn AnomalyDetector>, BoxError> {
    let factory = self
      .detectors
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key(name))
      .cloned()
      .ok_or_else(|| format!("unknown detector type '{}'", name))?;
    factory(spec)
  }

  pub fn build_trigger(&self, name: &str, spec: &Params) -> Result<Box<dyn EventTrigger>, BoxError> {
    let factory = self
      .triggers
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key(name))
      .cloned()
      .ok_or_else(|| format!("unknown event trigger type '{}'", name))?;
    factory(spec)
  }

  pub fn build_post_processor(
    &self,
    name: &str,
    spec: &Params,
  ) -> Result<Box<dyn AnomalyPostProcessor>, BoxError> {
    let factory = self
      .post_processors
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key(name))
      .cloned()
      .ok_or_else(|| format!("unknown post-processor type '{}'", name))?;
    factory(spec)
  }

  pub fn detector_types(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .detectors
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .keys()
      .cloned()
      .collect();
    names.sort();
    names
  }

  pub fn trigger_types(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .triggers
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .keys()
      .cloned()
      .collect();
    names.sort();
    names
  }

  pub fn post_processor_types(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .post_processors
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .keys()
      .cloned()
      .collect();
    names.sort();
    names
  }
}
