//! External collaborators of the engine: data sources, SQL engines, detectors, event triggers,
//! post-processors, and the time-index filler used by index-filler nodes.
//!
//! Operators reach them through [crate::plan::SharedResources]. Detectors, triggers and
//! post-processors are built by name from a [ComponentRegistry], so a pipeline can name a
//! detector type in its parameters without the engine knowing the implementation.

mod component_registry;
mod data_source;
#[cfg(test)]
mod data_source_test;
mod detector;
mod post_processor;
mod sql;
mod time_index_filler;
#[cfg(test)]
mod time_index_filler_test;
mod trigger;

pub use component_registry::{
  ComponentRegistry, DetectorFactory, PostProcessorFactory, TriggerFactory,
};
pub use data_source::{CsvDataSource, DataSource, FetchRequest, InMemoryDataSource};
pub use detector::{AnomalyDetector, ThresholdDetector, columns};
pub use post_processor::{AnomalyPostProcessor, ThresholdPostProcessor};
pub use sql::SqlEngine;
pub use time_index_filler::{FillNullMethod, TimeIndexFiller, TimeIndexFillerSpec, TimeLimitInference};
pub use trigger::{EventTrigger, LoggingTrigger};
