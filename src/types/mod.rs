//! Data model of the detection pipeline: descriptors, windows, tables and node results.
//!
//! Results flow between nodes as `Arc<NodeResult>`.

mod anomaly;
mod data_table;
#[cfg(test)]
mod data_table_test;
mod enumeration_item;
mod execution_log;
mod execution_window;
mod node_result;
#[cfg(test)]
mod node_result_test;
mod plan_node_descriptor;

pub use anomaly::{AnomalyFinding, AnomalyLabel, DetectionResult};
pub use data_table::{ColumnData, DataTable, properties};
pub use enumeration_item::EnumerationItem;
pub use execution_log::{EXECUTION_LOG_VERSION, ExecutionLog, ExecutionStep};
pub use execution_window::ExecutionWindow;
pub use node_result::{InputMap, NodeResult, OutputMap, collect_anomalies, output_map_to_json};
pub use plan_node_descriptor::{InputBean, OutputBean, PlanNodeDescriptor};

/// Node parameters: string keys to arbitrary JSON values.
pub type Params = serde_json::Map<String, serde_json::Value>;
