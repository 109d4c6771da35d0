//! CLI: Run a detection pipeline from a graph JSON file.
//!
//! The graph file is either a bare array of plan node descriptors or `{"alertId": .., "nodes": [..]}`.
//! Tables for data-fetcher nodes come from CSV files given with `--table NAME=PATH`.
//!
//! Usage: `run_pipeline [OPTIONS] --start <START> --end <END> <path-to-graph-json>`
//! Example: run_pipeline --start 2024-01-01T00:00:00Z --end 2024-01-02T00:00:00Z \
//!            --table cpu=data/cpu.csv --terminal fork graphs/cpu.json
//!
//! Set RUST_LOG=detection_pipeline=trace for TRACE-level span enter/exit and events.

use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use detection_pipeline::components::CsvDataSource;
use detection_pipeline::execution_log_io::{EXECUTION_LOG_FILENAME, save_execution_log};
use detection_pipeline::time_utils::parse_instant;
use detection_pipeline::{
  EngineConfig, ExecutionWindow, NodeRegistry, PipelineRequest, PlanNodeDescriptor, SharedResources,
  run_pipeline,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Run a detection pipeline from a graph JSON file.
#[derive(Parser, Debug)]
#[command(name = "run_pipeline")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  PIPELINE_CONFIG                  Engine config JSON file (--config).
  PIPELINE_LOG_DIR                 Directory for execution.log.json (--log-dir).
  PIPELINE_FORK_JOIN_PARALLELISM   Branch pool size.
  PIPELINE_BRANCH_TIMEOUT_MS       Per-branch join timeout in milliseconds.
  PIPELINE_REGISTRY_ON_DUPLICATE   reject | overwrite.

Examples:
  run_pipeline --start 0 --end 60000 graph.json
  run_pipeline --start 2024-01-01T00:00:00Z --end 2024-01-02T00:00:00Z --table cpu=cpu.csv graph.json"#
)]
struct Args {
  /// Window start: epoch millis or RFC 3339.
  #[arg(long, value_name = "START")]
  start: String,

  /// Window end (exclusive): epoch millis or RFC 3339.
  #[arg(long, value_name = "END")]
  end: String,

  /// Node whose outputs are printed. Default: every node not driven by a fork-join.
  #[arg(long, value_name = "NODE")]
  terminal: Option<String>,

  /// CSV table for data-fetcher nodes, as NAME=PATH. Repeatable.
  #[arg(long = "table", value_name = "NAME=PATH")]
  tables: Vec<String>,

  /// Engine config JSON file. Overridden by PIPELINE_CONFIG if set.
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Directory for execution.log.json. Overridden by PIPELINE_LOG_DIR if set.
  #[arg(long, value_name = "DIR")]
  log_dir: Option<PathBuf>,

  /// Path to the graph JSON file
  #[arg(value_name = "path-to-graph-json")]
  graph_path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GraphFile {
  Nodes(Vec<PlanNodeDescriptor>),
  #[serde(rename_all = "camelCase")]
  Alert {
    alert_id: Option<i64>,
    nodes: Vec<PlanNodeDescriptor>,
  },
}

fn fail(message: String) -> ! {
  eprintln!("{}", message);
  process::exit(1);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    // stdout carries the JSON result.
    .with_writer(std::io::stderr)
    .init();

  info!("run_pipeline starting");
  let args = Args::parse();

  // Env vars override flags.
  let config_path = env::var("PIPELINE_CONFIG").ok().map(PathBuf::from).or(args.config.clone());
  let log_dir = env::var("PIPELINE_LOG_DIR").ok().map(PathBuf::from).or(args.log_dir.clone());
  info!(config = ?config_path, log_dir = ?log_dir, "options (env or flags)");

  let config = match &config_path {
    Some(path) => EngineConfig::load(path),
    None => Ok(EngineConfig::default()),
  }
  .and_then(EngineConfig::with_env_overrides)
  .unwrap_or_else(|e| fail(format!("Config error: {}", e)));

  let window = parse_instant(&args.start)
    .and_then(|start| ExecutionWindow::new(start, parse_instant(&args.end)?))
    .unwrap_or_else(|e| fail(format!("Window error: {}", e)));

  let path = &args.graph_path;
  let text = fs::read_to_string(path)
    .unwrap_or_else(|e| fail(format!("Error reading {}: {}", path.display(), e)));
  let (alert_id, nodes) = match serde_json::from_str::<GraphFile>(&text) {
    Ok(GraphFile::Nodes(nodes)) => (None, nodes),
    Ok(GraphFile::Alert { alert_id, nodes }) => (alert_id, nodes),
    Err(e) => fail(format!("Error parsing graph: {}", e)),
  };

  let mut source = CsvDataSource::new();
  for spec in &args.tables {
    let Some((name, file)) = spec.split_once('=') else {
      fail(format!("Invalid --table '{}': expected NAME=PATH", spec));
    };
    source = source.with_table(name.trim(), file.trim());
  }

  let registry = NodeRegistry::with_builtins(config.registry.on_duplicate);
  let resources = SharedResources::default()
    .with_config(config)
    .with_data_source(Arc::new(source));
  let mut request = PipelineRequest::new(window, nodes);
  request.alert_id = alert_id;
  request.terminal = args.terminal.clone();

  let run = run_pipeline(&registry, resources, request).await;

  if let Some(dir) = &log_dir {
    let log_path = dir.join(EXECUTION_LOG_FILENAME);
    if let Err(e) = save_execution_log(&log_path, &run.log) {
      eprintln!("Error writing {}: {}", log_path.display(), e);
    }
  }

  let steps = run.log.completed_nodes().len();
  let outputs = run
    .into_result()
    .unwrap_or_else(|e| fail(format!("Pipeline error: {}", e)));
  let json = outputs
    .to_json()
    .unwrap_or_else(|e| fail(format!("Error rendering outputs: {}", e)));
  let rendered = serde_json::to_string_pretty(&json)
    .unwrap_or_else(|e| fail(format!("Error rendering outputs: {}", e)));

  info!(steps, anomalies = outputs.anomalies().len(), "pipeline completed");
  println!("{}", rendered);
}
