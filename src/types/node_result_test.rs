//! Tests for `NodeResult`.

use std::sync::Arc;

use super::{
  AnomalyFinding, DataTable, DetectionResult, NodeResult, OutputMap, collect_anomalies,
  output_map_to_json,
};

#[test]
fn only_detections_project_anomalies() {
  let detection = NodeResult::Detection(DetectionResult {
    anomalies: vec![AnomalyFinding::new(0, 10)],
    timeseries: None,
  });
  assert_eq!(detection.anomalies().map(|a| a.len()), Some(1));
  assert!(NodeResult::Echo("x".to_string()).anomalies().is_none());
  assert!(NodeResult::Table(DataTable::empty()).anomalies().is_none());
  assert!(NodeResult::ForkJoin(vec![]).anomalies().is_none());
}

#[test]
fn accessors_match_variant() {
  let echo = NodeResult::Echo("hi".to_string());
  assert_eq!(echo.as_echo(), Some("hi"));
  assert!(echo.as_table().is_none());
  assert_eq!(echo.kind(), "echo");
}

#[test]
fn collect_anomalies_flattens_in_key_order() {
  let mut outputs = OutputMap::new();
  outputs.insert(
    "b".to_string(),
    Arc::new(NodeResult::Detection(DetectionResult {
      anomalies: vec![AnomalyFinding::new(20, 30)],
      timeseries: None,
    })),
  );
  outputs.insert(
    "a".to_string(),
    Arc::new(NodeResult::Detection(DetectionResult {
      anomalies: vec![AnomalyFinding::new(0, 10)],
      timeseries: None,
    })),
  );
  outputs.insert("c".to_string(), Arc::new(NodeResult::Echo("skip".to_string())));
  let all = collect_anomalies(&outputs);
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].start_time, 0);
  assert_eq!(all[1].start_time, 20);
}

#[test]
fn output_map_renders_nested_fork_join() {
  let mut branch = OutputMap::new();
  branch.insert("output_Echo".to_string(), Arc::new(NodeResult::Echo("1".to_string())));
  let mut outputs = OutputMap::new();
  outputs.insert("all".to_string(), Arc::new(NodeResult::ForkJoin(vec![branch])));
  let json = output_map_to_json(&outputs).unwrap();
  assert_eq!(json["all"]["branches"][0]["output_Echo"]["echo"], "1");
}

fn detection(starts: &[i64]) -> Arc<NodeResult> {
  Arc::new(NodeResult::Detection(DetectionResult {
    anomalies: starts.iter().map(|&s| AnomalyFinding::new(s, s + 10)).collect(),
    timeseries: None,
  }))
}

#[test]
fn merged_map_projects_findings_of_its_entries() {
  let mut entries = OutputMap::new();
  entries.insert("1.output_AnomalyDetector".to_string(), detection(&[20, 30]));
  entries.insert("0.output_AnomalyDetector".to_string(), detection(&[0]));
  entries.insert("0.output_Echo".to_string(), Arc::new(NodeResult::Echo("x".to_string())));
  let combined = NodeResult::Combined(entries);
  let starts: Vec<i64> = combined.anomalies().unwrap().iter().map(|a| a.start_time).collect();
  assert_eq!(starts, vec![0, 20, 30]);
  assert_eq!(combined.kind(), "combined");
  assert_eq!(combined.as_combined().map(|m| m.len()), Some(3));
  assert!(NodeResult::Combined(OutputMap::new()).anomalies().unwrap().is_empty());
}

#[test]
fn map_anomalies_reaches_into_merged_maps_and_leaves_the_source_alone() {
  let mut entries = OutputMap::new();
  entries.insert("0.out".to_string(), detection(&[0, 10]));
  let original = NodeResult::Combined(entries);
  let shifted = original.map_anomalies(&mut |a: &mut AnomalyFinding| a.start_time += 1);
  let starts: Vec<i64> = shifted.anomalies().unwrap().iter().map(|a| a.start_time).collect();
  assert_eq!(starts, vec![1, 11]);
  let untouched: Vec<i64> = original.anomalies().unwrap().iter().map(|a| a.start_time).collect();
  assert_eq!(untouched, vec![0, 10]);

  let mut calls = 0;
  let echo = NodeResult::Echo("x".to_string()).map_anomalies(&mut |_: &mut AnomalyFinding| calls += 1);
  assert_eq!(echo.as_echo(), Some("x"));
  assert_eq!(calls, 0);
}

#[test]
fn merged_map_renders_its_entries() {
  let mut entries = OutputMap::new();
  entries.insert("0.output_Echo".to_string(), Arc::new(NodeResult::Echo("1".to_string())));
  let mut outputs = OutputMap::new();
  outputs.insert("output_Combiner".to_string(), Arc::new(NodeResult::Combined(entries)));
  let json = output_map_to_json(&outputs).unwrap();
  assert_eq!(json["output_Combiner"]["combined"]["0.output_Echo"]["echo"], "1");
}
