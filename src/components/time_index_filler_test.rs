//! Tests for `time_index_filler`.

use super::{FillNullMethod, TimeIndexFiller, TimeIndexFillerSpec, TimeLimitInference};
use crate::types::{ColumnData, DataTable, ExecutionWindow, Params, properties};
use serde_json::json;

const HOUR: i64 = 3_600_000;

fn table(times: Vec<i64>, values: Vec<f64>) -> DataTable {
  DataTable::from_columns(vec![
    ("timestamp".to_string(), ColumnData::Int64(times.into_iter().map(Some).collect())),
    ("value".to_string(), ColumnData::Float64(values.into_iter().map(Some).collect())),
  ])
  .unwrap()
}

fn params(value: serde_json::Value) -> Params {
  value.as_object().cloned().unwrap()
}

fn hourly(method: FillNullMethod) -> TimeIndexFillerSpec {
  TimeIndexFillerSpec {
    monitoring_granularity: Some("PT1H".to_string()),
    fill_null_method: method,
    ..TimeIndexFillerSpec::default()
  }
}

#[test]
fn fills_gaps_with_zeroes_by_default() {
  let filler = TimeIndexFiller::new(hourly(FillNullMethod::default()));
  let window = ExecutionWindow::new(0, 4 * HOUR).unwrap();
  let out = filler
    .fill_index(&window, &table(vec![2 * HOUR, 0], vec![3.0, 1.0]))
    .unwrap();
  assert_eq!(
    out.longs("timestamp").unwrap(),
    vec![Some(0), Some(HOUR), Some(2 * HOUR), Some(3 * HOUR)]
  );
  assert_eq!(
    out.doubles("value").unwrap(),
    vec![Some(1.0), Some(0.0), Some(3.0), Some(0.0)]
  );
}

#[test]
fn lookback_and_detection_period_are_filled_separately() {
  let spec = TimeIndexFillerSpec {
    min_time_inference: Some(TimeLimitInference::FromDetectionTimeWithLookback),
    lookback: Some("PT2H".to_string()),
    ..hourly(FillNullMethod::FillForward)
  };
  let filler = TimeIndexFiller::new(spec);
  let window = ExecutionWindow::new(2 * HOUR, 4 * HOUR).unwrap();
  let out = filler
    .fill_index(&window, &table(vec![0, 3 * HOUR], vec![5.0, 7.0]))
    .unwrap();
  assert_eq!(
    out.doubles("value").unwrap(),
    vec![Some(5.0), Some(5.0), None, Some(7.0)]
  );
}

#[test]
fn fill_backward_uses_next_value() {
  let filler = TimeIndexFiller::new(hourly(FillNullMethod::FillBackward));
  let window = ExecutionWindow::new(0, 3 * HOUR).unwrap();
  let out = filler
    .fill_index(&window, &table(vec![0, 2 * HOUR], vec![1.0, 9.0]))
    .unwrap();
  assert_eq!(out.doubles("value").unwrap(), vec![Some(1.0), Some(9.0), Some(9.0)]);
}

#[test]
fn keep_null_leaves_gaps() {
  let filler = TimeIndexFiller::new(hourly(FillNullMethod::KeepNull));
  let window = ExecutionWindow::new(0, 2 * HOUR).unwrap();
  let out = filler.fill_index(&window, &table(vec![0], vec![1.0])).unwrap();
  assert_eq!(out.doubles("value").unwrap(), vec![Some(1.0), None]);
}

#[test]
fn table_time_limits_and_granularity_properties_are_used() {
  let filler = TimeIndexFiller::new(TimeIndexFillerSpec::default());
  let input = table(vec![HOUR], vec![4.0])
    .with_property(properties::GRANULARITY, "PT1H")
    .with_property(properties::MIN_TIME_MILLIS, HOUR.to_string())
    .with_property(properties::MAX_TIME_MILLIS, (3 * HOUR).to_string());
  let window = ExecutionWindow::new(0, 10 * HOUR).unwrap();
  let out = filler.fill_index(&window, &input).unwrap();
  assert_eq!(out.longs("timestamp").unwrap(), vec![Some(HOUR), Some(2 * HOUR)]);
  assert_eq!(out.property(properties::GRANULARITY), Some("PT1H"));
}

#[test]
fn unaligned_min_is_rounded_up() {
  let filler = TimeIndexFiller::new(hourly(FillNullMethod::KeepNull));
  let window = ExecutionWindow::new(0, 3 * HOUR).unwrap();
  let out = filler
    .fill_index(&window, &table(vec![HOUR / 2, 2 * HOUR], vec![1.0, 2.0]))
    .unwrap();
  assert_eq!(out.longs("timestamp").unwrap(), vec![Some(HOUR), Some(2 * HOUR)]);
  assert_eq!(out.doubles("value").unwrap(), vec![None, Some(2.0)]);
}

#[test]
fn missing_granularity_is_an_error() {
  let filler = TimeIndexFiller::new(TimeIndexFillerSpec::default());
  let window = ExecutionWindow::new(0, HOUR).unwrap();
  assert!(filler.fill_index(&window, &table(vec![0], vec![1.0])).is_err());
}

#[test]
fn spec_parses_params() {
  let spec = TimeIndexFillerSpec::from_params(&params(json!({
    "timestamp": "ts",
    "monitoringGranularity": "P1D",
    "fillNullMethod": "fill_forward",
    "minTimeInference": "FROM_DETECTION_TIME",
    "maxTimeInference": "FROM_DATA",
  })))
  .unwrap();
  assert_eq!(spec.timestamp, "ts");
  assert_eq!(spec.fill_null_method, FillNullMethod::FillForward);
  assert_eq!(spec.min_time_inference, Some(TimeLimitInference::FromDetectionTime));
  assert_eq!(spec.max_time_inference, Some(TimeLimitInference::FromData));
}

#[test]
fn spec_rejects_lookback_inference_without_lookback() {
  let err = TimeIndexFillerSpec::from_params(&params(json!({
    "minTimeInference": "FROM_DETECTION_TIME_WITH_LOOKBACK"
  })))
  .unwrap_err();
  assert!(err.contains("lookback"));
}

#[test]
fn spec_rejects_bad_values() {
  assert!(TimeIndexFillerSpec::from_params(&params(json!({"fillNullMethod": "MAGIC"}))).is_err());
  assert!(TimeIndexFillerSpec::from_params(&params(json!({"monitoringGranularity": "P1M"}))).is_err());
  assert!(TimeIndexFillerSpec::from_params(&params(json!({"timestamp": 3}))).is_err());
}
