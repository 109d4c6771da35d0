//! Tests for `DataTable`.

use super::{ColumnData, DataTable, properties};

fn sample() -> DataTable {
  DataTable::from_columns(vec![
    (
      "timestamp".to_string(),
      ColumnData::Int64(vec![Some(3000), Some(1000), Some(2000)]),
    ),
    (
      "value".to_string(),
      ColumnData::Float64(vec![Some(3.0), None, Some(2.0)]),
    ),
    (
      "dim".to_string(),
      ColumnData::Utf8(vec![Some("c".to_string()), Some("a".to_string()), None]),
    ),
  ])
  .unwrap()
  .with_property(properties::GRANULARITY, "PT1S")
}

#[test]
fn from_columns_exposes_schema_and_rows() {
  let t = sample();
  assert_eq!(t.num_rows(), 3);
  assert_eq!(t.column_names(), vec!["timestamp", "value", "dim"]);
  assert!(t.contains("value"));
  assert!(!t.contains("missing"));
  assert_eq!(t.property(properties::GRANULARITY), Some("PT1S"));
}

#[test]
fn from_columns_rejects_ragged_columns() {
  let r = DataTable::from_columns(vec![
    ("a".to_string(), ColumnData::Int64(vec![Some(1)])),
    ("b".to_string(), ColumnData::Int64(vec![Some(1), Some(2)])),
  ]);
  assert!(r.is_err());
}

#[test]
fn empty_table_has_no_rows() {
  let t = DataTable::empty();
  assert!(t.is_empty());
  assert!(t.column_names().is_empty());
}

#[test]
fn numeric_columns_cast_between_types() {
  let t = sample();
  assert_eq!(t.doubles("timestamp").unwrap(), vec![Some(3000.0), Some(1000.0), Some(2000.0)]);
  assert_eq!(t.longs("value").unwrap(), vec![Some(3), None, Some(2)]);
}

#[test]
fn missing_column_is_an_error() {
  let err = sample().longs("nope").unwrap_err();
  assert!(err.to_string().contains("nope"));
}

#[test]
fn sorted_by_orders_rows_and_keeps_properties() {
  let sorted = sample().sorted_by("timestamp").unwrap();
  assert_eq!(sorted.longs("timestamp").unwrap(), vec![Some(1000), Some(2000), Some(3000)]);
  assert_eq!(sorted.doubles("value").unwrap(), vec![None, Some(2.0), Some(3.0)]);
  assert_eq!(
    sorted.strings("dim").unwrap(),
    vec![Some("a".to_string()), None, Some("c".to_string())]
  );
  assert_eq!(sorted.property(properties::GRANULARITY), Some("PT1S"));
}

#[test]
fn filter_time_range_is_half_open() {
  let filtered = sample().filter_time_range("timestamp", 1000, 3000).unwrap();
  assert_eq!(filtered.longs("timestamp").unwrap(), vec![Some(1000), Some(2000)]);
}

#[test]
fn to_json_renders_rows() {
  let json = sample().sorted_by("timestamp").unwrap().to_json().unwrap();
  assert_eq!(json[0]["timestamp"], 1000);
  assert!(json[0]["value"].is_null());
  assert_eq!(json[2]["dim"], "c");
}
