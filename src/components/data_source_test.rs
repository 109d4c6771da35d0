//! Tests for `data_source`.

use super::{CsvDataSource, DataSource, FetchRequest, InMemoryDataSource};
use crate::types::{ColumnData, DataTable, ExecutionWindow, properties};
use std::io::Write;

fn metrics() -> DataTable {
  DataTable::from_columns(vec![
    ("timestamp".to_string(), ColumnData::Int64(vec![Some(0), Some(1000), Some(2000)])),
    ("value".to_string(), ColumnData::Float64(vec![Some(1.0), Some(2.0), Some(3.0)])),
  ])
  .unwrap()
}

fn table_request(name: &str) -> FetchRequest {
  FetchRequest::Table {
    name: name.to_string(),
    time_column: "timestamp".to_string(),
  }
}

#[tokio::test]
async fn in_memory_filters_rows_to_window() {
  let source = InMemoryDataSource::new().with_table("metrics", metrics());
  let window = ExecutionWindow::new(1000, 2000).unwrap();
  let table = source.fetch(&table_request("metrics"), &window).await.unwrap();
  assert_eq!(table.longs("timestamp").unwrap(), vec![Some(1000)]);
}

#[tokio::test]
async fn in_memory_rejects_unknown_table_and_queries() {
  let source = InMemoryDataSource::new();
  let window = ExecutionWindow::new(0, 10).unwrap();
  let err = source.fetch(&table_request("nope"), &window).await.unwrap_err();
  assert!(err.to_string().contains("nope"));
  let query = FetchRequest::Query {
    query: "select 1".to_string(),
  };
  assert!(source.fetch(&query, &window).await.is_err());
}

#[tokio::test]
async fn csv_reads_epoch_and_rfc3339_timestamps() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(file, "timestamp,value,city").unwrap();
  writeln!(file, "0,1.5,paris").unwrap();
  writeln!(file, "1970-01-01T00:00:01Z,,berlin").unwrap();
  writeln!(file, "5000,4,rome").unwrap();
  file.flush().unwrap();

  let source = CsvDataSource::new()
    .with_table("metrics", file.path())
    .with_granularity("metrics", "PT1S");
  let window = ExecutionWindow::new(0, 3000).unwrap();
  let table = source.fetch(&table_request("metrics"), &window).await.unwrap();

  assert_eq!(table.longs("timestamp").unwrap(), vec![Some(0), Some(1000)]);
  assert_eq!(table.doubles("value").unwrap(), vec![Some(1.5), None]);
  assert_eq!(
    table.strings("city").unwrap(),
    vec![Some("paris".to_string()), Some("berlin".to_string())]
  );
  assert_eq!(table.property(properties::GRANULARITY), Some("PT1S"));
}

#[tokio::test]
async fn csv_missing_file_is_an_error() {
  let source = CsvDataSource::new().with_table("metrics", "/definitely/not/here.csv");
  let window = ExecutionWindow::new(0, 10).unwrap();
  let err = source.fetch(&table_request("metrics"), &window).await.unwrap_err();
  assert!(err.to_string().contains("not/here.csv"));
}

#[test]
fn csv_table_names_are_sorted() {
  let source = CsvDataSource::new().with_table("b", "b.csv").with_table("a", "a.csv");
  assert_eq!(source.table_names(), vec!["a", "b"]);
}
