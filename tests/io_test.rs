use std::path::Path;

use colrs::prelude::*;
use tempfile::tempdir;

fn sample() -> DataFrame {
    DataFrame::new(vec![
        Series::new("id", vec![1i64, 2, 3]),
        Series::new("value", vec![Some(0.5f64), None, Some(2.25)]),
        Series::new("label", vec![Some("a"), Some("b,c"), None]),
        Series::new("flag", vec![true, false, true]),
    ])
    .unwrap()
}

#[test]
fn test_csv_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.csv");
    let df = sample();
    write_csv(&df, &path).unwrap();

    let back = read_csv(&path, &ReadOptions::default()).unwrap();
    assert_eq!(back.shape(), (3, 4));
    assert_eq!(back.dtypes(), vec![DataType::Int64, DataType::Float64, DataType::Utf8, DataType::Boolean]);
    assert_eq!(back.column("value").unwrap().null_count(), 1);
    assert_eq!(back.column("label").unwrap().get(1).unwrap(), AnyValue::Utf8("b,c".into()));
}

#[test]
fn test_registry_dispatches_by_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.csv");
    let registry = CodecRegistry::default();
    registry.write_path(&sample(), &path).unwrap();
    let back = registry.read_path(&path, &ReadOptions::default().with_n_rows(Some(2))).unwrap();
    assert_eq!(back.height(), 2);
    assert_eq!(registry.names(), vec!["csv", "json"]);
}

#[test]
fn test_unregistered_format_is_missing_dependency() {
    let registry = CodecRegistry::default();
    let result = registry.read_path(Path::new("data.parquet"), &ReadOptions::default());
    assert!(matches!(result, Err(Error::MissingDependency(_))));
    assert!(matches!(registry.get("ipc"), Err(Error::MissingDependency(_))));
}

#[test]
fn test_headerless_with_delimiter() {
    let codec = CodecRegistry::default().get("csv").unwrap();
    let data = "1;x\n2;y\n";
    let options = ReadOptions::default().with_header(false).with_delimiter(b';');
    let df = codec.read(&mut data.as_bytes(), &options).unwrap();
    assert_eq!(df.get_column_names(), vec!["column_0", "column_1"]);
    assert_eq!(df.column("column_0").unwrap().dtype(), &DataType::Int64);
}

#[test]
fn test_ragged_record_is_an_error() {
    let codec = CodecRegistry::default().get("csv").unwrap();
    let data = "a,b\n1,2\n3\n";
    assert!(codec.read(&mut data.as_bytes(), &ReadOptions::default()).is_err());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let result = read_csv(dir.path().join("absent.csv"), &ReadOptions::default());
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_json_file_round_trip_through_registry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    let df = sample();
    let registry = CodecRegistry::default();
    registry.write_path(&df, &path).unwrap();
    let back = read_json(&path, &ReadOptions::default()).unwrap();
    assert_eq!(back.get_column_names(), df.get_column_names());
    assert_eq!(back.height(), df.height());
}
