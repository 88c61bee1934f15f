use chrono::NaiveDate;
use colrs::prelude::*;
use colrs::series::TypedBuffer;

#[test]
fn test_empty_input_defaults_to_float32() {
    let s = Series::construct("a", Vec::<AnyValue>::new(), None, &ConstructOptions::default()).unwrap();
    assert_eq!(s.dtype(), &DataType::Float32);
    assert!(s.is_empty());
}

#[test]
fn test_mixed_numeric_values_promote() {
    let values = vec![AnyValue::Int32(1), AnyValue::Null, AnyValue::Int64(2)];
    let s = Series::construct("a", values, None, &ConstructOptions::default().strict(true)).unwrap();
    assert_eq!(s.dtype(), &DataType::Int64);
    assert_eq!(s.null_count(), 1);
}

#[test]
fn test_heterogeneous_values_strict_and_lenient() {
    let values = vec![AnyValue::Int64(1), AnyValue::Utf8("a".into())];
    let strict = ConstructOptions::default().strict(true);
    assert!(Series::construct("a", values.clone(), None, &strict).is_err());

    let lenient = ConstructOptions::default().strict(false);
    let s = Series::construct("a", values, None, &lenient).unwrap();
    assert_eq!(s.dtype(), &DataType::Object);
    assert_eq!(s.len(), 2);
}

#[test]
fn test_nested_values_build_a_list() {
    let values = vec![
        AnyValue::from(Series::new("", vec![1i64, 2])),
        AnyValue::Null,
        AnyValue::from(Series::new("", vec![3i64])),
    ];
    let s = Series::construct("l", values, None, &ConstructOptions::default()).unwrap();
    assert_eq!(s.dtype(), &DataType::List(Box::new(DataType::Int64)));
    let exploded = s.explode().unwrap();
    assert_eq!(exploded.len(), 4);
}

#[test]
fn test_nan_to_null_policy() {
    let buffer = TypedBuffer::Float64(vec![1.0, f64::NAN]);
    let kept = Series::construct("f", buffer.clone(), None, &ConstructOptions::default().nan_to_null(false)).unwrap();
    assert_eq!(kept.null_count(), 0);
    let nulled = Series::construct("f", buffer, None, &ConstructOptions::default().nan_to_null(true)).unwrap();
    assert_eq!(nulled.null_count(), 1);
}

#[test]
fn test_series_input_reuses_storage() {
    let source = Series::new("a", vec![1i32, 2, 3]);
    let s = Series::construct("b", source.clone(), None, &ConstructOptions::default()).unwrap();
    assert_eq!(s.name(), "b");
    assert!(s.series_equal(&source));
}

#[test]
fn test_explicit_dtype_is_applied() {
    let values = vec![AnyValue::Int64(1), AnyValue::Int64(2)];
    let s = Series::construct("a", values, Some(&DataType::Float64), &ConstructOptions::default()).unwrap();
    assert_eq!(s.dtype(), &DataType::Float64);
}

#[test]
fn test_dates() {
    let d = NaiveDate::from_ymd_opt(1970, 1, 3);
    let s = Series::from_dates("d", vec![d, None]);
    assert_eq!(s.dtype(), &DataType::Date);
    assert_eq!(s.get(0).unwrap(), AnyValue::Date(2));
}

#[test]
fn test_dataframe_from_records_unions_keys() {
    let records = vec![
        vec![("a".to_string(), AnyValue::Int64(1))],
        vec![("b".to_string(), AnyValue::Utf8("x".into())), ("a".to_string(), AnyValue::Int64(2))],
    ];
    let df = DataFrame::from_records(&records, None, true).unwrap();
    assert_eq!(df.get_column_names(), vec!["a", "b"]);
    assert_eq!(df.column("b").unwrap().null_count(), 1);
}

#[test]
fn test_dataframe_from_pairs() {
    let df = DataFrame::from_pairs(
        vec![
            ("x", vec![AnyValue::Int64(1), AnyValue::Int64(2)]),
            ("y", vec![AnyValue::Float64(0.5), AnyValue::Null]),
        ],
        None,
    )
    .unwrap();
    assert_eq!(df.shape(), (2, 2));
    assert_eq!(df.dtypes(), vec![DataType::Int64, DataType::Float64]);
}

#[test]
fn test_dataframe_rejects_unequal_lengths() {
    let result = DataFrame::new(vec![
        Series::new("a", vec![1i64, 2]),
        Series::new("b", vec![1i64]),
    ]);
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}

#[test]
fn test_dataframe_rejects_duplicate_names() {
    let result = DataFrame::new(vec![
        Series::new("a", vec![1i64]),
        Series::new("a", vec![2i64]),
    ]);
    assert!(matches!(result, Err(Error::DuplicateColumnName(_))));
}
