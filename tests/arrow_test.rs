#![cfg(feature = "arrow")]

use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, ListArray, StringArray};
use arrow::datatypes::Int32Type;
use colrs::prelude::*;

#[test]
fn test_chunks_become_chunks() {
    let chunks: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![Some("a"), None])),
        Arc::new(StringArray::from(vec![Some("b")])),
    ];
    let s = Series::from_arrow_chunks("s", &chunks).unwrap();
    assert_eq!(s.chunk_lengths(), vec![2, 1]);
    assert_eq!(s.null_count(), 1);
}

#[test]
fn test_list_round_trip() {
    let list = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
        Some(vec![Some(1), Some(2)]),
        None,
        Some(vec![Some(3)]),
    ]);
    let s = Series::from_arrow("l", &list).unwrap();
    assert_eq!(s.dtype(), &DataType::List(Box::new(DataType::Int32)));
    assert_eq!(s.null_count(), 1);
    let back = s.to_arrow().unwrap();
    assert_eq!(back.len(), 3);
    assert_eq!(back.null_count(), 1);
}

#[test]
fn test_construct_from_arrow_input() {
    let array: ArrayRef = Arc::new(Int32Array::from(vec![1, 2, 3]));
    let s = Series::construct("a", array, None, &ConstructOptions::default()).unwrap();
    assert_eq!(s.dtype(), &DataType::Int32);
    assert_eq!(s.len(), 3);
}

#[test]
fn test_object_has_no_arrow_form() {
    let values = vec![AnyValue::Int64(1), AnyValue::Utf8("x".into())];
    let s = Series::from_any_values("o", &values, false).unwrap();
    assert!(matches!(s.to_arrow(), Err(Error::TypeMismatch(_))));
}
