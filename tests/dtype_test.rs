use colrs::core::dtype::get_supertype;
use colrs::{AnyValue, DataType, Error, Series, TimeUnit};

#[test]
fn test_integer_promotion() {
    assert_eq!(get_supertype(&DataType::Int8, &DataType::Int32), Some(DataType::Int32));
    assert_eq!(get_supertype(&DataType::UInt8, &DataType::Int8), Some(DataType::Int16));
    assert_eq!(get_supertype(&DataType::UInt32, &DataType::Int64), Some(DataType::Int64));
    assert_eq!(get_supertype(&DataType::Int32, &DataType::Float64), Some(DataType::Float64));
}

#[test]
fn test_decimal_scale_promotion() {
    let st = get_supertype(&DataType::Decimal(Some(10), 2), &DataType::Decimal(Some(5), 4));
    assert_eq!(st, Some(DataType::Decimal(None, 4)));
}

#[test]
fn test_lossless_round_trip_cast() {
    let s = Series::new("a", vec![Some(1i32), None, Some(-7)]);
    let wide = s.strict_cast(&DataType::Int64).unwrap();
    let back = wide.strict_cast(&DataType::Int32).unwrap();
    assert_eq!(back, s);
}

#[test]
fn test_strict_cast_overflow() {
    let s = Series::new("a", vec![1i64, 300]);
    match s.strict_cast(&DataType::UInt8) {
        Err(Error::Overflow(_)) => {}
        other => panic!("expected Overflow, got {:?}", other),
    }
    // lenient cast turns the value into null
    let lenient = s.cast(&DataType::UInt8).unwrap();
    assert_eq!(lenient.to_list(), vec![AnyValue::UInt8(1), AnyValue::Null]);
}

#[test]
fn test_boolean_to_uint32() {
    let s = Series::new("b", vec![true, false, true]);
    let out = s.cast(&DataType::UInt32).unwrap();
    assert_eq!(out.u32().unwrap().to_options(), vec![Some(1), Some(0), Some(1)]);
}

#[test]
fn test_boolean_arithmetic_is_rejected() {
    let a = Series::new("a", vec![true, false]);
    let b = Series::new("b", vec![true, true]);
    assert!(matches!(a.try_add(&b), Err(Error::TypeMismatch(_))));
    assert_eq!(a.and(&b).unwrap().bool().unwrap().to_options(), vec![Some(true), Some(false)]);
}

#[test]
fn test_time_unit_conversion() {
    assert_eq!(TimeUnit::Nanoseconds.convert(1_500_000, TimeUnit::Milliseconds), Some(1));
    assert_eq!(TimeUnit::Milliseconds.convert(2, TimeUnit::Microseconds), Some(2_000));
}
