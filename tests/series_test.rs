use colrs::series::arithmetic::ArithmeticOp;
use colrs::series::{Indexed, SeriesIndex};
use colrs::{AnyValue, DataType, Error, Series};
use colrs::prelude::{FillNullStrategy, RankMethod, RollingOptions};

#[test]
fn test_elementwise_add() {
    let a = Series::new("a", vec![1i64, 2, 3]);
    let b = Series::new("b", vec![4i64, 5, 6]);
    let out = a.try_add(&b).unwrap();
    assert_eq!(out.i64().unwrap().to_options(), vec![Some(5), Some(7), Some(9)]);
    assert_eq!(out.name(), "a");
}

#[test]
fn test_integer_true_division_is_float() {
    let a = Series::new("a", vec![1i64, 2, 3]);
    let b = Series::new("b", vec![2i64, 2, 2]);
    let out = a.try_div(&b).unwrap();
    assert_eq!(out.dtype(), &DataType::Float64);
    assert_eq!(out.f64().unwrap().to_options(), vec![Some(0.5), Some(1.0), Some(1.5)]);
}

#[test]
fn test_scalar_broadcast() {
    let a = Series::new("a", vec![10i32, 20]);
    let out = a.arithmetic_scalar(5i32, ArithmeticOp::Sub).unwrap();
    assert_eq!(out.i32().unwrap().to_options(), vec![Some(5), Some(15)]);
}

#[test]
fn test_length_mismatch() {
    let a = Series::new("a", vec![1i64, 2, 3]);
    let b = Series::new("b", vec![1i64, 2]);
    assert!(matches!(a.try_add(&b), Err(Error::ShapeMismatch(_))));
}

#[test]
fn test_null_partition() {
    let s = Series::new("a", vec![Some(1.0f64), None, Some(f64::NAN), None]);
    let nulls = s.filter(&s.is_null()).unwrap().len();
    let valid = s.filter(&s.is_not_null()).unwrap().len();
    assert_eq!(nulls + valid, s.len());
    // NaN is a value, not a null
    assert_eq!(s.null_count(), 2);
    assert_eq!(s.drop_nulls().unwrap().len(), 2);
    assert_eq!(s.drop_nans().unwrap().len(), 3);
}

#[test]
fn test_rechunk_is_idempotent() {
    let mut s = Series::new("a", vec![1i32, 2]);
    s.append(&Series::new("a", vec![3i32])).unwrap();
    assert_eq!(s.n_chunks(), 2);
    let before = s.to_list();
    s.rechunk();
    assert_eq!(s.n_chunks(), 1);
    s.rechunk();
    assert_eq!(s.n_chunks(), 1);
    assert_eq!(s.to_list(), before);
}

#[test]
fn test_append_concatenates() {
    let mut a = Series::new("a", vec![Some("x"), None]);
    let b = Series::new("b", vec![Some("y")]);
    let mut expected = a.to_list();
    expected.extend(b.to_list());
    a.append(&b).unwrap();
    assert_eq!(a.to_list(), expected);
    assert_eq!(a.chunk_lengths(), vec![2, 1]);
}

#[test]
fn test_extend_is_contiguous() {
    let mut a = Series::new("a", vec![1i64]);
    a.extend(&Series::new("a", vec![2i64, 3])).unwrap();
    assert_eq!(a.n_chunks(), 1);
    assert_eq!(a.len(), 3);
}

#[test]
fn test_negative_indexing() {
    let s = Series::new("a", vec![5i64, 6, 7, 8]);
    let n = s.len() as i64;
    for k in 0..n {
        assert_eq!(s.get(-k - 1).unwrap(), s.get(n - k - 1).unwrap());
    }
}

#[test]
fn test_get_item_variants() {
    let s = Series::new("a", vec![10i64, 20, 30, 40]);
    assert_eq!(s.get_item(-1).unwrap(), Indexed::Scalar(AnyValue::Int64(40)));

    let gathered = s
        .get_item(Series::new("idx", vec![-1i64, 0]))
        .unwrap()
        .into_series()
        .unwrap();
    assert_eq!(gathered.i64().unwrap().to_options(), vec![Some(40), Some(10)]);

    let mask = Series::new("m", vec![true, false, true, false]);
    let filtered = s.get_item(mask).unwrap().into_series().unwrap();
    assert_eq!(filtered.len(), 2);

    let stepped = s
        .get_item(SeriesIndex::Slice { start: Some(0), stop: None, step: Some(2) })
        .unwrap()
        .into_series()
        .unwrap();
    assert_eq!(stepped.i64().unwrap().to_options(), vec![Some(10), Some(30)]);

    let negative_step = SeriesIndex::Slice { start: None, stop: None, step: Some(-1) };
    assert!(s.get_item(negative_step).is_err());
}

#[test]
fn test_rolling_sum_leading_nulls() {
    let s = Series::new("a", vec![1.0f64, 2.0, 3.0, 4.0, 5.0]);
    let out = s.rolling_sum(&RollingOptions::new(3)).unwrap();
    assert_eq!(
        out.f64().unwrap().to_options(),
        vec![None, None, Some(6.0), Some(9.0), Some(12.0)]
    );

    let short = Series::new("a", vec![1.0f64, 2.0]);
    let out = short.rolling_sum(&RollingOptions::new(5)).unwrap();
    assert_eq!(out.null_count(), 2);
}

#[test]
fn test_rolling_min_periods() {
    let s = Series::new("a", vec![Some(1.0f64), None, Some(3.0)]);
    let options = RollingOptions::new(2).min_periods(1);
    let out = s.rolling_mean(&options).unwrap();
    assert_eq!(out.f64().unwrap().to_options(), vec![Some(1.0), Some(1.0), Some(3.0)]);
}

#[test]
fn test_rolling_apply_callback() {
    let s = Series::new("a", vec![1i64, 2, 3, 4]);
    let out = s
        .rolling_apply(
            |w: &Series| Ok(AnyValue::Int64(w.len() as i64)),
            &RollingOptions::new(2),
        )
        .unwrap();
    assert_eq!(out.null_count(), 1);
}

#[test]
fn test_rank_ties() {
    let s = Series::new("a", vec![3i64, 6, 1, 1, 6]);
    let average = s.rank(RankMethod::Average, false, None).unwrap();
    assert_eq!(
        average.f64().unwrap().to_options(),
        vec![Some(3.0), Some(4.5), Some(1.5), Some(1.5), Some(4.5)]
    );
    let ordinal = s
        .rank(RankMethod::Ordinal, false, None)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap();
    assert_eq!(
        ordinal.i64().unwrap().to_options(),
        vec![Some(3), Some(4), Some(1), Some(2), Some(5)]
    );
    let dense = s
        .rank(RankMethod::Dense, false, None)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap();
    assert_eq!(
        dense.i64().unwrap().to_options(),
        vec![Some(2), Some(3), Some(1), Some(1), Some(3)]
    );
}

#[test]
fn test_set_at_idx_scalar_broadcast() {
    let mut s = Series::new("a", vec![1i64, 2, 3, 4]);
    s.set_at_idx(&Series::new("idx", vec![0i64, 2]), 99i64).unwrap();
    assert_eq!(s.i64().unwrap().to_options(), vec![Some(99), Some(2), Some(99), Some(4)]);
}

#[test]
fn test_set_at_idx_length_mismatch() {
    let mut s = Series::new("a", vec![1i64, 2, 3, 4]);
    let values = Series::new("v", vec![7i64, 8, 9]);
    assert!(s.set_at_idx(&Series::new("idx", vec![0i64, 1]), values).is_err());
}

#[test]
fn test_sample_is_deterministic_with_seed() {
    let s = Series::new("a", (0..100i64).collect::<Vec<_>>());
    let a = s.sample_n(10, false, true, Some(42)).unwrap();
    let b = s.sample_n(10, false, true, Some(42)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 10);
    assert!(s.sample(Some(3), Some(0.5), false, false, None).is_err());
}

#[test]
fn test_fill_null_strategies() {
    let s = Series::new("a", vec![Some(1i64), None, Some(3), None]);
    let forward = s.fill_null(FillNullStrategy::Forward(None)).unwrap();
    assert_eq!(forward.i64().unwrap().to_options(), vec![Some(1), Some(1), Some(3), Some(3)]);
    let literal = s.fill_null(FillNullStrategy::Value(AnyValue::Int64(0))).unwrap();
    assert_eq!(literal.null_count(), 0);
}

#[test]
fn test_aggregations() {
    let s = Series::new("a", vec![Some(4i64), None, Some(1), Some(7)]);
    assert_eq!(s.sum().unwrap(), AnyValue::Int64(12));
    assert_eq!(s.min().unwrap(), AnyValue::Int64(1));
    assert_eq!(s.max().unwrap(), AnyValue::Int64(7));
    assert_eq!(s.mean(), Some(4.0));
    assert_eq!(s.median(), Some(4.0));
    assert_eq!(s.n_unique().unwrap(), 4);
}

#[test]
fn test_unique_keeps_first_appearance() {
    let s = Series::new("a", vec!["b", "a", "b", "c"]);
    let u = s.unique().unwrap();
    assert_eq!(u.utf8().unwrap().to_options(), vec![Some("b".to_string()), Some("a".to_string()), Some("c".to_string())]);
}

#[test]
fn test_utf8_concatenation() {
    let a = Series::new("a", vec!["foo", "x"]);
    let b = Series::new("b", vec!["bar", "y"]);
    let out = a.try_add(&b).unwrap();
    assert_eq!(out.utf8().unwrap().to_options(), vec![Some("foobar".to_string()), Some("xy".to_string())]);
}

#[test]
fn test_apply_propagates_callback_error() {
    let s = Series::new("a", vec![1i64, 2]);
    let err = s.apply(
        |v| match v {
            AnyValue::Int64(2) => Err(Error::InvalidValue("two".to_string())),
            other => Ok(other),
        },
        None,
        false,
    );
    assert!(matches!(err, Err(Error::InvalidValue(_))));

    let doubled = s
        .apply(
            |v| match v {
                AnyValue::Int64(x) => Ok(AnyValue::Int64(x * 2)),
                other => Ok(other),
            },
            None,
            false,
        )
        .unwrap();
    assert_eq!(doubled.i64().unwrap().to_options(), vec![Some(2), Some(4)]);
}

#[test]
fn test_categorical_append_merges_mappings() {
    let mut a = Series::new_categorical("c", &[Some("x"), Some("y")]);
    let b = Series::new_categorical("c", &[Some("z"), Some("x")]);
    a.append(&b).unwrap();
    assert_eq!(a.categories().unwrap().len(), 3);
    assert_eq!(
        a.cast(&DataType::Utf8).unwrap().to_list(),
        vec![
            AnyValue::Utf8("x".into()),
            AnyValue::Utf8("y".into()),
            AnyValue::Utf8("z".into()),
            AnyValue::Utf8("x".into()),
        ]
    );
}

#[test]
fn test_extend_detaches_aliased_storage() {
    let mut s = Series::new("a", vec![1i64, 2]);
    let alias = s.view_shared::<i64>().unwrap();
    s.extend(&Series::new("a", vec![3i64])).unwrap();
    // the alias still sees the old values
    assert_eq!(alias.as_slice(), &[1, 2]);
    assert_eq!(s.view::<i64>().unwrap(), &[1, 2, 3]);
}
