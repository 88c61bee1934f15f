use colrs::prelude::*;

fn frame() -> DataFrame {
    DataFrame::new(vec![
        Series::new("id", vec![1i64, 2, 3, 4]),
        Series::new("score", vec![Some(10.0f64), None, Some(30.0), Some(40.0)]),
        Series::new("name", vec!["ann", "bob", "cy", "dee"]),
        Series::new("active", vec![true, false, true, true]),
    ])
    .unwrap()
}

#[test]
fn test_unknown_column_fails_at_evaluation() {
    // building the expression succeeds
    let e = col("nope") + 1i64;
    assert!(matches!(frame().select(&[e]), Err(Error::ColumnNotFound(_))));
}

#[test]
fn test_arithmetic_and_alias() {
    let df = frame();
    let out = df
        .select(&[(col("id") * 2i64 + 1i64).alias("odd"), (col("score") / lit(10.0f64)).alias("tenths")])
        .unwrap();
    assert_eq!(
        out.column("odd").unwrap().i64().unwrap().to_options(),
        vec![Some(3), Some(5), Some(7), Some(9)]
    );
    assert_eq!(out.column("tenths").unwrap().null_count(), 1);
}

#[test]
fn test_literal_on_the_left() {
    let df = frame();
    let out = df.select(&[lit(10i64) - col("id")]).unwrap();
    assert_eq!(out.get_column_names(), vec!["id"]);
    assert_eq!(
        out.column("id").unwrap().i64().unwrap().to_options(),
        vec![Some(9), Some(8), Some(7), Some(6)]
    );
}

#[test]
fn test_with_columns_replaces_and_appends() {
    let df = frame();
    let out = df
        .with_columns(&[col("id").cast(DataType::Float64), col("score").fill_null(lit(0.0f64)).alias("filled")])
        .unwrap();
    assert_eq!(out.width(), 5);
    assert_eq!(out.column("id").unwrap().dtype(), &DataType::Float64);
    assert_eq!(out.column("filled").unwrap().null_count(), 0);
}

#[test]
fn test_chained_when_then() {
    let df = frame();
    let grade = when(col("score").gt_eq(30.0f64))
        .then(lit("high"))
        .when(col("score").gt_eq(10.0f64))
        .then(lit("low"))
        .otherwise(lit("none"))
        .alias("grade");
    let out = df.select(&[grade]).unwrap();
    assert_eq!(
        out.column("grade").unwrap().to_list(),
        vec![
            AnyValue::Utf8("low".into()),
            AnyValue::Utf8("none".into()),
            AnyValue::Utf8("high".into()),
            AnyValue::Utf8("high".into()),
        ]
    );
}

#[test]
fn test_when_without_otherwise_is_null() {
    let df = frame();
    let e: Expr = when(col("active")).then(col("id")).into();
    let out = df.select(&[e]).unwrap();
    assert_eq!(
        out.column("id").unwrap().i64().unwrap().to_options(),
        vec![Some(1), None, Some(3), Some(4)]
    );
}

#[test]
fn test_boolean_logic_and_filters() {
    let df = frame();
    let mask = df
        .select(&[col("active").and(col("id").gt(1i64)).alias("m")])
        .unwrap();
    let filtered = df.filter(mask.column("m").unwrap()).unwrap();
    assert_eq!(filtered.height(), 2);

    let negated = df.select(&[(!col("active")).alias("inactive")]).unwrap();
    assert_eq!(negated.column("inactive").unwrap().bool().unwrap().to_options()[1], Some(true));
}

#[test]
fn test_aggregations_broadcast() {
    let df = frame();
    let out = df
        .select(&[
            col("name"),
            col("score").mean().alias("avg"),
            col("score").count().alias("n"),
            col("id").max().alias("top"),
        ])
        .unwrap();
    assert_eq!(out.height(), 4);
    assert_eq!(
        out.column("avg").unwrap().f64().unwrap().non_null_values(),
        vec![80.0 / 3.0; 4]
    );
    assert_eq!(out.column("top").unwrap().get(0).unwrap(), AnyValue::Int64(4));
}

#[test]
fn test_aggregations_only() {
    let df = frame();
    let out = df.select(&[col("id").sum(), col("score").std(1).alias("sd")]).unwrap();
    assert_eq!(out.shape(), (1, 2));
    assert_eq!(out.column("id").unwrap().get(0).unwrap(), AnyValue::Int64(10));
}

#[test]
fn test_mismatched_lengths() {
    let df = frame();
    let result = df.select(&[col("id"), col("score").drop_nulls()]);
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}

#[test]
fn test_multi_column_expansion() {
    let df = frame();
    let out = df.select(&[cols(&["id", "score"]) * 2i64]).unwrap();
    assert_eq!(out.get_column_names(), vec!["id", "score"]);

    let out = df.select(&[dtype_col(&DataType::Boolean)]).unwrap();
    assert_eq!(out.get_column_names(), vec!["active"]);

    let out = df.select(&[first(), last()]).unwrap();
    assert_eq!(out.get_column_names(), vec!["id", "active"]);

    let out = df.select(&[nth(-2)]).unwrap();
    assert_eq!(out.get_column_names(), vec!["name"]);
}

#[test]
fn test_selector_composition() {
    let df = frame();
    let sel = Selector::numeric() | Selector::boolean();
    let out = df.select(&[sel.into()]).unwrap();
    assert_eq!(out.get_column_names(), vec!["id", "score", "active"]);

    let sel = Selector::all() - Selector::starts_with(&["s"]);
    let out = df.select(&[sel.into()]).unwrap();
    assert_eq!(out.get_column_names(), vec!["id", "name", "active"]);
}

#[test]
fn test_element_wise_apply_and_batch_map() {
    let df = frame();
    let upper = col("name").apply(
        |v| match v {
            AnyValue::Utf8(s) => Ok(AnyValue::Utf8(s.to_uppercase())),
            other => Ok(other),
        },
        Some(DataType::Utf8),
    );
    let out = df.select(&[upper]).unwrap();
    assert_eq!(out.column("name").unwrap().get(0).unwrap(), AnyValue::Utf8("ANN".into()));

    let reversed = col("id").map(|s: &Series| Ok(s.reverse()));
    let out = df.select(&[reversed]).unwrap();
    assert_eq!(out.column("id").unwrap().get(0).unwrap(), AnyValue::Int64(4));
}

#[test]
fn test_apply_error_propagates() {
    let df = frame();
    let failing = col("id").apply(|_| Err(Error::InvalidValue("boom".to_string())), None);
    assert!(matches!(df.select(&[failing]), Err(Error::InvalidValue(_))));
}

#[test]
fn test_is_in_and_rank() {
    let df = frame();
    let values = Series::new("values", vec![2i64, 4]);
    let out = df
        .select(&[
            col("id").is_in(lit(values)).alias("hit"),
            col("id").rank(RankMethod::Ordinal, true).cast(DataType::Int64).alias("r"),
        ])
        .unwrap();
    assert_eq!(
        out.column("hit").unwrap().bool().unwrap().to_options(),
        vec![Some(false), Some(true), Some(false), Some(true)]
    );
    assert_eq!(
        out.column("r").unwrap().i64().unwrap().to_options(),
        vec![Some(4), Some(3), Some(2), Some(1)]
    );
}

#[test]
fn test_rolling_expression() {
    let df = frame();
    let out = df
        .select(&[col("id").rolling_sum(RollingOptions::new(2)).alias("rs")])
        .unwrap();
    assert_eq!(
        out.column("rs").unwrap().i64().unwrap().to_options(),
        vec![None, Some(3), Some(5), Some(7)]
    );
}

#[test]
fn test_series_eval() {
    let s = Series::new("x", vec![1i64, 2, 3]);
    let out = s.eval(&(col("x") * 10i64)).unwrap();
    assert_eq!(out.i64().unwrap().to_options(), vec![Some(10), Some(20), Some(30)]);
}

#[test]
fn test_apply_stays_on_calling_thread_by_default() {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::thread::{self, ThreadId};

    let n = 20_000i64;
    let df = DataFrame::new(vec![Series::new("a", (0..n).collect::<Vec<_>>())]).unwrap();

    let seen: Arc<Mutex<HashSet<ThreadId>>> = Arc::new(Mutex::new(HashSet::new()));
    let recorder = Arc::clone(&seen);
    let tracked = col("a").apply(
        move |v| {
            recorder.lock().unwrap().insert(thread::current().id());
            Ok(v)
        },
        None,
    );
    let out = df.select(&[tracked]).unwrap();
    assert_eq!(out.height(), n as usize);

    let threads = seen.lock().unwrap();
    assert_eq!(threads.len(), 1);
    assert!(threads.contains(&thread::current().id()));
}

#[test]
fn test_parallel_apply_matches_serial() {
    let n = 20_000i64;
    let df = DataFrame::new(vec![Series::new("a", (0..n).collect::<Vec<_>>())]).unwrap();
    let double = |v: AnyValue| match v {
        AnyValue::Int64(x) => Ok(AnyValue::Int64(x * 2)),
        other => Ok(other),
    };
    let serial = df.select(&[col("a").apply(double, None)]).unwrap();
    let parallel = df
        .select(&[col("a").apply(double, None).alias("a").parallel(true)])
        .unwrap();
    assert_eq!(serial, parallel);
    assert_eq!(parallel.column("a").unwrap().get(-1).unwrap(), AnyValue::Int64(2 * (n - 1)));
}

#[test]
fn test_inverting_positional_selector_fails() {
    let df = frame();
    let result = df.select(&[(!Selector::last()).into()]);
    assert!(matches!(result, Err(Error::InvalidOperation(_))));
    let out = df.select(&[(!Selector::numeric()).into()]).unwrap();
    assert_eq!(out.get_column_names(), vec!["name", "active"]);
}
