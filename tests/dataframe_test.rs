use colrs::prelude::*;

fn sales() -> DataFrame {
    DataFrame::new(vec![
        Series::new("region", vec!["east", "west", "east", "west", "east"]),
        Series::new("product", vec!["a", "a", "b", "b", "a"]),
        Series::new("units", vec![3i64, 5, 2, 7, 4]),
        Series::new("price", vec![1.5f64, 2.0, 3.0, 1.0, 2.5]),
    ])
    .unwrap()
}

#[test]
fn test_basic_accessors() {
    let df = sales();
    assert_eq!(df.shape(), (5, 4));
    assert_eq!(df.get_column_names(), vec!["region", "product", "units", "price"]);
    assert!(matches!(df.column("missing"), Err(Error::ColumnNotFound(_))));
    assert_eq!(df.head(Some(2)).height(), 2);
    assert_eq!(df.get_row(-1).unwrap()[2], AnyValue::Int64(4));
}

#[test]
fn test_sort_and_filter() {
    let df = sales();
    let sorted = df.sort(&["units"], true).unwrap();
    assert_eq!(sorted.column("units").unwrap().i64().unwrap().to_options()[0], Some(7));

    let mask = df.column("units").unwrap().compare_with(3i64, colrs::series::comparison::CmpOp::Gt).unwrap();
    let filtered = df.filter(&mask).unwrap();
    assert_eq!(filtered.height(), 3);
}

#[test]
fn test_vstack_appends_chunks() {
    let df = sales();
    let stacked = df.vstack(&df).unwrap();
    assert_eq!(stacked.height(), 10);
    assert_eq!(stacked.n_chunks(), 2);
}

#[test]
fn test_inner_join_single_match() {
    let left = DataFrame::new(vec![
        Series::new("k", vec![1i64, 2]),
        Series::new("v", vec![10i64, 20]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![
        Series::new("k", vec![2i64, 3]),
        Series::new("w", vec![200i64, 300]),
    ])
    .unwrap();
    let out = left.inner_join(&right, "k", "k").unwrap();
    assert_eq!(out.shape(), (1, 3));
    assert_eq!(out.get_column_names(), vec!["k", "v", "w"]);
    assert_eq!(
        out.get_row(0).unwrap(),
        vec![AnyValue::Int64(2), AnyValue::Int64(20), AnyValue::Int64(200)]
    );
}

#[test]
fn test_left_join_keeps_unmatched_rows() {
    let left = DataFrame::new(vec![
        Series::new("k", vec![1i64, 2, 3]),
        Series::new("v", vec!["a", "b", "c"]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![
        Series::new("id", vec![3i32, 1]),
        Series::new("w", vec![30.0f64, 10.0]),
    ])
    .unwrap();
    let out = left.left_join(&right, "k", "id").unwrap();
    assert_eq!(out.height(), 3);
    assert_eq!(out.get_column_names(), vec!["k", "v", "w"]);
    assert_eq!(
        out.column("w").unwrap().f64().unwrap().to_options(),
        vec![Some(10.0), None, Some(30.0)]
    );
}

#[test]
fn test_join_suffixes_colliding_names() {
    let left = DataFrame::new(vec![
        Series::new("k", vec![1i64]),
        Series::new("v", vec![1i64]),
    ])
    .unwrap();
    let right = DataFrame::new(vec![
        Series::new("k", vec![1i64]),
        Series::new("v", vec![2i64]),
    ])
    .unwrap();
    let out = left.join(&right, "k", "k", JoinType::Inner).unwrap();
    assert_eq!(out.get_column_names(), vec!["k", "v", "v_right"]);
}

#[test]
fn test_groupby_sum_and_size() {
    let df = sales();
    let gb = df.groupby(&["region"]).unwrap();
    assert_eq!(gb.group_count(), 2);

    let sums = gb.agg("units", AggFunction::Sum).unwrap();
    assert_eq!(sums.get_column_names(), vec!["region", "units_sum"]);
    assert_eq!(
        sums.column("units_sum").unwrap().i64().unwrap().to_options(),
        vec![Some(9), Some(12)]
    );

    let size = gb.size().unwrap();
    assert_eq!(
        size.column("size").unwrap().cast(&DataType::Int64).unwrap().i64().unwrap().to_options(),
        vec![Some(3), Some(2)]
    );
}

#[test]
fn test_groupby_multiple_keys() {
    let df = sales();
    let gb = df.groupby(&["region", "product"]).unwrap();
    assert_eq!(gb.group_count(), 4);
    let means = gb.mean().unwrap();
    // non-numeric columns are skipped by numeric reducers
    assert_eq!(means.get_column_names(), vec!["region", "product", "units_mean", "price_mean"]);
    assert_eq!(
        means.column("units_mean").unwrap().f64().unwrap().to_options()[0],
        Some(3.5)
    );
}

#[test]
fn test_groupby_count_skips_nulls() {
    let df = DataFrame::new(vec![
        Series::new("k", vec!["x", "x", "y"]),
        Series::new("v", vec![Some(1i64), None, None]),
    ])
    .unwrap();
    let counts = df.groupby(&["k"]).unwrap().count().unwrap();
    assert_eq!(
        counts.column("v_count").unwrap().cast(&DataType::Int64).unwrap().i64().unwrap().to_options(),
        vec![Some(1), Some(0)]
    );
}

#[test]
fn test_groupby_parallel_matches_serial() {
    let n = 5000i64;
    let df = DataFrame::new(vec![
        Series::new("k", (0..n).map(|i| i % 7).collect::<Vec<_>>()),
        Series::new("v", (0..n).collect::<Vec<_>>()),
    ])
    .unwrap();
    let serial = df.groupby(&["k"]).unwrap().sum().unwrap();
    let parallel = df.groupby(&["k"]).unwrap().parallel(true).sum().unwrap();
    assert_eq!(serial, parallel);
}

#[test]
fn test_pivot_mean() {
    let df = sales();
    let out = df.pivot(&["region"], "product", "price", AggFunction::Mean).unwrap();
    assert_eq!(out.get_column_names(), vec!["region", "a", "b"]);
    assert_eq!(
        out.column("a").unwrap().f64().unwrap().to_options(),
        vec![Some(2.0), Some(2.0)]
    );
    assert_eq!(
        out.column("b").unwrap().f64().unwrap().to_options(),
        vec![Some(3.0), Some(1.0)]
    );
}

#[test]
fn test_pivot_rejects_unknown_column() {
    let df = sales();
    assert!(df.pivot(&["region"], "color", "units", AggFunction::Sum).is_err());
}
