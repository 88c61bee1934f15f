// Series and DataFrame benchmarks using Criterion
use colrs::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_construct_series(c: &mut Criterion) {
    let values: Vec<AnyValue> = (0..10_000)
        .map(|i| {
            if i % 10 == 0 {
                AnyValue::Null
            } else {
                AnyValue::Int64(i)
            }
        })
        .collect();
    let options = ConstructOptions::default();

    c.bench_function("construct_from_any_values_10k", |b| {
        b.iter(|| {
            let s = Series::construct("a", values.clone(), None, &options).unwrap();
            black_box(s)
        });
    });

    c.bench_function("new_from_vec_100k", |b| {
        b.iter(|| {
            let s = Series::new("a", (0..100_000i64).collect::<Vec<_>>());
            black_box(s)
        });
    });
}

fn bench_arithmetic(c: &mut Criterion) {
    let a = Series::new("a", (0..100_000i64).collect::<Vec<_>>());
    let b = Series::new("b", (0..100_000).map(|i| i as f64 * 0.5).collect::<Vec<_>>());

    c.bench_function("add_int_float_100k", |bench| {
        bench.iter(|| black_box(a.try_add(&b).unwrap()));
    });

    c.bench_function("mul_int_int_100k", |bench| {
        bench.iter(|| black_box(a.try_mul(&a).unwrap()));
    });
}

fn bench_rolling(c: &mut Criterion) {
    let s = Series::new("x", (0..50_000).map(|i| (i % 97) as f64).collect::<Vec<_>>());
    let options = RollingOptions::new(20);
    let parallel = RollingOptions::new(20).parallel(true);

    c.bench_function("rolling_sum_50k", |b| {
        b.iter(|| black_box(s.rolling_sum(&options).unwrap()));
    });

    c.bench_function("rolling_mean_50k_parallel", |b| {
        b.iter(|| black_box(s.rolling_mean(&parallel).unwrap()));
    });
}

fn bench_groupby(c: &mut Criterion) {
    let n = 50_000i64;
    let df = DataFrame::new(vec![
        Series::new("k", (0..n).map(|i| i % 100).collect::<Vec<_>>()),
        Series::new("v", (0..n).map(|i| i as f64).collect::<Vec<_>>()),
    ])
    .unwrap();

    c.bench_function("groupby_sum_50k", |b| {
        b.iter(|| black_box(df.groupby(&["k"]).unwrap().sum().unwrap()));
    });

    c.bench_function("groupby_sum_50k_parallel", |b| {
        b.iter(|| black_box(df.groupby(&["k"]).unwrap().parallel(true).sum().unwrap()));
    });
}

criterion_group!(
    series_benches,
    bench_construct_series,
    bench_arithmetic,
    bench_rolling,
    bench_groupby
);

criterion_main!(series_benches);
