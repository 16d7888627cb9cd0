//! Integration tests for series aggregation and ranking.

use analytics::timeseries::{max, nan_sum, top, top_with_other, Aggregate, NamedSeriesSet, OTHER};
use chrono::TimeDelta;

use super::common::{series, start};

const NAN: f64 = f64::NAN;

fn set(entries: &[(&str, &[f64])]) -> NamedSeriesSet {
    entries
        .iter()
        .map(|(name, values)| ((*name).to_string(), series(values)))
        .collect()
}

#[test]
fn test_nan_sum_across_instances() {
    let a = series(&[1.0, NAN, 3.0, NAN]);
    let b = series(&[NAN, NAN, 4.0, 2.0]);
    let c = series(&[1.0, NAN, NAN, NAN]);

    let total = Aggregate::nan_sum().with(&a).with(&b).with(&c).get();

    let values = total.values();
    assert_eq!(values[0], 2.0);
    assert!(values[1].is_nan());
    assert_eq!(values[2], 7.0);
    assert_eq!(values[3], 2.0);
    assert_eq!(total.from(), start());
}

#[test]
fn test_max_aggregate_skips_mismatched_range() {
    let a = series(&[1.0, 5.0, 3.0]);
    let b = series(&[4.0, 2.0, NAN]);
    let shifted = analytics::timeseries::TimeSeries::new(
        start() + TimeDelta::minutes(1),
        TimeDelta::seconds(60),
        vec![100.0, 100.0, 100.0],
    )
    .unwrap();

    let result = Aggregate::max().with(&a).with(&shifted).with(&b).get();
    assert_eq!(result.values(), [4.0, 5.0, 3.0]);
}

#[test]
fn test_top_queries_by_total_time() {
    let queries = set(&[
        ("select * from orders", &[10.0, 20.0]),
        ("select * from users", &[NAN, NAN]),
        ("update stock", &[40.0, 40.0]),
        ("delete from carts", &[1.0, NAN]),
        ("insert into events", &[15.0, 15.0]),
    ]);

    // equal totals rank by label
    let names: Vec<_> = top(&queries, nan_sum, 3).into_iter().map(|s| s.name).collect();
    assert_eq!(names, ["update stock", "insert into events", "select * from orders"]);
}

#[test]
fn test_top_with_other_sums_the_tail() {
    let patterns = set(&[
        ("timeout", &[5.0, 5.0]),
        ("deadlock", &[1.0, NAN]),
        ("disk full", &[NAN, 2.0]),
        ("auth failed", &[3.0, 3.0]),
    ]);

    let ranked = top_with_other(&patterns, nan_sum, 2);
    let names: Vec<_> = ranked.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["timeout", "auth failed", OTHER]);
    assert_eq!(ranked[2].series.values(), [1.0, 2.0]);
}

#[test]
fn test_top_by_peak_value() {
    let set = set(&[("a", &[1.0, 9.0]), ("b", &[5.0, 5.0])]);

    let by_peak: Vec<_> = top(&set, max, 1).into_iter().map(|s| s.name).collect();
    assert_eq!(by_peak, ["a"]);

    let by_total: Vec<_> = top(&set, nan_sum, 1).into_iter().map(|s| s.name).collect();
    assert_eq!(by_total, ["b"]);
}
