//! Deterministic top-K selection over a named series set.

use serde::Serialize;
use std::cmp::Ordering;

use super::aggregate::Aggregate;
use super::series::{Combinator, TimeSeries};
use super::NamedSeriesSet;

/// Label of the series that folds entries left out of a top-K selection.
pub const OTHER: &str = "other";

/// A labelled series, as produced by top-K selection.
#[derive(Debug, Clone, Serialize)]
pub struct NamedSeries {
    /// The label of the series.
    pub name: String,
    /// The series itself.
    pub series: TimeSeries,
}

impl NamedSeries {
    /// Creates a labelled series.
    #[must_use]
    pub fn new(name: impl Into<String>, series: TimeSeries) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }
}

/// Returns the `k` entries with the largest reduced value, largest first.
///
/// The reduction folds each series with `reduce`; a NaN result ranks as zero.
/// Ties are broken by label in lexical order.
///
/// # Example
///
/// ```
/// use analytics::timeseries::{nan_sum, top, NamedSeriesSet, TimeSeries};
/// use chrono::{TimeDelta, Utc};
///
/// let now = Utc::now();
/// let mut set = NamedSeriesSet::new();
/// for (name, v) in [("q1", 50.0), ("q2", 80.0), ("q3", 10.0)] {
///     let series = TimeSeries::new(now, TimeDelta::seconds(60), vec![v]).unwrap();
///     set.insert(name.to_string(), series);
/// }
///
/// let names: Vec<_> = top(&set, nan_sum, 2).into_iter().map(|s| s.name).collect();
/// assert_eq!(names, ["q2", "q1"]);
/// ```
#[must_use]
pub fn top(set: &NamedSeriesSet, reduce: Combinator, k: usize) -> Vec<NamedSeries> {
    ranked(set, reduce)
        .into_iter()
        .take(k)
        .map(|(name, series)| NamedSeries::new(name, series.clone()))
        .collect()
}

/// Like [`top`], followed by an `"other"` series summing the discarded entries.
///
/// The `"other"` series is omitted when nothing was discarded.
#[must_use]
pub fn top_with_other(set: &NamedSeriesSet, reduce: Combinator, k: usize) -> Vec<NamedSeries> {
    let ranked = ranked(set, reduce);
    let (kept, rest) = ranked.split_at(k.min(ranked.len()));

    let mut result: Vec<NamedSeries> = kept
        .iter()
        .map(|(name, series)| NamedSeries::new(*name, (*series).clone()))
        .collect();

    if !rest.is_empty() {
        let mut other = Aggregate::nan_sum();
        for (_, series) in rest {
            other.add(series);
        }
        result.push(NamedSeries::new(OTHER, other.get()));
    }
    result
}

fn ranked(set: &NamedSeriesSet, reduce: Combinator) -> Vec<(&str, &TimeSeries)> {
    let mut scored: Vec<(f64, &str, &TimeSeries)> = set
        .iter()
        .map(|(name, series)| {
            let score = series.reduce(reduce);
            let score = if score.is_nan() { 0.0 } else { score };
            (score, name.as_str(), series)
        })
        .collect();

    scored.sort_by(|a, b| match b.0.total_cmp(&a.0) {
        Ordering::Equal => a.1.cmp(b.1),
        other => other,
    });

    scored
        .into_iter()
        .map(|(_, name, series)| (name, series))
        .collect()
}
