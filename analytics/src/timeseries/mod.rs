//! Time series primitives.
//!
//! Provides the fixed-step [`TimeSeries`], NaN-aware [`Aggregate`]s and
//! deterministic [`top`]-K selection. All operations are pure: inputs are
//! borrowed and never mutated, and missing data stays NaN rather than zero.

mod aggregate;
mod series;
mod top;

use std::collections::BTreeMap;

pub use aggregate::Aggregate;
pub use series::{max, nan_sum, Combinator, Sample, TimeSeries};
pub use top::{top, top_with_other, NamedSeries, OTHER};

/// Series keyed by a unique, display-ready label.
pub type NamedSeriesSet = BTreeMap<String, TimeSeries>;
