//! Fixed-step time series.
//!
//! A `TimeSeries` is an immutable sequence of values sampled at a fixed step
//! starting at `from`. A NaN value means "no data" and is never treated as zero.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A binary NaN-aware combinator used by aggregates and reductions.
pub type Combinator = fn(f64, f64) -> f64;

/// Adds two values, ignoring NaN operands.
///
/// The result is NaN only if both operands are NaN.
#[must_use]
pub fn nan_sum(a: f64, b: f64) -> f64 {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => f64::NAN,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a + b,
    }
}

/// Returns the larger of two values, ignoring NaN operands.
///
/// The result is NaN only if both operands are NaN.
#[must_use]
pub fn max(a: f64, b: f64) -> f64 {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => f64::NAN,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a.max(b),
    }
}

/// A single sample of a time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// The instant of the sample.
    pub time: DateTime<Utc>,
    /// The sampled value, NaN if there is no data.
    pub value: f64,
}

/// Errors that can occur while building a series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    /// The step is not a positive whole number of milliseconds.
    #[error("Invalid step {0}: must be a positive whole number of milliseconds")]
    InvalidStep(TimeDelta),

    /// The last sample would fall outside the supported time range.
    #[error("Series of {len} samples from {from} with step {step} is out of range")]
    OutOfRange {
        /// Start of the series.
        from: DateTime<Utc>,
        /// Sampling step.
        step: TimeDelta,
        /// Number of samples.
        len: usize,
    },
}

/// An immutable fixed-step series covering `[from, from + step * len)`.
///
/// The step is a positive whole number of milliseconds and every instant of
/// the range is representable, so sample times never overflow.
///
/// # Example
///
/// ```
/// use analytics::timeseries::TimeSeries;
/// use chrono::{TimeDelta, TimeZone, Utc};
///
/// let from = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// let ts = TimeSeries::new(from, TimeDelta::seconds(30), vec![1.0, f64::NAN, 3.0]).unwrap();
///
/// assert_eq!(ts.len(), 3);
/// assert_eq!(ts.last(), 3.0);
/// assert!(!ts.is_empty());
/// assert!(TimeSeries::new(from, TimeDelta::zero(), vec![1.0]).is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSeries", into = "RawTimeSeries")]
pub struct TimeSeries {
    from: DateTime<Utc>,
    step: TimeDelta,
    values: Vec<f64>,
}

/// Wire form of a series: the step is carried in milliseconds and NaN as `null`.
#[derive(Serialize, Deserialize)]
struct RawTimeSeries {
    from: DateTime<Utc>,
    step_ms: i64,
    #[serde(with = "nan_as_null")]
    values: Vec<f64>,
}

impl TryFrom<RawTimeSeries> for TimeSeries {
    type Error = SeriesError;

    fn try_from(raw: RawTimeSeries) -> Result<Self, Self::Error> {
        match TimeDelta::try_milliseconds(raw.step_ms) {
            Some(step) => Self::new(raw.from, step, raw.values),
            None => Err(SeriesError::InvalidStep(TimeDelta::zero())),
        }
    }
}

impl From<TimeSeries> for RawTimeSeries {
    fn from(ts: TimeSeries) -> Self {
        Self {
            from: ts.from,
            step_ms: ts.step.num_milliseconds(),
            values: ts.values,
        }
    }
}

impl TimeSeries {
    /// Creates a series from raw values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The step is zero, negative or not a whole number of milliseconds
    /// - The end of the range is not a representable instant
    pub fn new(
        from: DateTime<Utc>,
        step: TimeDelta,
        values: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        let whole_ms = TimeDelta::try_milliseconds(step.num_milliseconds()) == Some(step);
        if step <= TimeDelta::zero() || !whole_ms {
            return Err(SeriesError::InvalidStep(step));
        }
        if offset(from, step, values.len()).is_none() {
            return Err(SeriesError::OutOfRange {
                from,
                step,
                len: values.len(),
            });
        }
        Ok(Self { from, step, values })
    }

    /// Creates a series of `len` NaN values.
    ///
    /// # Errors
    ///
    /// See [`TimeSeries::new`].
    pub fn nan(from: DateTime<Utc>, step: TimeDelta, len: usize) -> Result<Self, SeriesError> {
        Self::new(from, step, vec![f64::NAN; len])
    }

    /// Returns the start of the range (inclusive).
    #[must_use]
    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    /// Returns the end of the range (exclusive).
    #[must_use]
    pub fn to(&self) -> DateTime<Utc> {
        self.time_at(self.values.len())
    }

    /// Returns the sampling step.
    #[must_use]
    pub fn step(&self) -> TimeDelta {
        self.step
    }

    /// Returns the number of samples, defined or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the raw values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns true if the series has no defined (non-NaN) sample.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_nan())
    }

    /// Returns true if both series share the same range and step.
    #[must_use]
    pub fn same_range(&self, other: &Self) -> bool {
        self.from == other.from
            && self.step == other.step
            && self.values.len() == other.values.len()
    }

    /// Returns the instant of the sample at `index`.
    ///
    /// Indices up to `len()` are always representable; later ones saturate
    /// at the latest supported instant.
    #[must_use]
    pub fn time_at(&self, index: usize) -> DateTime<Utc> {
        offset(self.from, self.step, index).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Iterates over samples in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        self.values.iter().enumerate().map(|(i, &value)| Sample {
            time: self.time_at(i),
            value,
        })
    }

    /// Returns the value at the latest instant, NaN if there is none.
    #[must_use]
    pub fn last(&self) -> f64 {
        self.values.last().copied().unwrap_or(f64::NAN)
    }

    /// Returns the latest defined sample.
    #[must_use]
    pub fn last_not_nan(&self) -> Option<Sample> {
        self.values
            .iter()
            .rposition(|v| !v.is_nan())
            .map(|i| Sample {
                time: self.time_at(i),
                value: self.values[i],
            })
    }

    /// Folds all values with a NaN-aware combinator.
    ///
    /// Returns NaN if the series has no defined sample.
    #[must_use]
    pub fn reduce(&self, combine: Combinator) -> f64 {
        self.values.iter().fold(f64::NAN, |acc, &v| combine(acc, v))
    }

    /// Applies `f` to every value.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.with_values(self.values.iter().map(|&v| f(v)).collect())
    }

    /// Combines two series pointwise.
    ///
    /// Series with different ranges cannot be combined; an all-NaN series
    /// shaped like `self` is returned in that case.
    #[must_use]
    pub fn map2(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        if !self.same_range(other) {
            tracing::warn!(
                left_from = %self.from,
                right_from = %other.from,
                left_len = self.len(),
                right_len = other.len(),
                "Cannot combine series with different ranges"
            );
            return self.with_values(vec![f64::NAN; self.len()]);
        }
        self.with_values(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        )
    }

    /// Returns a series on the same grid holding `values`.
    ///
    /// `values` must be as long as `self`.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            from: self.from,
            step: self.step,
            values,
        }
    }
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self {
            from: DateTime::<Utc>::UNIX_EPOCH,
            step: TimeDelta::seconds(1),
            values: Vec::new(),
        }
    }
}

/// Instant `index` steps after `from`, `None` if it is not representable.
fn offset(from: DateTime<Utc>, step: TimeDelta, index: usize) -> Option<DateTime<Utc>> {
    let index = i64::try_from(index).ok()?;
    let ms = step.num_milliseconds().checked_mul(index)?;
    from.checked_add_signed(TimeDelta::try_milliseconds(ms)?)
}

/// Serializes NaN as JSON `null` and back.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}
