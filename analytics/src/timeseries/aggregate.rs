//! Pointwise aggregation of several series.

use super::series::{self, Combinator, TimeSeries};

/// Combines any number of series pointwise with a NaN-aware combinator.
///
/// Inputs are borrowed and never mutated. The first non-empty input fixes
/// the range; inputs with a different range are left out.
///
/// # Example
///
/// ```
/// use analytics::timeseries::{Aggregate, TimeSeries};
/// use chrono::{TimeDelta, Utc};
///
/// let now = Utc::now();
/// let a = TimeSeries::new(now, TimeDelta::seconds(60), vec![1.0, f64::NAN]).unwrap();
/// let b = TimeSeries::new(now, TimeDelta::seconds(60), vec![2.0, f64::NAN]).unwrap();
///
/// let total = Aggregate::nan_sum().with(&a).with(&b).get();
/// assert_eq!(total.values()[0], 3.0);
/// assert!(total.values()[1].is_nan());
/// ```
#[derive(Debug, Clone)]
pub struct Aggregate<'a> {
    combine: Combinator,
    inputs: Vec<&'a TimeSeries>,
}

impl<'a> Aggregate<'a> {
    /// Creates an aggregate with the given combinator.
    #[must_use]
    pub fn new(combine: Combinator) -> Self {
        Self {
            combine,
            inputs: Vec::new(),
        }
    }

    /// Creates an aggregate that sums defined values.
    #[must_use]
    pub fn nan_sum() -> Self {
        Self::new(series::nan_sum)
    }

    /// Creates an aggregate that takes the maximum of defined values.
    #[must_use]
    pub fn max() -> Self {
        Self::new(series::max)
    }

    /// Adds an input series.
    pub fn add(&mut self, series: &'a TimeSeries) -> &mut Self {
        self.inputs.push(series);
        self
    }

    /// Adds an input series, builder style.
    #[must_use]
    pub fn with(mut self, series: &'a TimeSeries) -> Self {
        self.inputs.push(series);
        self
    }

    /// Returns true if no input was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Finalizes the aggregate into one series.
    ///
    /// At each instant the output is NaN only if every input is NaN there.
    #[must_use]
    pub fn get(self) -> TimeSeries {
        let Some(reference) = self.inputs.iter().find(|ts| ts.len() > 0) else {
            return TimeSeries::default();
        };

        let mut values = vec![f64::NAN; reference.len()];
        for input in &self.inputs {
            if input.len() == 0 {
                continue;
            }
            if !input.same_range(reference) {
                tracing::warn!(
                    expected_from = %reference.from(),
                    expected_len = reference.len(),
                    from = %input.from(),
                    len = input.len(),
                    "Skipping aggregate input with a mismatched range"
                );
                continue;
            }
            for (acc, &v) in values.iter_mut().zip(input.values()) {
                *acc = (self.combine)(*acc, v);
            }
        }

        reference.with_values(values)
    }
}
