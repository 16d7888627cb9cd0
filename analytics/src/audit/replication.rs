//! Replication lag estimation.
//!
//! A replica's lag is observed in bytes: how far its replayed write-ahead
//! position trails the primary's current position. Bytes are hard to compare
//! across workloads, so the lag is also expressed as time: how long ago the
//! primary was at the position the replica has replayed up to.
//!
//! The primary position only grows, except when a failover or redeploy
//! resets it to a lower value. Samples above the current position belong to
//! an earlier epoch and are never used to date the lag.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::audit::report::Cell;
use crate::check::Check;
use crate::format::{format_bytes, format_duration};
use crate::model::ClusterRole;
use crate::timeseries::TimeSeries;

/// Estimated lag of one replica.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReplicationLag {
    /// Bytes the replica has yet to replay, never negative.
    pub byte_lag: f64,
    /// How long ago the primary was at the replayed position.
    #[serde(serialize_with = "serialize_secs")]
    pub time_lag: TimeDelta,
    /// True if the retained history does not reach back far enough, so the
    /// real lag may be larger than `time_lag`.
    pub lower_bound_only: bool,
}

impl ReplicationLag {
    /// Estimates the lag of a replica.
    ///
    /// Returns `None` when the instance is not a replica, the primary has no
    /// data, or the replayed position is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use analytics::audit::ReplicationLag;
    /// use analytics::model::ClusterRole;
    /// use analytics::timeseries::TimeSeries;
    /// use chrono::{TimeDelta, Utc};
    ///
    /// let step = TimeDelta::seconds(60);
    /// let now = Utc::now();
    /// let primary = TimeSeries::new(now, step, vec![100.0, 200.0, 300.0, 400.0]).unwrap();
    /// let replay = TimeSeries::new(now, step, vec![100.0, 100.0, 150.0, 200.0]).unwrap();
    ///
    /// let lag = ReplicationLag::estimate(&primary, &replay, ClusterRole::Replica).unwrap();
    /// assert_eq!(lag.byte_lag, 200.0);
    /// assert_eq!(lag.time_lag, TimeDelta::seconds(120));
    /// assert!(!lag.lower_bound_only);
    /// ```
    #[must_use]
    pub fn estimate(primary: &TimeSeries, replay: &TimeSeries, role: ClusterRole) -> Option<Self> {
        if role != ClusterRole::Replica {
            return None;
        }
        let now = primary.last_not_nan()?;
        let diff = now.value - replay.last();
        if diff.is_nan() {
            return None;
        }
        let byte_lag = diff.max(0.0);
        let target = now.value - byte_lag;

        let mut window_start: Option<DateTime<Utc>> = None;
        let mut past: Option<DateTime<Utc>> = None;
        for sample in primary.iter() {
            // NaN is missing data; values above `now` predate a reset.
            if sample.value.is_nan() || sample.value > now.value {
                continue;
            }
            window_start.get_or_insert(sample.time);
            if sample.value > target {
                break;
            }
            past = Some(sample.time);
        }

        let (from, lower_bound_only) = match past {
            Some(t) => (t, false),
            None => (window_start.unwrap_or(now.time), true),
        };

        Some(Self {
            byte_lag,
            time_lag: now.time - from,
            lower_bound_only,
        })
    }

    /// Returns true if the time lag is longer than `threshold_secs`.
    #[must_use]
    pub fn exceeds(&self, threshold_secs: f64) -> bool {
        secs(self.time_lag) > threshold_secs
    }

    /// Renders the lag as a table cell: formatted bytes plus a time tag,
    /// prefixed with `>` when the time is only a lower bound.
    #[must_use]
    pub fn cell(&self) -> Cell {
        let (value, unit) = format_bytes(self.byte_lag);
        let mut cell = Cell::new(value).with_unit(unit);
        if self.time_lag > TimeDelta::zero() {
            let prefix = if self.lower_bound_only { ">" } else { "" };
            cell = cell.with_tag(format!("{prefix}{}", format_duration(self.time_lag, 1)));
        }
        cell
    }
}

/// Byte lag at every instant: `max(0, primary - replay)`.
#[must_use]
pub fn byte_lag_series(primary: &TimeSeries, replay: &TimeSeries) -> TimeSeries {
    primary.map2(replay, |p, r| {
        let lag = p - r;
        if lag < 0.0 {
            0.0
        } else {
            lag
        }
    })
}

/// Estimates the lag of `instance`, records it on the check if it is longer
/// than the check threshold, and returns the table cell.
///
/// Instances without an estimate get an empty cell.
pub fn check_replication_lag(
    instance: &str,
    primary: &TimeSeries,
    replay: Option<&TimeSeries>,
    role: ClusterRole,
    check: &mut Check,
) -> Cell {
    let Some(lag) = replay.and_then(|replay| ReplicationLag::estimate(primary, replay, role)) else {
        return Cell::empty();
    };
    if lag.exceeds(check.threshold) {
        tracing::debug!(
            instance,
            byte_lag = lag.byte_lag,
            time_lag_secs = secs(lag.time_lag),
            lower_bound_only = lag.lower_bound_only,
            "Replica lagging behind the primary"
        );
        check.add_item(instance);
    }
    lag.cell()
}

#[allow(clippy::cast_precision_loss)]
fn secs(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

fn serialize_secs<S: serde::Serializer>(
    delta: &TimeDelta,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(secs(*delta))
}
