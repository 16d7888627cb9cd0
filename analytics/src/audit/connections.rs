//! Postgres connection state aggregation.
//!
//! Per-connection series are folded into a few canonical state buckets for
//! the saturation check and the overview chart, while idle-in-transaction and
//! lock-waiting connections stay at per-connection granularity for drill-down.

use std::collections::BTreeMap;

use crate::check::Check;
use crate::model::Postgres;
use crate::timeseries::{nan_sum, top, Aggregate, NamedSeries, NamedSeriesSet, TimeSeries};

/// Bucket of active connections waiting for a lock.
pub const ACTIVE_LOCKED_STATE: &str = "active (locked)";

/// Synthetic bucket of connection slots reserved for superusers.
pub const RESERVED_STATE: &str = "reserved";

/// State of connections holding an open transaction while idle.
pub const IDLE_IN_TRANSACTION_STATE: &str = "idle in transaction";

/// Setting holding the connection limit.
pub const MAX_CONNECTIONS_SETTING: &str = "max_connections";

/// Settings holding reserved connection slots. Present ones are summed.
pub const RESERVED_SETTINGS: [&str; 2] = [
    "superuser_reserved_connections",
    "rds.rds_superuser_reserved_connections",
];

const DRILL_DOWN_TOP: usize = 5;

/// Returns the suggested chart color of a canonical bucket.
#[must_use]
pub fn state_color(state: &str) -> Option<&'static str> {
    match state {
        "idle" => Some("grey-lighten2"),
        ACTIVE_LOCKED_STATE => Some("red-lighten2"),
        "active" => Some("green"),
        IDLE_IN_TRANSACTION_STATE => Some("lime"),
        RESERVED_STATE => Some("blue-lighten3"),
        _ => None,
    }
}

/// Connection counts of one instance, bucketed by state.
#[derive(Debug, Clone)]
pub struct ConnectionStates {
    /// Connection counts per canonical bucket, `reserved` included.
    pub by_state: BTreeMap<String, TimeSeries>,
    /// The `max_connections` setting, if reported.
    pub max_connections: Option<TimeSeries>,
    /// Top idle-in-transaction connections by connection identity.
    pub idle_in_transaction: Vec<NamedSeries>,
    /// Top lock-waiting connections by connection identity.
    pub locked: Vec<NamedSeries>,
}

impl ConnectionStates {
    /// Buckets the connections of an instance.
    #[must_use]
    pub fn new(postgres: &Postgres) -> Self {
        let mut buckets: BTreeMap<&str, Aggregate<'_>> = BTreeMap::new();
        for conn in &postgres.connections {
            let state = if conn.key.is_waiting_for_lock() {
                ACTIVE_LOCKED_STATE
            } else {
                conn.key.state.as_str()
            };
            buckets
                .entry(state)
                .or_insert_with(Aggregate::nan_sum)
                .add(&conn.series);
        }

        let mut reserved = Aggregate::nan_sum();
        for setting in RESERVED_SETTINGS {
            if let Some(series) = postgres.setting(setting) {
                reserved.add(series);
            }
        }

        let mut by_state: BTreeMap<String, TimeSeries> = buckets
            .into_iter()
            .map(|(state, agg)| (state.to_string(), agg.get()))
            .collect();
        by_state.insert(RESERVED_STATE.to_string(), reserved.get());

        let mut idle_in_transaction = NamedSeriesSet::new();
        let mut locked = NamedSeriesSet::new();
        for conn in &postgres.connections {
            if conn.key.state == IDLE_IN_TRANSACTION_STATE {
                idle_in_transaction.insert(conn.key.to_string(), conn.series.clone());
            } else if conn.key.is_waiting_for_lock() {
                locked.insert(conn.key.to_string(), conn.series.clone());
            }
        }

        Self {
            by_state,
            max_connections: postgres.setting(MAX_CONNECTIONS_SETTING).cloned(),
            idle_in_transaction: top(&idle_in_transaction, nan_sum, DRILL_DOWN_TOP),
            locked: top(&locked, nan_sum, DRILL_DOWN_TOP),
        }
    }

    /// Sum of the defined bucket values at the latest instant.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.by_state
            .values()
            .map(TimeSeries::last)
            .filter(|v| !v.is_nan())
            .sum()
    }

    /// Connection usage at the latest instant, percent of `max_connections`.
    ///
    /// Returns `None` if the limit is unknown or zero, or nothing is in use.
    #[must_use]
    pub fn saturation(&self) -> Option<f64> {
        let max = self.max_connections.as_ref().map_or(f64::NAN, TimeSeries::last);
        let total = self.total();
        if max > 0.0 && total > 0.0 {
            Some(total / max * 100.0)
        } else {
            None
        }
    }

    /// Records `instance` on the check if saturation exceeds its threshold.
    pub fn check(&self, instance: &str, check: &mut Check) {
        if let Some(saturation) = self.saturation() {
            if saturation > check.threshold {
                tracing::debug!(
                    instance,
                    saturation,
                    threshold = check.threshold,
                    "Connections close to the limit"
                );
                check.add_item(instance);
            }
        }
    }
}
