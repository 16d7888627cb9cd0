//! Common test utilities and fixtures for integration tests.
//!
//! Snapshots are built on a fixed one-minute grid so that expected lags and
//! durations can be computed by hand.

#![allow(dead_code)]

use analytics::model::{
    Application, ClusterRole, Connection, ConnectionKey, Deployment, DeploymentState,
    DeploymentStatus, Instance, Postgres, Status,
};
use analytics::timeseries::TimeSeries;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// Sampling step of every fixture series, seconds.
pub const STEP_SECS: i64 = 60;

/// Start of every fixture series.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

/// Builds a series on the fixture grid.
pub fn series(values: &[f64]) -> TimeSeries {
    TimeSeries::new(start(), TimeDelta::seconds(STEP_SECS), values.to_vec()).unwrap()
}

/// Builds a series of `len` copies of `value`.
pub fn flat(value: f64, len: usize) -> TimeSeries {
    series(&vec![value; len])
}

/// A healthy Postgres with the given average latency, seconds.
pub fn postgres(latency: f64, len: usize) -> Postgres {
    Postgres {
        up: flat(1.0, len),
        version: "16.2".to_string(),
        avg: flat(latency, len),
        p50: flat(latency, len),
        p95: flat(latency * 2.0, len),
        p99: flat(latency * 3.0, len),
        ..Postgres::default()
    }
}

/// A connection series with the given state.
pub fn connection(state: &str, user: &str, query: &str, values: &[f64]) -> Connection {
    Connection {
        key: ConnectionKey::new(state).with_query("shop", user, query),
        series: series(values),
    }
}

/// A primary writing `lsn` and a replica replaying `replay`.
pub fn cluster(lsn: &[f64], replay: &[f64]) -> Application {
    let len = lsn.len();
    let primary = Instance::new("pg-1")
        .with_role(ClusterRole::Primary)
        .with_postgres(Postgres {
            wal_current_lsn: Some(series(lsn)),
            ..postgres(0.01, len)
        });
    let replica = Instance::new("pg-2")
        .with_role(ClusterRole::Replica)
        .with_postgres(Postgres {
            wal_replay_lsn: Some(series(replay)),
            ..postgres(0.01, len)
        });
    application(vec![primary, replica])
}

/// An application with the given instances and no deployments.
pub fn application(instances: Vec<Instance>) -> Application {
    Application {
        name: "shop-db".to_string(),
        instances,
        deployments: Vec::new(),
    }
}

/// A classified deployment started `ago` before `now`.
pub fn deployment(
    id: &str,
    now: DateTime<Utc>,
    ago: TimeDelta,
    state: DeploymentState,
    status: Status,
) -> DeploymentStatus {
    DeploymentStatus {
        deployment: Deployment {
            id: id.to_string(),
            version: format!("v{id}"),
            started_at: now - ago,
        },
        state,
        status,
        lifetime_secs: ago.num_seconds(),
        message: format!("deployment {id}"),
        summaries: Vec::new(),
    }
}
