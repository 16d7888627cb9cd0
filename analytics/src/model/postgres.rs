//! Postgres telemetry of one instance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::timeseries::{NamedSeriesSet, TimeSeries};

/// Identity of a group of client connections sharing a state.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionKey {
    /// Database name.
    #[serde(default)]
    pub db: String,
    /// User name.
    #[serde(default)]
    pub user: String,
    /// Backend state, e.g. `active` or `idle in transaction`.
    pub state: String,
    /// Wait event type, e.g. `Lock`, if the backend is waiting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_event_type: Option<String>,
    /// Current or last query of the connections.
    #[serde(default)]
    pub query: String,
}

impl ConnectionKey {
    /// Creates a key for the given state.
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }

    /// Sets the wait event type.
    #[must_use]
    pub fn with_wait_event(mut self, wait_event_type: impl Into<String>) -> Self {
        self.wait_event_type = Some(wait_event_type.into());
        self
    }

    /// Sets database, user and query.
    #[must_use]
    pub fn with_query(
        mut self,
        db: impl Into<String>,
        user: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        self.db = db.into();
        self.user = user.into();
        self.query = query.into();
        self
    }

    /// Returns true if the connections are waiting for a lock.
    #[must_use]
    pub fn is_waiting_for_lock(&self) -> bool {
        self.state == "active" && self.wait_event_type.as_deref() == Some("Lock")
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}: {}", self.user, self.db, self.query)
    }
}

/// Connection counts for one connection key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// The connection identity.
    pub key: ConnectionKey,
    /// Number of connections over time.
    pub series: TimeSeries,
}

/// Identity of a normalized query.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    /// Database name.
    #[serde(default)]
    pub db: String,
    /// User name.
    #[serde(default)]
    pub user: String,
    /// Normalized query text.
    pub query: String,
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}: {}", self.user, self.db, self.query)
    }
}

/// Execution statistics of one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStats {
    /// The query identity.
    pub key: QueryKey,
    /// Execution time, query seconds per second.
    #[serde(default)]
    pub total_time: TimeSeries,
    /// Time spent in I/O, query seconds per second.
    #[serde(default)]
    pub io_time: TimeSeries,
}

/// Postgres telemetry of one instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Postgres {
    /// 1 while the exporter reaches the server.
    #[serde(default)]
    pub up: TimeSeries,
    /// Server version.
    #[serde(default)]
    pub version: String,
    /// Average query latency, seconds.
    #[serde(default)]
    pub avg: TimeSeries,
    /// Median query latency, seconds.
    #[serde(default)]
    pub p50: TimeSeries,
    /// 95th percentile query latency, seconds.
    #[serde(default)]
    pub p95: TimeSeries,
    /// 99th percentile query latency, seconds.
    #[serde(default)]
    pub p99: TimeSeries,
    /// Queries per second by database.
    #[serde(default)]
    pub queries_by_db: NamedSeriesSet,
    /// Connection counts by connection key.
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Server settings as series, e.g. `max_connections`.
    #[serde(default)]
    pub settings: BTreeMap<String, TimeSeries>,
    /// Current write-ahead log position, bytes.
    #[serde(default)]
    pub wal_current_lsn: Option<TimeSeries>,
    /// Replayed write-ahead log position, bytes.
    #[serde(default)]
    pub wal_replay_lsn: Option<TimeSeries>,
    /// Per-query statistics.
    #[serde(default)]
    pub queries: Vec<QueryStats>,
    /// Number of queries awaiting a lock, keyed by the query holding it.
    #[serde(default)]
    pub awaiting_queries_by_locking_query: NamedSeriesSet,
}

impl Postgres {
    /// Returns true if the exporter reached the server at the latest instant.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.up.last() > 0.0
    }

    /// Returns a setting series by name.
    #[must_use]
    pub fn setting(&self, name: &str) -> Option<&TimeSeries> {
        self.settings.get(name)
    }
}
