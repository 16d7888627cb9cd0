//! Input snapshot model.
//!
//! These types describe telemetry that has already been collected and
//! materialized into fixed-step series by the storage layer. Audits only read
//! them.

pub mod deployment;
pub mod postgres;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::timeseries::{NamedSeriesSet, TimeSeries};

pub use deployment::{
    Deployment, DeploymentState, DeploymentStatus, DeploymentSummary, Status,
    DEPLOYMENT_MAX_LIFETIME_SECS, DEPLOYMENT_MIN_LIFETIME_SECS,
};
pub use postgres::{Connection, ConnectionKey, Postgres, QueryKey, QueryStats};

/// Cluster role of a database instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRole {
    /// Accepts writes.
    Primary,
    /// Replays the primary's write-ahead log.
    Replica,
    /// Role could not be determined.
    #[default]
    Unknown,
}

impl std::fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Replica => write!(f, "replica"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Log message counts of an instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogMessages {
    /// Messages logged at error level.
    #[serde(default)]
    pub error: Option<TimeSeries>,
    /// Messages logged at critical level.
    #[serde(default)]
    pub critical: Option<TimeSeries>,
}

/// A monitored instance of an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Unique instance name.
    pub name: String,
    /// True if the instance no longer exists but still has data in range.
    #[serde(default)]
    pub obsolete: bool,
    /// Latest known cluster role.
    #[serde(default)]
    pub role: ClusterRole,
    /// Postgres telemetry, if the instance runs Postgres.
    #[serde(default)]
    pub postgres: Option<Postgres>,
    /// Log message counts by level.
    #[serde(default)]
    pub log_messages: LogMessages,
    /// Error log messages grouped by pattern.
    #[serde(default)]
    pub error_patterns: NamedSeriesSet,
}

impl Instance {
    /// Creates an instance without telemetry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            obsolete: false,
            role: ClusterRole::Unknown,
            postgres: None,
            log_messages: LogMessages::default(),
            error_patterns: NamedSeriesSet::new(),
        }
    }

    /// Sets the cluster role.
    #[must_use]
    pub fn with_role(mut self, role: ClusterRole) -> Self {
        self.role = role;
        self
    }

    /// Attaches Postgres telemetry.
    #[must_use]
    pub fn with_postgres(mut self, postgres: Postgres) -> Self {
        self.postgres = Some(postgres);
        self
    }
}

/// An application and everything audits look at.
///
/// Series are checked while deserializing. Call `validate` on a loaded
/// snapshot to check the deployment fields as well.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Application {
    /// Application name.
    pub name: String,
    /// Instances of the application.
    #[serde(default)]
    pub instances: Vec<Instance>,
    /// Deployments, oldest first, already classified.
    #[serde(default)]
    #[validate(nested)]
    pub deployments: Vec<DeploymentStatus>,
}

impl Application {
    /// Returns true if any instance reports Postgres telemetry.
    #[must_use]
    pub fn is_postgres(&self) -> bool {
        self.instances.iter().any(|i| i.postgres.is_some())
    }
}
