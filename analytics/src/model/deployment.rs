//! Deployments and their externally computed lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Deployments younger than this do not get a summary.
pub const DEPLOYMENT_MIN_LIFETIME_SECS: i64 = 30 * 60;

/// Longest lifetime a snapshot may report, one hundred years.
pub const DEPLOYMENT_MAX_LIFETIME_SECS: i64 = 100 * 365 * 86_400;

/// Severity of a finding or a table cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not enough data to tell.
    #[default]
    Unknown,
    /// Everything is fine.
    Ok,
    /// Needs attention.
    Warning,
    /// Broken.
    Critical,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Ok => write!(f, "ok"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A rollout of a new application version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique deployment id.
    pub id: String,
    /// Deployed version.
    pub version: String,
    /// When the rollout started.
    pub started_at: DateTime<Utc>,
}

/// Lifecycle state assigned to a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// Rollout still running.
    InProgress,
    /// Rollout has not finished for too long.
    Stuck,
    /// Rollout was cancelled.
    Cancelled,
    /// Rolled out, but not long enough ago to compare.
    Deployed,
    /// Rolled out and compared with the previous version.
    Summary,
}

/// One notable change observed after a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    /// Report the change belongs to.
    pub report: String,
    /// True if the change is an improvement.
    pub ok: bool,
    /// What changed.
    pub message: String,
    /// When it was observed.
    pub time: DateTime<Utc>,
}

/// A deployment with its classified state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeploymentStatus {
    /// The deployment.
    pub deployment: Deployment,
    /// Classified lifecycle state.
    pub state: DeploymentState,
    /// Overall status of the deployment.
    #[serde(default)]
    pub status: Status,
    /// How long the version has been running, seconds.
    #[serde(default)]
    #[validate(range(
        min = 0,
        max = DEPLOYMENT_MAX_LIFETIME_SECS,
        message = "Deployment lifetime is out of range"
    ))]
    pub lifetime_secs: i64,
    /// State details, e.g. why a rollout is stuck.
    #[serde(default)]
    pub message: String,
    /// Notable changes, for the `summary` state.
    #[serde(default)]
    pub summaries: Vec<DeploymentSummary>,
}
