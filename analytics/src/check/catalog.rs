//! Check catalog.
//!
//! The catalog is the process-wide registry of check definitions: key, title,
//! kind, threshold and unit. It is built once, optionally overlaid with
//! threshold overrides, and passed by reference into every audit pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use validator::Validate;

use super::Check;

/// Key of a check in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckId {
    /// Postgres instances reporting no metrics.
    PostgresAvailability,
    /// Postgres instances with a high average query latency.
    PostgresLatency,
    /// Total Postgres errors logged.
    PostgresErrors,
    /// Replicas lagging behind the primary.
    PostgresReplicationLag,
    /// Instances close to `max_connections`.
    PostgresConnections,
    /// Time a deployment has been stuck.
    DeploymentStatus,
}

impl CheckId {
    /// All known checks, in catalog order.
    pub const ALL: [Self; 6] = [
        Self::PostgresAvailability,
        Self::PostgresLatency,
        Self::PostgresErrors,
        Self::PostgresReplicationLag,
        Self::PostgresConnections,
        Self::DeploymentStatus,
    ];

    /// Returns the catalog key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PostgresAvailability => "postgres_availability",
            Self::PostgresLatency => "postgres_latency",
            Self::PostgresErrors => "postgres_errors",
            Self::PostgresReplicationLag => "postgres_replication_lag",
            Self::PostgresConnections => "postgres_connections",
            Self::DeploymentStatus => "deployment_status",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a check records its findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// A set of violating entity names.
    ItemSet,
    /// A running total.
    Counter,
    /// The last reported value.
    LastValue,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemSet => write!(f, "item_set"),
            Self::Counter => write!(f, "counter"),
            Self::LastValue => write!(f, "last_value"),
        }
    }
}

/// Unit of a check threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckUnit {
    /// A plain count.
    Count,
    /// Seconds.
    Seconds,
    /// Percent.
    Percent,
}

/// Definition of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CheckConfig {
    /// The catalog key.
    pub id: CheckId,
    /// Human-readable title.
    #[validate(length(min = 1, message = "Check title cannot be empty"))]
    pub title: String,
    /// How findings are recorded.
    pub kind: CheckKind,
    /// Threshold the auditing code compares measurements against.
    #[validate(range(min = 0.0, message = "Check threshold cannot be negative"))]
    pub threshold: f64,
    /// Unit of the threshold.
    pub unit: CheckUnit,
}

impl CheckConfig {
    /// Returns the built-in definition of a check.
    #[must_use]
    pub fn builtin(id: CheckId) -> Self {
        let (title, kind, threshold, unit) = match id {
            CheckId::PostgresAvailability => {
                ("Postgres availability", CheckKind::ItemSet, 0.0, CheckUnit::Count)
            }
            CheckId::PostgresLatency => {
                ("Postgres latency", CheckKind::ItemSet, 0.1, CheckUnit::Seconds)
            }
            CheckId::PostgresErrors => {
                ("Postgres errors", CheckKind::Counter, 0.0, CheckUnit::Count)
            }
            CheckId::PostgresReplicationLag => (
                "Postgres replication lag",
                CheckKind::ItemSet,
                30.0,
                CheckUnit::Seconds,
            ),
            CheckId::PostgresConnections => (
                "Postgres connections",
                CheckKind::ItemSet,
                90.0,
                CheckUnit::Percent,
            ),
            CheckId::DeploymentStatus => (
                "Deployment status",
                CheckKind::LastValue,
                180.0,
                CheckUnit::Seconds,
            ),
        };
        Self {
            id,
            title: title.to_string(),
            kind,
            threshold,
            unit,
        }
    }

    /// Validates the definition.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The title is empty
    /// - The threshold is negative, infinite or NaN
    pub fn validate_config(&self) -> Result<(), CatalogError> {
        if !self.threshold.is_finite() {
            return Err(CatalogError::InvalidThreshold {
                id: self.id,
                threshold: self.threshold,
            });
        }
        self.validate()?;
        Ok(())
    }
}

/// Errors that can occur while building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The override document could not be parsed.
    #[error("Invalid catalog overrides: {0}")]
    Parse(#[from] serde_json::Error),

    /// A threshold is not a finite number.
    #[error("Invalid threshold {threshold} for check '{id}'")]
    InvalidThreshold {
        /// The offending check.
        id: CheckId,
        /// The rejected threshold.
        threshold: f64,
    },

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Immutable registry of check definitions.
///
/// # Example
///
/// ```
/// use analytics::check::{CheckCatalog, CheckId};
///
/// let catalog = CheckCatalog::from_json(r#"{"postgres_latency": 0.25}"#).unwrap();
/// assert_eq!(catalog.get(CheckId::PostgresLatency).threshold, 0.25);
/// assert_eq!(catalog.get(CheckId::PostgresConnections).threshold, 90.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CheckCatalog {
    configs: [CheckConfig; 6],
}

impl CheckCatalog {
    /// Creates the catalog with built-in thresholds.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            configs: CheckId::ALL.map(CheckConfig::builtin),
        }
    }

    /// Parses a JSON object of threshold overrides keyed by check key and
    /// applies it on top of the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object of numbers, names
    /// an unknown check, or sets an invalid threshold.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let overrides: BTreeMap<CheckId, f64> = serde_json::from_str(json)?;
        Self::builtin().with_overrides(&overrides)
    }

    /// Returns a catalog with the given thresholds replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if any resulting definition is invalid.
    pub fn with_overrides(
        mut self,
        overrides: &BTreeMap<CheckId, f64>,
    ) -> Result<Self, CatalogError> {
        for (id, threshold) in overrides {
            tracing::debug!(check = %id, threshold, "Overriding check threshold");
            self.configs[id.index()].threshold = *threshold;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validates every definition.
    ///
    /// # Errors
    ///
    /// Returns the first invalid definition's error.
    pub fn validate(&self) -> Result<(), CatalogError> {
        self.configs.iter().try_for_each(CheckConfig::validate_config)
    }

    /// Returns the definition of a check.
    #[must_use]
    pub fn get(&self, id: CheckId) -> &CheckConfig {
        &self.configs[id.index()]
    }

    /// Creates an empty check for one audit pass.
    #[must_use]
    pub fn create(&self, id: CheckId) -> Check {
        Check::new(self.get(id))
    }

    /// Iterates over all definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &CheckConfig> {
        self.configs.iter()
    }
}

impl Default for CheckCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
