//! Threshold checks.
//!
//! A [`Check`] records the findings of one audit pass against a catalog entry.
//! It is a sink: comparing a measurement with the threshold is up to the
//! calling audit, the check only stores what was reported to it.

pub mod catalog;

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

pub use catalog::{CatalogError, CheckCatalog, CheckConfig, CheckId, CheckKind, CheckUnit};

/// Recorded findings of a check, shaped by its [`CheckKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    /// Names of violating entities, in insertion order, without duplicates.
    Items(Vec<String>),
    /// A running total.
    Counter(i64),
    /// The last reported value, if any.
    Value(Option<f64>),
}

impl CheckState {
    fn empty(kind: CheckKind) -> Self {
        match kind {
            CheckKind::ItemSet => Self::Items(Vec::new()),
            CheckKind::Counter => Self::Counter(0),
            CheckKind::LastValue => Self::Value(None),
        }
    }
}

/// A check created for one audit pass.
///
/// # Example
///
/// ```
/// use analytics::check::{CheckCatalog, CheckId};
///
/// let catalog = CheckCatalog::builtin();
/// let mut check = catalog.create(CheckId::PostgresLatency);
///
/// check.add_item("pg-1");
/// check.add_item("pg-1");
/// assert_eq!(check.items(), ["pg-1"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Check {
    /// The catalog key of the check.
    pub id: CheckId,
    /// Human-readable title.
    pub title: String,
    /// The threshold callers compare against.
    pub threshold: f64,
    /// Unit of the threshold and the recorded value.
    pub unit: CheckUnit,
    /// What was recorded.
    pub state: CheckState,
}

impl Check {
    /// Creates an empty check from a catalog entry.
    #[must_use]
    pub fn new(config: &CheckConfig) -> Self {
        Self {
            id: config.id,
            title: config.title.clone(),
            threshold: config.threshold,
            unit: config.unit,
            state: CheckState::empty(config.kind),
        }
    }

    /// Returns the kind fixed at construction.
    #[must_use]
    pub fn kind(&self) -> CheckKind {
        match self.state {
            CheckState::Items(_) => CheckKind::ItemSet,
            CheckState::Counter(_) => CheckKind::Counter,
            CheckState::Value(_) => CheckKind::LastValue,
        }
    }

    /// Records a violating entity. Recording the same name twice has no effect.
    pub fn add_item(&mut self, name: impl Into<String>) {
        let name = name.into();
        match &mut self.state {
            CheckState::Items(items) => {
                if !items.contains(&name) {
                    items.push(name);
                }
            }
            _ => self.ignore("add_item"),
        }
    }

    /// Adds `delta` to the running counter.
    pub fn inc(&mut self, delta: i64) {
        match &mut self.state {
            CheckState::Counter(total) => *total = total.saturating_add(delta),
            _ => self.ignore("inc"),
        }
    }

    /// Replaces the last value.
    pub fn set_value(&mut self, value: f64) {
        match &mut self.state {
            CheckState::Value(last) => *last = Some(value),
            _ => self.ignore("set_value"),
        }
    }

    /// Returns the recorded items, empty for non item-set checks.
    #[must_use]
    pub fn items(&self) -> &[String] {
        match &self.state {
            CheckState::Items(items) => items,
            _ => &[],
        }
    }

    /// Returns the counter, `None` for non-counter checks.
    #[must_use]
    pub fn count(&self) -> Option<i64> {
        match self.state {
            CheckState::Counter(total) => Some(total),
            _ => None,
        }
    }

    /// Returns the last value, `None` if unset or not a last-value check.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self.state {
            CheckState::Value(value) => value,
            _ => None,
        }
    }

    /// Returns true if anything was recorded.
    #[must_use]
    pub fn has_findings(&self) -> bool {
        match &self.state {
            CheckState::Items(items) => !items.is_empty(),
            CheckState::Counter(total) => *total > 0,
            CheckState::Value(value) => value.is_some(),
        }
    }

    fn ignore(&self, operation: &str) {
        tracing::debug!(
            check = %self.id,
            kind = %self.kind(),
            operation,
            "Ignoring operation not supported by the check kind"
        );
    }
}

/// A check that can be recorded into from several threads.
#[derive(Debug, Clone)]
pub struct SharedCheck {
    inner: Arc<Mutex<Check>>,
}

impl SharedCheck {
    /// Wraps a check for concurrent recording.
    #[must_use]
    pub fn new(check: Check) -> Self {
        Self {
            inner: Arc::new(Mutex::new(check)),
        }
    }

    /// See [`Check::add_item`].
    pub fn add_item(&self, name: impl Into<String>) {
        self.with(|check| check.add_item(name));
    }

    /// See [`Check::inc`].
    pub fn inc(&self, delta: i64) {
        self.with(|check| check.inc(delta));
    }

    /// See [`Check::set_value`].
    pub fn set_value(&self, value: f64) {
        self.with(|check| check.set_value(value));
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Check {
        self.with(|check| check.clone())
    }

    fn with<T>(&self, f: impl FnOnce(&mut Check) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
