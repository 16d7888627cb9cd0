//! Domain audits.
//!
//! Each audit reads one application snapshot, creates its checks from the
//! catalog and returns a [`Report`] of findings, or `None` when the audited
//! subsystem is absent.

pub mod connections;
pub mod deployments;
pub mod postgres;
pub mod replication;
pub mod report;

use chrono::{DateTime, Utc};

use crate::check::CheckCatalog;
use crate::model::Application;

pub use connections::ConnectionStates;
pub use replication::ReplicationLag;
pub use report::{Cell, Chart, ChartSeries, Report, ReportKind, Row, Table};

/// Runs every audit against `app` and returns the reports that apply.
///
/// # Example
///
/// ```
/// use analytics::audit::run_all;
/// use analytics::check::CheckCatalog;
/// use analytics::model::Application;
/// use chrono::Utc;
///
/// let app: Application = serde_json::from_str(r#"{"name": "empty"}"#).unwrap();
/// assert!(run_all(&app, &CheckCatalog::builtin(), Utc::now()).is_empty());
/// ```
#[must_use]
pub fn run_all(app: &Application, catalog: &CheckCatalog, now: DateTime<Utc>) -> Vec<Report> {
    let reports: Vec<Report> = [
        postgres::audit(app, catalog),
        deployments::audit(app, catalog, now),
    ]
    .into_iter()
    .flatten()
    .collect();

    tracing::info!(
        application = %app.name,
        instances = app.instances.len(),
        reports = reports.len(),
        "Audit pass finished"
    );
    reports
}
