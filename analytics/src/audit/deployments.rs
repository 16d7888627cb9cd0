//! Deployments audit.
//!
//! Renders already classified deployment states, newest first, and reports
//! how long a stuck rollout has been running.

use chrono::{DateTime, TimeDelta, Utc};

use crate::check::{CheckCatalog, CheckId};
use crate::format::{format_duration, format_duration_short};
use crate::model::{
    Application, DeploymentState, DeploymentSummary, Status, DEPLOYMENT_MIN_LIFETIME_SECS,
};

use super::report::{Cell, Link, Report, ReportKind};

/// Deployment table header.
pub const DEPLOYMENT_TABLE: [&str; 3] = ["Deployment", "Active", "Summary"];

/// Half-width of the drill-down range around a deployment start.
const DRILL_DOWN_MINUTES: i64 = 30;

/// Runs the deployments audit at `now`.
///
/// Returns `None` if the application has no deployments.
#[must_use]
pub fn audit(app: &Application, catalog: &CheckCatalog, now: DateTime<Utc>) -> Option<Report> {
    if app.deployments.is_empty() {
        return None;
    }

    let mut report = Report::new(ReportKind::Deployments);
    let mut status_check = catalog.create(CheckId::DeploymentStatus);
    let newest = app.deployments.len() - 1;

    for (i, ds) in app.deployments.iter().enumerate().rev() {
        let started_at = ds.deployment.started_at;
        let since_start = now - started_at;
        let window = TimeDelta::minutes(DRILL_DOWN_MINUTES);

        let mut version = Cell::new(ds.deployment.version.as_str())
            .with_status(ds.status, ds.deployment.version.as_str())
            .with_tag(format!("{} ago", format_duration(since_start, 1)));
        if let (Some(from), Some(to)) = (
            started_at.checked_sub_signed(window),
            started_at.checked_add_signed(window),
        ) {
            version = version.with_link(Link {
                report: ReportKind::Instances,
                from,
                to,
            });
        }

        let active = match TimeDelta::try_seconds(ds.lifetime_secs) {
            Some(lifetime) => Cell::new(format_duration(lifetime, 1))
                .with_short_value(format_duration_short(lifetime)),
            None => {
                tracing::warn!(
                    deployment = %ds.deployment.id,
                    lifetime_secs = ds.lifetime_secs,
                    "Deployment lifetime out of range"
                );
                Cell::empty()
            }
        };

        let mut summary = Cell::empty();
        match ds.state {
            DeploymentState::Summary => {
                if ds.summaries.is_empty() {
                    summary = summary.with_stub("No notable changes");
                } else {
                    summary.summaries.clone_from(&ds.summaries);
                }
            }
            DeploymentState::Deployed => {
                version = version.update_status(Status::Unknown);
                summary = if i == newest {
                    summary.with_stub("Collecting data...")
                } else {
                    summary.with_stub(format!(
                        "Not enough data due to the lifetime < {}",
                        format_duration(TimeDelta::seconds(DEPLOYMENT_MIN_LIFETIME_SECS), 1)
                    ))
                };
            }
            DeploymentState::Stuck => {
                #[allow(clippy::cast_precision_loss)]
                let stuck_secs = since_start.num_seconds() as f64;
                tracing::debug!(
                    deployment = %ds.deployment.id,
                    stuck_secs,
                    "Deployment is stuck"
                );
                status_check.set_value(stuck_secs);
                summary.summaries.push(DeploymentSummary {
                    report: ReportKind::Instances.to_string(),
                    ok: false,
                    message: ds.message.clone(),
                    time: started_at,
                });
            }
            DeploymentState::InProgress | DeploymentState::Cancelled => {
                summary = summary.with_stub(ds.message.as_str());
            }
        }

        let table = report.table(&DEPLOYMENT_TABLE);
        table.set_sorted(true);
        table.add_row(vec![version, active, summary]).id = Some(ds.deployment.id.clone());
    }

    report.add_check(status_check);
    Some(report)
}
