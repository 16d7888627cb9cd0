//! Integration tests for the deployments audit.

use analytics::audit::{deployments, run_all, ReportKind};
use analytics::check::{CheckCatalog, CheckId};
use analytics::model::{DeploymentState, DeploymentSummary, Instance, Status};
use chrono::{TimeDelta, TimeZone, Utc};

use super::common::{application, deployment, postgres};

#[test]
fn test_deployment_history_report() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut app = application(Vec::new());

    let mut released = deployment(
        "41",
        now,
        TimeDelta::days(2),
        DeploymentState::Summary,
        Status::Warning,
    );
    released.summaries.push(DeploymentSummary {
        report: "postgres".to_string(),
        ok: false,
        message: "Latency increased by 40%".to_string(),
        time: now - TimeDelta::days(2),
    });
    app.deployments = vec![
        released,
        deployment(
            "42",
            now,
            TimeDelta::hours(3),
            DeploymentState::Cancelled,
            Status::Unknown,
        ),
        deployment(
            "43",
            now,
            TimeDelta::minutes(45),
            DeploymentState::Stuck,
            Status::Critical,
        ),
    ];

    let report = deployments::audit(&app, &CheckCatalog::builtin(), now).unwrap();
    assert_eq!(report.kind, ReportKind::Deployments);

    let ids: Vec<_> = report.tables[0]
        .rows
        .iter()
        .map(|r| r.id.clone().unwrap())
        .collect();
    assert_eq!(ids, ["43", "42", "41"]);

    let stuck = &report.tables[0].rows[0];
    assert_eq!(stuck.cells[0].value, "v43");
    assert_eq!(stuck.cells[0].tags, ["45m ago"]);
    assert_eq!(stuck.cells[1].value, "45m");
    assert!(!stuck.cells[2].summaries[0].ok);

    let cancelled = &report.tables[0].rows[1];
    assert_eq!(cancelled.cells[2].stub.as_deref(), Some("deployment 42"));

    let released = &report.tables[0].rows[2];
    assert_eq!(released.cells[0].tags, ["2d ago"]);
    assert_eq!(released.cells[2].summaries[0].message, "Latency increased by 40%");

    let check = report.find_check(CheckId::DeploymentStatus).unwrap();
    assert_eq!(check.value(), Some(2700.0));
    assert!(check.has_findings());
}

#[test]
fn test_healthy_history_has_no_stuck_value() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut app = application(Vec::new());
    app.deployments = vec![
        deployment(
            "1",
            now,
            TimeDelta::hours(6),
            DeploymentState::Summary,
            Status::Ok,
        ),
        deployment(
            "2",
            now,
            TimeDelta::minutes(5),
            DeploymentState::InProgress,
            Status::Unknown,
        ),
    ];

    let report = deployments::audit(&app, &CheckCatalog::builtin(), now).unwrap();
    let check = report.find_check(CheckId::DeploymentStatus).unwrap();
    assert_eq!(check.value(), None);
    assert_eq!(
        report.tables[0].rows[1].cells[2].stub.as_deref(),
        Some("No notable changes")
    );
}

#[test]
fn test_run_all_orders_reports() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut app = application(vec![Instance::new("pg-1").with_postgres(postgres(0.01, 3))]);
    app.deployments = vec![deployment(
        "1",
        now,
        TimeDelta::minutes(10),
        DeploymentState::Deployed,
        Status::Ok,
    )];

    let kinds: Vec<_> = run_all(&app, &CheckCatalog::builtin(), now)
        .into_iter()
        .map(|r| r.kind)
        .collect();
    assert_eq!(kinds, [ReportKind::Postgres, ReportKind::Deployments]);
}
