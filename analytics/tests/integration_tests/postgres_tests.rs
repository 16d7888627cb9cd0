//! Integration tests for the Postgres audit.
//!
//! Tests cover:
//! - Replication lag estimation through a full audit pass
//! - Connection saturation with reserved slots
//! - Availability, latency and error checks
//! - Loading a snapshot from JSON

use analytics::audit::{postgres, run_all, ReportKind};
use analytics::check::{CheckCatalog, CheckId};
use analytics::model::{Application, ClusterRole, Instance, LogMessages, Postgres};
use chrono::TimeDelta;

use super::common::{
    application, cluster, connection, flat, postgres as pg, series, start, STEP_SECS,
};

// ============================================================================
// REPLICATION TESTS
// ============================================================================

#[test]
fn test_replica_lagging_two_steps() {
    let app = cluster(
        &[1000.0, 2000.0, 3000.0, 4000.0, 5000.0],
        &[1000.0, 1000.0, 2000.0, 3000.0, 3000.0],
    );
    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    let check = report.find_check(CheckId::PostgresReplicationLag).unwrap();
    assert_eq!(check.items(), ["pg-2"]);

    let rows = &report.tables[0].rows;
    assert_eq!(rows.len(), 2);
    let lag_cell = &rows[1].cells[6];
    assert_eq!(lag_cell.value, "2");
    assert_eq!(lag_cell.unit, "KB");
    assert_eq!(lag_cell.tags, ["2m"]);

    // primary rows carry no lag
    assert!(rows[0].cells[6].value.is_empty());
}

#[test]
fn test_replica_caught_up() {
    let app = cluster(&[100.0, 200.0, 300.0], &[100.0, 200.0, 300.0]);
    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    let check = report.find_check(CheckId::PostgresReplicationLag).unwrap();
    assert!(!check.has_findings());
    let lag_cell = &report.tables[0].rows[1].cells[6];
    assert_eq!(lag_cell.value, "0");
    assert!(lag_cell.tags.is_empty());
}

#[test]
fn test_replica_behind_retained_history_is_lower_bound() {
    let app = cluster(
        &[9000.0, 9500.0, 10000.0, 5000.0, 5100.0, 5200.0, 5300.0],
        &[4000.0; 7],
    );
    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    let lag_cell = &report.tables[0].rows[1].cells[6];
    assert_eq!(lag_cell.tags, [">3m"]);
    let check = report.find_check(CheckId::PostgresReplicationLag).unwrap();
    assert_eq!(check.items(), ["pg-2"]);
}

#[test]
fn test_replication_threshold_override() {
    let app = cluster(
        &[1000.0, 2000.0, 3000.0, 4000.0, 5000.0],
        &[1000.0, 1000.0, 2000.0, 3000.0, 3000.0],
    );
    let catalog = CheckCatalog::from_json(r#"{"postgres_replication_lag": 300}"#).unwrap();
    let report = postgres::audit(&app, &catalog).unwrap();

    let check = report.find_check(CheckId::PostgresReplicationLag).unwrap();
    assert!(!check.has_findings());
    assert_eq!(check.threshold, 300.0);
}

#[test]
fn test_byte_lag_chart_per_instance() {
    let app = cluster(&[100.0, 200.0, 300.0], &[100.0, 100.0, 500.0]);
    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    let chart = report
        .find_chart(postgres::charts::REPLICATION_LAG, None)
        .unwrap();
    assert_eq!(chart.series.len(), 2);
    let replica = &chart.series[1];
    assert_eq!(replica.name, "pg-2");
    assert_eq!(replica.data.values(), [0.0, 100.0, 0.0]);
}

// ============================================================================
// CONNECTION TESTS
// ============================================================================

#[test]
fn test_connection_saturation_counts_reserved_slots() {
    let mut db = pg(0.01, 2);
    db.connections = vec![
        connection("active", "app", "select 1", &[40.0, 40.0]),
        connection("idle", "app", "", &[45.0, 45.0]),
    ];
    db.settings.insert("max_connections".to_string(), flat(100.0, 2));
    db.settings
        .insert("superuser_reserved_connections".to_string(), flat(5.0, 2));
    let app = application(vec![Instance::new("pg-1").with_postgres(db)]);

    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    let check = report.find_check(CheckId::PostgresConnections).unwrap();
    assert!(!check.has_findings());

    // one more connection pushes usage past 90%
    let mut db = pg(0.01, 2);
    db.connections = vec![
        connection("active", "app", "select 1", &[41.0, 41.0]),
        connection("idle", "app", "", &[45.0, 45.0]),
    ];
    db.settings.insert("max_connections".to_string(), flat(100.0, 2));
    db.settings
        .insert("superuser_reserved_connections".to_string(), flat(5.0, 2));
    let app = application(vec![Instance::new("pg-1").with_postgres(db)]);

    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();
    let check = report.find_check(CheckId::PostgresConnections).unwrap();
    assert_eq!(check.items(), ["pg-1"]);
}

#[test]
fn test_connections_chart_has_lock_bucket() {
    let mut db = pg(0.01, 2);
    let mut locked = connection("active", "app", "update orders", &[3.0, 4.0]);
    locked.key = locked.key.with_wait_event("Lock");
    db.connections = vec![
        connection("active", "app", "select 1", &[1.0, 2.0]),
        locked,
    ];
    let app = application(vec![Instance::new("pg-1").with_postgres(db)]);

    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();
    let chart = report
        .find_chart(postgres::charts::CONNECTIONS, Some("pg-1"))
        .unwrap();
    let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"active"));
    assert!(names.contains(&"active (locked)"));
}

// ============================================================================
// INSTANCE CHECK TESTS
// ============================================================================

#[test]
fn test_checks_over_mixed_instances() {
    let mut slow = pg(0.25, 3);
    slow.avg = series(&[0.05, 0.2, 0.25]);

    let mut down = pg(0.01, 3);
    down.up = series(&[1.0, 1.0, 0.0]);

    let mut noisy = Instance::new("pg-3").with_postgres(pg(0.01, 3));
    noisy.log_messages = LogMessages {
        error: Some(series(&[1.0, f64::NAN, 2.0])),
        critical: Some(series(&[f64::NAN, f64::NAN, 1.0])),
    };

    let app = application(vec![
        Instance::new("pg-1").with_postgres(slow),
        Instance::new("pg-2").with_postgres(down),
        noisy,
    ]);
    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    let availability = report.find_check(CheckId::PostgresAvailability).unwrap();
    assert_eq!(availability.items(), ["pg-2"]);

    let latency = report.find_check(CheckId::PostgresLatency).unwrap();
    assert_eq!(latency.items(), ["pg-1"]);

    let errors = report.find_check(CheckId::PostgresErrors).unwrap();
    assert_eq!(errors.count(), Some(4));

    let rows = &report.tables[0].rows;
    assert_eq!(rows[0].cells[4].value, "250");
    assert_eq!(rows[0].cells[4].unit, "ms");
    assert_eq!(rows[2].cells[5].value, "4");
}

#[test]
fn test_primary_role_icon() {
    let app = cluster(&[1.0, 2.0], &[1.0, 2.0]);
    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    let rows = &report.tables[0].rows;
    assert_eq!(rows[0].cells[1].value, ClusterRole::Primary.to_string());
    assert_eq!(
        rows[0].cells[1].icon.as_ref().map(|i| i.name.as_str()),
        Some("mdi-database-edit-outline")
    );
}

#[test]
fn test_instances_without_postgres_are_skipped() {
    let app = application(vec![
        Instance::new("web-1"),
        Instance::new("pg-1").with_postgres(pg(0.01, 2)),
    ]);
    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    assert_eq!(report.tables[0].rows.len(), 1);
    assert_eq!(report.tables[0].rows[0].cells[0].value, "pg-1");
}

#[test]
fn test_application_without_postgres_has_no_report() {
    let app = application(vec![Instance::new("web-1")]);
    assert!(postgres::audit(&app, &CheckCatalog::builtin()).is_none());
    assert!(run_all(&app, &CheckCatalog::builtin(), start()).is_empty());
}

// ============================================================================
// SNAPSHOT TESTS
// ============================================================================

#[test]
fn test_audit_snapshot_from_json() {
    let s = |values: serde_json::Value| {
        serde_json::json!({
            "from": "2024-01-15T10:00:00Z",
            "step_ms": STEP_SECS * 1000,
            "values": values,
        })
    };
    let json = serde_json::json!({
        "name": "billing",
        "instances": [
            {
                "name": "pg-main",
                "role": "primary",
                "postgres": {
                    "up": s(serde_json::json!([1, 1, 1])),
                    "avg": s(serde_json::json!([0.01, null, 0.02])),
                    "queries_by_db": {
                        "billing": s(serde_json::json!([10, 12, 14])),
                        "audit": s(serde_json::json!([1, null, 1]))
                    },
                    "wal_current_lsn": s(serde_json::json!([100, 200, 300]))
                }
            },
            {
                "name": "pg-standby",
                "role": "replica",
                "postgres": {
                    "up": s(serde_json::json!([1, 1, 1])),
                    "avg": s(serde_json::json!([0.01, 0.01, 0.01])),
                    "wal_replay_lsn": s(serde_json::json!([100, 200, 300]))
                }
            }
        ]
    });
    let app: Application = serde_json::from_value(json).unwrap();
    let reports = run_all(&app, &CheckCatalog::builtin(), start() + TimeDelta::hours(1));

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.kind, ReportKind::Postgres);
    assert!(report.checks.iter().all(|c| !c.has_findings()));

    let qps = report.find_chart(postgres::charts::QUERIES, None).unwrap();
    assert_eq!(qps.series[0].data.values(), [11.0, 12.0, 15.0]);

    let serialized = serde_json::to_value(report).unwrap();
    assert_eq!(serialized["kind"], "postgres");
    // NaN samples are emitted as null
    let latency = &serialized["charts"][0]["series"][0]["data"]["values"];
    assert_eq!(latency[1], serde_json::Value::Null);
}

#[test]
fn test_postgres_default_is_down() {
    let app = application(vec![Instance::new("pg-1").with_postgres(Postgres::default())]);
    let report = postgres::audit(&app, &CheckCatalog::builtin()).unwrap();

    let availability = report.find_check(CheckId::PostgresAvailability).unwrap();
    assert_eq!(availability.items(), ["pg-1"]);
}
