//! Integration tests for the check catalog and concurrent check recording.

use analytics::check::{CatalogError, CheckCatalog, CheckId, CheckKind, SharedCheck};

#[test]
fn test_builtin_catalog_covers_every_check() {
    let catalog = CheckCatalog::builtin();
    let ids: Vec<_> = catalog.iter().map(|c| c.id).collect();
    assert_eq!(ids, CheckId::ALL);

    assert_eq!(catalog.get(CheckId::PostgresErrors).kind, CheckKind::Counter);
    assert_eq!(catalog.get(CheckId::DeploymentStatus).kind, CheckKind::LastValue);
    assert_eq!(catalog.get(CheckId::PostgresReplicationLag).threshold, 30.0);
}

#[test]
fn test_overrides_keep_other_thresholds() {
    let catalog =
        CheckCatalog::from_json(r#"{"postgres_connections": 75, "deployment_status": 600}"#)
            .unwrap();

    assert_eq!(catalog.get(CheckId::PostgresConnections).threshold, 75.0);
    assert_eq!(catalog.get(CheckId::DeploymentStatus).threshold, 600.0);
    assert_eq!(catalog.get(CheckId::PostgresLatency).threshold, 0.1);
}

#[test]
fn test_unknown_check_is_rejected() {
    let result = CheckCatalog::from_json(r#"{"redis_latency": 1}"#);
    assert!(matches!(result, Err(CatalogError::Parse(_))));
}

#[test]
fn test_negative_threshold_is_rejected() {
    let result = CheckCatalog::from_json(r#"{"postgres_latency": -1}"#);
    assert!(matches!(result, Err(CatalogError::ValidationError(_))));
}

#[test]
fn test_shared_check_from_worker_threads() {
    let catalog = CheckCatalog::builtin();
    let availability = SharedCheck::new(catalog.create(CheckId::PostgresAvailability));
    let errors = SharedCheck::new(catalog.create(CheckId::PostgresErrors));

    std::thread::scope(|s| {
        for worker in 0..8 {
            let availability = availability.clone();
            let errors = errors.clone();
            s.spawn(move || {
                for i in 0..50 {
                    availability.add_item(format!("pg-{}", (worker * 50 + i) % 10));
                    errors.inc(1);
                }
            });
        }
    });

    let availability = availability.snapshot();
    assert_eq!(availability.items().len(), 10);
    assert_eq!(errors.snapshot().count(), Some(400));
}
