//! Postgres audit.
//!
//! Walks the Postgres instances of an application and produces the latency,
//! error, connection, replication and availability findings.

use crate::check::{CheckCatalog, CheckId};
use crate::format::format_float;
use crate::model::{Application, ClusterRole, Instance, Postgres, Status};
use crate::timeseries::{nan_sum, top, Aggregate, NamedSeriesSet, TimeSeries};

use super::connections::{state_color, ConnectionStates, MAX_CONNECTIONS_SETTING};
use super::replication::{byte_lag_series, check_replication_lag};
use super::report::{Cell, Report, ReportKind};

const OVERVIEW: &str = "overview";
const TOP: usize = 5;

/// Instance table header.
pub const INSTANCE_TABLE: [&str; 7] = [
    "Instance",
    "Role",
    "Status",
    "Queries",
    "Latency",
    "Errors",
    "Replication lag",
];

/// Chart titles of the Postgres report.
pub mod charts {
    /// Query latency, overview and per instance.
    pub const LATENCY: &str = "Postgres query latency <selector>, seconds";
    /// Queries per second per instance.
    pub const QUERIES: &str = "Queries per second";
    /// Errors, overview and per instance by pattern.
    pub const ERRORS: &str = "Errors <selector>";
    /// Connections by canonical state.
    pub const CONNECTIONS: &str = "Postgres connections <selector>";
    /// Idle-in-transaction drill-down.
    pub const IDLE_TRANSACTIONS: &str = "Idle transactions on <selector>";
    /// Lock-waiting drill-down.
    pub const LOCKED_QUERIES: &str = "Locked queries on <selector>";
    /// Blocking queries drill-down.
    pub const BLOCKING_QUERIES: &str =
        "Blocking queries by the number of awaiting queries on <selector>";
    /// Queries by execution time.
    pub const QUERIES_BY_TOTAL_TIME: &str =
        "Queries by total time on <selector>, query seconds/second";
    /// Queries by I/O time.
    pub const QUERIES_BY_IO_TIME: &str = "Queries by I/O time on <selector>, query seconds/second";
    /// Byte lag per instance.
    pub const REPLICATION_LAG: &str = "Replication lag, bytes";
}

/// Runs the Postgres audit.
///
/// Returns `None` if no instance of the application runs Postgres.
#[must_use]
pub fn audit(app: &Application, catalog: &CheckCatalog) -> Option<Report> {
    if !app.is_postgres() {
        return None;
    }

    let mut report = Report::new(ReportKind::Postgres);
    let mut availability = catalog.create(CheckId::PostgresAvailability);
    let mut latency = catalog.create(CheckId::PostgresLatency);
    let mut errors_check = catalog.create(CheckId::PostgresErrors);
    let mut replication = catalog.create(CheckId::PostgresReplicationLag);
    let mut connections = catalog.create(CheckId::PostgresConnections);

    let mut primary = Aggregate::max();
    for pg in app.instances.iter().filter_map(|i| i.postgres.as_ref()) {
        if let Some(lsn) = &pg.wal_current_lsn {
            primary.add(lsn);
        }
    }
    let primary_lsn = primary.get();

    for instance in &app.instances {
        let Some(pg) = &instance.postgres else {
            tracing::debug!(
                instance = %instance.name,
                "Skipping instance without Postgres metrics"
            );
            continue;
        };
        let name = instance.name.as_str();

        report
            .chart_in_group(charts::LATENCY, Some(OVERVIEW))
            .feature()
            .add_series(name, pg.avg.clone());
        if pg.avg.last() > latency.threshold {
            latency.add_item(name);
        }
        report
            .chart_in_group(charts::LATENCY, Some(name))
            .add_series("avg", pg.avg.clone())
            .add_series("p50", pg.p50.clone())
            .add_series("p95", pg.p95.clone())
            .add_series("p99", pg.p99.clone());

        let qps = sum_all(&pg.queries_by_db);
        report.chart(charts::QUERIES).add_series(name, qps.clone());

        let errors = error_messages(instance);
        query_charts(&mut report, name, pg);
        report
            .chart_in_group(charts::ERRORS, Some(OVERVIEW))
            .column()
            .feature()
            .add_series(name, errors.clone());
        report
            .chart_in_group(charts::ERRORS, Some(name))
            .column()
            .add_many(top(&instance.error_patterns, nan_sum, TOP));

        let states = ConnectionStates::new(pg);
        states.check(name, &mut connections);
        connection_charts(&mut report, name, &states);
        lock_charts(&mut report, name, pg);

        let lag = match &pg.wal_replay_lsn {
            Some(replay) if !primary_lsn.is_empty() => byte_lag_series(&primary_lsn, replay),
            _ => TimeSeries::default(),
        };
        report.chart(charts::REPLICATION_LAG).add_series(name, lag);

        if instance.obsolete {
            continue;
        }

        let role_cell = Cell::new(instance.role.to_string());
        let role_cell = match instance.role {
            ClusterRole::Primary => {
                role_cell.with_icon("mdi-database-edit-outline", "rgba(0,0,0,0.87)")
            }
            ClusterRole::Replica => role_cell.with_icon("mdi-database-import-outline", "grey"),
            ClusterRole::Unknown => role_cell,
        };
        let status = if pg.is_up() {
            Cell::empty().with_status(Status::Ok, "up")
        } else {
            availability.add_item(name);
            Cell::empty().with_status(Status::Warning, "down (no metrics)")
        };

        let total_errors = errors.reduce(nan_sum);
        let errors_cell = if total_errors.is_nan() {
            Cell::empty()
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let count = total_errors as i64;
            errors_check.inc(count);
            Cell::new(format!("{total_errors:.0}"))
        };

        let lag_cell = check_replication_lag(
            name,
            &primary_lsn,
            pg.wal_replay_lsn.as_ref(),
            instance.role,
            &mut replication,
        );

        let mut name_cell = Cell::new(name);
        if !pg.version.is_empty() {
            name_cell = name_cell.with_tag(format!("version: {}", pg.version));
        }
        report.table(&INSTANCE_TABLE).add_row(vec![
            name_cell,
            role_cell,
            status,
            Cell::new(format_float(qps.last())).with_unit("/s"),
            Cell::new(format_float(pg.avg.last() * 1000.0)).with_unit("ms"),
            errors_cell,
            lag_cell,
        ]);
    }

    for check in [availability, latency, errors_check, replication, connections] {
        report.add_check(check);
    }
    Some(report)
}

/// Error and critical log messages of an instance.
fn error_messages(instance: &Instance) -> TimeSeries {
    let mut errors = Aggregate::nan_sum();
    for series in [&instance.log_messages.error, &instance.log_messages.critical]
        .into_iter()
        .flatten()
    {
        errors.add(series);
    }
    errors.get()
}

fn sum_all(set: &NamedSeriesSet) -> TimeSeries {
    let mut total = Aggregate::nan_sum();
    for series in set.values() {
        total.add(series);
    }
    total.get()
}

fn query_charts(report: &mut Report, name: &str, pg: &Postgres) {
    let mut total_time = NamedSeriesSet::new();
    let mut io_time = NamedSeriesSet::new();
    for stats in &pg.queries {
        let query = stats.key.to_string();
        total_time.insert(query.clone(), stats.total_time.clone());
        io_time.insert(query, stats.io_time.clone());
    }
    report
        .chart_in_group(charts::QUERIES_BY_TOTAL_TIME, Some(name))
        .stacked()
        .sorted()
        .add_many(top(&total_time, nan_sum, TOP));
    report
        .chart_in_group(charts::QUERIES_BY_IO_TIME, Some(name))
        .stacked()
        .sorted()
        .add_many(top(&io_time, nan_sum, TOP));
}

fn connection_charts(report: &mut Report, name: &str, states: &ConnectionStates) {
    let chart = report.chart_in_group(charts::CONNECTIONS, Some(name)).stacked();
    if let Some(max) = &states.max_connections {
        chart.set_threshold(MAX_CONNECTIONS_SETTING, max.clone());
    }
    for (state, series) in &states.by_state {
        chart.add_colored_series(state.as_str(), series.clone(), state_color(state));
    }
    report
        .chart_in_group(charts::IDLE_TRANSACTIONS, Some(name))
        .stacked()
        .add_many(states.idle_in_transaction.clone());
    report
        .chart_in_group(charts::LOCKED_QUERIES, Some(name))
        .stacked()
        .add_many(states.locked.clone());
}

fn lock_charts(report: &mut Report, name: &str, pg: &Postgres) {
    report
        .chart_in_group(charts::BLOCKING_QUERIES, Some(name))
        .stacked()
        .shift_colors()
        .add_many(top(&pg.awaiting_queries_by_locking_query, nan_sum, TOP));
}
