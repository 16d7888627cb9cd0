//! Vigil CLI
//!
//! Command-line interface for running telemetry audits over an application snapshot.
//!
//! # Usage
//!
//! ```bash
//! vigil --help
//! vigil --snapshot app.json audit
//! vigil --snapshot app.json --catalog thresholds.json audit --report postgres --pretty
//! vigil catalog
//! ```

#![deny(unsafe_code)]

use analytics::audit::{self, Report};
use analytics::check::CheckCatalog;
use analytics::chrono::{DateTime, Utc};
use analytics::model::Application;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Vigil CLI - Telemetry audit command-line interface
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Application snapshot (JSON)
    #[arg(short, long, env = "VIGIL_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Check threshold overrides (JSON object keyed by check id)
    #[arg(short, long, env = "VIGIL_CATALOG")]
    catalog: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, env = "VIGIL_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run audits against the snapshot
    Audit {
        /// Which audit to run
        #[arg(short, long, value_enum, default_value_t = ReportSelection::All)]
        report: ReportSelection,

        /// Evaluation time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// Print the effective check catalog
    Catalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportSelection {
    All,
    Postgres,
    Deployments,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let output = run(&cli)?;
    println!("{output}");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: &Cli) -> Result<String> {
    let catalog = load_catalog(cli.catalog.as_deref())?;

    match &cli.command {
        Some(Commands::Audit {
            report,
            now,
            pretty,
        }) => {
            let path = cli
                .snapshot
                .as_deref()
                .context("No snapshot given (use --snapshot or VIGIL_SNAPSHOT)")?;
            let app = load_snapshot(path)?;
            let now = now.unwrap_or_else(Utc::now);
            let reports = run_audits(&app, &catalog, *report, now);
            to_json(&reports, *pretty)
        }
        Some(Commands::Catalog) => {
            let configs: Vec<_> = catalog.iter().collect();
            to_json(&configs, true)
        }
        None => Ok(format!(
            "Vigil CLI v{}\nUse --help for usage information",
            env!("CARGO_PKG_VERSION")
        )),
    }
}

fn load_catalog(path: Option<&Path>) -> Result<CheckCatalog> {
    let Some(path) = path else {
        return Ok(CheckCatalog::builtin());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let catalog = CheckCatalog::from_json(&json)
        .with_context(|| format!("Invalid catalog {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded check catalog overrides");
    Ok(catalog)
}

fn load_snapshot(path: &Path) -> Result<Application> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let app: Application = serde_json::from_str(&json)
        .with_context(|| format!("Invalid snapshot {}", path.display()))?;
    app.validate()
        .with_context(|| format!("Invalid snapshot {}", path.display()))?;
    tracing::info!(
        application = %app.name,
        instances = app.instances.len(),
        deployments = app.deployments.len(),
        "Loaded snapshot"
    );
    Ok(app)
}

fn run_audits(
    app: &Application,
    catalog: &CheckCatalog,
    selection: ReportSelection,
    now: DateTime<Utc>,
) -> Vec<Report> {
    match selection {
        ReportSelection::All => audit::run_all(app, catalog, now),
        ReportSelection::Postgres => audit::postgres::audit(app, catalog).into_iter().collect(),
        ReportSelection::Deployments => audit::deployments::audit(app, catalog, now)
            .into_iter()
            .collect(),
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
