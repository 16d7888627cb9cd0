//! Vigil Analytics Library
//!
//! This crate turns already-collected per-instance telemetry into audit
//! findings: threshold checks, ranked breakdowns and derived series.
//!
//! # Modules
//!
//! - [`timeseries`] - Fixed-step series, NaN-aware aggregation and top-K selection
//! - [`check`] - Threshold check sink and the check catalog
//! - [`model`] - Input snapshot types (instances, Postgres telemetry, deployments)
//! - [`audit`] - Domain audits producing reports
//! - [`format`] - Formatting of bytes, durations and numbers for report cells
//!
//! # Example
//!
//! ```
//! use analytics::timeseries::{Aggregate, TimeSeries};
//! use chrono::{TimeDelta, Utc};
//!
//! let now = Utc::now();
//! let step = TimeDelta::seconds(60);
//! let errors = TimeSeries::new(now, step, vec![1.0, f64::NAN]).unwrap();
//! let critical = TimeSeries::new(now, step, vec![f64::NAN, f64::NAN]).unwrap();
//!
//! let total = Aggregate::nan_sum().with(&errors).with(&critical).get();
//! assert_eq!(total.values()[0], 1.0);
//! assert!(total.values()[1].is_nan());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod check;
pub mod format;
pub mod model;
pub mod timeseries;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
