//! Audit findings handed to the rendering layer.
//!
//! A [`Report`] collects the checks, chart series and table rows produced by
//! one audit. It is plain data; how it is drawn is not decided here.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::check::Check;
use crate::model::{DeploymentSummary, Status};
use crate::timeseries::{NamedSeries, TimeSeries};

/// Which subsystem a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Postgres instances of the application.
    Postgres,
    /// Deployments of the application.
    Deployments,
    /// Instances of the application, a drill-down target.
    Instances,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Deployments => write!(f, "deployments"),
            Self::Instances => write!(f, "instances"),
        }
    }
}

/// One series of a chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    /// Legend label.
    pub name: String,
    /// Suggested color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// The data.
    pub data: TimeSeries,
}

/// A chart: a titled set of series, optionally drawn per instance.
#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    /// Chart title.
    pub title: String,
    /// Group the chart belongs to, e.g. `overview` or an instance name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// The series.
    pub series: Vec<ChartSeries>,
    /// A reference line, e.g. a configured limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<ChartSeries>,
    /// Draw series stacked on top of each other.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stacked: bool,
    /// Order the legend by value.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sorted: bool,
    /// Draw bars instead of lines.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub column: bool,
    /// Show the chart first in its group.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub feature: bool,
    /// Start the palette at a different offset than neighbouring charts.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub shift_colors: bool,
}

impl Chart {
    fn new(title: &str, group: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            group: group.map(str::to_string),
            series: Vec::new(),
            threshold: None,
            stacked: false,
            sorted: false,
            column: false,
            feature: false,
            shift_colors: false,
        }
    }

    /// Marks the chart as stacked.
    pub fn stacked(&mut self) -> &mut Self {
        self.stacked = true;
        self
    }

    /// Marks the chart as sorted.
    pub fn sorted(&mut self) -> &mut Self {
        self.sorted = true;
        self
    }

    /// Marks the chart as a column chart.
    pub fn column(&mut self) -> &mut Self {
        self.column = true;
        self
    }

    /// Marks the chart as featured.
    pub fn feature(&mut self) -> &mut Self {
        self.feature = true;
        self
    }

    /// Shifts the chart palette.
    pub fn shift_colors(&mut self) -> &mut Self {
        self.shift_colors = true;
        self
    }

    /// Adds a series.
    pub fn add_series(&mut self, name: impl Into<String>, data: TimeSeries) -> &mut Self {
        self.series.push(ChartSeries {
            name: name.into(),
            color: None,
            data,
        });
        self
    }

    /// Adds a series with a color.
    pub fn add_colored_series(
        &mut self,
        name: impl Into<String>,
        data: TimeSeries,
        color: Option<&str>,
    ) -> &mut Self {
        self.series.push(ChartSeries {
            name: name.into(),
            color: color.map(str::to_string),
            data,
        });
        self
    }

    /// Adds ranked series, keeping their order.
    pub fn add_many(&mut self, series: Vec<NamedSeries>) -> &mut Self {
        for s in series {
            self.add_series(s.name, s.series);
        }
        self
    }

    /// Sets the reference line.
    pub fn set_threshold(&mut self, name: impl Into<String>, data: TimeSeries) -> &mut Self {
        self.threshold = Some(ChartSeries {
            name: name.into(),
            color: None,
            data,
        });
        self
    }
}

/// Link from a cell to another report over a time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    /// Target report.
    pub report: ReportKind,
    /// Range start.
    pub from: DateTime<Utc>,
    /// Range end.
    pub to: DateTime<Utc>,
}

/// Status marker of a cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellStatus {
    /// Severity.
    pub status: Status,
    /// Short explanation.
    pub message: String,
}

/// An icon drawn next to a cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Icon {
    /// Icon name.
    pub name: String,
    /// Icon color.
    pub color: String,
}

/// A table cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cell {
    /// Main value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Compact form of the value for narrow layouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_value: Option<String>,
    /// Unit of the value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,
    /// Secondary annotations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Status marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CellStatus>,
    /// Icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    /// Placeholder text shown instead of a value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stub: Option<String>,
    /// Deployment changes shown in the cell.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub summaries: Vec<DeploymentSummary>,
    /// Drill-down link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

impl Cell {
    /// Creates a cell with a value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Creates an empty cell.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sets the compact form of the value.
    #[must_use]
    pub fn with_short_value(mut self, short_value: impl Into<String>) -> Self {
        self.short_value = Some(short_value.into());
        self
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Appends a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the status marker.
    #[must_use]
    pub fn with_status(mut self, status: Status, message: impl Into<String>) -> Self {
        self.status = Some(CellStatus {
            status,
            message: message.into(),
        });
        self
    }

    /// Changes the severity of an existing status marker.
    #[must_use]
    pub fn update_status(mut self, status: Status) -> Self {
        if let Some(ref mut current) = self.status {
            current.status = status;
        }
        self
    }

    /// Sets the icon.
    #[must_use]
    pub fn with_icon(mut self, name: impl Into<String>, color: impl Into<String>) -> Self {
        self.icon = Some(Icon {
            name: name.into(),
            color: color.into(),
        });
        self
    }

    /// Sets the placeholder text.
    #[must_use]
    pub fn with_stub(mut self, stub: impl Into<String>) -> Self {
        self.stub = Some(stub.into());
        self
    }

    /// Sets the drill-down link.
    #[must_use]
    pub fn with_link(mut self, link: Link) -> Self {
        self.link = Some(link);
        self
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// Stable row id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Cells, one per header column.
    pub cells: Vec<Cell>,
}

/// A table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    /// Column headers.
    pub header: Vec<String>,
    /// Rows, in display order.
    pub rows: Vec<Row>,
    /// Let the reader re-sort rows by column.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sorted: bool,
}

impl Table {
    /// Sets whether rows may be re-sorted.
    pub fn set_sorted(&mut self, sorted: bool) {
        self.sorted = sorted;
    }

    /// Appends a row.
    pub fn add_row(&mut self, cells: Vec<Cell>) -> &mut Row {
        self.rows.push(Row { id: None, cells });
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }
}

/// Findings of one audit.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// The subsystem covered.
    pub kind: ReportKind,
    /// Checks, in creation order.
    pub checks: Vec<Check>,
    /// Charts, in creation order.
    pub charts: Vec<Chart>,
    /// Tables, in creation order.
    pub tables: Vec<Table>,
}

impl Report {
    /// Creates an empty report.
    #[must_use]
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            checks: Vec::new(),
            charts: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Attaches a finished check.
    pub fn add_check(&mut self, check: Check) {
        self.checks.push(check);
    }

    /// Returns the chart with the given title, creating it if needed.
    pub fn chart(&mut self, title: &str) -> &mut Chart {
        self.chart_in_group(title, None)
    }

    /// Returns the chart with the given title and group, creating it if needed.
    pub fn chart_in_group(&mut self, title: &str, group: Option<&str>) -> &mut Chart {
        let position = self
            .charts
            .iter()
            .position(|c| c.title == title && c.group.as_deref() == group);
        let index = position.unwrap_or_else(|| {
            self.charts.push(Chart::new(title, group));
            self.charts.len() - 1
        });
        &mut self.charts[index]
    }

    /// Returns the table with the given header, creating it if needed.
    pub fn table(&mut self, header: &[&str]) -> &mut Table {
        let position = self
            .tables
            .iter()
            .position(|t| t.header.iter().map(String::as_str).eq(header.iter().copied()));
        let index = position.unwrap_or_else(|| {
            self.tables.push(Table {
                header: header.iter().map(|h| (*h).to_string()).collect(),
                rows: Vec::new(),
                sorted: false,
            });
            self.tables.len() - 1
        });
        &mut self.tables[index]
    }

    /// Returns the first chart with the given title and group.
    #[must_use]
    pub fn find_chart(&self, title: &str, group: Option<&str>) -> Option<&Chart> {
        self.charts
            .iter()
            .find(|c| c.title == title && c.group.as_deref() == group)
    }

    /// Returns the check with the given id.
    #[must_use]
    pub fn find_check(&self, id: crate::check::CheckId) -> Option<&Check> {
        self.checks.iter().find(|c| c.id == id)
    }
}
