//! Table observer for comparing benchmark runs.
//!
//! This module provides [`TableObserver`], which renders validated runs as
//! formatted ASCII tables using the `tabled` crate.
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! scorte = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use scorte::observers::table::{TableObserver, TableStyle};
//!
//! let observer = TableObserver::new().with_style(TableStyle::Rounded);
//! println!("{}", observer.render(reports.iter()));
//! // ╭────────────────┬───────────┬─────────┬─────────┬─────────┬───────┬─────────────╮
//! // │ Strategy       │ Time (ms) │ vs best │ Success │ Failure │ Final │ Consistency │
//! // ├────────────────┼───────────┼─────────┼─────────┼─────────┼───────┼─────────────┤
//! // │ cas            │ 3         │ 1.00x   │ 1000    │ 0       │ 0     │ ok          │
//! // │ mutex          │ 5         │ 1.67x   │ 1000    │ 0       │ 0     │ ok          │
//! // ╰────────────────┴───────────┴─────────┴─────────┴─────────┴───────┴─────────────╯
//! ```

use std::time::Duration;

use tabled::{settings::Style, Table, Tabled};

use crate::validate::ValidationReport;

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// Dots for borders
    Dots,
    /// No borders, just spacing
    Blank,
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// The style to use for rendering.
    pub style: TableStyle,
    /// Whether to show the header row.
    pub show_header: bool,
    /// Custom title for the table (optional).
    pub title: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            show_header: true,
            title: None,
        }
    }
}

/// Internal row representation for tabled.
#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Contention")]
    level: String,
    #[tabled(rename = "Time (ms)")]
    elapsed_ms: String,
    #[tabled(rename = "vs best")]
    relative: String,
    #[tabled(rename = "Success")]
    successes: u64,
    #[tabled(rename = "Failure")]
    failures: u64,
    #[tabled(rename = "Retries")]
    retries: u64,
    #[tabled(rename = "Final")]
    final_quantity: i64,
    #[tabled(rename = "Consistency")]
    consistency: String,
}

/// An observer that renders benchmark runs as a comparison table.
///
/// Each row is one run. The "vs best" column divides the run's elapsed time
/// by the fastest run in the same rendering.
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Creates a new table observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table observer with the specified configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Sets the table style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets whether to show the header row.
    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    /// Sets an optional title for the table.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Applies the configured style to a table.
    fn apply_style(&self, table: &mut Table) {
        match self.config.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Modern => {
                table.with(Style::modern());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Dots => {
                table.with(Style::dots());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
    }

    /// Renders the reports as a table string.
    pub fn render<'a>(&self, reports: impl Iterator<Item = &'a ValidationReport>) -> String {
        let reports: Vec<&ValidationReport> = reports.collect();
        let best = reports
            .iter()
            .map(|report| report.result.elapsed)
            .min()
            .unwrap_or(Duration::ZERO);

        let rows: Vec<RunRow> = reports
            .iter()
            .map(|report| {
                let result = &report.result;
                RunRow {
                    strategy: result.strategy.to_string(),
                    level: result.level.to_string(),
                    elapsed_ms: format!("{:.3}", result.elapsed.as_secs_f64() * 1e3),
                    relative: format!("{:.2}x", result.relative_to(best)),
                    successes: result.successes(),
                    failures: result.failures(),
                    retries: result.retries,
                    final_quantity: result.final_quantity,
                    consistency: if report.is_consistent() {
                        "ok".to_string()
                    } else {
                        report
                            .violations
                            .iter()
                            .map(|v| v.name())
                            .collect::<Vec<_>>()
                            .join(", ")
                    },
                }
            })
            .collect();

        let mut table = Table::new(&rows);
        self.apply_style(&mut table);

        if !self.config.show_header {
            table.with(tabled::settings::Remove::row(
                tabled::settings::object::Rows::first(),
            ));
        }

        if let Some(ref title) = self.config.title {
            format!("{}\n{}", title, table)
        } else {
            table.to_string()
        }
    }
}
