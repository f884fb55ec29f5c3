//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};
use tally_pipeline::{ItemOutcome, Resolution, RunSummary};
use tally_store::{CategorySummary, DailyTotal, LoadSummary, OutlierRow};

/// Everything the report command prints.
#[derive(Debug, Clone, Serialize)]
pub struct SpendReport {
    /// Spend per category, noise filtered
    pub categories: Vec<CategorySummary>,
    /// Largest amounts, unfiltered
    pub outliers: Vec<OutlierRow>,
    /// Daily series, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<Vec<DailyTotal>>,
}

/// Checkpoint progress against the input set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Input files found
    pub inputs: usize,
    /// Records in the checkpoint
    pub checkpointed: usize,
    /// Inputs not yet checkpointed
    pub pending: usize,
    /// Checkpointed records that are uncategorized or lack an amount
    pub degraded: usize,
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// The active output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// One progress line per finished item; table format only.
    pub fn progress(&self, outcome: &ItemOutcome, total: usize) -> Option<String> {
        if self.format != OutputFormat::Table {
            return None;
        }

        let width = total.to_string().len();
        let position = format!("[{:>width$}/{}]", outcome.index + 1, total, width = width);
        let detail = match &outcome.resolution {
            Resolution::AlreadyDone => self.colorize("already done", "cyan"),
            Resolution::Committed {
                category,
                confidence,
                total_amount,
                degraded,
            } => {
                let amount = total_amount
                    .map(|a| format!("{:.2}", a))
                    .unwrap_or_else(|| "-".to_string());
                let line = format!("{} ({}) {}", category, confidence, amount);
                if *degraded {
                    self.colorize(&line, "yellow")
                } else {
                    self.colorize(&line, "green")
                }
            }
            Resolution::Failed(e) => self.colorize(&format!("failed: {}", e), "red"),
        };

        Some(format!("{} {} {}", position, outcome.item_key, detail))
    }

    /// Format the end-of-run summary.
    pub fn run_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let failures: Vec<serde_json::Value> = summary
                    .failures()
                    .map(|o| {
                        serde_json::json!({
                            "item_key": o.item_key.as_str(),
                            "error": o.error().map(|e| e.to_string()),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&serde_json::json!({
                    "run_id": summary.run_id,
                    "interrupted": summary.interrupted,
                    "metrics": summary.metrics,
                    "failures": failures,
                }))?)
            }
            OutputFormat::Table => {
                let mut out = summary.metrics.summary();
                if summary.interrupted {
                    out.push('\n');
                    out.push_str(&self.warning(&format!(
                        "Interrupted: {} item(s) not started, run again to resume",
                        summary.metrics.not_started
                    )));
                }
                for failure in summary.failures() {
                    if let Some(e) = failure.error() {
                        out.push('\n');
                        out.push_str(&self.error(&format!("{}: {}", failure.item_key, e)));
                    }
                }
                Ok(out)
            }
            OutputFormat::Quiet => Ok(format!(
                "{} {} {}",
                summary.metrics.committed, summary.metrics.skipped, summary.metrics.failed
            )),
        }
    }

    /// Format the result of loading the checkpoint.
    pub fn load_summary(&self, summary: &LoadSummary, rows: usize) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "inserted": summary.inserted,
                "skipped": summary.skipped,
                "rows": rows,
            }))?),
            OutputFormat::Table => Ok(self.success(&format!(
                "Loaded {} new record(s), {} already present ({} row(s) total)",
                summary.inserted, summary.skipped, rows
            ))),
            OutputFormat::Quiet => Ok(summary.inserted.to_string()),
        }
    }

    /// Format the spend report.
    pub fn spend_report(&self, report: &SpendReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => {
                let mut sections = vec![
                    self.section("Spend by category", self.category_table(&report.categories)),
                    self.section("Largest amounts", self.outlier_table(&report.outliers)),
                ];
                if let Some(daily) = &report.daily {
                    sections.push(self.section("Daily spend", self.daily_table(daily)));
                }
                Ok(sections.join("\n\n"))
            }
            OutputFormat::Quiet => Ok(report
                .categories
                .iter()
                .map(|c| format!("{}\t{:.2}", c.category, c.total_amount))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format checkpoint status.
    pub fn status(&self, status: &StatusReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(status)?),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Inputs", "Checkpointed", "Pending", "Degraded"]);
                builder.push_record([
                    status.inputs.to_string(),
                    status.checkpointed.to_string(),
                    status.pending.to_string(),
                    status.degraded.to_string(),
                ]);
                Ok(Self::styled(builder))
            }
            OutputFormat::Quiet => Ok(status.pending.to_string()),
        }
    }

    fn section(&self, title: &str, body: String) -> String {
        format!("{}\n{}", self.colorize(title, "cyan"), body)
    }

    fn category_table(&self, rows: &[CategorySummary]) -> String {
        if rows.is_empty() {
            return self.colorize("No receipts with a plausible amount.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Category", "Receipts", "Total"]);
        for row in rows {
            builder.push_record([
                row.category.clone(),
                row.count.to_string(),
                format!("{:.2}", row.total_amount),
            ]);
        }
        Self::styled(builder)
    }

    fn outlier_table(&self, rows: &[OutlierRow]) -> String {
        if rows.is_empty() {
            return self.colorize("No amounts recorded.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Receipt", "Merchant", "Amount", "Category"]);
        for row in rows {
            builder.push_record([
                row.item_key.clone(),
                row.merchant.clone().unwrap_or_else(|| "-".to_string()),
                format!("{:.2}", row.total_amount),
                row.category.clone(),
            ]);
        }
        Self::styled(builder)
    }

    fn daily_table(&self, rows: &[DailyTotal]) -> String {
        if rows.is_empty() {
            return self.colorize("No receipts with a plausible date.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Date", "Receipts", "Total"]);
        for row in rows {
            builder.push_record([
                row.date.to_string(),
                row.count.to_string(),
                format!("{:.2}", row.total_amount),
            ]);
        }
        Self::styled(builder)
    }

    fn styled(builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}
