//! Report command implementation.

use crate::cli::ReportArgs;
use crate::commands::load::{load_into, open_report_table};
use crate::config::Config;
use crate::error::Result;
use crate::output::{Formatter, SpendReport};
use tally_store::ReportTable;
use tally_validate::Validator;
use tracing::debug;

/// Build the spend report from `table`.
pub fn build_report(table: &ReportTable, config: &Config, limit: usize, daily: bool) -> Result<SpendReport> {
    let categories = table.category_summary(config.validation.amount_noise_threshold)?;
    let outliers = table.top_outliers(limit)?;
    let daily = if daily {
        Some(table.daily_totals(&Validator::new(config.validation.clone()))?)
    } else {
        None
    };

    Ok(SpendReport {
        categories,
        outliers,
        daily,
    })
}

/// Execute the report command.
pub fn execute_report(args: ReportArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let database = args.database.as_deref().unwrap_or(config.report.database_path.as_path());
    let mut table = open_report_table(database)?;

    if args.load {
        let summary = load_into(&mut table, &config.pipeline.checkpoint_path)?;
        debug!(inserted = summary.inserted, skipped = summary.skipped, "Loaded checkpoint before reporting");
    }

    let limit = args.limit.unwrap_or(config.report.outlier_limit);
    let report = build_report(&table, config, limit, args.daily)?;
    println!("{}", formatter.spend_report(&report)?);
    Ok(())
}
