//! Load command implementation.

use crate::cli::LoadArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use std::fs;
use std::path::Path;
use tally_store::{LoadSummary, ReportTable};

/// Open the report database, creating its directory if needed.
pub fn open_report_table(path: &Path) -> Result<ReportTable> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(ReportTable::open(path)?)
}

/// Load the checkpoint at `checkpoint` into `table`.
pub fn load_into(table: &mut ReportTable, checkpoint: &Path) -> Result<LoadSummary> {
    Ok(table.load_checkpoint(checkpoint)?)
}

/// Execute the load command.
pub fn execute_load(args: LoadArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let checkpoint = args.checkpoint.as_deref().unwrap_or(config.pipeline.checkpoint_path.as_path());
    let database = args.database.as_deref().unwrap_or(config.report.database_path.as_path());

    let mut table = open_report_table(database)?;
    let summary = load_into(&mut table, checkpoint)?;
    println!("{}", formatter.load_summary(&summary, table.row_count()?)?);
    Ok(())
}
