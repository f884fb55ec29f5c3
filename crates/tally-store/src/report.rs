//! SQLite report table

use crate::{JsonCheckpointStore, StoreError};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tally_domain::DocumentRecord;
use tally_validate::Validator;
use tracing::{debug, info};

/// Outcome of loading records into the report table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Rows that were new
    pub inserted: usize,
    /// Records whose key was already present
    pub skipped: usize,
}

/// One row of the category summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    /// Category label
    pub category: String,
    /// Sum of plausible amounts
    pub total_amount: f64,
    /// Number of receipts contributing to the sum
    pub count: usize,
}

/// One row of the outlier report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierRow {
    /// Source item
    pub item_key: String,
    /// Extracted merchant
    pub merchant: Option<String>,
    /// Cleaned amount, unfiltered
    pub total_amount: f64,
    /// Category label
    pub category: String,
}

/// Spend on one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    /// Purchase date
    pub date: NaiveDate,
    /// Sum of plausible amounts
    pub total_amount: f64,
    /// Receipts on that day
    pub count: usize,
}

/// Deduplicated, queryable projection of the checkpoint
pub struct ReportTable {
    conn: Connection,
}

impl ReportTable {
    /// Open (or create) the report database at `path`
    ///
    /// Use `:memory:` for an in-memory table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let table = Self { conn };
        table.initialize_schema()?;
        Ok(table)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Insert every record whose key is not already present
    ///
    /// Runs in one transaction; repeating a load never double-counts.
    pub fn load_records(&mut self, records: &[DocumentRecord]) -> Result<LoadSummary, StoreError> {
        let tx = self.conn.transaction()?;
        let mut summary = LoadSummary::default();
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO receipts
                 (itemKey, merchant, purchaseDate, totalAmountClean, category, categoryConfidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in records {
                let changed = stmt.execute(params![
                    record.item_key.as_str(),
                    record.merchant,
                    record.purchase_date,
                    record.total_amount_clean,
                    record.category,
                    record.category_confidence.value(),
                ])?;
                if changed == 0 {
                    summary.skipped += 1;
                } else {
                    summary.inserted += 1;
                }
            }
        }
        tx.commit()?;

        info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            "Loaded records into report table"
        );
        Ok(summary)
    }

    /// Load the checkpoint file at `path`
    ///
    /// A missing checkpoint loads nothing; a corrupt one is an error.
    pub fn load_checkpoint(&mut self, path: &Path) -> Result<LoadSummary, StoreError> {
        let records = JsonCheckpointStore::read_records(path)?;
        debug!(path = %path.display(), records = records.len(), "Read checkpoint for loading");
        self.load_records(&records)
    }

    /// Spend per category, counting only amounts below `noise_threshold`
    ///
    /// Ordered by total spend, highest first.
    pub fn category_summary(&self, noise_threshold: f64) -> Result<Vec<CategorySummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT category, SUM(totalAmountClean) AS total_spend, COUNT(*) AS receipt_count
             FROM receipts
             WHERE totalAmountClean IS NOT NULL AND totalAmountClean < ?1
             GROUP BY category
             ORDER BY total_spend DESC, category ASC",
        )?;

        let rows = stmt
            .query_map(params![noise_threshold], |row| {
                Ok(CategorySummary {
                    category: row.get(0)?,
                    total_amount: row.get(1)?,
                    count: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The `limit` largest amounts, with no noise filtering
    pub fn top_outliers(&self, limit: usize) -> Result<Vec<OutlierRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT itemKey, merchant, totalAmountClean, category
             FROM receipts
             WHERE totalAmountClean IS NOT NULL
             ORDER BY totalAmountClean DESC, itemKey ASC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(OutlierRow {
                    item_key: row.get(0)?,
                    merchant: row.get(1)?,
                    total_amount: row.get(2)?,
                    category: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Daily spend series, ordered by date
    ///
    /// Only rows whose date parses and falls inside the validator's range and
    /// whose amount is plausible contribute.
    pub fn daily_totals(&self, validator: &Validator) -> Result<Vec<DailyTotal>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT purchaseDate, totalAmountClean
             FROM receipts
             WHERE purchaseDate IS NOT NULL AND totalAmountClean IS NOT NULL",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for (raw_date, amount) in rows {
            let Some(date) = validator.parse_date(&raw_date) else {
                continue;
            };
            if !validator.is_plausible_date(date) || !validator.is_plausible_amount(amount) {
                continue;
            }
            let entry = days.entry(date).or_insert((0.0, 0));
            entry.0 += amount;
            entry.1 += 1;
        }

        Ok(days
            .into_iter()
            .map(|(date, (total_amount, count))| DailyTotal {
                date,
                total_amount,
                count,
            })
            .collect())
    }

    /// Number of rows in the table
    pub fn row_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM receipts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
