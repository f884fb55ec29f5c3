//! Tally Storage Layer
//!
//! Two stores with different jobs:
//!
//! - [`JsonCheckpointStore`]: the durable, append-only source of truth for a
//!   batch run. One pretty-printed JSON array of `DocumentRecord`s, replaced
//!   atomically (write temp file, fsync, verify, rename) on every append.
//! - [`ReportTable`]: a SQLite projection of the checkpoint for reporting.
//!   Loading is insert-if-absent on `item_key`, so it can be repeated freely.
//!
//! # Examples
//!
//! ```no_run
//! use tally_domain::traits::CheckpointStore;
//! use tally_store::{JsonCheckpointStore, ReportTable};
//!
//! let checkpoint = JsonCheckpointStore::open("data/checkpoint.json").unwrap();
//! let mut table = ReportTable::open(":memory:").unwrap();
//! let summary = table.load_records(checkpoint.records()).unwrap();
//! println!("{} new rows", summary.inserted);
//! ```

#![warn(missing_docs)]

mod checkpoint;
mod report;

use thiserror::Error;

pub use checkpoint::JsonCheckpointStore;
pub use report::{CategorySummary, DailyTotal, LoadSummary, OutlierRow, ReportTable};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The checkpoint file exists but cannot be parsed
    #[error("Checkpoint {path} is corrupt: {reason}")]
    Corrupt {
        /// Checkpoint file
        path: String,
        /// Parser message
        reason: String,
    },

    /// The freshly written checkpoint did not read back as written
    #[error("Checkpoint verification failed: {0}")]
    Verification(String),
}
