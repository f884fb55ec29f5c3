//! Tally Validation & Normalization
//!
//! Cleans and range-checks the values extracted from a receipt.
//!
//! The Validator provides:
//! - Amount cleaning (configurable symbol stripping, nonnegative decimals only)
//! - Date parsing against a list of accepted formats
//! - Plausibility checks (corpus date range, amount noise threshold)
//! - A per-record report of everything that looked wrong
//!
//! Nothing here drops data. A rejected value stays in the record as raw text;
//! aggregation decides at query time what to leave out of its sums.
//!
//! # Examples
//!
//! ```
//! use tally_validate::{Validator, ValidationConfig};
//!
//! let validator = Validator::new(ValidationConfig::default());
//!
//! assert_eq!(validator.clean_amount("$1,234.50"), Some(1234.50));
//! assert_eq!(validator.clean_amount("RM12.00"), None);
//! assert!(!validator.is_plausible_amount(25_000.0));
//! ```

#![warn(missing_docs)]

mod amount;
mod config;
mod date;
mod error;
mod validator;

pub use amount::clean_amount;
pub use config::ValidationConfig;
pub use date::parse_receipt_date;
pub use error::ValidationError;
pub use validator::{RejectionReason, ValidationReport, ValidationStatus, Validator};
