//! Record normalization and plausibility checks

use crate::{clean_amount, parse_receipt_date, ValidationConfig};
use chrono::NaiveDate;
use tally_domain::DocumentRecord;
use tracing::debug;

/// Result of validating one record
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Whether every checked value looked plausible
    pub status: ValidationStatus,

    /// Everything that looked wrong
    pub reasons: Vec<RejectionReason>,
}

impl ValidationReport {
    fn from_reasons(reasons: Vec<RejectionReason>) -> Self {
        let status = if reasons.is_empty() {
            ValidationStatus::Accepted
        } else {
            ValidationStatus::Flagged
        };
        Self { status, reasons }
    }

    /// Whether no value was rejected
    pub fn is_clean(&self) -> bool {
        self.status == ValidationStatus::Accepted
    }
}

/// Validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// All present values are plausible
    Accepted,

    /// At least one value was rejected; the record is still kept
    Flagged,
}

/// Why a value was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// No amount was extracted
    MissingAmount,

    /// Amount text did not parse to a nonnegative number
    UnparseableAmount {
        /// Raw extracted text
        raw: String,
    },

    /// Amount at or above the noise threshold
    AmountAboveNoiseThreshold {
        /// Cleaned amount
        amount: f64,
        /// Configured threshold
        threshold: f64,
    },

    /// No date was extracted
    MissingDate,

    /// Date text matched none of the configured formats
    UnparseableDate {
        /// Raw extracted text
        raw: String,
    },

    /// Parsed date lies outside the configured range
    DateOutOfRange {
        /// Parsed date
        date: NaiveDate,
        /// Earliest accepted date
        from: NaiveDate,
        /// Latest accepted date
        to: NaiveDate,
    },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAmount => write!(f, "no total amount extracted"),
            Self::UnparseableAmount { raw } => write!(f, "amount '{}' is not a number", raw),
            Self::AmountAboveNoiseThreshold { amount, threshold } => {
                write!(f, "amount {} is at or above noise threshold {}", amount, threshold)
            }
            Self::MissingDate => write!(f, "no purchase date extracted"),
            Self::UnparseableDate { raw } => write!(f, "date '{}' matches no known format", raw),
            Self::DateOutOfRange { date, from, to } => {
                write!(f, "date {} outside {}..={}", date, from, to)
            }
        }
    }
}

/// The Validator cleans extracted values and flags implausible ones
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new Validator with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Create a Validator with default configuration
    pub fn default_config() -> Self {
        Self::new(ValidationConfig::default())
    }

    /// The active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Clean amount text using the configured symbol set
    pub fn clean_amount(&self, raw: &str) -> Option<f64> {
        clean_amount(raw, &self.config.stripped_symbols)
    }

    /// Parse date text using the configured formats
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        parse_receipt_date(raw, &self.config.date_formats)
    }

    /// Whether `amount` is below the noise threshold
    pub fn is_plausible_amount(&self, amount: f64) -> bool {
        amount < self.config.amount_noise_threshold
    }

    /// Whether `date` lies within the corpus date range
    pub fn is_plausible_date(&self, date: NaiveDate) -> bool {
        date >= self.config.valid_date_from && date <= self.config.valid_date_to
    }

    /// Fill the cleaned fields of `record` from its raw fields and report
    /// anything implausible
    ///
    /// Raw fields are never modified. `total_amount_clean` is set only when the
    /// raw amount parses; an amount above the noise threshold is still stored
    /// (aggregation filters it) but flagged here.
    pub fn normalize(&self, record: &mut DocumentRecord) -> ValidationReport {
        record.merchant = record
            .merchant
            .take()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        record.total_amount_clean = record
            .total_amount_raw
            .as_deref()
            .and_then(|raw| self.clean_amount(raw));

        let report = self.validate(record);
        if !report.is_clean() {
            debug!(
                item_key = %record.item_key,
                reasons = ?report.reasons,
                "Record flagged during normalization"
            );
        }
        report
    }

    /// Check a record without changing it
    pub fn validate(&self, record: &DocumentRecord) -> ValidationReport {
        let mut reasons = Vec::new();

        // 1. Amount
        match (&record.total_amount_raw, record.total_amount_clean) {
            (None, _) => reasons.push(RejectionReason::MissingAmount),
            (Some(raw), None) => reasons.push(RejectionReason::UnparseableAmount { raw: raw.clone() }),
            (Some(_), Some(amount)) => {
                if !self.is_plausible_amount(amount) {
                    reasons.push(RejectionReason::AmountAboveNoiseThreshold {
                        amount,
                        threshold: self.config.amount_noise_threshold,
                    });
                }
            }
        }

        // 2. Date
        match &record.purchase_date {
            None => reasons.push(RejectionReason::MissingDate),
            Some(raw) => match self.parse_date(raw) {
                None => reasons.push(RejectionReason::UnparseableDate { raw: raw.clone() }),
                Some(date) if !self.is_plausible_date(date) => {
                    reasons.push(RejectionReason::DateOutOfRange {
                        date,
                        from: self.config.valid_date_from,
                        to: self.config.valid_date_to,
                    });
                }
                Some(_) => {}
            },
        }

        ValidationReport::from_reasons(reasons)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_domain::ItemKey;

    fn record(amount: Option<&str>, date: Option<&str>) -> DocumentRecord {
        let mut r = DocumentRecord::uncategorized(ItemKey::new("r.jpg"), "r.jpg");
        r.total_amount_raw = amount.map(String::from);
        r.purchase_date = date.map(String::from);
        r
    }

    #[test]
    fn test_clean_record_accepted() {
        let validator = Validator::default_config();
        let mut r = record(Some("$45.10"), Some("12/03/2018"));
        let report = validator.normalize(&mut r);

        assert_eq!(r.total_amount_clean, Some(45.10));
        assert!(report.is_clean());
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn test_unparseable_amount_stays_raw() {
        let validator = Validator::default_config();
        let mut r = record(Some("RM12.00"), Some("12/03/2018"));
        let report = validator.normalize(&mut r);

        assert_eq!(r.total_amount_raw.as_deref(), Some("RM12.00"));
        assert_eq!(r.total_amount_clean, None);
        assert_eq!(report.status, ValidationStatus::Flagged);
        assert!(matches!(report.reasons[0], RejectionReason::UnparseableAmount { .. }));
    }

    #[test]
    fn test_noise_amount_kept_but_flagged() {
        let validator = Validator::default_config();
        let mut r = record(Some("25000"), Some("12/03/2018"));
        let report = validator.normalize(&mut r);

        assert_eq!(r.total_amount_clean, Some(25_000.0));
        assert!(matches!(
            report.reasons[0],
            RejectionReason::AmountAboveNoiseThreshold { .. }
        ));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let validator = Validator::default_config();
        assert!(validator.is_plausible_amount(19_999.99));
        assert!(!validator.is_plausible_amount(20_000.0));
    }

    #[test]
    fn test_date_out_of_range() {
        let validator = Validator::default_config();
        let r = record(Some("1.00"), Some("01/01/2023"));
        let report = validator.validate(&r);
        assert!(matches!(report.reasons[0], RejectionReason::DateOutOfRange { .. }));
    }

    #[test]
    fn test_date_bounds_inclusive() {
        let validator = Validator::default_config();
        assert!(validator.is_plausible_date(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()));
        assert!(validator.is_plausible_date(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap()));
        assert!(!validator.is_plausible_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()));
    }

    #[test]
    fn test_missing_fields_reported() {
        let validator = Validator::default_config();
        let report = validator.validate(&record(None, None));
        assert_eq!(
            report.reasons,
            vec![RejectionReason::MissingAmount, RejectionReason::MissingDate]
        );
    }

    #[test]
    fn test_blank_merchant_becomes_absent() {
        let validator = Validator::default_config();
        let mut r = record(Some("1.00"), Some("01/01/2018"));
        r.merchant = Some("   ".to_string());
        validator.normalize(&mut r);
        assert!(r.merchant.is_none());
    }

    #[test]
    fn test_ringgit_config_cleans_prefix() {
        let validator = Validator::new(ValidationConfig::ringgit());
        let mut r = record(Some("RM12.00"), Some("01/01/2018"));
        validator.normalize(&mut r);
        assert_eq!(r.total_amount_clean, Some(12.0));
    }
}
