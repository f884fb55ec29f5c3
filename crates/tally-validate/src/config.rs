//! Validation configuration

use crate::date::default_date_formats;
use crate::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Configuration for cleaning and plausibility rules
///
/// The date bounds describe the provenance of the receipt corpus (scanned
/// receipts published in 2019), which is why they are configuration rather
/// than constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Substrings removed from amount text before parsing
    pub stripped_symbols: Vec<String>,

    /// Earliest plausible purchase date (inclusive)
    pub valid_date_from: NaiveDate,

    /// Latest plausible purchase date (inclusive)
    pub valid_date_to: NaiveDate,

    /// Amounts at or above this are treated as misread artifacts
    /// (phone numbers, barcodes) and left out of aggregate sums
    pub amount_noise_threshold: f64,

    /// `chrono` formats tried, in order, when parsing dates
    pub date_formats: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            stripped_symbols: vec!["$".to_string(), ",".to_string()],
            valid_date_from: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            valid_date_to: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap_or_default(),
            amount_noise_threshold: 20_000.0,
            date_formats: default_date_formats(),
        }
    }
}

impl ValidationConfig {
    /// Configuration for ringgit receipts where the extractor leaves `RM` in
    /// the answer
    pub fn ringgit() -> Self {
        let mut config = Self::default();
        config.stripped_symbols.push("RM".to_string());
        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.valid_date_from > self.valid_date_to {
            return Err(ValidationError::Config(format!(
                "valid_date_from {} is after valid_date_to {}",
                self.valid_date_from, self.valid_date_to
            )));
        }
        if self.amount_noise_threshold.is_nan() || self.amount_noise_threshold <= 0.0 {
            return Err(ValidationError::Config(
                "amount_noise_threshold must be greater than 0".to_string(),
            ));
        }
        if self.date_formats.is_empty() {
            return Err(ValidationError::Config(
                "date_formats must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ValidationError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ValidationError> {
        toml::to_string_pretty(self).map_err(|e| ValidationError::Config(e.to_string()))
    }
}
