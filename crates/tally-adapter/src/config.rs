//! Configuration for the Field Extraction Adapter

use crate::AdapterError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tally_domain::default_categories;

/// Questions asked for one document field
///
/// `fallback` is the same question phrased in the alternate language; it is
/// only asked when the primary attempt is insufficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldQuestions {
    /// Question asked first
    pub primary: String,

    /// Alternate-language question, if the field has one
    #[serde(default)]
    pub fallback: Option<String>,
}

impl FieldQuestions {
    /// A field with only a primary question
    pub fn single(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: None,
        }
    }

    /// A field with a primary and a fallback question
    pub fn with_fallback(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: Some(fallback.into()),
        }
    }
}

/// Configuration for the Field Extraction Adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Top confidence below which the fallback question is asked
    pub confidence_threshold: f64,

    /// Questions for the receipt total
    pub total_amount: FieldQuestions,

    /// Questions for the merchant name
    pub merchant: FieldQuestions,

    /// Questions for the purchase date
    pub purchase_date: FieldQuestions,

    /// Recognized tokens skipped before sampling classification text
    /// (header noise: shop address, registration numbers)
    pub classification_token_offset: usize,

    /// Maximum recognized tokens included in the classification text
    pub classification_token_limit: usize,

    /// Closed label set offered to the classifier
    pub categories: Vec<String>,

    /// Merchant name used in classification text when none was extracted
    pub unknown_merchant: String,

    /// Recognized tokens below this confidence are discarded
    pub min_token_confidence: f64,

    /// Base URL of the inference server
    pub endpoint: String,

    /// Per-request timeout for the inference server (seconds)
    pub request_timeout_secs: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            total_amount: FieldQuestions::with_fallback(
                "What is the total amount?",
                "What is the Jumlah?",
            ),
            merchant: FieldQuestions::single("What is the name of the store or merchant?"),
            purchase_date: FieldQuestions::single("What is the date of the receipt?"),
            classification_token_offset: 10,
            classification_token_limit: 60,
            categories: default_categories(),
            unknown_merchant: "Unknown Store".to_string(),
            min_token_confidence: 0.5,
            endpoint: crate::http::DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: crate::http::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AdapterConfig {
    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AdapterError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AdapterError::Config(format!(
                "confidence_threshold {} out of range [0.0, 1.0]",
                self.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_token_confidence) {
            return Err(AdapterError::Config(format!(
                "min_token_confidence {} out of range [0.0, 1.0]",
                self.min_token_confidence
            )));
        }
        if self.categories.is_empty() {
            return Err(AdapterError::Config("categories must not be empty".to_string()));
        }
        if self.categories.iter().any(|c| c == tally_domain::UNCATEGORIZED) {
            return Err(AdapterError::Config(format!(
                "'{}' is reserved and cannot be a category",
                tally_domain::UNCATEGORIZED
            )));
        }
        for (name, questions) in [
            ("total_amount", &self.total_amount),
            ("merchant", &self.merchant),
            ("purchase_date", &self.purchase_date),
        ] {
            if questions.primary.trim().is_empty() {
                return Err(AdapterError::Config(format!(
                    "{} primary question must not be empty",
                    name
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(AdapterError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, AdapterError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| AdapterError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, AdapterError> {
        toml::to_string_pretty(self)
            .map_err(|e| AdapterError::Config(format!("Failed to serialize TOML: {}", e)))
    }
}
