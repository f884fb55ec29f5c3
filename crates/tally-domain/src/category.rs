//! Expense category labels

use crate::Confidence;

/// Sentinel label for documents whose classification failed
pub const UNCATEGORIZED: &str = "Uncategorized";

/// The closed label set offered to the zero-shot classifier by default
pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "Groceries and Supermarket",
    "Food and Restaurant",
    "Fuel and Gas Station",
    "Utilities and Bills",
    "Hardware and DIY",
    "Stationery and Office Supplies",
    "Pharmacy and Medical",
    "Transportation and Parking",
    "Electronics",
];

/// Outcome of classifying one document
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryResult {
    /// Winning label (or [`UNCATEGORIZED`])
    pub label: String,

    /// Score of the winning label
    pub confidence: Confidence,
}

impl CategoryResult {
    /// Create a result for a classified document
    pub fn new(label: impl Into<String>, confidence: impl Into<Confidence>) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.into(),
        }
    }

    /// The fallback result used whenever classification fails
    pub fn uncategorized() -> Self {
        Self {
            label: UNCATEGORIZED.to_string(),
            confidence: Confidence::ZERO,
        }
    }

    /// Whether this is the failure sentinel
    pub fn is_uncategorized(&self) -> bool {
        self.label == UNCATEGORIZED
    }
}

/// The default label set as owned strings
pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}
