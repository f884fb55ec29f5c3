//! Confidence score module

use serde::{Deserialize, Serialize};
use std::fmt;

/// A model's certainty in an extracted or classified value.
///
/// Always within [0.0, 1.0]. Out-of-range inputs are clamped and `NaN` becomes
/// `0.0`, so a misbehaving service can never push a record outside the range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// The zero score used for failed classification
    pub const ZERO: Confidence = Confidence(0.0);

    /// Create a confidence, clamping into [0, 1]
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_domain::Confidence;
    ///
    /// assert_eq!(Confidence::new(0.42).value(), 0.42);
    /// assert_eq!(Confidence::new(1.7).value(), 1.0);
    /// assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
    /// ```
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Get the raw score
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether the score is strictly below `threshold`
    pub fn is_below(&self, threshold: f64) -> bool {
        self.0 < threshold
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}
