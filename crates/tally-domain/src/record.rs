//! Document record module - the unit persisted by the checkpoint store

use crate::{CategoryResult, Confidence, UNCATEGORIZED};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Stable identifier of one source document (typically its file name)
///
/// The primary deduplication key: a checkpoint never holds two records with
/// the same `ItemKey`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Create a key from any string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive the key from a file path (its file name)
    ///
    /// Returns `None` when the path has no final component or the file name
    /// is not valid UTF-8; a lossy conversion could give two files the same
    /// key.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_domain::ItemKey;
    /// use std::path::Path;
    ///
    /// let key = ItemKey::from_path(Path::new("/data/raw/X51005200931.jpg")).unwrap();
    /// assert_eq!(key.as_str(), "X51005200931.jpg");
    /// ```
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| Self(name.to_string()))
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Polygon around a recognized token, as integer pixel points
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingBox(pub Vec<[i32; 2]>);

/// One text fragment produced by text recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedToken {
    /// Recognized text
    pub text: String,

    /// Where the text sits on the page
    pub bounding_box: BoundingBox,

    /// Recognizer certainty
    pub confidence: Confidence,
}

impl RecognizedToken {
    /// Create a token
    pub fn new(text: impl Into<String>, bounding_box: BoundingBox, confidence: impl Into<Confidence>) -> Self {
        Self {
            text: text.into(),
            bounding_box,
            confidence: confidence.into(),
        }
    }
}

/// One processed input document
///
/// Optional fields serialize as explicit `null` so the checkpoint file stays
/// self-describing; missing fields deserialize as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Unique, stable identifier of the source item
    pub item_key: ItemKey,

    /// Locator of the original input
    pub source_path: String,

    /// Extracted merchant name
    #[serde(default)]
    pub merchant: Option<String>,

    /// Raw extracted date text (not parsed)
    #[serde(default)]
    pub purchase_date: Option<String>,

    /// Raw extracted total amount text
    #[serde(default)]
    pub total_amount_raw: Option<String>,

    /// Normalized amount; absent when the raw text does not parse
    #[serde(default)]
    pub total_amount_clean: Option<f64>,

    /// Category label or `Uncategorized`
    pub category: String,

    /// Score of `category`
    pub category_confidence: Confidence,

    /// Text recognition output, in reading order
    #[serde(default)]
    pub extracted_tokens: Vec<RecognizedToken>,
}

impl DocumentRecord {
    /// Create a record with no extracted fields and the `Uncategorized` sentinel
    pub fn uncategorized(item_key: ItemKey, source_path: impl Into<String>) -> Self {
        Self {
            item_key,
            source_path: source_path.into(),
            merchant: None,
            purchase_date: None,
            total_amount_raw: None,
            total_amount_clean: None,
            category: UNCATEGORIZED.to_string(),
            category_confidence: Confidence::ZERO,
            extracted_tokens: Vec::new(),
        }
    }

    /// Apply a classification outcome
    pub fn with_category(mut self, result: CategoryResult) -> Self {
        self.category = result.label;
        self.category_confidence = result.confidence;
        self
    }

    /// Whether the category is the failure sentinel
    pub fn is_uncategorized(&self) -> bool {
        self.category == UNCATEGORIZED
    }

    /// Whether an operator should look at this record: uncategorized or
    /// lacking a usable amount
    pub fn is_degraded(&self) -> bool {
        self.is_uncategorized() || self.total_amount_clean.is_none()
    }
}
