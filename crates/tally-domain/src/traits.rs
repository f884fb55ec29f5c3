//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and the outside
//! world: the recognition services it calls and the store it commits to.
//! Implementations live in other crates.

use crate::{Confidence, DocumentRecord, InputItem, ItemKey, PreparedDocument, RecognizedToken};
use std::path::Path;

/// One answer from the document question answerer
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Answer text as produced by the service
    pub text: String,

    /// Service certainty
    pub confidence: Confidence,
}

impl Answer {
    /// Create an answer
    pub fn new(text: impl Into<String>, confidence: impl Into<Confidence>) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.into(),
        }
    }
}

/// One label score from the zero-shot classifier
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    /// Candidate label
    pub label: String,

    /// Score for the label
    pub score: Confidence,
}

impl LabelScore {
    /// Create a label score
    pub fn new(label: impl Into<String>, score: impl Into<Confidence>) -> Self {
        Self {
            label: label.into(),
            score: score.into(),
        }
    }
}

/// Image cleanup applied before text recognition
///
/// Failure here means the input itself is unreadable.
pub trait Preprocessor {
    /// Error type for preprocessing
    type Error;

    /// Prepare one input for recognition
    fn preprocess(&self, item: &InputItem) -> Result<PreparedDocument, Self::Error>;
}

/// Text recognition engine
pub trait TextRecognizer {
    /// Error type for recognition
    type Error;

    /// Recognize text tokens, in reading order
    fn recognize(&self, document: &PreparedDocument) -> Result<Vec<RecognizedToken>, Self::Error>;
}

/// Document field-extraction model (question answering over a document)
pub trait DocumentQuestionAnswerer {
    /// Error type for question answering
    type Error;

    /// Ask one question about the document at `locator`
    ///
    /// Returns answers ranked by descending confidence; empty when the model
    /// has nothing to say.
    fn answer(&self, locator: &Path, question: &str) -> Result<Vec<Answer>, Self::Error>;
}

/// Zero-shot category classifier
pub trait ZeroShotClassifier {
    /// Error type for classification
    type Error;

    /// Score `text` against `labels`, ranked by descending score
    fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<LabelScore>, Self::Error>;
}

/// Result of appending to a checkpoint store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The record was new and is now durable
    Inserted,

    /// A record with the same key already existed; nothing changed
    Duplicate,
}

/// Durable, idempotent record of processed items
///
/// Implemented by the infrastructure layer (tally-store)
pub trait CheckpointStore {
    /// Error type for store operations
    type Error;

    /// Re-read the durable representation, replacing in-memory state
    ///
    /// Missing or corrupt storage yields an empty set, not an error.
    fn load(&mut self) -> Result<Vec<DocumentRecord>, Self::Error>;

    /// Whether `key` has already been committed
    fn contains(&self, key: &ItemKey) -> bool;

    /// Commit `record` unless its key is already present
    ///
    /// After `Ok(AppendOutcome::Inserted)` the record survives a restart.
    fn append(&mut self, record: DocumentRecord) -> Result<AppendOutcome, Self::Error>;

    /// All committed records, in commit order
    fn records(&self) -> &[DocumentRecord];

    /// Number of committed records
    fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether nothing has been committed yet
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
