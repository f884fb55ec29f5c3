//! Deterministic service doubles
//!
//! These return pre-configured responses without touching the network or the
//! file system. Clones share their configuration and call records, so a test
//! can hand one clone to the pipeline and inspect the other afterwards.
//!
//! # Examples
//!
//! ```
//! use tally_adapter::mock::MockQuestionAnswerer;
//! use tally_domain::traits::DocumentQuestionAnswerer;
//! use std::path::Path;
//!
//! let qa = MockQuestionAnswerer::default()
//!     .with_answer("What is the total amount?", "12.50", 0.92);
//!
//! let answers = qa.answer(Path::new("r.jpg"), "What is the total amount?").unwrap();
//! assert_eq!(answers[0].text, "12.50");
//! assert_eq!(qa.call_count(), 1);
//! ```

use crate::AdapterError;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tally_domain::traits::{
    DocumentQuestionAnswerer, Preprocessor, TextRecognizer, ZeroShotClassifier,
};
use tally_domain::{
    Answer, BoundingBox, InputItem, LabelScore, PreparedDocument, RecognizedToken,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn document_name(locator: &Path) -> String {
    locator
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| locator.to_string_lossy().into_owned())
}

#[derive(Debug, Default)]
struct QaState {
    answers: HashMap<String, Vec<Answer>>,
    document_answers: HashMap<(String, String), Vec<Answer>>,
    failing_documents: HashSet<String>,
    failing_questions: HashSet<String>,
    asked: Vec<(String, String)>,
}

/// Mock document question answerer
#[derive(Debug, Clone, Default)]
pub struct MockQuestionAnswerer {
    state: Arc<Mutex<QaState>>,
}

impl MockQuestionAnswerer {
    /// Answer `question` with `text` for every document
    pub fn with_answer(self, question: impl Into<String>, text: impl Into<String>, confidence: f64) -> Self {
        lock(&self.state)
            .answers
            .entry(question.into())
            .or_default()
            .push(Answer::new(text, confidence));
        self
    }

    /// Answer `question` with `text` for the document named `document` only
    pub fn with_document_answer(
        self,
        document: impl Into<String>,
        question: impl Into<String>,
        text: impl Into<String>,
        confidence: f64,
    ) -> Self {
        lock(&self.state)
            .document_answers
            .entry((document.into(), question.into()))
            .or_default()
            .push(Answer::new(text, confidence));
        self
    }

    /// Fail every question about the document named `document`
    pub fn failing_document(self, document: impl Into<String>) -> Self {
        lock(&self.state).failing_documents.insert(document.into());
        self
    }

    /// Fail `question` for every document
    pub fn failing_question(self, question: impl Into<String>) -> Self {
        lock(&self.state).failing_questions.insert(question.into());
        self
    }

    /// Get the number of times answer was called
    pub fn call_count(&self) -> usize {
        lock(&self.state).asked.len()
    }

    /// Every (document name, question) pair asked so far, in order
    pub fn asked(&self) -> Vec<(String, String)> {
        lock(&self.state).asked.clone()
    }

    /// Questions asked about the document named `document`, in order
    pub fn questions_for(&self, document: &str) -> Vec<String> {
        lock(&self.state)
            .asked
            .iter()
            .filter(|(doc, _)| doc == document)
            .map(|(_, q)| q.clone())
            .collect()
    }
}

impl DocumentQuestionAnswerer for MockQuestionAnswerer {
    type Error = AdapterError;

    fn answer(&self, locator: &Path, question: &str) -> Result<Vec<Answer>, Self::Error> {
        let document = document_name(locator);
        let mut state = lock(&self.state);
        state.asked.push((document.clone(), question.to_string()));

        if state.failing_documents.contains(&document) || state.failing_questions.contains(question) {
            return Err(AdapterError::Communication("Mock error".to_string()));
        }

        let key = (document, question.to_string());
        if let Some(answers) = state.document_answers.get(&key) {
            return Ok(answers.clone());
        }
        Ok(state.answers.get(question).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
struct ClassifierState {
    ranked: Vec<LabelScore>,
    fail_when_contains: Vec<String>,
    texts: Vec<String>,
}

/// Mock zero-shot classifier returning a fixed ranking
#[derive(Debug, Clone, Default)]
pub struct MockClassifier {
    state: Arc<Mutex<ClassifierState>>,
}

impl MockClassifier {
    /// Create a classifier that always returns `ranked`
    pub fn new(ranked: Vec<(&str, f64)>) -> Self {
        let ranked = ranked
            .into_iter()
            .map(|(label, score)| LabelScore::new(label, score))
            .collect();
        Self {
            state: Arc::new(Mutex::new(ClassifierState {
                ranked,
                ..Default::default()
            })),
        }
    }

    /// Fail any call whose text contains `needle`
    pub fn failing_when_contains(self, needle: impl Into<String>) -> Self {
        lock(&self.state).fail_when_contains.push(needle.into());
        self
    }

    /// Get the number of times classify was called
    pub fn call_count(&self) -> usize {
        lock(&self.state).texts.len()
    }

    /// Texts passed to classify, in order
    pub fn texts(&self) -> Vec<String> {
        lock(&self.state).texts.clone()
    }
}

impl ZeroShotClassifier for MockClassifier {
    type Error = AdapterError;

    fn classify(&self, text: &str, _labels: &[String]) -> Result<Vec<LabelScore>, Self::Error> {
        let mut state = lock(&self.state);
        state.texts.push(text.to_string());

        if state.fail_when_contains.iter().any(|needle| text.contains(needle.as_str())) {
            return Err(AdapterError::Other("Mock error".to_string()));
        }
        Ok(state.ranked.clone())
    }
}

#[derive(Debug, Default)]
struct RecognizerState {
    tokens: Vec<RecognizedToken>,
    failing_documents: HashSet<String>,
    calls: usize,
}

/// Mock text recognizer returning the same tokens for every document
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    state: Arc<Mutex<RecognizerState>>,
}

impl MockRecognizer {
    /// Create a recognizer returning one token per word, each with `confidence`
    pub fn from_words(words: &[&str], confidence: f64) -> Self {
        let tokens = words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let y = i as i32 * 12;
                RecognizedToken::new(
                    *word,
                    BoundingBox(vec![[0, y], [40, y], [40, y + 10], [0, y + 10]]),
                    confidence,
                )
            })
            .collect();
        Self::from_tokens(tokens)
    }

    /// Create a recognizer returning `tokens`
    pub fn from_tokens(tokens: Vec<RecognizedToken>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecognizerState {
                tokens,
                ..Default::default()
            })),
        }
    }

    /// Fail recognition for the document named `document`
    pub fn failing_document(self, document: impl Into<String>) -> Self {
        lock(&self.state).failing_documents.insert(document.into());
        self
    }

    /// Get the number of times recognize was called
    pub fn call_count(&self) -> usize {
        lock(&self.state).calls
    }
}

impl TextRecognizer for MockRecognizer {
    type Error = AdapterError;

    fn recognize(&self, document: &PreparedDocument) -> Result<Vec<RecognizedToken>, Self::Error> {
        let mut state = lock(&self.state);
        state.calls += 1;
        if state.failing_documents.contains(document.item.key.as_str()) {
            return Err(AdapterError::Timeout);
        }
        Ok(state.tokens.clone())
    }
}

#[derive(Debug, Default)]
struct PreprocessorState {
    unreadable: HashSet<String>,
    calls: usize,
}

/// Mock preprocessor that never touches the file system
#[derive(Debug, Clone, Default)]
pub struct MockPreprocessor {
    state: Arc<Mutex<PreprocessorState>>,
}

impl MockPreprocessor {
    /// Treat the document named `document` as unreadable
    pub fn unreadable(self, document: impl Into<String>) -> Self {
        lock(&self.state).unreadable.insert(document.into());
        self
    }

    /// Get the number of times preprocess was called
    pub fn call_count(&self) -> usize {
        lock(&self.state).calls
    }
}

impl Preprocessor for MockPreprocessor {
    type Error = AdapterError;

    fn preprocess(&self, item: &InputItem) -> Result<PreparedDocument, Self::Error> {
        let mut state = lock(&self.state);
        state.calls += 1;
        if state.unreadable.contains(item.key.as_str()) {
            return Err(AdapterError::Unreadable {
                path: item.source_path.display().to_string(),
                reason: "mock unreadable".to_string(),
            });
        }
        Ok(PreparedDocument {
            item: item.clone(),
            image: Vec::new(),
        })
    }
}
