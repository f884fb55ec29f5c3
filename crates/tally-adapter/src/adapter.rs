//! The Field Extraction Adapter
//!
//! Every method here is infallible: service errors, timeouts and empty
//! responses are logged with the item key and turned into an absent field,
//! an empty token list or the `Uncategorized` category.

use crate::config::{AdapterConfig, FieldQuestions};
use std::fmt::Display;
use std::path::Path;
use tally_domain::traits::{DocumentQuestionAnswerer, TextRecognizer, ZeroShotClassifier};
use tally_domain::{Answer, CategoryResult, InputItem, ItemKey, PreparedDocument, RecognizedToken};
use tracing::{debug, warn};

/// Which question produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The primary-language question
    Primary,
    /// The alternate-language question
    Fallback,
}

/// Result of asking for one document field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// A non-empty answer was obtained
    Answered {
        /// The accepted answer, trimmed
        answer: Answer,
        /// The question that produced it
        attempt: Attempt,
    },
    /// The service answered but had nothing usable
    Absent,
    /// No answer, and at least one service call failed
    Unavailable,
}

impl FieldOutcome {
    /// The answer text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Answered { answer, .. } => Some(&answer.text),
            Self::Absent | Self::Unavailable => None,
        }
    }

    /// Consume the outcome, keeping only the answer text
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Answered { answer, .. } => Some(answer.text),
            Self::Absent | Self::Unavailable => None,
        }
    }

    /// Which attempt produced the answer
    pub fn attempt(&self) -> Option<Attempt> {
        match self {
            Self::Answered { attempt, .. } => Some(*attempt),
            Self::Absent | Self::Unavailable => None,
        }
    }

    /// Whether a service call failed and nothing was recovered
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Raw field texts extracted from one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    /// Merchant name
    pub merchant: Option<String>,
    /// Purchase date, unparsed
    pub purchase_date: Option<String>,
    /// Total amount, unparsed
    pub total_amount: Option<String>,
    /// Whether the question answerer failed for any field
    pub unavailable: bool,
}

/// One question's result before the fallback decision
enum Reply {
    Answer(Answer),
    Empty,
    Failed,
}

impl Reply {
    fn into_answer(self) -> Option<Answer> {
        match self {
            Reply::Answer(answer) => Some(answer),
            Reply::Empty | Reply::Failed => None,
        }
    }
}

/// Uniform front for the question answerer, classifier and recognizer
pub struct FieldExtractionAdapter<Q, C, R> {
    qa: Q,
    classifier: C,
    recognizer: R,
    config: AdapterConfig,
}

impl<Q, C, R> FieldExtractionAdapter<Q, C, R>
where
    Q: DocumentQuestionAnswerer,
    C: ZeroShotClassifier,
    R: TextRecognizer,
    Q::Error: Display,
    C::Error: Display,
    R::Error: Display,
{
    /// Create a new adapter over the given services
    pub fn new(qa: Q, classifier: C, recognizer: R, config: AdapterConfig) -> Self {
        Self {
            qa,
            classifier,
            recognizer,
            config,
        }
    }

    /// Get the adapter configuration
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Ask one question and keep the best non-empty answer
    fn ask_once(&self, key: &ItemKey, locator: &Path, question: &str) -> Reply {
        match self.qa.answer(locator, question) {
            Ok(answers) => answers
                .into_iter()
                .find_map(|a| {
                    let text = a.text.trim();
                    (!text.is_empty()).then(|| Answer::new(text, a.confidence))
                })
                .map_or(Reply::Empty, Reply::Answer),
            Err(e) => {
                warn!(item_key = %key, question, error = %e, "Question answering failed");
                Reply::Failed
            }
        }
    }

    /// Ask for one field using the confidence-driven fallback protocol
    ///
    /// The fallback question is only issued when the primary attempt gave no
    /// answer or its confidence is below the configured threshold. Once
    /// issued, the fallback decides the field: its answer is used, and when it
    /// comes back empty the field is absent even if the primary produced a
    /// low-confidence answer. Fields without a fallback question keep
    /// whatever the primary attempt gave.
    pub fn ask_with_fallback(
        &self,
        key: &ItemKey,
        locator: &Path,
        questions: &FieldQuestions,
    ) -> FieldOutcome {
        let primary = self.ask_once(key, locator, &questions.primary);
        let mut any_failed = matches!(primary, Reply::Failed);

        let sufficient = matches!(
            &primary,
            Reply::Answer(a) if !a.confidence.is_below(self.config.confidence_threshold)
        );

        let decided = match (&questions.fallback, sufficient) {
            (Some(fallback_question), false) => {
                debug!(item_key = %key, "Primary answer insufficient, asking fallback question");
                let fallback = self.ask_once(key, locator, fallback_question);
                any_failed |= matches!(fallback, Reply::Failed);
                if let Reply::Answer(rejected) = &primary {
                    debug!(
                        item_key = %key,
                        confidence = %rejected.confidence,
                        "Discarding low-confidence primary answer"
                    );
                }
                fallback.into_answer().map(|answer| (answer, Attempt::Fallback))
            }
            _ => primary.into_answer().map(|answer| (answer, Attempt::Primary)),
        };

        match decided {
            Some((answer, attempt)) => FieldOutcome::Answered { answer, attempt },
            None if any_failed => FieldOutcome::Unavailable,
            None => {
                debug!(item_key = %key, question = %questions.primary, "Field absent");
                FieldOutcome::Absent
            }
        }
    }

    /// Extract merchant, date and total amount for one document
    pub fn extract_fields(&self, item: &InputItem) -> ExtractedFields {
        let locator = item.locator();
        let merchant = self.ask_with_fallback(&item.key, locator, &self.config.merchant);
        let purchase_date = self.ask_with_fallback(&item.key, locator, &self.config.purchase_date);
        let total_amount = self.ask_with_fallback(&item.key, locator, &self.config.total_amount);

        let unavailable = [&merchant, &purchase_date, &total_amount]
            .iter()
            .any(|outcome| outcome.is_unavailable());

        ExtractedFields {
            merchant: merchant.into_text(),
            purchase_date: purchase_date.into_text(),
            total_amount: total_amount.into_text(),
            unavailable,
        }
    }

    /// Recognize text tokens, dropping those below the confidence floor
    ///
    /// A failed recognition yields no tokens.
    pub fn recognize(&self, document: &PreparedDocument) -> Vec<RecognizedToken> {
        match self.recognizer.recognize(document) {
            Ok(tokens) => {
                let total = tokens.len();
                let kept: Vec<_> = tokens
                    .into_iter()
                    .filter(|t| !t.confidence.is_below(self.config.min_token_confidence))
                    .collect();
                debug!(item_key = %document.item.key, total, kept = kept.len(), "Recognized tokens");
                kept
            }
            Err(e) => {
                warn!(item_key = %document.item.key, error = %e, "Text recognition failed");
                Vec::new()
            }
        }
    }

    /// Build the description handed to the classifier
    ///
    /// # Examples
    ///
    /// ```
    /// # use tally_adapter::{AdapterConfig, FieldExtractionAdapter};
    /// # use tally_adapter::mock::{MockClassifier, MockQuestionAnswerer, MockRecognizer};
    /// let adapter = FieldExtractionAdapter::new(
    ///     MockQuestionAnswerer::default(),
    ///     MockClassifier::default(),
    ///     MockRecognizer::default(),
    ///     AdapterConfig::default(),
    /// );
    /// assert_eq!(
    ///     adapter.classification_text(None, &[]),
    ///     "A receipt from Unknown Store. The items purchased include: "
    /// );
    /// ```
    pub fn classification_text(&self, merchant: Option<&str>, tokens: &[RecognizedToken]) -> String {
        let merchant = merchant
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.config.unknown_merchant);
        let sample = tokens
            .iter()
            .skip(self.config.classification_token_offset)
            .take(self.config.classification_token_limit)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "A receipt from {}. The items purchased include: {}",
            merchant, sample
        )
    }

    /// Classify a description into the configured label set
    ///
    /// Any failure, an empty ranking or a label outside the set yields
    /// [`CategoryResult::uncategorized`].
    pub fn classify(&self, key: &ItemKey, text: &str) -> CategoryResult {
        let ranked = match self.classifier.classify(text, &self.config.categories) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(item_key = %key, error = %e, "Classification failed");
                return CategoryResult::uncategorized();
            }
        };

        let Some(top) = ranked
            .into_iter()
            .max_by(|a, b| a.score.value().total_cmp(&b.score.value()))
        else {
            warn!(item_key = %key, "Classifier returned no labels");
            return CategoryResult::uncategorized();
        };

        if !self.config.categories.iter().any(|c| *c == top.label) {
            warn!(item_key = %key, label = %top.label, "Classifier returned unknown label");
            return CategoryResult::uncategorized();
        }

        debug!(item_key = %key, label = %top.label, score = %top.score, "Classified");
        CategoryResult::new(top.label, top.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockClassifier, MockQuestionAnswerer, MockRecognizer};
    use tally_domain::BoundingBox;

    const TOTAL: &str = "What is the total amount?";
    const JUMLAH: &str = "What is the Jumlah?";
    const MERCHANT: &str = "What is the name of the store or merchant?";

    type MockAdapter = FieldExtractionAdapter<MockQuestionAnswerer, MockClassifier, MockRecognizer>;

    fn adapter_with(qa: MockQuestionAnswerer, classifier: MockClassifier) -> MockAdapter {
        FieldExtractionAdapter::new(qa, classifier, MockRecognizer::default(), AdapterConfig::default())
    }

    fn ask_total(adapter: &MockAdapter) -> FieldOutcome {
        let questions = adapter.config().total_amount.clone();
        adapter.ask_with_fallback(&ItemKey::new("r.jpg"), Path::new("r.jpg"), &questions)
    }

    #[test]
    fn test_low_confidence_issues_fallback() {
        let qa = MockQuestionAnswerer::default()
            .with_answer(TOTAL, "9.90", 0.3)
            .with_answer(JUMLAH, "19.90", 0.8);
        let adapter = adapter_with(qa.clone(), MockClassifier::default());

        let outcome = ask_total(&adapter);

        assert_eq!(qa.questions_for("r.jpg"), vec![TOTAL.to_string(), JUMLAH.to_string()]);
        assert_eq!(outcome.text(), Some("19.90"));
        assert_eq!(outcome.attempt(), Some(Attempt::Fallback));
    }

    #[test]
    fn test_high_confidence_skips_fallback() {
        let qa = MockQuestionAnswerer::default()
            .with_answer(TOTAL, "9.90", 0.9)
            .with_answer(JUMLAH, "19.90", 0.8);
        let adapter = adapter_with(qa.clone(), MockClassifier::default());

        let outcome = ask_total(&adapter);

        assert_eq!(qa.call_count(), 1);
        assert_eq!(outcome.text(), Some("9.90"));
        assert_eq!(outcome.attempt(), Some(Attempt::Primary));
    }

    #[test]
    fn test_empty_primary_issues_fallback() {
        let qa = MockQuestionAnswerer::default().with_answer(JUMLAH, "  7.00 ", 0.6);
        let adapter = adapter_with(qa.clone(), MockClassifier::default());

        let outcome = ask_total(&adapter);

        assert_eq!(qa.call_count(), 2);
        assert_eq!(outcome.text(), Some("7.00"));
    }

    #[test]
    fn test_low_confidence_primary_dropped_when_fallback_empty() {
        let qa = MockQuestionAnswerer::default().with_answer(TOTAL, "99999", 0.05);
        let adapter = adapter_with(qa.clone(), MockClassifier::default());

        let outcome = ask_total(&adapter);

        assert_eq!(qa.call_count(), 2);
        assert_eq!(outcome, FieldOutcome::Absent);
        assert_eq!(outcome.text(), None);
    }

    #[test]
    fn test_low_confidence_primary_kept_without_fallback_question() {
        let qa = MockQuestionAnswerer::default().with_answer(MERCHANT, "KEDAI", 0.2);
        let adapter = adapter_with(qa.clone(), MockClassifier::default());

        let outcome = adapter.ask_with_fallback(
            &ItemKey::new("r.jpg"),
            Path::new("r.jpg"),
            &adapter.config().merchant,
        );

        assert_eq!(qa.call_count(), 1);
        assert_eq!(outcome.text(), Some("KEDAI"));
        assert_eq!(outcome.attempt(), Some(Attempt::Primary));
    }

    #[test]
    fn test_both_attempts_fail_is_unavailable() {
        let qa = MockQuestionAnswerer::default().failing_document("r.jpg");
        let adapter = adapter_with(qa.clone(), MockClassifier::default());

        assert_eq!(ask_total(&adapter), FieldOutcome::Unavailable);
        assert_eq!(qa.call_count(), 2);
    }

    #[test]
    fn test_no_answers_is_absent() {
        let qa = MockQuestionAnswerer::default();
        let adapter = adapter_with(qa.clone(), MockClassifier::default());

        assert_eq!(ask_total(&adapter), FieldOutcome::Absent);
        assert_eq!(qa.call_count(), 2);
    }

    #[test]
    fn test_failed_fallback_after_low_confidence_primary_is_unavailable() {
        let qa = MockQuestionAnswerer::default()
            .with_answer(TOTAL, "9.90", 0.2)
            .failing_question(JUMLAH);
        let adapter = adapter_with(qa, MockClassifier::default());

        assert_eq!(ask_total(&adapter), FieldOutcome::Unavailable);
    }

    #[test]
    fn test_extract_fields_flags_unavailable_service() {
        let qa = MockQuestionAnswerer::default().failing_document("r.jpg");
        let adapter = adapter_with(qa, MockClassifier::default());
        let fields = adapter.extract_fields(&InputItem::from_path("r.jpg").unwrap());

        assert!(fields.unavailable);
        assert!(fields.merchant.is_none());
        assert!(fields.total_amount.is_none());
    }

    #[test]
    fn test_whitespace_answer_counts_as_no_result() {
        let qa = MockQuestionAnswerer::default()
            .with_answer("What is the name of the store or merchant?", "   ", 0.99);
        let adapter = adapter_with(qa, MockClassifier::default());
        let item = InputItem::from_path("r.jpg").unwrap();

        let fields = adapter.extract_fields(&item);
        assert!(fields.merchant.is_none());
    }

    #[test]
    fn test_extract_fields_asks_each_field() {
        let qa = MockQuestionAnswerer::default()
            .with_answer("What is the name of the store or merchant?", "KEDAI ABC", 0.95)
            .with_answer("What is the date of the receipt?", "25/12/2018", 0.88)
            .with_answer(TOTAL, "RM12.00", 0.7);
        let adapter = adapter_with(qa.clone(), MockClassifier::default());
        let item = InputItem::from_path("/in/r.jpg").unwrap();

        let fields = adapter.extract_fields(&item);

        assert_eq!(fields.merchant.as_deref(), Some("KEDAI ABC"));
        assert_eq!(fields.purchase_date.as_deref(), Some("25/12/2018"));
        assert_eq!(fields.total_amount.as_deref(), Some("RM12.00"));
        assert!(!fields.unavailable);
        assert_eq!(qa.call_count(), 3);
    }

    #[test]
    fn test_classification_text_samples_tokens() {
        let adapter = adapter_with(MockQuestionAnswerer::default(), MockClassifier::default());
        let tokens: Vec<_> = (0..100)
            .map(|i| RecognizedToken::new(format!("t{}", i), BoundingBox::default(), 0.9))
            .collect();

        let text = adapter.classification_text(Some("SHELL"), &tokens);

        assert!(text.starts_with("A receipt from SHELL. The items purchased include: t10 t11"));
        assert!(text.ends_with(" t69"));
        assert!(!text.contains("t9 "));
        assert!(!text.contains("t70"));
    }

    #[test]
    fn test_classify_takes_top_label() {
        let classifier = MockClassifier::new(vec![("Electronics", 0.2), ("Food and Restaurant", 0.7)]);
        let adapter = adapter_with(MockQuestionAnswerer::default(), classifier);

        let result = adapter.classify(&ItemKey::new("r.jpg"), "A receipt from X.");
        assert_eq!(result.label, "Food and Restaurant");
        assert_eq!(result.confidence.value(), 0.7);
    }

    #[test]
    fn test_classify_failure_is_uncategorized() {
        let classifier = MockClassifier::new(vec![("Electronics", 0.9)]).failing_when_contains("X");
        let adapter = adapter_with(MockQuestionAnswerer::default(), classifier);

        let result = adapter.classify(&ItemKey::new("r.jpg"), "A receipt from X.");
        assert!(result.is_uncategorized());
        assert_eq!(result.confidence.value(), 0.0);
    }

    #[test]
    fn test_classify_empty_or_unknown_label_is_uncategorized() {
        let adapter = adapter_with(MockQuestionAnswerer::default(), MockClassifier::new(vec![]));
        assert!(adapter.classify(&ItemKey::new("r.jpg"), "text").is_uncategorized());

        let adapter = adapter_with(
            MockQuestionAnswerer::default(),
            MockClassifier::new(vec![("Casino", 0.99)]),
        );
        assert!(adapter.classify(&ItemKey::new("r.jpg"), "text").is_uncategorized());
    }

    #[test]
    fn test_recognize_filters_and_absorbs_failures() {
        let recognizer = MockRecognizer::from_tokens(vec![
            RecognizedToken::new("TOTAL", BoundingBox::default(), 0.9),
            RecognizedToken::new("~~", BoundingBox::default(), 0.1),
        ])
        .failing_document("bad.jpg");
        let adapter = FieldExtractionAdapter::new(
            MockQuestionAnswerer::default(),
            MockClassifier::default(),
            recognizer,
            AdapterConfig::default(),
        );

        let good = PreparedDocument {
            item: InputItem::from_path("good.jpg").unwrap(),
            image: Vec::new(),
        };
        let bad = PreparedDocument {
            item: InputItem::from_path("bad.jpg").unwrap(),
            image: Vec::new(),
        };

        let tokens = adapter.recognize(&good);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "TOTAL");
        assert!(adapter.recognize(&bad).is_empty());
    }
}
