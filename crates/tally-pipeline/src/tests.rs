//! Integration tests for the Orchestrator

#[cfg(test)]
mod tests {
    use crate::{ItemState, Orchestrator, PipelineConfig, PipelineError, Resolution};
    use std::fs;
    use std::path::Path;
    use tally_adapter::mock::{MockClassifier, MockPreprocessor, MockQuestionAnswerer, MockRecognizer};
    use tally_adapter::{AdapterConfig, FieldExtractionAdapter};
    use tally_domain::traits::CheckpointStore;
    use tally_domain::{DocumentRecord, InputItem, ItemKey};
    use tally_store::JsonCheckpointStore;
    use tally_validate::Validator;
    use tempfile::TempDir;

    const MERCHANT: &str = "What is the name of the store or merchant?";
    const DATE: &str = "What is the date of the receipt?";
    const TOTAL: &str = "What is the total amount?";

    type TestOrchestrator = Orchestrator<
        MockPreprocessor,
        MockQuestionAnswerer,
        MockClassifier,
        MockRecognizer,
        JsonCheckpointStore,
    >;

    struct Services {
        preprocessor: MockPreprocessor,
        qa: MockQuestionAnswerer,
        classifier: MockClassifier,
        recognizer: MockRecognizer,
    }

    impl Services {
        fn new() -> Self {
            Self {
                preprocessor: MockPreprocessor::default(),
                qa: MockQuestionAnswerer::default()
                    .with_answer(MERCHANT, "KEDAI MAKAN SEDAP", 0.95)
                    .with_answer(DATE, "03/01/2018", 0.9)
                    .with_answer(TOTAL, "12.50", 0.9),
                classifier: MockClassifier::new(vec![("Food and Restaurant", 0.82), ("Electronics", 0.1)]),
                recognizer: MockRecognizer::from_words(&["NASI", "LEMAK", "TEH", "TARIK", "TOTAL", "12.50"], 0.9),
            }
        }

        fn orchestrator(&self, checkpoint: &Path, config: PipelineConfig) -> TestOrchestrator {
            let adapter = FieldExtractionAdapter::new(
                self.qa.clone(),
                self.classifier.clone(),
                self.recognizer.clone(),
                AdapterConfig::default(),
            );
            let store = JsonCheckpointStore::open(checkpoint).unwrap();
            Orchestrator::new(self.preprocessor.clone(), adapter, Validator::default(), store, config)
        }
    }

    fn items(dir: &Path, count: usize) -> Vec<InputItem> {
        (1..=count)
            .map(|i| InputItem::from_path(dir.join(format!("receipt{}.jpg", i))).unwrap())
            .collect()
    }

    fn committed_records(orchestrator: &TestOrchestrator) -> Vec<DocumentRecord> {
        orchestrator.store().lock().unwrap().records().to_vec()
    }

    #[tokio::test]
    async fn test_failed_extraction_scenario() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        let mut services = Services::new();
        services.qa = services.qa.clone().failing_document("receipt2.jpg");

        let orchestrator = services.orchestrator(&checkpoint, PipelineConfig::default());
        let summary = orchestrator.run(items(dir.path(), 3)).await.unwrap();

        assert_eq!(summary.metrics.committed, 3);
        assert_eq!(summary.metrics.failed, 0);
        assert_eq!(summary.metrics.degraded, 1);

        let records = committed_records(&orchestrator);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].category, "Food and Restaurant");
        assert_eq!(records[0].total_amount_clean, Some(12.5));
        assert_eq!(records[1].item_key.as_str(), "receipt2.jpg");
        assert_eq!(records[1].category, "Uncategorized");
        assert_eq!(records[1].category_confidence.value(), 0.0);
        assert_eq!(records[2].category, "Food and Restaurant");

        // The failing item was never sent to the classifier
        assert_eq!(services.classifier.call_count(), 2);

        // Re-running the batch appends nothing and calls no service
        let before = fs::read_to_string(&checkpoint).unwrap();
        let qa_calls = services.qa.call_count();

        let rerun = services.orchestrator(&checkpoint, PipelineConfig::default());
        let summary = rerun.run(items(dir.path(), 3)).await.unwrap();

        assert_eq!(summary.metrics.committed, 0);
        assert_eq!(summary.metrics.skipped, 3);
        assert_eq!(services.qa.call_count(), qa_calls);
        assert_eq!(fs::read_to_string(&checkpoint).unwrap(), before);
    }

    #[tokio::test]
    async fn test_resume_after_partial_run() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        let services = Services::new();

        let first = services.orchestrator(&checkpoint, PipelineConfig::default());
        first.run(items(dir.path(), 2)).await.unwrap();

        let second = services.orchestrator(&checkpoint, PipelineConfig::default());
        let summary = second.run(items(dir.path(), 4)).await.unwrap();

        assert_eq!(summary.metrics.skipped, 2);
        assert_eq!(summary.metrics.committed, 2);
        assert!(summary.outcomes[0].is_skipped());
        assert!(!summary.outcomes[3].is_skipped());

        let persisted = JsonCheckpointStore::read_records(&checkpoint).unwrap();
        let keys: Vec<_> = persisted.iter().map(|r| r.item_key.as_str()).collect();
        assert_eq!(keys, vec!["receipt1.jpg", "receipt2.jpg", "receipt3.jpg", "receipt4.jpg"]);
    }

    #[tokio::test]
    async fn test_unreadable_input_is_isolated() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        let mut services = Services::new();
        services.preprocessor = MockPreprocessor::default().unreadable("receipt2.jpg");

        let orchestrator = services.orchestrator(&checkpoint, PipelineConfig::default());
        let summary = orchestrator.run(items(dir.path(), 3)).await.unwrap();

        assert_eq!(summary.metrics.committed, 2);
        assert_eq!(summary.metrics.failed, 1);
        assert_eq!(summary.outcomes[1].state(), ItemState::Failed);
        assert!(matches!(
            summary.outcomes[1].error(),
            Some(PipelineError::InputUnreadable { .. })
        ));
        assert_eq!(summary.outcomes[2].state(), ItemState::Succeeded);

        let store = orchestrator.store();
        let store = store.lock().unwrap();
        assert_eq!(store.len(), 2);
        assert!(!store.contains(&ItemKey::new("receipt2.jpg")));
    }

    #[tokio::test]
    async fn test_empty_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let services = Services::new();
        let orchestrator = services.orchestrator(&dir.path().join("checkpoint.json"), PipelineConfig::default());

        let result = orchestrator.run(Vec::new()).await;
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_interrupt_stops_dispatch() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        let services = Services::new();
        let orchestrator = services.orchestrator(&checkpoint, PipelineConfig::default());

        let summary = orchestrator
            .run_until_interrupted(items(dir.path(), 3), std::future::ready(()), |_| {})
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.metrics.committed, 1);
        assert_eq!(summary.metrics.not_started, 2);
        assert_eq!(JsonCheckpointStore::read_records(&checkpoint).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_run_commits_every_item_once() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        let services = Services::new();
        let config = PipelineConfig {
            concurrency: 3,
            ..PipelineConfig::default()
        };
        let orchestrator = services.orchestrator(&checkpoint, config);

        let summary = orchestrator.run(items(dir.path(), 6)).await.unwrap();

        assert_eq!(summary.metrics.committed, 6);
        let indexes: Vec<_> = summary.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5]);

        let persisted = JsonCheckpointStore::read_records(&checkpoint).unwrap();
        assert_eq!(persisted.len(), 6);
    }

    #[tokio::test]
    async fn test_same_key_is_processed_once() {
        let dir = TempDir::new().unwrap();
        let checkpoint = dir.path().join("checkpoint.json");
        let services = Services::new();
        let config = PipelineConfig {
            concurrency: 2,
            ..PipelineConfig::default()
        };
        let orchestrator = services.orchestrator(&checkpoint, config);

        let item = InputItem::from_path(dir.path().join("receipt1.jpg")).unwrap();
        let summary = orchestrator.run(vec![item.clone(), item]).await.unwrap();

        assert_eq!(summary.metrics.committed, 1);
        assert_eq!(summary.metrics.skipped, 1);
        assert_eq!(services.qa.questions_for("receipt1.jpg").len(), 3);
        assert_eq!(committed_records(&orchestrator).len(), 1);
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_outcome() {
        let dir = TempDir::new().unwrap();
        let services = Services::new();
        let orchestrator = services.orchestrator(&dir.path().join("checkpoint.json"), PipelineConfig::default());

        let mut seen = Vec::new();
        orchestrator
            .run_until_interrupted(items(dir.path(), 3), std::future::pending(), |outcome| {
                seen.push(outcome.item_key.to_string())
            })
            .await
            .unwrap();

        assert_eq!(seen, vec!["receipt1.jpg", "receipt2.jpg", "receipt3.jpg"]);
    }

    #[tokio::test]
    async fn test_process_single_item() {
        let dir = TempDir::new().unwrap();
        let services = Services::new();
        let orchestrator = services.orchestrator(&dir.path().join("checkpoint.json"), PipelineConfig::default());
        let item = InputItem::from_path(dir.path().join("receipt9.jpg")).unwrap();

        let outcome = orchestrator.process_item(item.clone()).await.unwrap();
        match outcome.resolution {
            Resolution::Committed { category, total_amount, degraded, .. } => {
                assert_eq!(category, "Food and Restaurant");
                assert_eq!(total_amount, Some(12.5));
                assert!(!degraded);
            }
            other => panic!("Expected a commit, got {:?}", other),
        }

        let again = orchestrator.process_item(item).await.unwrap();
        assert!(again.is_skipped());
    }

    #[tokio::test]
    async fn test_classification_text_uses_merchant_and_tokens() {
        let dir = TempDir::new().unwrap();
        let services = Services::new();
        let orchestrator = services.orchestrator(&dir.path().join("checkpoint.json"), PipelineConfig::default());

        orchestrator.run(items(dir.path(), 1)).await.unwrap();

        // Six tokens are all inside the skipped header window
        assert_eq!(
            services.classifier.texts(),
            vec!["A receipt from KEDAI MAKAN SEDAP. The items purchased include: ".to_string()]
        );
        let records = committed_records(&orchestrator);
        assert_eq!(records[0].extracted_tokens.len(), 6);
    }
}
