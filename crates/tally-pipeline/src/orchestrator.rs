//! Core Orchestrator implementation

use crate::{ItemOutcome, ItemState, PipelineConfig, PipelineError, Resolution, RunMetrics, RunSummary};
use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tally_adapter::FieldExtractionAdapter;
use tally_domain::traits::{
    CheckpointStore, DocumentQuestionAnswerer, Preprocessor, TextRecognizer, ZeroShotClassifier,
};
use tally_domain::{AppendOutcome, CategoryResult, DocumentRecord, InputItem, ItemKey};
use tally_store::JsonCheckpointStore;
use tally_validate::Validator;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Open the checkpoint at `path` and make sure it accepts writes
///
/// Any problem here is batch-fatal, so it is reported as
/// [`PipelineError::Destination`].
pub fn open_checkpoint(path: &Path) -> Result<JsonCheckpointStore, PipelineError> {
    let destination = |reason: String| PipelineError::Destination {
        path: path.display().to_string(),
        reason,
    };
    let store = JsonCheckpointStore::open(path).map_err(|e| destination(e.to_string()))?;
    store.check_writable().map_err(|e| destination(e.to_string()))?;
    Ok(store)
}

/// Removes the key from the in-flight set when the item is done
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<ItemKey>>,
    key: ItemKey,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<ItemKey>>, key: &ItemKey) -> Option<Self> {
        let mut keys = in_flight.lock().unwrap_or_else(|p| p.into_inner());
        keys.insert(key.clone()).then(|| Self {
            in_flight,
            key: key.clone(),
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        keys.remove(&self.key);
    }
}

/// Everything one item needs, shared by all worker threads
struct Worker<P, Q, C, R, S> {
    preprocessor: P,
    adapter: FieldExtractionAdapter<Q, C, R>,
    validator: Validator,
    store: Arc<Mutex<S>>,
    in_flight: Mutex<HashSet<ItemKey>>,
}

impl<P, Q, C, R, S> Worker<P, Q, C, R, S>
where
    P: Preprocessor,
    Q: DocumentQuestionAnswerer,
    C: ZeroShotClassifier,
    R: TextRecognizer,
    S: CheckpointStore,
    P::Error: Display,
    Q::Error: Display,
    C::Error: Display,
    R::Error: Display,
    S::Error: Display,
{
    fn process_in_span(&self, item: InputItem, index: usize, total: usize, parent: &Span) -> ItemOutcome {
        let span = info_span!(parent: parent, "item", item_key = %item.key, index = index + 1, total);
        let _enter = span.enter();

        let resolution = catch_unwind(AssertUnwindSafe(|| self.resolve(&item))).unwrap_or_else(|_| {
            error!("Item processing panicked");
            Resolution::Failed(PipelineError::Worker("panicked while processing".to_string()))
        });

        ItemOutcome {
            index,
            item_key: item.key,
            resolution,
        }
    }

    fn resolve(&self, item: &InputItem) -> Resolution {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &item.key) else {
            warn!("Item already in flight, not processing it twice");
            return Resolution::AlreadyDone;
        };

        match self.is_committed(&item.key) {
            Ok(true) => {
                debug!("Already checkpointed, skipping");
                return Resolution::AlreadyDone;
            }
            Ok(false) => {}
            Err(e) => return Resolution::Failed(e),
        }

        debug!(state = %ItemState::Processing, "Processing");
        match self.build_record(item) {
            Ok(record) => self.commit(record),
            Err(e) => {
                error!(error = %e, "Item failed");
                Resolution::Failed(e)
            }
        }
    }

    fn is_committed(&self, key: &ItemKey) -> Result<bool, PipelineError> {
        let store = self
            .store
            .lock()
            .map_err(|e| PipelineError::Store(format!("Lock poisoned: {}", e)))?;
        Ok(store.contains(key))
    }

    /// Preprocess, extract, normalize and classify one item
    fn build_record(&self, item: &InputItem) -> Result<DocumentRecord, PipelineError> {
        let document = self
            .preprocessor
            .preprocess(item)
            .map_err(|e| PipelineError::InputUnreadable {
                item_key: item.key.to_string(),
                reason: e.to_string(),
            })?;

        let fields = self.adapter.extract_fields(item);
        let tokens = self.adapter.recognize(&document);

        let mut record =
            DocumentRecord::uncategorized(item.key.clone(), item.source_path.display().to_string());
        record.merchant = fields.merchant;
        record.purchase_date = fields.purchase_date;
        record.total_amount_raw = fields.total_amount;
        record.extracted_tokens = tokens;

        let report = self.validator.normalize(&mut record);
        for reason in &report.reasons {
            info!(reason = %reason, "Value rejected");
        }

        let category = if fields.unavailable {
            warn!("Extraction unavailable, leaving uncategorized");
            CategoryResult::uncategorized()
        } else {
            let text = self
                .adapter
                .classification_text(record.merchant.as_deref(), &record.extracted_tokens);
            self.adapter.classify(&item.key, &text)
        };

        Ok(record.with_category(category))
    }

    /// The commit point
    fn commit(&self, record: DocumentRecord) -> Resolution {
        let category = record.category.clone();
        let confidence = record.category_confidence;
        let total_amount = record.total_amount_clean;
        let degraded = record.is_degraded();

        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(e) => return Resolution::Failed(PipelineError::Store(format!("Lock poisoned: {}", e))),
        };

        match store.append(record) {
            Ok(AppendOutcome::Inserted) => {
                info!(category = %category, confidence = %confidence, degraded, "Committed");
                Resolution::Committed {
                    category,
                    confidence,
                    total_amount,
                    degraded,
                }
            }
            Ok(AppendOutcome::Duplicate) => {
                debug!("Committed elsewhere in the meantime");
                Resolution::AlreadyDone
            }
            Err(e) => {
                error!(error = %e, "Checkpoint append failed");
                Resolution::Failed(PipelineError::Store(e.to_string()))
            }
        }
    }
}

/// Drives input items through preprocessing, extraction, validation,
/// classification and the checkpoint
///
/// Service calls are blocking and run on tokio's blocking pool; the store is
/// shared behind a mutex so concurrent items commit one at a time.
pub struct Orchestrator<P, Q, C, R, S> {
    worker: Arc<Worker<P, Q, C, R, S>>,
    config: PipelineConfig,
}

impl<P, Q, C, R, S> Orchestrator<P, Q, C, R, S>
where
    P: Preprocessor + Send + Sync + 'static,
    Q: DocumentQuestionAnswerer + Send + Sync + 'static,
    C: ZeroShotClassifier + Send + Sync + 'static,
    R: TextRecognizer + Send + Sync + 'static,
    S: CheckpointStore + Send + 'static,
    P::Error: Display,
    Q::Error: Display,
    C::Error: Display,
    R::Error: Display,
    S::Error: Display,
{
    /// Create a new Orchestrator
    pub fn new(
        preprocessor: P,
        adapter: FieldExtractionAdapter<Q, C, R>,
        validator: Validator,
        store: S,
        config: PipelineConfig,
    ) -> Self {
        Self {
            worker: Arc::new(Worker {
                preprocessor,
                adapter,
                validator,
                store: Arc::new(Mutex::new(store)),
                in_flight: Mutex::new(HashSet::new()),
            }),
            config,
        }
    }

    /// Get the pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared handle to the checkpoint store
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.worker.store)
    }

    /// Run a single item to a terminal state
    pub async fn process_item(&self, item: InputItem) -> Result<ItemOutcome, PipelineError> {
        let worker = Arc::clone(&self.worker);
        let parent = Span::current();
        tokio::task::spawn_blocking(move || worker.process_in_span(item, 0, 1, &parent))
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))
    }

    /// Run the whole batch to completion
    ///
    /// # Errors
    ///
    /// Only batch-fatal conditions are errors; failed items are reported in
    /// the summary.
    pub async fn run(&self, items: Vec<InputItem>) -> Result<RunSummary, PipelineError> {
        self.run_until_interrupted(items, std::future::pending(), |_| {})
            .await
    }

    /// Run the batch until it completes or `shutdown` resolves
    ///
    /// Once `shutdown` resolves no new item is dispatched; items already in
    /// flight finish and commit. `on_outcome` sees every outcome as it
    /// arrives.
    pub async fn run_until_interrupted<F, O>(
        &self,
        items: Vec<InputItem>,
        shutdown: F,
        mut on_outcome: O,
    ) -> Result<RunSummary, PipelineError>
    where
        F: Future<Output = ()>,
        O: FnMut(&ItemOutcome),
    {
        self.config.validate().map_err(PipelineError::Config)?;
        if items.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let run_id = Uuid::now_v7().to_string();
        let span = info_span!("run", run_id = %run_id, total = items.len());
        self.drive(items, shutdown, &mut on_outcome, run_id)
            .instrument(span)
            .await
    }

    async fn drive<F, O>(
        &self,
        items: Vec<InputItem>,
        shutdown: F,
        on_outcome: &mut O,
        run_id: String,
    ) -> Result<RunSummary, PipelineError>
    where
        F: Future<Output = ()>,
        O: FnMut(&ItemOutcome),
    {
        let started = Instant::now();
        let total = items.len();
        let concurrency = self.config.concurrency.max(1);
        let run_span = Span::current();

        info!(concurrency, "Run started");

        let mut metrics = RunMetrics::new(total);
        let mut outcomes = Vec::with_capacity(total);
        let mut queue = items.into_iter().enumerate();
        let mut tasks = JoinSet::new();
        let mut interrupted = false;
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            while !interrupted && tasks.len() < concurrency {
                let Some((index, item)) = queue.next() else {
                    break;
                };
                let worker = Arc::clone(&self.worker);
                let parent = run_span.clone();
                tasks.spawn_blocking(move || worker.process_in_span(item, index, total, &parent));
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = &mut shutdown, if !interrupted => {
                    interrupted = true;
                    warn!(in_flight = tasks.len(), "Interrupt received, finishing in-flight items");
                }
                joined = tasks.join_next() => {
                    let Some(joined) = joined else {
                        continue;
                    };
                    let outcome = joined.map_err(|e| PipelineError::Worker(e.to_string()))?;
                    metrics.record(&outcome);
                    on_outcome(&outcome);
                    outcomes.push(outcome);
                }
            }
        }

        metrics.not_started = queue.count();
        metrics.set_elapsed(started.elapsed());
        outcomes.sort_by_key(|o: &ItemOutcome| o.index);

        info!(
            committed = metrics.committed,
            skipped = metrics.skipped,
            failed = metrics.failed,
            degraded = metrics.degraded,
            not_started = metrics.not_started,
            interrupted,
            "Run finished"
        );

        Ok(RunSummary {
            run_id,
            metrics,
            interrupted,
            outcomes,
        })
    }
}
