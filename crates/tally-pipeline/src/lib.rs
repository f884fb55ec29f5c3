//! Tally Pipeline
//!
//! Drives a batch of scanned receipts through preprocessing, field
//! extraction, validation, classification and the checkpoint.
//!
//! # Architecture
//!
//! ```text
//! input dir → enumerate → [skip if checkpointed] → preprocess → extract
//!           → recognize → normalize → classify → checkpoint append
//! ```
//!
//! # Key Features
//!
//! - **Per-item fault isolation**: an unreadable or failing item is logged
//!   and counted; the batch carries on
//! - **Resumable**: already-checkpointed items are skipped without calling any
//!   service, so re-running a batch is idempotent
//! - **Bounded concurrency**: `concurrency = 1` is strictly sequential; larger
//!   values keep several items in flight with at most one per item key
//! - **Graceful interruption**: a shutdown signal stops dispatch between
//!   items and lets in-flight items commit
//!
//! # Example Usage
//!
//! ```no_run
//! use tally_adapter::mock::{MockClassifier, MockPreprocessor, MockQuestionAnswerer, MockRecognizer};
//! use tally_adapter::{AdapterConfig, FieldExtractionAdapter};
//! use tally_pipeline::{enumerate_inputs, open_checkpoint, Orchestrator, PipelineConfig};
//! use tally_validate::Validator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let store = open_checkpoint(&config.checkpoint_path)?;
//! let adapter = FieldExtractionAdapter::new(
//!     MockQuestionAnswerer::default(),
//!     MockClassifier::new(vec![("Food and Restaurant", 0.8)]),
//!     MockRecognizer::default(),
//!     AdapterConfig::default(),
//! );
//!
//! let items = enumerate_inputs(&config)?;
//! let orchestrator = Orchestrator::new(MockPreprocessor::default(), adapter, Validator::default(), store, config);
//! let summary = orchestrator.run(items).await?;
//!
//! println!("{}", summary.metrics.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod input;
mod metrics;
mod orchestrator;
mod types;

#[cfg(test)]
mod tests;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use input::{enumerate_inputs, pending_items};
pub use metrics::RunMetrics;
pub use orchestrator::{open_checkpoint, Orchestrator};
pub use types::{ItemOutcome, ItemState, Resolution, RunSummary};
