//! Tally Field Extraction Adapter
//!
//! Wraps the external recognition and classification services behind one
//! uniform, infallible contract.
//!
//! # Architecture
//!
//! This crate provides implementations of the service traits from
//! `tally-domain` and the [`FieldExtractionAdapter`] that sits in front of
//! them. Service errors never cross the adapter: a failed or timed-out call
//! becomes an absent field or the `Uncategorized` category, logged with the
//! item key.
//!
//! # Services
//!
//! - `MockQuestionAnswerer`, `MockClassifier`, `MockRecognizer`,
//!   `MockPreprocessor`: deterministic doubles for testing
//! - `HttpInferenceClient`: JSON-over-HTTP inference server
//! - `FilePreprocessor`: reads the document from disk as-is
//!
//! # Examples
//!
//! ```
//! use tally_adapter::{AdapterConfig, FieldExtractionAdapter};
//! use tally_adapter::mock::{MockClassifier, MockQuestionAnswerer, MockRecognizer};
//! use tally_domain::ItemKey;
//!
//! let classifier = MockClassifier::new(vec![("Electronics", 0.91)]);
//! let adapter = FieldExtractionAdapter::new(
//!     MockQuestionAnswerer::default(),
//!     classifier,
//!     MockRecognizer::default(),
//!     AdapterConfig::default(),
//! );
//!
//! let result = adapter.classify(&ItemKey::new("r.jpg"), "A receipt from Unknown Store.");
//! assert_eq!(result.label, "Electronics");
//! ```

#![warn(missing_docs)]

mod adapter;
mod config;
pub mod http;
pub mod mock;
mod preprocess;

use thiserror::Error;

pub use adapter::{Attempt, ExtractedFields, FieldExtractionAdapter, FieldOutcome};
pub use config::{AdapterConfig, FieldQuestions};
pub use http::HttpInferenceClient;
pub use preprocess::FilePreprocessor;

/// Errors raised by the external services
///
/// These stay inside this crate's boundary except for [`AdapterError::Unreadable`],
/// which the orchestrator treats as a failed item.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Call exceeded its time budget
    #[error("Request timed out")]
    Timeout,

    /// Invalid response from the service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available on the server
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The input document could not be opened or decoded
    #[error("Unreadable input {path}: {reason}")]
    Unreadable {
        /// Path of the document
        path: String,
        /// What went wrong
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("Service error: {0}")]
    Other(String),
}
