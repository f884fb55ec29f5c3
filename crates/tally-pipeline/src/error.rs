//! Error types for the pipeline

use thiserror::Error;

/// Errors that can occur while running a batch
///
/// Only [`EmptyInput`](PipelineError::EmptyInput),
/// [`InputDirectory`](PipelineError::InputDirectory) and
/// [`Destination`](PipelineError::Destination) stop a batch. Everything else
/// is reported for one item and the batch moves on.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source item cannot be opened or decoded
    #[error("Input {item_key} is unreadable: {reason}")]
    InputUnreadable {
        /// Offending item
        item_key: String,
        /// What went wrong
        reason: String,
    },

    /// Committing the record failed
    #[error("Store error: {0}")]
    Store(String),

    /// A worker thread died while processing an item
    #[error("Worker failed: {0}")]
    Worker(String),

    /// Nothing to process
    #[error("Input set is empty")]
    EmptyInput,

    /// The input directory cannot be listed
    #[error("Cannot read input directory {path}: {reason}")]
    InputDirectory {
        /// Directory that was listed
        path: String,
        /// What went wrong
        reason: String,
    },

    /// The checkpoint location cannot be used
    #[error("Unusable destination {path}: {reason}")]
    Destination {
        /// Checkpoint path
        path: String,
        /// What went wrong
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
