//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline error
    #[error(transparent)]
    Pipeline(#[from] tally_pipeline::PipelineError),

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] tally_store::StoreError),

    /// Inference service error
    #[error("Service error: {0}")]
    Adapter(#[from] tally_adapter::AdapterError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Some items of a run failed; the rest were committed
    #[error("{0} item(s) failed; run again to retry them")]
    ItemsFailed(usize),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
