//! Validation error types

use thiserror::Error;

/// Errors raised while setting up validation
///
/// Value-level problems are never errors; they become
/// [`RejectionReason`](crate::RejectionReason)s.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
