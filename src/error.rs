//! Error types for ACWR Flux
//!
//! Only the input boundaries (record parsing, configuration, timezone policy) can fail.
//! The workload calculator and tier classification are infallible.

use thiserror::Error;

/// Errors that can occur while preparing input for computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse training records: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
