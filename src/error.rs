//! Error types for Epiflux

use thiserror::Error;

/// Errors that can occur while preparing data for, or persisting around, the pipeline.
///
/// The calculators themselves never fail; these errors come from the edges
/// (row parsing, configuration, storage, encoding).
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient trials for computation: {0}")]
    InsufficientTrials(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Failures reported by the data-fetching collaborator.
///
/// These are surfaced to the consumer as a distinct error state and are never
/// swallowed by the refresher.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Transport error while fetching {resource}: {message}")]
    Transport { resource: String, message: String },

    #[error("Unexpected status {status} while fetching {resource}")]
    Status { resource: String, status: u16 },

    #[error("Failed to decode {resource}: {message}")]
    Decode { resource: String, message: String },

    #[error("Data source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Name of the resource the failure relates to, when known
    pub fn resource(&self) -> Option<&str> {
        match self {
            FetchError::Transport { resource, .. }
            | FetchError::Status { resource, .. }
            | FetchError::Decode { resource, .. } => Some(resource.as_str()),
            FetchError::Unavailable(_) => None,
        }
    }
}
