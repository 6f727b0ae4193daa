//! Error types for embedding providers

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for embedding provider calls
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Credentials were rejected (401/403). Never retried.
    #[error("Provider rejected credentials: {0}")]
    Auth(String),

    /// Network failure, rate limiting or a provider-side error. Retried.
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// The provider refused the request for another reason. Not retried.
    #[error("Provider rejected request: {0}")]
    Request(String),

    /// Credentials or settings are missing
    #[error("Embedding configuration error: {0}")]
    Config(String),

    /// The provider answered with something unusable
    #[error("Malformed provider response: {0}")]
    Response(String),
}

impl EmbeddingError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => EmbeddingError::Auth(format!("status {}: {}", status, body)),
            408 | 429 | 500..=599 => {
                EmbeddingError::Transient(format!("status {}: {}", status, body))
            }
            _ => EmbeddingError::Request(format!("status {}: {}", status, body)),
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmbeddingError::Transient(_))
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => EmbeddingError::from_status(status.as_u16(), err.to_string()),
            None if err.is_decode() => EmbeddingError::Response(err.to_string()),
            None => EmbeddingError::Transient(err.to_string()),
        }
    }
}

impl From<rig::embeddings::EmbeddingError> for EmbeddingError {
    fn from(err: rig::embeddings::EmbeddingError) -> Self {
        use rig::embeddings::EmbeddingError as RigError;

        match err {
            RigError::HttpError(e) => match e.status() {
                Some(status) => EmbeddingError::from_status(status.as_u16(), e.to_string()),
                None => EmbeddingError::Transient(e.to_string()),
            },
            RigError::JsonError(e) => EmbeddingError::Response(e.to_string()),
            RigError::ResponseError(msg) => EmbeddingError::Response(msg),
            other => EmbeddingError::Transient(other.to_string()),
        }
    }
}

impl From<EmbeddingError> for CrateError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::Auth(msg) => CrateError::Auth(msg),
            EmbeddingError::Config(msg) => CrateError::Config(msg),
            other => CrateError::Embedding(other.to_string()),
        }
    }
}
