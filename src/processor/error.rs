//! Error types for the processor module

use crate::error::Error as CrateError;
use crate::index::DbError;
use crate::model::EmbeddingError;
use thiserror::Error;

/// Error type for processor operations
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Invalid chunking parameters
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Embedding provider failure, after retries where they apply
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Storage failure while reading pending work or writing vectors
    #[error(transparent)]
    Database(#[from] DbError),

    /// Uploaded document could not be turned into text
    #[error("Document error: {0}")]
    Document(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<ProcessError> for CrateError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Embedding(e) => e.into(),
            ProcessError::Database(e) => e.into(),
            _ => CrateError::Process(err.to_string()),
        }
    }
}
