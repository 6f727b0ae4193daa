//! # Search Error Types Module
//!
//! Errors raised while retrieving chunks or generating an answer from them.

use thiserror::Error;

use crate::error::Error as CrateError;
use crate::index::DbError;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Error occurred during database operations
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Error occurred during result processing
    #[error("Result processing error: {0}")]
    ResultProcessing(String),

    /// Invalid search parameters
    #[error("Invalid search parameters: {0}")]
    InvalidParameters(String),

    /// The answer-generation collaborator failed
    #[error("Answer generation error: {0}")]
    Generation(String),
}

impl From<libsql::Error> for SearchError {
    fn from(err: libsql::Error) -> Self {
        SearchError::Database(DbError::Query(err.to_string()))
    }
}

impl From<SearchError> for CrateError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Database(e) => e.into(),
            other => CrateError::Search(other.to_string()),
        }
    }
}
