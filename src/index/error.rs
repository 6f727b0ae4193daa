//! # Database Error Types Module
//!
//! This module defines error types specific to the chunk store of the ingestion pipeline.
//!
//! ## Key Components
//!
//! - `DbError`: Enum representing different types of database operation failures
//!
//! Schema failures are configuration errors: they abort whatever operation opened the
//! store instead of being logged and ignored.

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl From<DbError> for CrateError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Schema(msg) => CrateError::Config(format!("Schema error: {}", msg)),
            other => CrateError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_failures_are_configuration_errors() {
        let err: CrateError = DbError::Schema("no such module".to_string()).into();
        assert!(matches!(err, CrateError::Config(_)));

        let err: CrateError = DbError::Query("locked".to_string()).into();
        assert!(matches!(err, CrateError::Database(_)));
    }
}
