//! Error types for the sitekb crate

use thiserror::Error;

/// Result type for sitekb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sitekb operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication or authorization was rejected by a provider
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Content processing error
    #[error("Process error: {0}")]
    Process(String),

    /// Embedding provider error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Search error
    #[error("Search error: {0}")]
    Search(String),

    /// Ingestion error
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
