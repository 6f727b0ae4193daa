//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// Page could not be loaded by the renderer
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Sitemap parsing error
    #[error("Sitemap error: {0}")]
    Sitemap(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The root URL cannot be crawled
    #[error("Invalid root URL: {0}")]
    InvalidRoot(String),

    /// A crawl job exceeded its wait ceiling
    #[error("Crawl timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A crawl job was stopped before it finished
    #[error("Crawl stopped")]
    Stopped,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Http(e) => CrateError::Http(e),
            CrawlError::UrlParse(e) => CrateError::Other(format!("URL parse error: {}", e)),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
