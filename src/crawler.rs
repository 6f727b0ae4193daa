//! # Website Crawler Module
//!
//! This module discovers and crawls a tenant's website. It is the first stage of the
//! ingestion workflow, responsible for turning a root URL into page records.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: Page and depth budgets, path filters, pacing, extraction mode
//! - `Crawler`: Sequential breadth-first crawl seeded from the sitemap or root URL
//! - `UrlFilter`: Normalization and accept/reject rules for candidate URLs
//! - `SitemapResolver`: Recursive sitemap and sitemap index expansion
//! - `Renderer`: Page loading backend (`HttpRenderer`, `StaticRenderer`)
//! - `CrawlJob`: A crawl running on a background task with status, stop and timeout
//!
//! ## Modes
//!
//! Discovery records only `{url, title}` with a larger page budget and faster
//! pacing, so users can pick which pages to ingest. A full-content crawl records
//! `{url, title, content}` for the chunking stage.

mod config;
mod content_extraction;
mod error;
mod fetcher;
mod job;
mod orchestrator;
mod renderer;
mod robots;
mod sitemap;
pub mod storage;
mod url_filter;

// Re-export important types and functions
pub use config::{CrawlMode, CrawlerConfig, CrawlerConfigBuilder};
pub use content_extraction::{collapse_whitespace, extract_page, ExtractedPage};
pub use error::CrawlError;
pub use fetcher::{Fetched, PageFetcher};
pub use job::{CrawlJob, JobStatus};
pub use orchestrator::{
    CrawlOutput, CrawlProgress, Crawler, DiscoveryResult, DiscoveryStats, FilteringStats,
};
pub use renderer::{HttpRenderer, RenderedPage, Renderer, StaticRenderer};
pub use robots::RobotsRules;
pub use sitemap::{parse_sitemap, SitemapResolver};
pub use url_filter::{normalize_url, strip_www, FilterDecision, RejectReason, UrlFilter};

use serde::{Deserialize, Serialize};

/// A page recorded by a full-content crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledPage {
    /// Normalized URL of the page
    pub url: String,

    /// Document title, or the URL when the page has none
    pub title: String,

    /// Extracted text with whitespace collapsed
    pub content: String,
}

/// A page recorded by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPage {
    pub url: String,
    pub title: String,
}

impl From<CrawledPage> for DiscoveredPage {
    fn from(page: CrawledPage) -> Self {
        DiscoveredPage {
            url: page.url,
            title: page.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovered_page_json_shape() {
        let page: DiscoveredPage = CrawledPage {
            url: "https://acme.test/about".to_string(),
            title: "About".to_string(),
            content: "About us".to_string(),
        }
        .into();

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["url"], "https://acme.test/about");
        assert_eq!(json["title"], "About");
        assert!(json.get("content").is_none());
    }
}
