//! # sitekb - Per-tenant website knowledge bases
//!
//! This crate turns a business website into a searchable knowledge base. It discovers
//! and crawls the site, splits page text into overlapping chunks, embeds them with an
//! external provider, and retrieves the most relevant chunks for a question so an
//! answer can be generated from them.
//!
//! ## Features
//!
//! - Sitemap-first, breadth-first crawling with path filters and robots.txt support
//! - Discovery runs that record titles only, with page selection per tenant
//! - Word-window chunking with change detection by content hash
//! - Batched, rate-limited embedding with retries for transient failures
//! - Vector storage in LibSQL, with native or in-process similarity search
//! - Uploaded documents searchable alongside crawled pages
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitekb::crawler::{Crawler, CrawlerConfig, HttpRenderer};
//! use sitekb::index::Database;
//! use sitekb::ingest::KnowledgeBase;
//! use sitekb::processor::ProcessorConfig;
//! use sitekb::search::RetrievalConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlerConfig::default();
//!     let renderer = HttpRenderer::new(&config.user_agent)?;
//!     let crawler = Crawler::new(renderer, config)?;
//!     let db = Database::open("sitekb.db").await?;
//!     let provider = sitekb::model::gemini_from_env()?;
//!
//!     let kb = KnowledgeBase::new(
//!         db,
//!         crawler,
//!         ProcessorConfig::default(),
//!         provider,
//!         RetrievalConfig::default(),
//!     )
//!     .await;
//!
//!     let tenant = kb.tenant("https://example.com/").await?;
//!     let report = kb.ingest_site(&tenant).await?;
//!     println!("{} chunks created", report.chunks_created);
//!
//!     for hit in kb.query(&tenant, "What are your opening hours?", 5).await? {
//!         println!("{:.3} {}", hit.similarity, hit.url);
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod model;

// Pipeline modules
pub mod crawler;
pub mod index;
pub mod ingest;
pub mod processor;
pub mod search;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
