//! Chunk store for the knowledge base
//!
//! This module persists tenants, their discovered and crawled pages, the chunks
//! derived from page content, and uploaded documents, all in one libsql database.

mod database;
pub mod error;
mod schema;

pub use database::Database;
pub use error::DbError;

use serde::Serialize;

/// A site onboarded into the knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tenant {
    /// ID of the tenant
    pub id: i64,

    /// URL the tenant was created from
    pub root_url: String,

    /// Hostname without a leading `www.`
    pub domain: String,

    /// Creation time, unix seconds
    pub created_at: i64,
}

/// A page known for a tenant, whether only discovered or also crawled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredPage {
    pub id: i64,
    pub tenant_id: i64,
    pub url: String,
    pub title: Option<String>,

    /// Last discovery or crawl that saw the page, unix seconds
    pub discovered_at: i64,

    /// Content has been crawled and chunked at least once
    pub processed: bool,

    /// The user wants the page (re)crawled on the next ingestion
    pub selected: bool,
}

/// A row whose embedding has not been computed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEmbedding {
    pub id: i64,
    pub content: String,
}

/// Embedding progress for one kind of row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmbeddingCounts {
    pub total: usize,
    pub embedded: usize,
}

impl EmbeddingCounts {
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.embedded)
    }
}

/// Outcome of reconciling a discovery run with the stored pages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Pages seen for the first time
    pub added: usize,

    /// Known pages whose title and timestamp were refreshed
    pub refreshed: usize,

    /// Unprocessed pages that the run no longer found
    pub removed: usize,
}

/// An uploaded file after text extraction
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub content: String,
}
