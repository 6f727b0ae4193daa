//! # Semantic Search Module
//!
//! This module provides the vector similarity search over a tenant's embedded chunks
//! and documents. It forms the "retrieval" part of the question-answering flow.
//!
//! ## Key Components
//!
//! - `Retriever`: One similarity search at a fixed threshold
//! - `NativeRetriever`: Cosine similarity computed by libsql (`vector_distance_cos`)
//! - `ScanRetriever`: Bounded candidate load with cosine similarity computed in process
//! - `RetrievalBackend`: The retriever chosen once by a capability probe
//! - `build_context` / `AnswerGenerator`: Contract with the answer-generation service
//! - `RigAnswerGenerator`: Rate-limited answers from a `rig` completion model
//!
//! ## Search Process
//!
//! 1. Search at the primary threshold
//! 2. If nothing qualifies, search once more at the fallback threshold
//! 3. Return at most `top_k` results sorted by descending similarity
//!
//! A tenant without embedded content yields an empty result, never an error.

mod context;
mod error;
pub mod generator;
mod native;
mod scan;

pub use context::{
    build_context, build_user_message, estimate_tokens, AnswerGenerator, DEFAULT_CONTEXT_TOKENS,
    DEFAULT_SYSTEM_PROMPT, NO_INFORMATION_ANSWER,
};
pub use error::SearchError;
pub use generator::RigAnswerGenerator;
pub use native::NativeRetriever;
pub use scan::ScanRetriever;

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::index::Database;

/// Where a retrieved chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Page,
    Document,
}

/// Search result with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedChunk {
    /// ID of the chunk, or of the document when `source` is `Document`
    pub chunk_id: i64,

    pub source: Source,

    /// Page URL, or filename for documents
    pub url: String,

    pub title: String,

    pub content: String,

    /// Cosine similarity with the query
    pub similarity: f32,
}

/// Options for retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Minimum similarity on the first attempt
    pub primary_threshold: f32,

    /// Minimum similarity when the first attempt finds nothing
    pub fallback_threshold: f32,

    /// Rows loaded per result by the scan backend
    pub candidate_multiplier: usize,

    /// Results returned by default
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            primary_threshold: 0.1,
            fallback_threshold: 0.0,
            candidate_multiplier: 20,
            top_k: 8,
        }
    }
}

/// Builder for RetrievalConfig
#[derive(Debug, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary and fallback thresholds
    pub fn thresholds(mut self, primary: f32, fallback: f32) -> Self {
        self.config.primary_threshold = primary;
        self.config.fallback_threshold = fallback;
        self
    }

    pub fn candidate_multiplier(mut self, candidate_multiplier: usize) -> Self {
        self.config.candidate_multiplier = candidate_multiplier;
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn build(self) -> RetrievalConfig {
        self.config
    }
}

impl RetrievalConfig {
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::new()
    }
}

/// A similarity search backend
pub trait Retriever: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Up to `top_k` rows of `tenant_id` with similarity at least `threshold`,
    /// best first
    fn search(
        &self,
        db: &Database,
        tenant_id: i64,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> impl Future<Output = Result<Vec<RetrievedChunk>, SearchError>> + Send;
}

/// The retriever selected for a database
#[derive(Debug, Clone)]
pub enum RetrievalBackend {
    Native(NativeRetriever),
    Scan(ScanRetriever),
}

impl RetrievalBackend {
    /// Use native search when the database supports it, the scan otherwise
    #[instrument(skip_all)]
    pub async fn probe(db: &Database, config: &RetrievalConfig) -> Self {
        let backend = if NativeRetriever::is_supported(db).await {
            RetrievalBackend::Native(NativeRetriever)
        } else {
            RetrievalBackend::Scan(ScanRetriever::new(config.candidate_multiplier))
        };
        info!("Using {} retrieval", backend.name());
        backend
    }

    /// Search at the primary threshold, relaxing to the fallback threshold once if
    /// nothing qualifies
    #[instrument(skip(self, db, config, query), fields(backend = self.name()))]
    pub async fn query(
        &self,
        db: &Database,
        config: &RetrievalConfig,
        tenant_id: i64,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidParameters("top_k must be positive".to_string()));
        }

        let results = self
            .search(db, tenant_id, query, top_k, config.primary_threshold)
            .await?;
        if !results.is_empty() {
            return Ok(results);
        }

        debug!(
            "No results at {}, retrying at {}",
            config.primary_threshold, config.fallback_threshold
        );
        self.search(db, tenant_id, query, top_k, config.fallback_threshold)
            .await
    }
}

impl Retriever for RetrievalBackend {
    fn name(&self) -> &'static str {
        match self {
            RetrievalBackend::Native(r) => r.name(),
            RetrievalBackend::Scan(r) => r.name(),
        }
    }

    async fn search(
        &self,
        db: &Database,
        tenant_id: i64,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        match self {
            RetrievalBackend::Native(r) => r.search(db, tenant_id, query, top_k, threshold).await,
            RetrievalBackend::Scan(r) => r.search(db, tenant_id, query, top_k, threshold).await,
        }
    }
}
