//! # Ingestion Module
//!
//! Tenant-level orchestration of the whole pipeline: discovery and page selection,
//! crawling, chunking with change detection, embedding, and question answering.
//!
//! ## Key Components
//!
//! - `KnowledgeBase`: Entry point wiring the crawler, store, embedding pipeline and
//!   retriever together
//! - `IngestReport`: Counters describing one ingestion run
//! - `TenantLocks`: Single-flight admission per tenant
//!
//! Two ingestions of the same tenant never overlap: the second one is rejected with
//! [`IngestError::Busy`] instead of racing on chunk replacement. Different tenants
//! proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument};

use crate::crawler::{CrawlError, CrawledPage, Crawler, DiscoveryResult, Renderer};
use crate::error::Error as CrateError;
use crate::index::{Database, DbError, NewDocument, SyncReport, Tenant};
use crate::model::EmbeddingProvider;
use crate::processor::{
    chunk_words, content_hash, extract_document_text, ChunkOptions, EmbeddingPipeline,
    ProcessError, ProcessorConfig,
};
use crate::search::{
    build_context, AnswerGenerator, RetrievalBackend, RetrievalConfig, RetrievedChunk,
    SearchError, DEFAULT_CONTEXT_TOKENS, DEFAULT_SYSTEM_PROMPT, NO_INFORMATION_ANSWER,
};

/// Error type for ingestion operations
#[derive(Debug, Error)]
pub enum IngestError {
    /// Another ingestion of the same tenant is still running
    #[error("Ingestion already running for {0}")]
    Busy(String),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl From<IngestError> for CrateError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Busy(domain) => {
                CrateError::Ingest(format!("Ingestion already running for {}", domain))
            }
            IngestError::Crawl(e) => e.into(),
            IngestError::Process(e) => e.into(),
            IngestError::Database(e) => e.into(),
            IngestError::Search(e) => e.into(),
        }
    }
}

/// Counters describing one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Pages fetched or supplied for this run
    pub pages_crawled: usize,

    /// Pages whose chunk set was replaced
    pub pages_changed: usize,

    /// Chunks inserted for changed pages
    pub chunks_created: usize,

    /// Chunk vectors computed by this run
    pub embeddings_generated: usize,

    /// Document vectors computed by this run
    pub documents_processed: usize,
}

/// Outcome of a discovery run
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub tenant: Tenant,

    #[serde(flatten)]
    pub discovery: DiscoveryResult,

    pub sync: SyncReport,
}

/// A generated answer with the chunks it was grounded in
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RetrievedChunk>,
}

/// Per-tenant single-flight admission
#[derive(Debug, Default)]
pub struct TenantLocks {
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one ingestion of `tenant`, or fail if one is already running. The
    /// tenant stays locked until the returned guard is dropped.
    pub fn try_acquire(&self, tenant: &Tenant) -> Result<OwnedMutexGuard<()>, IngestError> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.entry(tenant.id).or_default().clone()
        };

        lock.try_lock_owned()
            .map_err(|_| IngestError::Busy(tenant.domain.clone()))
    }
}

/// A per-tenant knowledge base over one database
pub struct KnowledgeBase<R, P> {
    db: Database,
    crawler: Crawler<R>,
    chunk_options: ChunkOptions,
    pipeline: EmbeddingPipeline<P>,
    retrieval: RetrievalConfig,
    retriever: RetrievalBackend,
    locks: TenantLocks,
}

impl<R: Renderer, P: EmbeddingProvider> KnowledgeBase<R, P> {
    /// Wire the pipeline together, probing the database for native vector search
    pub async fn new(
        db: Database,
        crawler: Crawler<R>,
        processor: ProcessorConfig,
        provider: P,
        retrieval: RetrievalConfig,
    ) -> Self {
        let retriever = RetrievalBackend::probe(&db, &retrieval).await;
        Self::with_retriever(db, crawler, processor, provider, retrieval, retriever)
    }

    /// Wire the pipeline together with an explicit retrieval backend
    pub fn with_retriever(
        db: Database,
        crawler: Crawler<R>,
        processor: ProcessorConfig,
        provider: P,
        retrieval: RetrievalConfig,
        retriever: RetrievalBackend,
    ) -> Self {
        Self {
            db,
            crawler,
            chunk_options: processor.chunk_options,
            pipeline: EmbeddingPipeline::new(provider, processor.embedding),
            retrieval,
            retriever,
            locks: TenantLocks::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn crawler(&self) -> &Crawler<R> {
        &self.crawler
    }

    pub fn pipeline(&self) -> &EmbeddingPipeline<P> {
        &self.pipeline
    }

    pub fn retriever(&self) -> &RetrievalBackend {
        &self.retriever
    }

    /// Find or create the tenant for a site
    pub async fn tenant(&self, root_url: &str) -> Result<Tenant, IngestError> {
        Ok(self.db.ensure_tenant(root_url).await?)
    }

    /// Discover the tenant's pages and reconcile them with the stored ones
    #[instrument(skip(self, tenant), fields(tenant = %tenant.domain))]
    pub async fn discover(&self, tenant: &Tenant) -> Result<DiscoveryReport, IngestError> {
        let _admission = self.locks.try_acquire(tenant)?;

        let discovery = self.crawler.discover(&tenant.root_url).await?;
        let sync = self
            .db
            .sync_discovered_pages(tenant.id, &discovery.pages)
            .await?;

        Ok(DiscoveryReport {
            tenant: tenant.clone(),
            discovery,
            sync,
        })
    }

    /// Crawl the tenant's selected pages, or the whole site when none are
    /// selected, then chunk and embed whatever changed
    #[instrument(skip(self, tenant), fields(tenant = %tenant.domain))]
    pub async fn ingest_site(&self, tenant: &Tenant) -> Result<IngestReport, IngestError> {
        let _admission = self.locks.try_acquire(tenant)?;

        let selected = self.db.selected_pages(tenant.id).await?;
        let pages = if selected.is_empty() {
            self.crawler.crawl(&tenant.root_url).await?
        } else {
            info!("Crawling {} selected pages", selected.len());
            let urls: Vec<String> = selected.into_iter().map(|p| p.url).collect();
            self.crawler.crawl_urls(&urls).await
        };

        self.ingest_locked(tenant, &pages).await
    }

    /// Chunk and embed pages crawled earlier, e.g. loaded from an archive
    #[instrument(skip(self, tenant, pages), fields(tenant = %tenant.domain, pages = pages.len()))]
    pub async fn ingest_pages(
        &self,
        tenant: &Tenant,
        pages: &[CrawledPage],
    ) -> Result<IngestReport, IngestError> {
        let _admission = self.locks.try_acquire(tenant)?;
        self.ingest_locked(tenant, pages).await
    }

    async fn ingest_locked(
        &self,
        tenant: &Tenant,
        pages: &[CrawledPage],
    ) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport {
            pages_crawled: pages.len(),
            ..Default::default()
        };

        for page in pages {
            let page_id = self.db.record_crawled_page(tenant.id, page).await?;
            let chunks = chunk_words(&page.content, &self.chunk_options)?;
            let hash = content_hash(&page.content);

            if self
                .db
                .replace_chunks_for_page(tenant.id, page_id, &hash, &chunks)
                .await?
            {
                report.pages_changed += 1;
                report.chunks_created += chunks.len();
            } else {
                debug!("Unchanged: {}", page.url);
            }
        }

        report.embeddings_generated = self.pipeline.embed_pending(&self.db, tenant.id).await?;
        report.documents_processed = self
            .pipeline
            .embed_pending_documents(&self.db, tenant.id)
            .await?;

        info!(
            "Ingested {} pages: {} changed, {} chunks, {} embeddings",
            report.pages_crawled,
            report.pages_changed,
            report.chunks_created,
            report.embeddings_generated
        );
        Ok(report)
    }

    /// Store an uploaded document and embed it
    #[instrument(skip(self, tenant, bytes), fields(tenant = %tenant.domain, size = bytes.len()))]
    pub async fn ingest_document(
        &self,
        tenant: &Tenant,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<IngestReport, IngestError> {
        let _admission = self.locks.try_acquire(tenant)?;

        let document = NewDocument {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            content: extract_document_text(content_type, bytes)?,
        };
        self.db.upsert_document(tenant.id, &document).await?;

        Ok(IngestReport {
            documents_processed: self
                .pipeline
                .embed_pending_documents(&self.db, tenant.id)
                .await?,
            ..Default::default()
        })
    }

    /// The `top_k` chunks most similar to `question`
    #[instrument(skip(self, tenant), fields(tenant = %tenant.domain))]
    pub async fn query(
        &self,
        tenant: &Tenant,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, IngestError> {
        let vector = self.pipeline.embed_query(question).await?;
        Ok(self
            .retriever
            .query(&self.db, &self.retrieval, tenant.id, &vector, top_k)
            .await?)
    }

    /// Answer `question` from retrieved context using `generator`
    pub async fn answer<G: AnswerGenerator>(
        &self,
        tenant: &Tenant,
        question: &str,
        generator: &G,
        system_prompt: Option<&str>,
    ) -> Result<Answer, IngestError> {
        let sources = self.query(tenant, question, self.retrieval.top_k).await?;
        if sources.is_empty() {
            return Ok(Answer {
                text: NO_INFORMATION_ANSWER.to_string(),
                sources,
            });
        }

        let context = build_context(&sources, DEFAULT_CONTEXT_TOKENS);
        let text = generator
            .answer(
                question,
                &context,
                system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT),
            )
            .await?;

        Ok(Answer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlerConfig, StaticRenderer};
    use crate::model::MockEmbeddingProvider;
    use crate::search::ScanRetriever;
    use std::time::Duration;
    use tempfile::TempDir;

    struct EchoGenerator;

    impl AnswerGenerator for EchoGenerator {
        async fn answer(
            &self,
            question: &str,
            context: &str,
            _system_prompt: &str,
        ) -> Result<String, SearchError> {
            Ok(format!("{} | {}", question, context.lines().next().unwrap_or_default()))
        }
    }

    async fn knowledge_base(
        mock: MockEmbeddingProvider,
    ) -> (KnowledgeBase<StaticRenderer, MockEmbeddingProvider>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("kb.db").to_string_lossy())
            .await
            .unwrap();
        let config = CrawlerConfig::builder()
            .delay(Duration::ZERO)
            .respect_robots_txt(false)
            .build();
        let crawler = Crawler::new(StaticRenderer::new(), config).unwrap();
        let kb = KnowledgeBase::with_retriever(
            db,
            crawler,
            ProcessorConfig::default(),
            mock,
            RetrievalConfig::default(),
            RetrievalBackend::Scan(ScanRetriever::default()),
        );
        (kb, dir)
    }

    fn page(url: &str, content: &str) -> CrawledPage {
        CrawledPage {
            url: url.to_string(),
            title: url.rsplit('/').next().unwrap_or_default().to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_reingesting_identical_content_makes_no_provider_calls() {
        let mock = MockEmbeddingProvider::new(16);
        let (kb, _dir) = knowledge_base(mock.clone()).await;
        let tenant = kb.tenant("https://acme.test/").await.unwrap();
        let pages = vec![
            page("https://acme.test/", "Emergency plumbing across the city"),
            page("https://acme.test/about", "Family business since 1990"),
        ];

        let first = kb.ingest_pages(&tenant, &pages).await.unwrap();
        assert_eq!(first.pages_changed, 2);
        assert_eq!(first.chunks_created, 2);
        assert_eq!(first.embeddings_generated, 2);
        let calls = mock.calls();

        let second = kb.ingest_pages(&tenant, &pages).await.unwrap();
        assert_eq!(
            second,
            IngestReport {
                pages_crawled: 2,
                ..Default::default()
            }
        );
        assert_eq!(mock.calls(), calls);

        // One page changes: only its chunk is re-embedded
        let changed = vec![page("https://acme.test/about", "Family business since 1985")];
        let third = kb.ingest_pages(&tenant, &changed).await.unwrap();
        assert_eq!(third.pages_changed, 1);
        assert_eq!(third.embeddings_generated, 1);
    }

    #[tokio::test]
    async fn test_same_tenant_is_single_flight() {
        let (kb, _dir) = knowledge_base(MockEmbeddingProvider::default()).await;
        let tenant = kb.tenant("https://acme.test/").await.unwrap();
        let other = kb.tenant("https://other.test/").await.unwrap();

        let held = kb.locks.try_acquire(&tenant).unwrap();
        assert!(matches!(
            kb.ingest_pages(&tenant, &[]).await,
            Err(IngestError::Busy(domain)) if domain == "acme.test"
        ));
        assert!(kb.ingest_pages(&other, &[]).await.is_ok());

        drop(held);
        assert!(kb.ingest_pages(&tenant, &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_documents_are_retrievable() {
        let (kb, _dir) = knowledge_base(MockEmbeddingProvider::new(32)).await;
        let tenant = kb.tenant("https://acme.test/").await.unwrap();

        let report = kb
            .ingest_document(
                &tenant,
                "faq.html",
                "text/html",
                b"<html><body><p>Boiler servicing costs 80 pounds</p></body></html>",
            )
            .await
            .unwrap();
        assert_eq!(report.documents_processed, 1);

        let results = kb.query(&tenant, "boiler servicing", 3).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "faq.html");
        assert_eq!(results[0].content, "Boiler servicing costs 80 pounds");
    }

    #[tokio::test]
    async fn test_answer_without_knowledge() {
        let (kb, _dir) = knowledge_base(MockEmbeddingProvider::default()).await;
        let tenant = kb.tenant("https://acme.test/").await.unwrap();

        let answer = kb
            .answer(&tenant, "Are you open?", &EchoGenerator, None)
            .await
            .unwrap();
        assert_eq!(answer.text, NO_INFORMATION_ANSWER);
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_answer_with_context() {
        let (kb, _dir) = knowledge_base(MockEmbeddingProvider::new(32)).await;
        let tenant = kb.tenant("https://acme.test/").await.unwrap();
        kb.ingest_pages(
            &tenant,
            &[page("https://acme.test/hours", "Open weekdays from nine to five")],
        )
        .await
        .unwrap();

        let answer = kb
            .answer(&tenant, "When are you open?", &EchoGenerator, None)
            .await
            .unwrap();
        assert_eq!(answer.text, "When are you open? | Source: hours");
        assert_eq!(answer.sources.len(), 1);
    }
}
