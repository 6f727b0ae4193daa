//! Embedding generation functionality for the processor module
//!
//! Pending chunks and documents are read from the store in batches, embedded with
//! retry on transient provider failures, and written back one vector per row. Each
//! batch is persisted before the next is requested, so an interrupted run leaves the
//! remaining rows pending for the next one.

use tracing::{debug, info, instrument, warn};

use crate::index::{Database, PendingEmbedding};
use crate::model::{EmbeddingError, EmbeddingProvider};
use crate::processor::config::EmbeddingConfig;
use crate::processor::error::ProcessError;

#[derive(Debug, Clone, Copy)]
enum Target {
    Chunks,
    Documents,
}

impl Target {
    async fn fetch(
        self,
        db: &Database,
        tenant_id: i64,
        limit: usize,
    ) -> Result<Vec<PendingEmbedding>, ProcessError> {
        Ok(match self {
            Target::Chunks => db.fetch_unembedded(tenant_id, limit).await?,
            Target::Documents => db.fetch_unembedded_documents(tenant_id, limit).await?,
        })
    }

    async fn write(self, db: &Database, id: i64, vector: &[f32]) -> Result<(), ProcessError> {
        match self {
            Target::Chunks => db.write_embedding(id, vector).await?,
            Target::Documents => db.write_document_embedding(id, vector).await?,
        }
        Ok(())
    }
}

/// Batches pending rows through an embedding provider
pub struct EmbeddingPipeline<P> {
    provider: P,
    config: EmbeddingConfig,
}

impl<P: EmbeddingProvider> EmbeddingPipeline<P> {
    pub fn new(provider: P, config: EmbeddingConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Items per provider call: the configured batch size within the provider limit
    pub fn batch_size(&self) -> usize {
        self.config.batch_size.min(self.provider.max_batch()).max(1)
    }

    /// Embed every chunk of `tenant_id` that has no vector yet
    ///
    /// # Returns
    ///
    /// The number of chunks embedded by this call
    #[instrument(skip(self, db))]
    pub async fn embed_pending(
        &self,
        db: &Database,
        tenant_id: i64,
    ) -> Result<usize, ProcessError> {
        self.drain(db, tenant_id, Target::Chunks).await
    }

    /// Embed every uploaded document of `tenant_id` that has no vector yet
    #[instrument(skip(self, db))]
    pub async fn embed_pending_documents(
        &self,
        db: &Database,
        tenant_id: i64,
    ) -> Result<usize, ProcessError> {
        self.drain(db, tenant_id, Target::Documents).await
    }

    /// Embed a single query text
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProcessError> {
        let mut vectors = self.embed_with_retry(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Response("no vector for query".to_string()).into())
    }

    async fn drain(
        &self,
        db: &Database,
        tenant_id: i64,
        target: Target,
    ) -> Result<usize, ProcessError> {
        let batch_size = self.batch_size();
        let mut embedded = 0;

        loop {
            let batch = target.fetch(db, tenant_id, batch_size).await?;
            if batch.is_empty() {
                break;
            }

            let texts = batch.iter().map(|item| item.content.clone()).collect();
            let vectors = self.embed_with_retry(texts).await?;

            for (item, vector) in batch.iter().zip(&vectors) {
                target.write(db, item.id, vector).await?;
            }
            embedded += batch.len();
            debug!("Embedded batch of {} {:?}", batch.len(), target);
        }

        if embedded > 0 {
            info!(
                "Embedded {} {:?} with {}",
                embedded,
                target,
                self.provider.name()
            );
        }
        Ok(embedded)
    }

    /// Call the provider, retrying transient failures with exponential backoff.
    ///
    /// Authentication and other non-retryable errors are returned after the first
    /// attempt. The result holds exactly one vector per input text.
    pub async fn embed_with_retry(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = texts.len();
        let mut attempt = 1;

        loop {
            match self.provider.embed(texts.clone()).await {
                Ok(vectors) if vectors.len() == expected => return Ok(vectors),
                Ok(vectors) => {
                    return Err(EmbeddingError::Response(format!(
                        "expected {} vectors, got {}",
                        expected,
                        vectors.len()
                    )));
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                    let delay = self.config.backoff(attempt);
                    warn!(
                        "Embedding attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, self.config.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawledPage;
    use crate::model::mock_embedding::MockFailure;
    use crate::model::MockEmbeddingProvider;
    use crate::processor::{chunk_words, content_hash, ChunkOptions};
    use std::time::Duration;
    use tempfile::TempDir;

    fn fast_config(batch_size: usize, max_attempts: u32) -> EmbeddingConfig {
        EmbeddingConfig {
            batch_size,
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    /// A tenant with one page split into `chunks` two-word chunks
    async fn store_with_chunks(chunks: usize) -> (Database, i64, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("kb.db").to_string_lossy())
            .await
            .unwrap();
        let tenant = db.ensure_tenant("https://acme.test/").await.unwrap();

        let text = (0..chunks * 2)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let page = CrawledPage {
            url: "https://acme.test/".to_string(),
            title: "Home".to_string(),
            content: text.clone(),
        };
        let page_id = db.record_crawled_page(tenant.id, &page).await.unwrap();
        let options = ChunkOptions {
            chunk_size: 2,
            overlap: 0,
        };
        db.replace_chunks_for_page(
            tenant.id,
            page_id,
            &content_hash(&text),
            &chunk_words(&text, &options).unwrap(),
        )
        .await
        .unwrap();

        (db, tenant.id, dir)
    }

    #[tokio::test]
    async fn test_embeds_all_pending_in_batches() {
        let (db, tenant_id, _dir) = store_with_chunks(25).await;
        let mock = MockEmbeddingProvider::new(8);
        let pipeline = EmbeddingPipeline::new(mock.clone(), fast_config(10, 3));

        assert_eq!(pipeline.embed_pending(&db, tenant_id).await.unwrap(), 25);
        assert_eq!(mock.batch_sizes(), vec![10, 10, 5]);
        assert_eq!(db.count_chunks(tenant_id).await.unwrap().pending(), 0);

        // Nothing left to do
        assert_eq!(pipeline.embed_pending(&db, tenant_id).await.unwrap(), 0);
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_batches_respect_provider_limit() {
        let (db, tenant_id, _dir) = store_with_chunks(9).await;
        let mock = MockEmbeddingProvider::new(8).with_max_batch(4);
        let pipeline = EmbeddingPipeline::new(mock.clone(), fast_config(10, 3));

        assert_eq!(pipeline.batch_size(), 4);
        pipeline.embed_pending(&db, tenant_id).await.unwrap();
        assert_eq!(mock.batch_sizes(), vec![4, 4, 1]);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let (db, tenant_id, _dir) = store_with_chunks(3).await;
        let mock = MockEmbeddingProvider::new(8);
        mock.fail_next(MockFailure::Transient, 2);
        let pipeline = EmbeddingPipeline::new(mock.clone(), fast_config(10, 3));

        assert_eq!(pipeline.embed_pending(&db, tenant_id).await.unwrap(), 3);
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_ceiling_surfaces_the_error() {
        let (db, tenant_id, _dir) = store_with_chunks(3).await;
        let mock = MockEmbeddingProvider::new(8);
        mock.fail_next(MockFailure::Transient, 10);
        let pipeline = EmbeddingPipeline::new(mock.clone(), fast_config(10, 3));

        let err = pipeline.embed_pending(&db, tenant_id).await.unwrap_err();
        assert!(matches!(err, ProcessError::Embedding(EmbeddingError::Transient(_))));
        assert_eq!(mock.calls(), 3);
        assert_eq!(db.count_chunks(tenant_id).await.unwrap().pending(), 3);
    }

    #[tokio::test]
    async fn test_auth_failures_are_not_retried() {
        let (db, tenant_id, _dir) = store_with_chunks(3).await;
        let mock = MockEmbeddingProvider::new(8);
        mock.fail_next(MockFailure::Auth, 1);
        let pipeline = EmbeddingPipeline::new(mock.clone(), fast_config(10, 5));

        let err = pipeline.embed_pending(&db, tenant_id).await.unwrap_err();
        assert!(matches!(err, ProcessError::Embedding(EmbeddingError::Auth(_))));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_completed_batches_survive_a_later_failure() {
        let (db, tenant_id, _dir) = store_with_chunks(6).await;
        let mock = MockEmbeddingProvider::new(8);
        let pipeline = EmbeddingPipeline::new(mock.clone(), fast_config(4, 1));

        // First batch of four succeeds, then the provider rejects the key
        let first = db.fetch_unembedded(tenant_id, 4).await.unwrap();
        let texts = first.iter().map(|p| p.content.clone()).collect();
        let vectors = pipeline.embed_with_retry(texts).await.unwrap();
        for (item, vector) in first.iter().zip(&vectors) {
            db.write_embedding(item.id, vector).await.unwrap();
        }
        mock.fail_next(MockFailure::Auth, 1);

        assert!(pipeline.embed_pending(&db, tenant_id).await.is_err());
        let counts = db.count_chunks(tenant_id).await.unwrap();
        assert_eq!(counts.embedded, 4);
        assert_eq!(counts.pending(), 2);
    }

    #[tokio::test]
    async fn test_documents_and_queries() {
        let (db, tenant_id, _dir) = store_with_chunks(1).await;
        let mock = MockEmbeddingProvider::new(8);
        let pipeline = EmbeddingPipeline::new(mock.clone(), fast_config(10, 2));

        db.upsert_document(
            tenant_id,
            &crate::index::NewDocument {
                filename: "menu.txt".to_string(),
                content_type: "text/plain".to_string(),
                size: 4,
                content: "soup".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(pipeline.embed_pending_documents(&db, tenant_id).await.unwrap(), 1);
        assert_eq!(db.count_documents(tenant_id).await.unwrap().embedded, 1);

        let query = pipeline.embed_query("soup of the day").await.unwrap();
        assert_eq!(query, mock.vector_for("soup of the day"));
    }
}
