//! Brute-force similarity search computed in process

use libsql::params;
use tracing::{debug, instrument};

use crate::index::Database;
use crate::model::{blob_to_vector, cosine_similarity};
use crate::search::error::SearchError;
use crate::search::{RetrievedChunk, Retriever, Source};

const CHUNK_CANDIDATES_SQL: &str = "
    SELECT c.id, p.url, COALESCE(p.title, p.url), c.content, c.embedding
    FROM chunks c JOIN pages p ON p.id = c.page_id
    WHERE c.tenant_id = ? AND c.embedding IS NOT NULL
    ORDER BY c.id
    LIMIT ?";

const DOCUMENT_CANDIDATES_SQL: &str = "
    SELECT id, filename, filename, content, embedding
    FROM documents
    WHERE tenant_id = ? AND embedding IS NOT NULL
    ORDER BY id
    LIMIT ?";

/// Retriever that loads a bounded candidate set and ranks it with cosine similarity
#[derive(Debug, Clone, Copy)]
pub struct ScanRetriever {
    candidate_multiplier: usize,
}

impl ScanRetriever {
    /// Load at most `top_k * candidate_multiplier` rows per source
    pub fn new(candidate_multiplier: usize) -> Self {
        Self {
            candidate_multiplier: candidate_multiplier.max(1),
        }
    }

    async fn candidates(
        &self,
        db: &Database,
        sql: &str,
        source: Source,
        tenant_id: i64,
        limit: i64,
        query: &[f32],
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        let mut rows = db.execute_query(sql, params![tenant_id, limit]).await?;
        let mut out = Vec::new();

        while let Some(row) = rows.next().await? {
            let blob: Vec<u8> = row.get(4).map_err(|e| {
                SearchError::ResultProcessing(format!("Failed to get embedding: {}", e))
            })?;
            out.push(RetrievedChunk {
                chunk_id: row.get(0).map_err(|e| {
                    SearchError::ResultProcessing(format!("Failed to get chunk_id: {}", e))
                })?,
                source,
                url: row.get(1).map_err(|e| {
                    SearchError::ResultProcessing(format!("Failed to get url: {}", e))
                })?,
                title: row.get(2).map_err(|e| {
                    SearchError::ResultProcessing(format!("Failed to get title: {}", e))
                })?,
                content: row.get(3).map_err(|e| {
                    SearchError::ResultProcessing(format!("Failed to get content: {}", e))
                })?,
                similarity: cosine_similarity(query, &blob_to_vector(&blob)),
            });
        }
        Ok(out)
    }
}

impl Default for ScanRetriever {
    fn default() -> Self {
        Self::new(20)
    }
}

impl Retriever for ScanRetriever {
    fn name(&self) -> &'static str {
        "scan"
    }

    #[instrument(skip(self, db, query), fields(dims = query.len()))]
    async fn search(
        &self,
        db: &Database,
        tenant_id: i64,
        query: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        let limit =
            i64::try_from(top_k.saturating_mul(self.candidate_multiplier)).unwrap_or(i64::MAX);

        let mut candidates = self
            .candidates(db, CHUNK_CANDIDATES_SQL, Source::Page, tenant_id, limit, query)
            .await?;
        let documents = self
            .candidates(db, DOCUMENT_CANDIDATES_SQL, Source::Document, tenant_id, limit, query)
            .await?;
        candidates.extend(documents);
        let scanned = candidates.len();

        candidates.retain(|c| c.similarity >= threshold);
        // stable: equal scores keep storage order
        candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        candidates.truncate(top_k);

        debug!("Scanned {} candidates, kept {}", scanned, candidates.len());
        Ok(candidates)
    }
}
