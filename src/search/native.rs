//! Similarity search executed inside libsql with `vector_distance_cos`

use libsql::{params, Rows};
use tracing::{debug, instrument};

use crate::index::Database;
use crate::model::vector_to_blob;
use crate::search::error::SearchError;
use crate::search::{RetrievedChunk, Retriever, Source};

// Rows whose dimensionality differs from the query, or with a zero-norm
// embedding, score 0 instead of failing or dropping out.
const NATIVE_SEARCH_SQL: &str = "
    SELECT id, source, url, title, content, similarity FROM (
        SELECT c.id AS id, 'page' AS source, 0 AS source_rank, p.url AS url,
               COALESCE(p.title, p.url) AS title, c.content AS content,
               CASE WHEN length(c.embedding) = length(?1)
                    THEN COALESCE(1.0 - vector_distance_cos(c.embedding, ?1), 0.0)
                    ELSE 0.0 END AS similarity
        FROM chunks c JOIN pages p ON p.id = c.page_id
        WHERE c.tenant_id = ?2 AND c.embedding IS NOT NULL
        UNION ALL
        SELECT d.id, 'document', 1, d.filename, d.filename, d.content,
               CASE WHEN length(d.embedding) = length(?1)
                    THEN COALESCE(1.0 - vector_distance_cos(d.embedding, ?1), 0.0)
                    ELSE 0.0 END
        FROM documents d
        WHERE d.tenant_id = ?2 AND d.embedding IS NOT NULL
    )
    WHERE similarity >= ?3
    ORDER BY similarity DESC, source_rank, id
    LIMIT ?4";

/// Retriever backed by libsql's vector functions
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRetriever;

impl NativeRetriever {
    /// Whether the connected libsql build provides `vector_distance_cos`
    pub async fn is_supported(db: &Database) -> bool {
        db.execute_query(
            "SELECT vector_distance_cos(vector32('[1,0]'), vector32('[0,1]'))",
            params![],
        )
        .await
        .is_ok()
    }
}

impl Retriever for NativeRetriever {
    fn name(&self) -> &'static str {
        "native"
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
        let rows = db
            .execute_query(
                NATIVE_SEARCH_SQL,
                params![
                    libsql::Value::Blob(vector_to_blob(query)),
                    tenant_id,
                    threshold as f64,
                    i64::try_from(top_k).unwrap_or(i64::MAX)
                ],
            )
            .await?;

        let results = process_results(rows).await?;
        debug!("Native search returned {} rows", results.len());
        Ok(results)
    }
}

/// Process the results from a query into RetrievedChunk objects
async fn process_results(mut rows: Rows) -> Result<Vec<RetrievedChunk>, SearchError> {
    let mut results = Vec::new();
    while let Some(row) = rows.next().await? {
        let source: String = row.get(1).map_err(|e| {
            SearchError::ResultProcessing(format!("Failed to get source: {}", e))
        })?;

        results.push(RetrievedChunk {
            chunk_id: row.get(0).map_err(|e| {
                SearchError::ResultProcessing(format!("Failed to get chunk_id: {}", e))
            })?,
            source: if source == "document" {
                Source::Document
            } else {
                Source::Page
            },
            url: row
                .get(2)
                .map_err(|e| SearchError::ResultProcessing(format!("Failed to get url: {}", e)))?,
            title: row
                .get(3)
                .map_err(|e| SearchError::ResultProcessing(format!("Failed to get title: {}", e)))?,
            content: row.get(4).map_err(|e| {
                SearchError::ResultProcessing(format!("Failed to get content: {}", e))
            })?,
            similarity: row.get::<f64>(5).map_err(|e| {
                SearchError::ResultProcessing(format!("Failed to get similarity: {}", e))
            })? as f32,
        });
    }

    Ok(results)
}
