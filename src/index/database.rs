//! Database operations for the index module

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use libsql::{params, Connection, Row, Rows};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::crawler::{strip_www, CrawledPage, DiscoveredPage};
use crate::index::error::DbError;
use crate::index::schema;
use crate::index::{EmbeddingCounts, NewDocument, PendingEmbedding, StoredPage, SyncReport, Tenant};
use crate::model::vector_to_blob;
use crate::processor::TextChunk;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn field(name: &'static str) -> impl Fn(libsql::Error) -> DbError {
    move |e| DbError::Data(format!("Failed to get {}: {}", name, e))
}

fn query_err(action: &'static str) -> impl Fn(libsql::Error) -> DbError {
    move |e| DbError::Query(format!("Failed to {}: {}", action, e))
}

/// Database manager for the chunk store
///
/// Clones share one connection. Multi-statement writes take `write_lock` so that
/// their transactions never interleave on the shared connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Create a new database manager
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, DbError> {
        schema::initialize_schema(&conn).await?;

        Ok(Self {
            conn,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Open (or create) a local database file
    pub async fn open(path: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Execute a custom query with parameters
    pub async fn execute_query<P>(&self, sql: &str, params: P) -> Result<Rows, DbError>
    where
        P: libsql::params::IntoParams,
    {
        self.conn
            .query(sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))
    }

    // Tenants

    /// Find the tenant for `root_url`'s domain, creating it if needed
    #[instrument(skip(self))]
    pub async fn ensure_tenant(&self, root_url: &str) -> Result<Tenant, DbError> {
        let domain = domain_of(root_url)?;

        self.conn
            .execute(
                "INSERT INTO tenants (root_url, domain, created_at) VALUES (?, ?, ?)
                 ON CONFLICT(domain) DO NOTHING",
                params![root_url, domain.clone(), now()],
            )
            .await
            .map_err(query_err("create tenant"))?;

        self.tenant_by_domain(&domain)
            .await?
            .ok_or_else(|| DbError::Data(format!("Tenant for {} vanished after insert", domain)))
    }

    /// Look up the tenant owning `url`'s domain
    pub async fn find_tenant(&self, url: &str) -> Result<Option<Tenant>, DbError> {
        self.tenant_by_domain(&domain_of(url)?).await
    }

    /// Get a tenant by ID
    pub async fn get_tenant(&self, tenant_id: i64) -> Result<Option<Tenant>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, root_url, domain, created_at FROM tenants WHERE id = ?",
                params![tenant_id],
            )
            .await
            .map_err(query_err("get tenant"))?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_tenant(&row)?)),
            None => Ok(None),
        }
    }

    async fn tenant_by_domain(&self, domain: &str) -> Result<Option<Tenant>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, root_url, domain, created_at FROM tenants WHERE domain = ?",
                params![domain],
            )
            .await
            .map_err(query_err("get tenant"))?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_tenant(&row)?)),
            None => Ok(None),
        }
    }

    /// All tenants, oldest first
    #[instrument(skip(self))]
    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, root_url, domain, created_at FROM tenants ORDER BY id",
                params![],
            )
            .await
            .map_err(query_err("list tenants"))?;

        let mut tenants = Vec::new();
        while let Some(row) = rows.next().await? {
            tenants.push(row_to_tenant(&row)?);
        }
        Ok(tenants)
    }

    /// Delete a tenant and, by cascade, everything it owns
    #[instrument(skip(self))]
    pub async fn delete_tenant(&self, tenant_id: i64) -> Result<bool, DbError> {
        let _guard = self.write_lock.lock().await;
        let deleted = self
            .conn
            .execute("DELETE FROM tenants WHERE id = ?", params![tenant_id])
            .await
            .map_err(query_err("delete tenant"))?;
        Ok(deleted > 0)
    }

    // Pages

    /// Reconcile a discovery run with the stored pages.
    ///
    /// Known pages get a fresh title and timestamp, new pages are inserted unselected
    /// and unprocessed, and pages the run no longer found are deleted only while
    /// unprocessed.
    #[instrument(skip(self, pages), fields(pages = pages.len()))]
    pub async fn sync_discovered_pages(
        &self,
        tenant_id: i64,
        pages: &[DiscoveredPage],
    ) -> Result<SyncReport, DbError> {
        let _guard = self.write_lock.lock().await;
        let existing: HashMap<String, (i64, bool)> = self
            .pages_where(tenant_id, "")
            .await?
            .into_iter()
            .map(|p| (p.url, (p.id, p.processed)))
            .collect();

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

        let timestamp = now();
        let mut report = SyncReport::default();
        let mut seen = HashSet::new();

        for page in pages {
            if !seen.insert(page.url.as_str()) {
                continue;
            }
            tx.execute(
                "INSERT INTO pages (tenant_id, url, title, discovered_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT(tenant_id, url) DO UPDATE SET
                 title = excluded.title,
                 discovered_at = excluded.discovered_at",
                params![tenant_id, page.url.clone(), page.title.clone(), timestamp],
            )
            .await
            .map_err(query_err("upsert page"))?;

            if existing.contains_key(&page.url) {
                report.refreshed += 1;
            } else {
                report.added += 1;
            }
        }

        for (url, (id, processed)) in &existing {
            if *processed || seen.contains(url.as_str()) {
                continue;
            }
            tx.execute("DELETE FROM pages WHERE id = ?", params![*id])
                .await
                .map_err(query_err("delete page"))?;
            report.removed += 1;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        info!(
            "Synced pages: {} added, {} refreshed, {} removed",
            report.added, report.refreshed, report.removed
        );
        Ok(report)
    }

    /// Mark `urls` as selected or unselected, returning how many pages matched
    pub async fn set_page_selection(
        &self,
        tenant_id: i64,
        urls: &[String],
        selected: bool,
    ) -> Result<usize, DbError> {
        let _guard = self.write_lock.lock().await;
        let mut updated = 0;
        for url in urls {
            updated += self
                .conn
                .execute(
                    "UPDATE pages SET selected = ? WHERE tenant_id = ? AND url = ?",
                    params![selected as i64, tenant_id, url.clone()],
                )
                .await
                .map_err(query_err("update selection"))?;
        }
        Ok(updated as usize)
    }

    /// Pages the user selected for ingestion
    pub async fn selected_pages(&self, tenant_id: i64) -> Result<Vec<StoredPage>, DbError> {
        self.pages_where(tenant_id, "AND selected = 1").await
    }

    /// Every page of a tenant, in insertion order
    pub async fn list_pages(&self, tenant_id: i64) -> Result<Vec<StoredPage>, DbError> {
        self.pages_where(tenant_id, "").await
    }

    async fn pages_where(&self, tenant_id: i64, filter: &str) -> Result<Vec<StoredPage>, DbError> {
        let sql = format!(
            "SELECT id, tenant_id, url, title, discovered_at, processed, selected
             FROM pages WHERE tenant_id = ? {} ORDER BY id",
            filter
        );
        let mut rows = self
            .conn
            .query(&sql, params![tenant_id])
            .await
            .map_err(query_err("list pages"))?;

        let mut pages = Vec::new();
        while let Some(row) = rows.next().await? {
            pages.push(row_to_page(&row)?);
        }
        Ok(pages)
    }

    /// Store the content of a crawled page and mark it processed, returning its ID
    #[instrument(skip(self, page), fields(url = %page.url))]
    pub async fn record_crawled_page(
        &self,
        tenant_id: i64,
        page: &CrawledPage,
    ) -> Result<i64, DbError> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self
            .conn
            .query(
                "INSERT INTO pages (tenant_id, url, title, discovered_at, processed, content)
                 VALUES (?, ?, ?, ?, 1, ?)
                 ON CONFLICT(tenant_id, url) DO UPDATE SET
                 title = excluded.title,
                 discovered_at = excluded.discovered_at,
                 processed = 1,
                 content = excluded.content
                 RETURNING id",
                params![
                    tenant_id,
                    page.url.clone(),
                    page.title.clone(),
                    now(),
                    page.content.clone()
                ],
            )
            .await
            .map_err(query_err("record page"))?;

        single_id(&mut rows).await
    }

    // Chunks

    /// Replace the chunk set of a page in one transaction.
    ///
    /// Nothing is written when the stored chunks already derive from `content_hash`
    /// and there are as many of them as in `chunks`; returns whether a replacement
    /// happened. Replaced chunks start without an embedding.
    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub async fn replace_chunks_for_page(
        &self,
        tenant_id: i64,
        page_id: i64,
        content_hash: &str,
        chunks: &[TextChunk],
    ) -> Result<bool, DbError> {
        let _guard = self.write_lock.lock().await;

        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*), COALESCE(SUM(content_hash = ?), 0)
                 FROM chunks WHERE page_id = ?",
                params![content_hash, page_id],
            )
            .await
            .map_err(query_err("read chunk hashes"))?;
        let (stored, matching) = match rows.next().await? {
            Some(row) => (
                row.get::<i64>(0).map_err(field("chunk count"))?,
                row.get::<i64>(1).map_err(field("matching count"))?,
            ),
            None => (0, 0),
        };
        drop(rows);

        if stored > 0 && stored == matching && stored as usize == chunks.len() {
            debug!("Page {} unchanged, keeping {} chunks", page_id, stored);
            return Ok(false);
        }

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

        tx.execute("DELETE FROM chunks WHERE page_id = ?", params![page_id])
            .await
            .map_err(query_err("delete chunks"))?;

        for chunk in chunks {
            tx.execute(
                "INSERT INTO chunks (tenant_id, page_id, ordinal, total, content, content_hash)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    tenant_id,
                    page_id,
                    chunk.ordinal as i64,
                    chunk.total as i64,
                    chunk.text.clone(),
                    content_hash
                ],
            )
            .await
            .map_err(query_err("insert chunk"))?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        debug!("Replaced chunks of page {} ({} stored before)", page_id, stored);
        Ok(true)
    }

    /// Up to `limit` chunks of a tenant still lacking an embedding, oldest first
    pub async fn fetch_unembedded(
        &self,
        tenant_id: i64,
        limit: usize,
    ) -> Result<Vec<PendingEmbedding>, DbError> {
        self.pending("chunks", tenant_id, limit).await
    }

    /// Store the vector of one chunk; a chunk that already has one is left untouched
    pub async fn write_embedding(&self, chunk_id: i64, vector: &[f32]) -> Result<(), DbError> {
        self.write_vector("chunks", chunk_id, vector).await
    }

    /// Chunk totals of a tenant
    pub async fn count_chunks(&self, tenant_id: i64) -> Result<EmbeddingCounts, DbError> {
        self.counts("chunks", tenant_id).await
    }

    // Documents

    /// Insert or replace an uploaded document, clearing any previous embedding
    #[instrument(skip(self, document), fields(filename = %document.filename))]
    pub async fn upsert_document(
        &self,
        tenant_id: i64,
        document: &NewDocument,
    ) -> Result<i64, DbError> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self
            .conn
            .query(
                "INSERT INTO documents (tenant_id, filename, content_type, size, content, uploaded_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(tenant_id, filename) DO UPDATE SET
                 content_type = excluded.content_type,
                 size = excluded.size,
                 content = excluded.content,
                 uploaded_at = excluded.uploaded_at,
                 embedding = NULL
                 RETURNING id",
                params![
                    tenant_id,
                    document.filename.clone(),
                    document.content_type.clone(),
                    document.size as i64,
                    document.content.clone(),
                    now()
                ],
            )
            .await
            .map_err(query_err("upsert document"))?;

        single_id(&mut rows).await
    }

    /// Up to `limit` documents of a tenant still lacking an embedding
    pub async fn fetch_unembedded_documents(
        &self,
        tenant_id: i64,
        limit: usize,
    ) -> Result<Vec<PendingEmbedding>, DbError> {
        self.pending("documents", tenant_id, limit).await
    }

    /// Store the vector of one document
    pub async fn write_document_embedding(
        &self,
        document_id: i64,
        vector: &[f32],
    ) -> Result<(), DbError> {
        self.write_vector("documents", document_id, vector).await
    }

    /// Document totals of a tenant
    pub async fn count_documents(&self, tenant_id: i64) -> Result<EmbeddingCounts, DbError> {
        self.counts("documents", tenant_id).await
    }

    async fn pending(
        &self,
        table: &'static str,
        tenant_id: i64,
        limit: usize,
    ) -> Result<Vec<PendingEmbedding>, DbError> {
        let sql = format!(
            "SELECT id, content FROM {} WHERE tenant_id = ? AND embedding IS NULL ORDER BY id LIMIT ?",
            table
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(&sql, params![tenant_id, limit])
            .await
            .map_err(query_err("fetch pending embeddings"))?;

        let mut pending = Vec::new();
        while let Some(row) = rows.next().await? {
            pending.push(PendingEmbedding {
                id: row.get(0).map_err(field("id"))?,
                content: row.get(1).map_err(field("content"))?,
            });
        }
        Ok(pending)
    }

    async fn write_vector(
        &self,
        table: &'static str,
        id: i64,
        vector: &[f32],
    ) -> Result<(), DbError> {
        let sql = format!(
            "UPDATE {} SET embedding = ? WHERE id = ? AND embedding IS NULL",
            table
        );
        let _guard = self.write_lock.lock().await;
        self.conn
            .execute(&sql, params![libsql::Value::Blob(vector_to_blob(vector)), id])
            .await
            .map_err(query_err("write embedding"))?;
        Ok(())
    }

    async fn counts(
        &self,
        table: &'static str,
        tenant_id: i64,
    ) -> Result<EmbeddingCounts, DbError> {
        let sql = format!(
            "SELECT COUNT(*), COUNT(embedding) FROM {} WHERE tenant_id = ?",
            table
        );
        let mut rows = self
            .conn
            .query(&sql, params![tenant_id])
            .await
            .map_err(query_err("count rows"))?;

        match rows.next().await? {
            Some(row) => Ok(EmbeddingCounts {
                total: row.get::<i64>(0).map_err(field("total"))? as usize,
                embedded: row.get::<i64>(1).map_err(field("embedded"))? as usize,
            }),
            None => Ok(EmbeddingCounts::default()),
        }
    }
}

fn domain_of(url: &str) -> Result<String, DbError> {
    let parsed = url
        .parse::<url::Url>()
        .map_err(|e| DbError::Data(format!("Failed to parse URL {}: {}", url, e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| DbError::Data(format!("URL has no host: {}", url)))?;
    Ok(strip_www(&host.to_ascii_lowercase()).to_string())
}

async fn single_id(rows: &mut Rows) -> Result<i64, DbError> {
    match rows.next().await? {
        Some(row) => row.get(0).map_err(field("id")),
        None => Err(DbError::Data("No ID returned".to_string())),
    }
}

fn row_to_tenant(row: &Row) -> Result<Tenant, DbError> {
    Ok(Tenant {
        id: row.get(0).map_err(field("id"))?,
        root_url: row.get(1).map_err(field("root_url"))?,
        domain: row.get(2).map_err(field("domain"))?,
        created_at: row.get(3).map_err(field("created_at"))?,
    })
}

fn row_to_page(row: &Row) -> Result<StoredPage, DbError> {
    Ok(StoredPage {
        id: row.get(0).map_err(field("id"))?,
        tenant_id: row.get(1).map_err(field("tenant_id"))?,
        url: row.get(2).map_err(field("url"))?,
        title: row.get(3).map_err(field("title"))?,
        discovered_at: row.get(4).map_err(field("discovered_at"))?,
        processed: row.get::<i64>(5).map_err(field("processed"))? != 0,
        selected: row.get::<i64>(6).map_err(field("selected"))? != 0,
    })
}
