//! # Database Schema Module
//!
//! This module defines and manages the database schema of the chunk store.
//!
//! ## Schema Design
//!
//! A single logical store keyed by tenant:
//! 1. `tenants` - One row per onboarded site, unique by domain
//! 2. `pages` - Discovered and crawled pages, unique per `(tenant_id, url)`
//! 3. `chunks` - Word windows of page content, unique per `(page_id, ordinal)`
//! 4. `documents` - Uploaded files, unique per `(tenant_id, filename)`
//!
//! Every table cascades from `tenants`, and chunks also cascade from their page.
//! Embeddings are little-endian `f32` blobs that stay NULL until the embedding
//! pipeline fills them. All statements are `IF NOT EXISTS`, so initialization is
//! idempotent and safe for concurrent openers.

use crate::index::error::DbError;
use libsql::{Connection, params};
use tracing::debug;

const SCHEMA: &[(&str, &str)] = &[
    (
        "tenants table",
        "CREATE TABLE IF NOT EXISTS tenants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            root_url TEXT NOT NULL,
            domain TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        )",
    ),
    (
        "pages table",
        "CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            title TEXT,
            discovered_at INTEGER NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0,
            selected INTEGER NOT NULL DEFAULT 0,
            content TEXT,
            UNIQUE (tenant_id, url),
            FOREIGN KEY (tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
        )",
    ),
    (
        "chunks table",
        "CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            page_id INTEGER NOT NULL,
            ordinal INTEGER NOT NULL,
            total INTEGER NOT NULL,
            content TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            embedding BLOB,
            UNIQUE (page_id, ordinal),
            FOREIGN KEY (tenant_id) REFERENCES tenants(id) ON DELETE CASCADE,
            FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE
        )",
    ),
    (
        "chunks tenant index",
        "CREATE INDEX IF NOT EXISTS idx_chunks_tenant_page ON chunks(tenant_id, page_id)",
    ),
    (
        "documents table",
        "CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            filename TEXT NOT NULL,
            content_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB,
            uploaded_at INTEGER NOT NULL,
            UNIQUE (tenant_id, filename),
            FOREIGN KEY (tenant_id) REFERENCES tenants(id) ON DELETE CASCADE
        )",
    ),
];

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute("PRAGMA foreign_keys = ON", params![])
        .await
        .map_err(|e| DbError::Schema(format!("Failed to enable foreign keys: {}", e)))?;

    for (name, sql) in SCHEMA {
        conn.execute(sql, params![])
            .await
            .map_err(|e| DbError::Schema(format!("Failed to create {}: {}", name, e)))?;
        debug!("Ensured {}", name);
    }

    Ok(())
}
