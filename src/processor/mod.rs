//! Content processor module
//!
//! This module turns page and document text into stored chunks and vectors:
//! word-window chunking with content hashing, text extraction for uploads, and the
//! batched embedding pipeline.

mod chunking;
mod config;
mod documents;
mod embedding;
mod error;

pub use chunking::{chunk_words, content_hash, TextChunk};
pub use config::{ChunkOptions, EmbeddingConfig, ProcessorConfig, ProcessorConfigBuilder};
pub use documents::extract_document_text;
pub use embedding::EmbeddingPipeline;
pub use error::ProcessError;
