//! # Processor Configuration Module
//!
//! This module provides configuration structures and builders for the processing
//! stage of the ingestion pipeline: how text is chunked and how chunks are sent to
//! the embedding provider.
//!
//! ## Key Components
//!
//! - `ChunkOptions`: Controls the chunking behavior (size and overlap, in words)
//! - `EmbeddingConfig`: Batch size and retry policy for embedding calls
//! - `ProcessorConfig`: Complete configuration for the processor pipeline
//! - `ProcessorConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! Chunk size and overlap change the granularity of what retrieval can return; the
//! retry policy bounds how long one ingestion waits on a struggling provider.

use std::time::Duration;

/// Configuration for chunking text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOptions {
    /// Size of each chunk in words
    pub chunk_size: usize,

    /// Words shared by consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Configuration for embedding batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Texts sent per provider call
    pub batch_size: usize,

    /// Attempts per batch before giving up, the first call included
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry
    pub base_backoff: Duration,

    /// Upper bound on any single retry delay
    pub max_backoff: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_attempts: 4,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl EmbeddingConfig {
    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Configuration for the processor
#[derive(Debug, Clone, Default)]
pub struct ProcessorConfig {
    /// Options for chunking
    pub chunk_options: ChunkOptions,

    /// Options for embedding
    pub embedding: EmbeddingConfig,
}

/// Builder for ProcessorConfig
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::default(),
        }
    }

    /// Set the chunk options
    pub fn chunk_options(mut self, chunk_options: ChunkOptions) -> Self {
        self.config.chunk_options = chunk_options;
        self
    }

    /// Set the chunk size in words
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_options.chunk_size = chunk_size;
        self
    }

    /// Set the overlap in words
    pub fn overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_options.overlap = overlap;
        self
    }

    /// Set the embedding batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.embedding.batch_size = batch_size;
        self
    }

    /// Set the attempt ceiling per batch
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.embedding.max_attempts = max_attempts;
        self
    }

    /// Set the initial and maximum retry delays
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.config.embedding.base_backoff = base;
        self.config.embedding.max_backoff = max;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProcessorConfig {
        self.config
    }
}

impl ProcessorConfig {
    /// Create a new builder
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();

        assert_eq!(config.chunk_options.chunk_size, 1000);
        assert_eq!(config.chunk_options.overlap, 200);
        assert_eq!(config.embedding.batch_size, 10);
        assert_eq!(config.embedding.max_attempts, 4);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = EmbeddingConfig::default();

        assert_eq!(config.backoff(1), Duration::from_secs(1));
        assert_eq!(config.backoff(2), Duration::from_secs(2));
        assert_eq!(config.backoff(4), Duration::from_secs(8));
        assert_eq!(config.backoff(5), Duration::from_secs(10));
        assert_eq!(config.backoff(60), Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let config = ProcessorConfig::builder()
            .chunk_size(300)
            .overlap(30)
            .batch_size(4)
            .max_attempts(2)
            .backoff(Duration::from_millis(5), Duration::from_millis(20))
            .build();

        assert_eq!(
            config.chunk_options,
            ChunkOptions {
                chunk_size: 300,
                overlap: 30
            }
        );
        assert_eq!(config.embedding.batch_size, 4);
        assert_eq!(config.embedding.backoff(3), Duration::from_millis(20));
    }
}
