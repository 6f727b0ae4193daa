//! # Embedding Provider Module
//!
//! This module provides a single interface over the external embedding services the
//! pipeline can use, with built-in rate limiting to prevent API quota exhaustion.
//!
//! ## Key Components
//!
//! - `EmbeddingProvider`: Trait implemented by every embedding backend
//! - `RigEmbedder`: Adapter for `rig` embedding models (Gemini by default)
//! - `OpenAiEmbedder`: Direct client for OpenAI-compatible embedding APIs
//! - `RateLimitedEmbedder`: A wrapper that adds rate limiting to any provider
//! - `MockEmbeddingProvider`: Deterministic offline provider for tests
//! - `EmbeddingConversion`: Utilities for converting between embedding formats
//!
//! Providers classify failures into [`EmbeddingError`] variants so callers can retry
//! transient failures and stop immediately on rejected credentials.

use std::future::Future;

pub mod embedding;
mod error;
pub mod mock_embedding;
pub mod openai;
pub mod ratelimited_embedding;
pub mod rig_embedding;

pub use embedding::{blob_to_vector, cosine_similarity, vector_to_blob, EmbeddingConversion};
pub use error::EmbeddingError;
pub use mock_embedding::MockEmbeddingProvider;
pub use openai::OpenAiEmbedder;
pub use ratelimited_embedding::RateLimitedEmbedder;
pub use rig_embedding::RigEmbedder;

/// Requests per minute allowed against Gemini embeddings
pub const GEMINI_EMBEDDING_RPM: u32 = 1000;

/// Requests per minute allowed against OpenAI embeddings
pub const OPENAI_EMBEDDING_RPM: u32 = 3000;

/// A service that turns texts into vectors
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Largest number of texts accepted by one call
    fn max_batch(&self) -> usize {
        usize::MAX
    }

    /// Embed `texts`, returning one vector per text in the same order
    fn embed(
        &self,
        texts: Vec<String>,
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;
}

/// Rate-limited Gemini embedder
pub type GeminiEmbedder =
    RateLimitedEmbedder<RigEmbedder<rig::providers::gemini::embedding::EmbeddingModel>>;

/// Rate-limited Gemini embeddings using `GEMINI_API_KEY`
pub fn gemini_from_env() -> Result<GeminiEmbedder, EmbeddingError> {
    let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
        EmbeddingError::Config("GEMINI_API_KEY environment variable must be set".to_string())
    })?;
    Ok(RateLimitedEmbedder::per_minute(
        rig_embedding::gemini_embedder(&api_key),
        GEMINI_EMBEDDING_RPM,
    ))
}

/// Rate-limited OpenAI embeddings using `OPENAI_API_KEY`
pub fn openai_from_env() -> Result<RateLimitedEmbedder<OpenAiEmbedder>, EmbeddingError> {
    Ok(RateLimitedEmbedder::per_minute(
        OpenAiEmbedder::from_env()?,
        OPENAI_EMBEDDING_RPM,
    ))
}

/// Provider chosen at runtime, e.g. from a command-line flag
#[derive(Clone)]
pub enum ConfiguredEmbedder {
    Gemini(GeminiEmbedder),
    OpenAi(RateLimitedEmbedder<OpenAiEmbedder>),
    Mock(MockEmbeddingProvider),
}

impl ConfiguredEmbedder {
    /// Build the provider named `gemini`, `openai` or `mock`
    pub fn from_name(name: &str) -> Result<Self, EmbeddingError> {
        match name {
            "gemini" => Ok(Self::Gemini(gemini_from_env()?)),
            "openai" => Ok(Self::OpenAi(openai_from_env()?)),
            "mock" => Ok(Self::Mock(MockEmbeddingProvider::new(
                mock_embedding::DEFAULT_DIMENSIONS,
            ))),
            other => Err(EmbeddingError::Config(format!(
                "Unknown embedding provider: {}",
                other
            ))),
        }
    }
}

impl EmbeddingProvider for ConfiguredEmbedder {
    fn name(&self) -> &str {
        match self {
            Self::Gemini(p) => p.name(),
            Self::OpenAi(p) => p.name(),
            Self::Mock(p) => p.name(),
        }
    }

    fn max_batch(&self) -> usize {
        match self {
            Self::Gemini(p) => p.max_batch(),
            Self::OpenAi(p) => p.max_batch(),
            Self::Mock(p) => p.max_batch(),
        }
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match self {
            Self::Gemini(p) => p.embed(texts).await,
            Self::OpenAi(p) => p.embed(texts).await,
            Self::Mock(p) => p.embed(texts).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_mock_provider() {
        let provider = ConfiguredEmbedder::from_name("mock").unwrap();
        let vectors = provider.embed(vec!["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), mock_embedding::DEFAULT_DIMENSIONS);
        assert!(matches!(
            ConfiguredEmbedder::from_name("cohere"),
            Err(EmbeddingError::Config(_))
        ));
    }

    #[test]
    fn test_missing_credentials_are_config_errors() {
        // Only meaningful when the variable is absent from the test environment
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(openai_from_env(), Err(EmbeddingError::Config(_))));
        }
        if std::env::var("GEMINI_API_KEY").is_err() {
            assert!(matches!(gemini_from_env(), Err(EmbeddingError::Config(_))));
        }
    }
}
