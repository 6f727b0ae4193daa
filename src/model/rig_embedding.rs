//! Adapter from `rig` embedding models to [`EmbeddingProvider`]

use rig::embeddings::EmbeddingModel;
use rig::providers::gemini;
use tracing::debug;

use crate::model::embedding::EmbeddingConversion;
use crate::model::{EmbeddingError, EmbeddingProvider};

/// Any `rig` embedding model, exposed as an [`EmbeddingProvider`]
#[derive(Debug, Clone)]
pub struct RigEmbedder<M> {
    model: M,
    name: String,
}

impl<M: EmbeddingModel> RigEmbedder<M> {
    pub fn new(model: M, name: impl Into<String>) -> Self {
        Self {
            model,
            name: name.into(),
        }
    }
}

/// Gemini `text-embedding-004` through rig
pub fn gemini_embedder(api_key: &str) -> RigEmbedder<gemini::embedding::EmbeddingModel> {
    let client = gemini::Client::new(api_key);
    RigEmbedder::new(
        client.embedding_model(gemini::embedding::EMBEDDING_004),
        gemini::embedding::EMBEDDING_004,
    )
}

impl<M> EmbeddingProvider for RigEmbedder<M>
where
    M: EmbeddingModel + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn max_batch(&self) -> usize {
        M::MAX_DOCUMENTS
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!("Embedding {} texts with {}", texts.len(), self.name);
        let embeddings = self.model.embed_texts(texts).await?;
        Ok(embeddings.iter().map(|e| e.to_vec()).collect())
    }
}
