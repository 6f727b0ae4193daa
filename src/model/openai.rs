//! OpenAI-compatible `/v1/embeddings` client
//!
//! Talks to the embeddings endpoint directly so that HTTP status codes survive and
//! credential rejections can be told apart from transient failures.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::model::{EmbeddingError, EmbeddingProvider};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default embedding model
pub const TEXT_EMBEDDING_3_SMALL: &str = "text-embedding-3-small";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding client for OpenAI-compatible APIs
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    /// Create a client for `model` at the default base URL
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Create a client from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self, EmbeddingError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            EmbeddingError::Config("OPENAI_API_KEY environment variable must be set".to_string())
        })?;
        Ok(Self::new(api_key, TEXT_EMBEDDING_3_SMALL))
    }

    /// Point the client at another OpenAI-compatible server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn max_batch(&self) -> usize {
        2048
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: &texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::from_status(status.as_u16(), body));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Response(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::Response(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        debug!("Received {} embeddings", parsed.data.len());

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn embedder(server: &mockito::ServerGuard) -> OpenAiEmbedder {
        OpenAiEmbedder::new("test-key", TEXT_EMBEDDING_3_SMALL).with_base_url(server.url())
    }

    #[tokio::test]
    async fn test_embed_orders_by_index() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": ["first", "second"]
            })))
            .with_status(200)
            .with_body(
                r#"{"data":[
                    {"index":1,"embedding":[0.0,1.0]},
                    {"index":0,"embedding":[1.0,0.0]}
                ]}"#,
            )
            .create_async()
            .await;

        let vectors = embedder(&server)
            .embed(vec!["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_auth_and_transient_errors() {
        let mut server = mockito::Server::new_async().await;
        let _unauthorized = server
            .mock("POST", "/embeddings")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key"}}"#)
            .create_async()
            .await;

        let err = embedder(&server)
            .embed(vec!["x".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Auth(_)));

        let mut server = mockito::Server::new_async().await;
        let _overloaded = server
            .mock("POST", "/embeddings")
            .with_status(503)
            .create_async()
            .await;

        let err = embedder(&server)
            .embed(vec!["x".to_string()])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_count_mismatch_is_response_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#)
            .create_async()
            .await;

        let err = embedder(&server)
            .embed(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Response(_)));
    }
}
