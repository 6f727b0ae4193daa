use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::{debug_span, info_span, Instrument};

use crate::model::{EmbeddingError, EmbeddingProvider};

/// Embedding provider wrapper that waits for a governor permit before each call
#[derive(Clone)]
pub struct RateLimitedEmbedder<P> {
    provider: P,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<P: EmbeddingProvider> RateLimitedEmbedder<P> {
    pub fn new(provider: P, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            provider,
            limiter: Arc::new(limiter),
        }
    }

    /// Allow at most `requests` calls per minute. Zero is treated as one.
    pub fn per_minute(provider: P, requests: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self::new(provider, RateLimiter::direct(quota))
    }

    pub fn inner(&self) -> &P {
        &self.provider
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for RateLimitedEmbedder<P> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn max_batch(&self) -> usize {
        self.provider.max_batch()
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;
        self.provider
            .embed(texts)
            .instrument(info_span!("embed_texts"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_embedding::MockEmbeddingProvider;

    #[tokio::test]
    async fn test_passes_through() {
        let limited = RateLimitedEmbedder::per_minute(MockEmbeddingProvider::new(8), 1000);

        let vectors = limited
            .embed(vec!["one".to_string(), "two".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(limited.inner().calls(), 1);
        assert_eq!(limited.name(), "mock");
    }
}
