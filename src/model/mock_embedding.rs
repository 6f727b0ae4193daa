//! # Mock Embedding Provider for Testing
//!
//! Provides a `MockEmbeddingProvider` that implements `EmbeddingProvider` without
//! network access. Vectors are deterministic bag-of-words hashes, so texts sharing
//! words are similar. Failures can be scripted to exercise retry handling.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::model::{EmbeddingError, EmbeddingProvider};

/// Vector size used when the mock stands in for a real provider
pub const DEFAULT_DIMENSIONS: usize = 256;

/// Failure the mock returns instead of embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Auth,
    Transient,
}

#[derive(Debug, Default)]
struct MockState {
    failures: VecDeque<MockFailure>,
    batches: Vec<usize>,
    overrides: HashMap<String, Vec<f32>>,
}

/// A deterministic embedding provider for tests and offline runs
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    max_batch: usize,
    calls: Arc<AtomicUsize>,
    state: Arc<Mutex<MockState>>,
}

impl MockEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` components
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            max_batch: usize::MAX,
            calls: Arc::new(AtomicUsize::new(0)),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Limit how many texts one call accepts
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    /// Return `vector` whenever exactly `text` is embedded
    pub fn with_vector(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.with_state(|state| {
            state.overrides.insert(text.into(), vector);
        });
        self
    }

    /// Fail the next `times` calls with `failure`
    pub fn fail_next(&self, failure: MockFailure, times: usize) {
        self.with_state(|state| {
            state.failures.extend(std::iter::repeat_n(failure, times));
        });
    }

    /// Number of `embed` calls so far, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Sizes of the batches that were embedded successfully
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.with_state(|state| state.batches.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Hash every lowercase word into one of `dimensions` buckets
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x100000001b3)
                });
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(16)
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn max_batch(&self) -> usize {
        self.max_batch
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if texts.len() > self.max_batch {
            return Err(EmbeddingError::Request(format!(
                "batch of {} exceeds limit {}",
                texts.len(),
                self.max_batch
            )));
        }

        let (failure, overrides) = self.with_state(|state| {
            let failure = state.failures.pop_front();
            if failure.is_none() {
                state.batches.push(texts.len());
            }
            (failure, state.overrides.clone())
        });

        match failure {
            Some(MockFailure::Auth) => {
                Err(EmbeddingError::Auth("status 401: invalid key".to_string()))
            }
            Some(MockFailure::Transient) => {
                Err(EmbeddingError::Transient("status 503: overloaded".to_string()))
            }
            None => Ok(texts
                .iter()
                .map(|t| {
                    overrides
                        .get(t)
                        .cloned()
                        .unwrap_or_else(|| self.vector_for(t))
                })
                .collect()),
        }
    }
}
