//! Answer generation through `rig` completion models

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rig::completion::CompletionModel;
use rig::message::AssistantContent;
use rig::providers::gemini;
use tracing::{debug_span, info_span, Instrument};

use crate::search::context::{build_user_message, AnswerGenerator};
use crate::search::error::SearchError;

/// Chat model used for answers
pub const GEMINI_ANSWER_MODEL: &str = "gemini-2.0-flash";

/// Requests per minute allowed against the answer model
pub const GEMINI_COMPLETION_RPM: u32 = 30;

/// [`AnswerGenerator`] backed by any rate-limited `rig` completion model
#[derive(Clone)]
pub struct RigAnswerGenerator<M> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M: CompletionModel> RigAnswerGenerator<M> {
    /// Allow at most `requests` completions per minute. Zero is treated as one.
    pub fn new(model: M, requests: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self {
            model,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

/// Gemini answers using `GEMINI_API_KEY`
pub fn gemini_from_env()
-> Result<RigAnswerGenerator<gemini::completion::CompletionModel>, SearchError> {
    let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
        SearchError::Generation("GEMINI_API_KEY environment variable must be set".to_string())
    })?;
    let client = gemini::Client::new(&api_key);
    Ok(RigAnswerGenerator::new(
        client.completion_model(GEMINI_ANSWER_MODEL),
        GEMINI_COMPLETION_RPM,
    ))
}

impl<M: CompletionModel> AnswerGenerator for RigAnswerGenerator<M> {
    async fn answer(
        &self,
        question: &str,
        context: &str,
        system_prompt: &str,
    ) -> Result<String, SearchError> {
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;

        let response = self
            .model
            .completion_request(build_user_message(question, context))
            .preamble(system_prompt.to_string())
            .send()
            .instrument(info_span!("completion"))
            .await
            .map_err(|e| SearchError::Generation(e.to_string()))?;

        let text = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<String>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(SearchError::Generation("Empty completion".to_string()));
        }
        Ok(text)
    }
}
