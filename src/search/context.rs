//! Prompt context for the answer-generation collaborator
//!
//! Retrieval results are rendered as source blocks and cut off at a rough token
//! budget. The completion call itself lives behind [`AnswerGenerator`].

use std::future::Future;

use crate::search::error::SearchError;
use crate::search::RetrievedChunk;

/// Token budget for rendered context
pub const DEFAULT_CONTEXT_TOKENS: usize = 6000;

/// System prompt used when the tenant has not configured one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for a business website. \
     Answer based only on the provided CONTEXT. Cite sources using their titles and URLs at \
     the end. If unsure, say you don't know.";

/// Reply given when retrieval found nothing to ground an answer in
pub const NO_INFORMATION_ANSWER: &str =
    "I don't have enough information about that yet. Please try rephrasing your question.";

/// Rough token count: whitespace-separated words times 1.3
pub fn estimate_tokens(text: &str) -> f64 {
    text.split_whitespace().count() as f64 * 1.3
}

/// Render results in rank order until the next block would exceed `max_tokens`
pub fn build_context(results: &[RetrievedChunk], max_tokens: usize) -> String {
    let mut context = String::new();
    let mut used = 0.0;

    for result in results {
        let block = format!(
            "Source: {}\nURL: {}\n---\n{}\n\n",
            result.title, result.url, result.content
        );
        let tokens = estimate_tokens(&block);
        if used + tokens > max_tokens as f64 {
            break;
        }
        context.push_str(&block);
        used += tokens;
    }

    context
}

/// The user message sent alongside the system prompt
pub fn build_user_message(question: &str, context: &str) -> String {
    format!("CONTEXT:\n{}\n\nQUESTION: {}", context, question)
}

/// An external chat-completion service answering from retrieved context
pub trait AnswerGenerator: Send + Sync {
    fn answer(
        &self,
        question: &str,
        context: &str,
        system_prompt: &str,
    ) -> impl Future<Output = Result<String, SearchError>> + Send;
}
