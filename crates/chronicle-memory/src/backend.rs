//! The model calls memory depends on: summarization and embedding.
//!
//! Agents that run against a real LLM plug in an HTTP-backed implementation
//! (see `chronicle-runner`). [`OfflineBackend`] has no model at all: every
//! compaction is skipped and every recall uses substring matching.

use std::future::Future;

use crate::embedding::Embedding;
use crate::error::MemoryError;

/// Instruction prepended to the transcript when compacting short-term memory.
pub const COMPACTION_PROMPT: &str = "Summarize the following conversation history into a concise \
paragraph. Keep the key facts, decisions, relationships, and any promises made. \
Drop greetings and repetition.";

/// Summarization and embedding provider for agent memory.
pub trait MemoryBackend: Send + Sync {
    /// Summarize a compaction prompt into a short text.
    fn summarize(&self, prompt: &str) -> impl Future<Output = Result<String, MemoryError>> + Send;

    /// Embed a text into a dense vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding, MemoryError>> + Send;
}

/// A backend with no model behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

impl MemoryBackend for OfflineBackend {
    async fn summarize(&self, _prompt: &str) -> Result<String, MemoryError> {
        Err(MemoryError::Unavailable)
    }

    async fn embed(&self, _text: &str) -> Result<Embedding, MemoryError> {
        Err(MemoryError::Unavailable)
    }
}
