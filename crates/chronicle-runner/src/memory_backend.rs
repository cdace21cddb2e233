//! Agent memory backed by the LLM endpoint.

use chronicle_memory::{Embedding, MemoryBackend, MemoryError};

use crate::llm::LlmClient;

/// Summarizes through chat completions and embeds through the embeddings
/// endpoint of the same client.
#[derive(Debug, Clone)]
pub struct LlmMemoryBackend {
    client: LlmClient,
}

impl LlmMemoryBackend {
    /// Wrap a client.
    pub const fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

impl MemoryBackend for LlmMemoryBackend {
    async fn summarize(&self, prompt: &str) -> Result<String, MemoryError> {
        let summary = self
            .client
            .complete_text(prompt)
            .await
            .map_err(|e| MemoryError::Summarize(e.to_string()))?;
        if summary.trim().is_empty() {
            return Err(MemoryError::Summarize("empty summary".to_owned()));
        }
        Ok(summary)
    }

    async fn embed(&self, text: &str) -> Result<Embedding, MemoryError> {
        self.client
            .embed(text)
            .await
            .map(Embedding)
            .map_err(|e| MemoryError::Embed(e.to_string()))
    }
}
