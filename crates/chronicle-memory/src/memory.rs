//! Per-agent memory combining the short-term buffer and long-term store.
//!
//! ## Compaction
//!
//! Every [`AgentMemory::add_message`] checks the buffer's total content
//! length against [`MemoryConfig::stm_max_chars`]. Past the threshold the
//! whole buffer is summarized by the backend, the summary is stored as a
//! new long-term document, and the buffer is reset to a two-message
//! placeholder carrying the summary. The placeholder copy of the summary is
//! truncated to half of what the threshold leaves after the placeholder
//! line, so the buffer ends up below the threshold.
//!
//! A failed summarization is logged and leaves the buffer as it was. A
//! failed embedding still stores the document, unembedded.
//!
//! ## Recall
//!
//! [`AgentMemory::recall`] returns the buffered messages plus the top
//! matching long-term documents joined by blank lines. The query is
//! embedded for cosine ranking; if that fails, a substring match is used.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chronicle_types::MessageRole;

use crate::backend::{COMPACTION_PROMPT, MemoryBackend};
use crate::error::MemoryError;
use crate::long_term::{DocumentMetadata, LongTermMemory, LtmDocument};
use crate::short_term::{MemoryMessage, SUMMARY_PLACEHOLDER, ShortTermMemory};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for agent memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum messages in the short-term buffer (default: 20).
    #[serde(default = "default_stm_max_messages")]
    pub stm_max_messages: usize,

    /// Content length that triggers compaction (default: 8192).
    #[serde(default = "default_stm_max_chars")]
    pub stm_max_chars: usize,

    /// Long-term documents returned per recall (default: 5).
    #[serde(default = "default_ltm_top_k")]
    pub ltm_top_k: usize,
}

const fn default_stm_max_messages() -> usize {
    20
}

const fn default_stm_max_chars() -> usize {
    8192
}

const fn default_ltm_top_k() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            stm_max_messages: default_stm_max_messages(),
            stm_max_chars: default_stm_max_chars(),
            ltm_top_k: default_ltm_top_k(),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What happened to the buffer after a message was added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// The buffer is under the threshold.
    NotNeeded,
    /// The buffer was summarized into long-term memory.
    Compacted {
        /// Content length before compaction.
        before: usize,
        /// Content length after compaction.
        after: usize,
        /// Whether the new document received an embedding.
        embedded: bool,
    },
    /// Summarization failed; the buffer is unchanged.
    Skipped {
        /// Why the summary could not be produced.
        reason: String,
    },
}

/// Context assembled for a decision prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recall {
    /// The short-term buffer, oldest first.
    pub recent_messages: Vec<MemoryMessage>,
    /// Matching long-term documents joined by blank lines.
    pub long_term_summary: String,
}

/// Serializable copy of a whole memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Short-term buffer, oldest first.
    pub stm: Vec<MemoryMessage>,
    /// Long-term documents in insertion order.
    pub ltm_documents: Vec<LtmDocument>,
}

impl MemorySnapshot {
    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, MemoryError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self, MemoryError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// AgentMemory
// ---------------------------------------------------------------------------

/// Two-tier memory owned by one agent.
#[derive(Debug)]
pub struct AgentMemory<B> {
    config: MemoryConfig,
    stm: ShortTermMemory,
    ltm: LongTermMemory,
    backend: B,
}

impl<B: MemoryBackend> AgentMemory<B> {
    /// An empty memory.
    pub fn new(config: MemoryConfig, backend: B) -> Self {
        Self {
            stm: ShortTermMemory::new(config.stm_max_messages),
            ltm: LongTermMemory::new(),
            config,
            backend,
        }
    }

    /// Append a message and compact if the buffer grew past the threshold.
    pub async fn add_message(&mut self, message: MemoryMessage) -> CompactionOutcome {
        self.stm.push(message);
        if self.stm.total_weight() <= self.config.stm_max_chars {
            return CompactionOutcome::NotNeeded;
        }
        self.compact().await
    }

    /// Convenience wrapper around [`AgentMemory::add_message`].
    pub async fn remember(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
    ) -> CompactionOutcome {
        self.add_message(MemoryMessage::now(role, content)).await
    }

    async fn compact(&mut self) -> CompactionOutcome {
        let before = self.stm.total_weight();
        let prompt = format!("{COMPACTION_PROMPT}\n\n{}", self.stm.transcript());

        let summary = match self.backend.summarize(&prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, stm_chars = before, "Memory compaction failed; keeping buffer");
                return CompactionOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let embedding = match self.backend.embed(&summary).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(error = %e, "Summary embedding failed; storing for substring recall");
                None
            }
        };
        let embedded = embedding.is_some();

        let inputs = self
            .stm
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.ltm.add(LtmDocument {
            text: summary.clone(),
            metadata: DocumentMetadata {
                inputs,
                outputs: summary.clone(),
                timestamp: chrono::Utc::now(),
            },
            embedding,
        });

        let room = self
            .config
            .stm_max_chars
            .saturating_sub(SUMMARY_PLACEHOLDER.chars().count());
        let seeded = truncate_chars(&summary, room / 2);
        self.stm.seed_with_summary(seeded);
        let after = self.stm.total_weight();

        debug!(before, after, embedded, ltm_documents = self.ltm.len(), "Memory compacted");
        CompactionOutcome::Compacted {
            before,
            after,
            embedded,
        }
    }

    /// Buffered messages plus the long-term documents relevant to `query`.
    ///
    /// An empty query skips the long-term search.
    pub async fn recall(&self, query: &str) -> Recall {
        let recent_messages = self.stm.messages().cloned().collect();
        if query.trim().is_empty() || self.ltm.is_empty() {
            return Recall {
                recent_messages,
                long_term_summary: String::new(),
            };
        }

        let k = self.config.ltm_top_k;
        let hits = match self.backend.embed(query).await {
            Ok(embedding) => self.ltm.search_by_embedding(&embedding, query, k),
            Err(e) => {
                debug!(error = %e, "Query embedding failed; using substring recall");
                self.ltm.search_by_substring(query, k)
            }
        };

        let long_term_summary = hits
            .iter()
            .map(|doc| doc.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Recall {
            recent_messages,
            long_term_summary,
        }
    }

    /// Copy the whole memory for persistence.
    pub fn export(&self) -> MemorySnapshot {
        MemorySnapshot {
            stm: self.stm.messages().cloned().collect(),
            ltm_documents: self.ltm.documents().to_vec(),
        }
    }

    /// Replace the whole memory with a snapshot, verbatim.
    pub fn import(&mut self, snapshot: MemorySnapshot) {
        self.stm.restore(snapshot.stm);
        self.ltm.restore(snapshot.ltm_documents);
    }

    /// Embed every long-term document that lacks a vector. Returns how many
    /// were embedded; failures are logged and left for substring recall.
    pub async fn backfill_embeddings(&mut self) -> usize {
        let mut embedded: usize = 0;
        for doc in self.ltm.unembedded_mut() {
            match self.backend.embed(&doc.text).await {
                Ok(embedding) => {
                    doc.embedding = Some(embedding);
                    embedded = embedded.saturating_add(1);
                }
                Err(e) => warn!(error = %e, "Could not backfill document embedding"),
            }
        }
        embedded
    }

    /// The short-term buffer.
    pub const fn short_term(&self) -> &ShortTermMemory {
        &self.stm
    }

    /// The long-term store.
    pub const fn long_term(&self) -> &LongTermMemory {
        &self.ltm
    }

    /// Active configuration.
    pub const fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

/// The longest prefix of `text` with at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(index, _)| text.get(..index).unwrap_or(text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::backend::OfflineBackend;
    use crate::embedding::Embedding;

    /// Summarizes to a fixed text and embeds by keyword.
    struct KeywordBackend {
        summary: String,
        fail_summaries: AtomicBool,
    }

    impl KeywordBackend {
        fn new(summary: &str) -> Self {
            Self {
                summary: summary.to_owned(),
                fail_summaries: AtomicBool::new(false),
            }
        }
    }

    impl MemoryBackend for KeywordBackend {
        async fn summarize(&self, prompt: &str) -> Result<String, MemoryError> {
            assert!(prompt.starts_with(COMPACTION_PROMPT));
            if self.fail_summaries.load(Ordering::SeqCst) {
                return Err(MemoryError::Summarize(String::from("rate limited")));
            }
            Ok(self.summary.clone())
        }

        async fn embed(&self, text: &str) -> Result<Embedding, MemoryError> {
            let lower = text.to_lowercase();
            let sword = if lower.contains("sword") { 1.0 } else { 0.0 };
            let bread = if lower.contains("bread") { 1.0 } else { 0.0 };
            Ok(Embedding(vec![sword, bread, 0.1]))
        }
    }

    fn small_config() -> MemoryConfig {
        MemoryConfig {
            stm_max_messages: 6,
            stm_max_chars: 100,
            ltm_top_k: 5,
        }
    }

    #[tokio::test]
    async fn buffer_never_exceeds_message_bound() {
        let mut memory = AgentMemory::new(
            MemoryConfig {
                stm_max_messages: 3,
                stm_max_chars: 10_000,
                ltm_top_k: 5,
            },
            OfflineBackend,
        );
        for i in 0..10 {
            memory.remember(MessageRole::Human, format!("msg {i}")).await;
            assert!(memory.short_term().len() <= 3);
        }
    }

    #[tokio::test]
    async fn compaction_moves_summary_to_long_term() {
        let mut memory = AgentMemory::new(small_config(), KeywordBackend::new("forged a sword"));
        let first = memory.remember(MessageRole::Human, "a".repeat(60)).await;
        assert_eq!(first, CompactionOutcome::NotNeeded);

        let second = memory.remember(MessageRole::Ai, "b".repeat(60)).await;
        match second {
            CompactionOutcome::Compacted {
                before,
                after,
                embedded,
            } => {
                assert_eq!(before, 120);
                assert!(after < 100);
                assert!(embedded);
            }
            other => panic!("expected compaction, got {other:?}"),
        }
        assert_eq!(memory.long_term().len(), 1);
        assert_eq!(memory.short_term().len(), 2);
        assert_eq!(
            memory.long_term().documents().first().unwrap().metadata.inputs,
            "b".repeat(60)
        );
    }

    #[tokio::test]
    async fn oversized_summary_still_lands_below_threshold() {
        let mut memory = AgentMemory::new(small_config(), KeywordBackend::new(&"z".repeat(500)));
        memory.remember(MessageRole::Human, "x".repeat(120)).await;
        assert!(memory.short_term().total_weight() < memory.config().stm_max_chars);
        assert_eq!(memory.long_term().documents().first().unwrap().text.len(), 500);
    }

    #[tokio::test]
    async fn failed_compaction_leaves_buffer_untouched() {
        let backend = KeywordBackend::new("unused");
        backend.fail_summaries.store(true, Ordering::SeqCst);
        let mut memory = AgentMemory::new(small_config(), backend);
        let outcome = memory.remember(MessageRole::Human, "y".repeat(120)).await;
        assert!(matches!(outcome, CompactionOutcome::Skipped { .. }));
        assert_eq!(memory.short_term().total_weight(), 120);
        assert!(memory.long_term().is_empty());
    }

    #[tokio::test]
    async fn recall_ranks_by_similarity() {
        let mut memory = AgentMemory::new(small_config(), KeywordBackend::new("unused"));
        memory.import(MemorySnapshot {
            stm: vec![MemoryMessage::now(MessageRole::Human, "hello")],
            ltm_documents: vec![
                document("baked bread", Some(vec![0.0, 1.0, 0.1])),
                document("sharpened a sword", Some(vec![1.0, 0.0, 0.1])),
            ],
        });

        let recall = memory.recall("where is my sword").await;
        assert_eq!(recall.recent_messages.len(), 1);
        assert!(recall.long_term_summary.starts_with("sharpened a sword"));
        assert!(recall.long_term_summary.contains("\n\nbaked bread"));
    }

    #[tokio::test]
    async fn recall_falls_back_to_substring_without_embeddings() {
        let mut memory = AgentMemory::new(small_config(), OfflineBackend);
        memory.import(MemorySnapshot {
            stm: Vec::new(),
            ltm_documents: vec![
                document("Traded WOOD with the merchant", None),
                document("Rested at the inn", None),
            ],
        });
        let recall = memory.recall("wood").await;
        assert_eq!(recall.long_term_summary, "Traded WOOD with the merchant");
        assert!(memory.recall("").await.long_term_summary.is_empty());
    }

    #[tokio::test]
    async fn export_import_round_trips_exactly() {
        let mut memory = AgentMemory::new(small_config(), KeywordBackend::new("sword talk"));
        memory.remember(MessageRole::Human, "q".repeat(105)).await;
        memory.remember(MessageRole::Ai, "short").await;

        let json = memory.export().to_json().unwrap();
        let mut restored = AgentMemory::new(small_config(), OfflineBackend);
        restored.import(MemorySnapshot::from_json(&json).unwrap());
        assert_eq!(restored.export(), memory.export());
    }

    #[tokio::test]
    async fn backfill_embeds_missing_vectors() {
        let mut memory = AgentMemory::new(small_config(), KeywordBackend::new("unused"));
        memory.import(MemorySnapshot {
            stm: Vec::new(),
            ltm_documents: vec![document("bread", None), document("sword", Some(vec![1.0]))],
        });
        assert_eq!(memory.backfill_embeddings().await, 1);
        assert!(memory.long_term().documents().iter().all(|d| d.embedding.is_some()));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    fn document(text: &str, embedding: Option<Vec<f32>>) -> LtmDocument {
        LtmDocument {
            text: text.to_owned(),
            metadata: DocumentMetadata {
                inputs: String::new(),
                outputs: text.to_owned(),
                timestamp: chrono::Utc::now(),
            },
            embedding: embedding.map(Embedding),
        }
    }
}
