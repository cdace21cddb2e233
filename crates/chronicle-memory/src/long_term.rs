//! Long-term memory: compacted summaries queried by cosine similarity,
//! with a case-insensitive substring fallback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;

/// Provenance of a long-term document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Representative input that triggered the compaction.
    pub inputs: String,
    /// The summary produced.
    pub outputs: String,
    /// When the document was created.
    pub timestamp: DateTime<Utc>,
}

/// One compacted summary.
///
/// Documents without an embedding remain reachable through substring
/// matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtmDocument {
    /// Summary text.
    pub text: String,
    /// Provenance.
    pub metadata: DocumentMetadata,
    /// Vector for similarity search, absent if embedding failed.
    pub embedding: Option<Embedding>,
}

/// Unordered store of compacted summaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTermMemory {
    documents: Vec<LtmDocument>,
}

impl LongTermMemory {
    /// An empty store.
    pub const fn new() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    /// Add a document.
    pub fn add(&mut self, document: LtmDocument) {
        self.documents.push(document);
    }

    /// Top-`k` documents by cosine similarity to `query`, best first.
    ///
    /// Documents that have no embedding cannot be ranked; if fewer than `k`
    /// ranked hits exist, unembedded documents whose text contains
    /// `query_text` fill the remaining slots.
    pub fn search_by_embedding(
        &self,
        query: &Embedding,
        query_text: &str,
        k: usize,
    ) -> Vec<&LtmDocument> {
        let mut scored: Vec<(f32, &LtmDocument)> = self
            .documents
            .iter()
            .filter_map(|doc| {
                doc.embedding
                    .as_ref()
                    .map(|embedding| (query.cosine_similarity(embedding), doc))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut hits: Vec<&LtmDocument> = scored.into_iter().take(k).map(|(_, doc)| doc).collect();
        if hits.len() < k {
            let needle = query_text.to_lowercase();
            let remaining = k.saturating_sub(hits.len());
            hits.extend(
                self.documents
                    .iter()
                    .filter(|doc| doc.embedding.is_none())
                    .filter(|doc| doc.text.to_lowercase().contains(&needle))
                    .take(remaining),
            );
        }
        hits
    }

    /// First `k` documents whose text contains `query`, ignoring case.
    pub fn search_by_substring(&self, query: &str, k: usize) -> Vec<&LtmDocument> {
        let needle = query.to_lowercase();
        self.documents
            .iter()
            .filter(|doc| doc.text.to_lowercase().contains(&needle))
            .take(k)
            .collect()
    }

    /// Replace the contents verbatim.
    pub fn restore(&mut self, documents: Vec<LtmDocument>) {
        self.documents = documents;
    }

    /// Mutable access to documents lacking an embedding.
    pub fn unembedded_mut(&mut self) -> impl Iterator<Item = &mut LtmDocument> {
        self.documents.iter_mut().filter(|doc| doc.embedding.is_none())
    }

    /// All documents in insertion order.
    pub fn documents(&self) -> &[LtmDocument] {
        &self.documents
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
