//! Error types for the chronicle-memory crate.
//!
//! None of these are fatal to a simulation: compaction failures leave the
//! short-term buffer untouched and embedding failures fall back to
//! substring search.

/// Errors that can occur while compacting, embedding, or restoring memory.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The summarization call failed.
    #[error("summarization failed: {0}")]
    Summarize(String),

    /// The embedding call failed.
    #[error("embedding failed: {0}")]
    Embed(String),

    /// The backend has no model behind it.
    #[error("memory backend unavailable")]
    Unavailable,

    /// A memory snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {source}")]
    Serde {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
