//! Two-tier agent memory for the Chronicle simulation.
//!
//! Each agent owns one [`AgentMemory`]:
//!
//! - [`short_term`] -- a bounded FIFO buffer of recent messages
//! - [`long_term`] -- compacted summaries recalled by cosine similarity
//! - [`memory`] -- the combined memory with compaction, recall, and
//!   export/import
//! - [`backend`] -- the summarize/embed calls memory depends on
//! - [`embedding`] -- dense vectors and cosine similarity

pub mod backend;
pub mod embedding;
pub mod error;
pub mod long_term;
pub mod memory;
pub mod short_term;

pub use backend::{COMPACTION_PROMPT, MemoryBackend, OfflineBackend};
pub use embedding::Embedding;
pub use error::MemoryError;
pub use long_term::{DocumentMetadata, LongTermMemory, LtmDocument};
pub use memory::{AgentMemory, CompactionOutcome, MemoryConfig, MemorySnapshot, Recall};
pub use short_term::{MemoryMessage, SUMMARY_PLACEHOLDER, ShortTermMemory};
