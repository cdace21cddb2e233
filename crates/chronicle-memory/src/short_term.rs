//! Short-term memory: a bounded FIFO buffer of recent messages.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use chronicle_types::MessageRole;
use serde::{Deserialize, Serialize};

/// Content of the human half of the placeholder pair seeded after compaction.
pub const SUMMARY_PLACEHOLDER: &str = "Previous conversation summary";

/// One message in short-term memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMessage {
    /// Message text.
    pub content: String,
    /// Who produced the message.
    pub role: MessageRole,
    /// When the message was recorded.
    pub timestamp: DateTime<Utc>,
}

impl MemoryMessage {
    /// A message stamped with the current time.
    pub fn now(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }

    /// Length used as the token proxy for compaction decisions.
    pub fn weight(&self) -> usize {
        self.content.chars().count()
    }
}

/// Bounded buffer of recent messages. Oldest entries are evicted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortTermMemory {
    messages: VecDeque<MemoryMessage>,
    max_messages: usize,
}

impl ShortTermMemory {
    /// An empty buffer holding at most `max_messages` entries (minimum 2, so
    /// the post-compaction placeholder pair always fits).
    pub fn new(max_messages: usize) -> Self {
        let max_messages = max_messages.max(2);
        Self {
            messages: VecDeque::with_capacity(max_messages),
            max_messages,
        }
    }

    /// Append a message, evicting the oldest entries past the bound.
    pub fn push(&mut self, message: MemoryMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// Total content length across all messages.
    pub fn total_weight(&self) -> usize {
        self.messages
            .iter()
            .map(MemoryMessage::weight)
            .fold(0_usize, usize::saturating_add)
    }

    /// Render the buffer as `role: content` lines for summarization.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replace the contents with the placeholder pair carrying a summary.
    pub fn seed_with_summary(&mut self, summary: &str) {
        self.messages.clear();
        self.push(MemoryMessage::now(MessageRole::Human, SUMMARY_PLACEHOLDER));
        self.push(MemoryMessage::now(MessageRole::Ai, summary));
    }

    /// Replace the contents verbatim, keeping only the newest entries that
    /// fit the bound.
    pub fn restore(&mut self, messages: Vec<MemoryMessage>) {
        self.messages = messages.into();
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&MemoryMessage> {
        self.messages.back()
    }

    /// Messages oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &MemoryMessage> {
        self.messages.iter()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Configured bound.
    pub const fn max_messages(&self) -> usize {
        self.max_messages
    }
}
