//! Chat messages routed through the communication channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// Wire name of the broadcast channel.
pub const GLOBAL_CHANNEL: &str = "global";

/// Where a chat message is delivered.
///
/// Serialized as a plain string: `"global"` or the recipient's agent id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Channel {
    /// Every subscriber except the sender.
    Global,
    /// Only the named agent.
    Direct(AgentId),
}

impl Channel {
    /// Whether an agent receives messages on this channel.
    pub fn reaches(&self, agent_id: &AgentId) -> bool {
        match self {
            Self::Global => true,
            Self::Direct(recipient) => recipient == agent_id,
        }
    }
}

impl From<String> for Channel {
    fn from(value: String) -> Self {
        if value == GLOBAL_CHANNEL {
            Self::Global
        } else {
            Self::Direct(AgentId::new(value))
        }
    }
}

impl From<&str> for Channel {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Global => Self::from(GLOBAL_CHANNEL),
            Channel::Direct(recipient) => recipient.0,
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Global => f.write_str(GLOBAL_CHANNEL),
            Self::Direct(recipient) => write!(f, "{recipient}"),
        }
    }
}

/// A message sent by one agent. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub sender: AgentId,
    /// Delivery channel.
    pub channel: Channel,
    /// Message text.
    pub content: String,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
}
