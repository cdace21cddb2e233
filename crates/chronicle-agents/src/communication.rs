//! Publish/subscribe message routing between agents.
//!
//! The [`CommsChannel`] is the central dispatcher. Every message is kept in
//! a bounded history for audit, and delivered synchronously to subscribers:
//!
//! - `global` messages go to every subscriber except the sender,
//! - direct messages go only to the subscriber whose id is the channel.
//!
//! Sending to an agent with no subscription is not an error; the message
//! still lands in the history.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use tracing::debug;

use chronicle_types::{AgentId, Channel, ChatMessage};

/// Default number of messages retained in history.
pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

/// Default number of messages returned by [`CommsChannel::recent_messages`].
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// A delivery callback registered for one agent.
pub type Subscriber = Box<dyn FnMut(&ChatMessage) + Send>;

// ---------------------------------------------------------------------------
// CommsChannel
// ---------------------------------------------------------------------------

/// Message router with a bounded history.
pub struct CommsChannel {
    subscribers: BTreeMap<AgentId, Subscriber>,
    history: VecDeque<ChatMessage>,
    history_limit: usize,
}

impl core::fmt::Debug for CommsChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommsChannel")
            .field("subscribers", &self.subscribers.keys().collect::<Vec<_>>())
            .field("history_len", &self.history.len())
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl Default for CommsChannel {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl CommsChannel {
    /// A router keeping at most `history_limit` messages (minimum 1).
    pub fn new(history_limit: usize) -> Self {
        Self {
            subscribers: BTreeMap::new(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Register the delivery callback for an agent, replacing any previous one.
    pub fn subscribe(&mut self, agent_id: AgentId, callback: Subscriber) {
        self.subscribers.insert(agent_id, callback);
    }

    /// Remove an agent's delivery callback. Returns whether one existed.
    pub fn unsubscribe(&mut self, agent_id: &AgentId) -> bool {
        self.subscribers.remove(agent_id).is_some()
    }

    /// Record a message and deliver it. Returns the number of subscribers
    /// it was delivered to.
    pub fn send_message(
        &mut self,
        sender: &AgentId,
        channel: Channel,
        content: impl Into<String>,
    ) -> usize {
        let message = ChatMessage {
            sender: sender.clone(),
            channel,
            content: content.into(),
            timestamp: Utc::now(),
        };

        let mut delivered: usize = 0;
        match &message.channel {
            Channel::Global => {
                for (agent_id, callback) in &mut self.subscribers {
                    if agent_id != sender {
                        callback(&message);
                        delivered = delivered.saturating_add(1);
                    }
                }
            }
            Channel::Direct(recipient) => {
                if let Some(callback) = self.subscribers.get_mut(recipient) {
                    callback(&message);
                    delivered = 1;
                }
            }
        }

        debug!(
            sender = %message.sender,
            channel = %message.channel,
            delivered,
            "Message routed"
        );

        self.history.push_back(message);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        delivered
    }

    /// The last `limit` messages an agent sent or could have received,
    /// oldest first.
    pub fn recent_messages(&self, agent_id: &AgentId, limit: usize) -> Vec<&ChatMessage> {
        let mut relevant: Vec<&ChatMessage> = self
            .history
            .iter()
            .rev()
            .filter(|m| m.channel.reaches(agent_id) || &m.sender == agent_id)
            .take(limit)
            .collect();
        relevant.reverse();
        relevant
    }

    /// The full retained history, oldest first.
    pub fn all_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether no message has been retained.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn inbox(comms: &mut CommsChannel, id: &str) -> Arc<Mutex<Vec<String>>> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        comms.subscribe(
            AgentId::new(id),
            Box::new(move |m: &ChatMessage| sink.lock().unwrap().push(m.content.clone())),
        );
        received
    }

    #[test]
    fn global_reaches_everyone_but_sender() {
        let mut comms = CommsChannel::default();
        let a = inbox(&mut comms, "a");
        let b = inbox(&mut comms, "b");
        let c = inbox(&mut comms, "c");

        let delivered = comms.send_message(&AgentId::new("a"), Channel::Global, "hello all");
        assert_eq!(delivered, 2);
        assert!(a.lock().unwrap().is_empty());
        assert_eq!(b.lock().unwrap().as_slice(), ["hello all"]);
        assert_eq!(c.lock().unwrap().as_slice(), ["hello all"]);
    }

    #[test]
    fn direct_reaches_only_recipient() {
        let mut comms = CommsChannel::default();
        let b = inbox(&mut comms, "b");
        let c = inbox(&mut comms, "c");

        let delivered = comms.send_message(&AgentId::new("a"), Channel::from("b"), "psst");
        assert_eq!(delivered, 1);
        assert_eq!(b.lock().unwrap().len(), 1);
        assert!(c.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribed_recipients_still_get_history() {
        let mut comms = CommsChannel::default();
        let delivered = comms.send_message(&AgentId::new("a"), Channel::from("ghost"), "anyone?");
        assert_eq!(delivered, 0);
        assert_eq!(comms.len(), 1);
    }

    #[test]
    fn recent_messages_filters_and_limits() {
        let mut comms = CommsChannel::default();
        let me = AgentId::new("me");
        comms.send_message(&AgentId::new("x"), Channel::Global, "g1");
        comms.send_message(&AgentId::new("x"), Channel::from("other"), "not mine");
        comms.send_message(&AgentId::new("x"), Channel::from("me"), "to me");
        comms.send_message(&me, Channel::from("x"), "from me");
        comms.send_message(&AgentId::new("x"), Channel::Global, "g2");

        let recent: Vec<_> = comms
            .recent_messages(&me, 3)
            .into_iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(recent, vec!["to me", "from me", "g2"]);
    }

    #[test]
    fn history_is_bounded() {
        let mut comms = CommsChannel::new(2);
        for i in 0..5 {
            comms.send_message(&AgentId::new("a"), Channel::Global, format!("m{i}"));
        }
        let kept: Vec<_> = comms.all_messages().map(|m| m.content.as_str()).collect();
        assert_eq!(kept, vec!["m3", "m4"]);
    }
}
