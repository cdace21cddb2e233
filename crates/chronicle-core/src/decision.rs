//! Decision provider trait and stub implementations.
//!
//! Once per day the scheduler asks every proactive agent's
//! [`DecisionProvider`] what it wants to do; inside a conversation chain it
//! asks the listener how it reacts. The trait abstracts the mechanism: an
//! LLM-backed agent, a scripted bot, or a test stub.
//!
//! Providers never fail from the scheduler's point of view. Whatever goes
//! wrong inside a provider must surface as the safe default
//! ([`Action::Rest`]); the scheduler additionally enforces a deadline on
//! [`DecisionProvider::decide`] and substitutes the same default when it
//! passes. Follow-up work that must not be cut short belongs in
//! [`DecisionProvider::settle`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use chronicle_types::{Action, WorldState};

/// One decision-provider call, reported back to the scheduler for the
/// world log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCallRecord {
    /// The prompt sent.
    pub prompt: String,
    /// The raw response, or the error text on failure.
    pub response: String,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
    /// Whether the call produced a usable response.
    pub success: bool,
}

/// A source of agent decisions.
///
/// `world` is a read-only view of the live world. `context` is `None` on
/// the daily path and carries a reaction prompt (a line of dialogue, or an
/// inspection report) otherwise.
pub trait DecisionProvider: Send {
    /// Decide on zero or more actions.
    fn decide<'a>(
        &'a mut self,
        world: &'a WorldState,
        context: Option<&'a str>,
    ) -> BoxFuture<'a, Vec<Action>>;

    /// Finish the work that follows a decision already returned by
    /// [`decide`](Self::decide), such as writing the exchange to memory.
    ///
    /// The scheduler awaits this after every decision that met its
    /// deadline, and never puts a deadline on it.
    fn settle(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    /// Take the call records accumulated since the last drain.
    fn drain_call_records(&mut self) -> Vec<AiCallRecord> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// StubDecisionProvider
// ---------------------------------------------------------------------------

/// A provider that always rests.
///
/// Used when no LLM backend is configured, so the daily cycle can run end
/// to end.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubDecisionProvider;

impl StubDecisionProvider {
    /// Create a new stub provider.
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionProvider for StubDecisionProvider {
    fn decide<'a>(
        &'a mut self,
        _world: &'a WorldState,
        _context: Option<&'a str>,
    ) -> BoxFuture<'a, Vec<Action>> {
        Box::pin(async { vec![Action::safe_default()] })
    }
}

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

/// A provider that replays a fixed script of replies.
///
/// Each call pops the next reply. Once the script runs out, every call
/// returns `fallback` (empty unless set). Every context the provider was
/// called with is recorded in a shared transcript, so callers can inspect
/// it after the provider has been handed to a simulation.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: VecDeque<Vec<Action>>,
    fallback: Vec<Action>,
    delay: Option<std::time::Duration>,
    transcript: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptedProvider {
    /// A provider replaying `script` in order.
    pub fn new(script: impl IntoIterator<Item = Vec<Action>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A provider that returns the same reply on every call.
    pub fn repeating(reply: Vec<Action>) -> Self {
        Self {
            fallback: reply,
            ..Self::default()
        }
    }

    /// Reply with `fallback` once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Vec<Action>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sleep before every reply, to exercise deadlines.
    #[must_use]
    pub const fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle to the shared transcript of received contexts.
    pub fn transcript(&self) -> Arc<Mutex<Vec<Option<String>>>> {
        Arc::clone(&self.transcript)
    }

    fn record(&self, context: Option<&str>) {
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.push(context.map(str::to_owned));
        }
    }
}

impl DecisionProvider for ScriptedProvider {
    fn decide<'a>(
        &'a mut self,
        _world: &'a WorldState,
        context: Option<&'a str>,
    ) -> BoxFuture<'a, Vec<Action>> {
        self.record(context);
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_always_rests() {
        let world = WorldState::default();
        let mut provider = StubDecisionProvider::new();
        assert_eq!(provider.decide(&world, None).await, vec![Action::Rest]);
        assert!(provider.drain_call_records().is_empty());
    }

    #[tokio::test]
    async fn scripted_provider_replays_then_falls_back() {
        let world = WorldState::default();
        let mut provider = ScriptedProvider::new([vec![Action::Forage], vec![]])
            .with_fallback(vec![Action::Rest]);
        let transcript = provider.transcript();

        assert_eq!(provider.decide(&world, None).await, vec![Action::Forage]);
        assert!(provider.decide(&world, Some("hello")).await.is_empty());
        assert_eq!(provider.decide(&world, None).await, vec![Action::Rest]);

        let seen = transcript.lock().unwrap().clone();
        assert_eq!(seen, vec![None, Some(String::from("hello")), None]);
    }
}
