//! Conversation chains.
//!
//! A CHAT resolved on the daily path may turn into a back-and-forth. The
//! chain is an explicit loop over one exchange at a time:
//!
//! 1. stop if the chain has reached `max_chain_depth` exchanges;
//! 2. resolve the addressee with the fuzzy matcher;
//! 3. ask the listener's provider how it reacts to what was said;
//! 4. resolve every action in the reply, in order;
//! 5. continue with the listener as the new speaker if the reply held a
//!    CHAT, otherwise acknowledge the speaker and stop.
//!
//! Guardians answer once and never carry a chain further. Chains cost no
//! interaction budget beyond the opening CHAT.

use tracing::debug;

use chronicle_agents::find_agent;
use chronicle_types::{Action, AgentId, Archetype, Importance, LogDraft, LogKind};

use crate::runner::UpdateCallback;
use crate::scheduler::{DaySummary, Simulation};

/// Why a chain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd {
    /// The exchange cap was reached.
    DepthLimit,
    /// The addressee matched no agent.
    UnresolvedTarget,
    /// The speaker addressed itself.
    SelfAddressed,
    /// The addressee has no decision provider.
    ListenerSilent,
    /// A guardian gave its single reply.
    GuardianReplied,
    /// The listener replied without speaking and was made to acknowledge.
    Acknowledged,
}

impl ChainEnd {
    const fn describe(self) -> &'static str {
        match self {
            Self::DepthLimit => "reached its length limit",
            Self::UnresolvedTarget => "was addressed to no one",
            Self::SelfAddressed => "turned into a monologue",
            Self::ListenerSilent => "met silence",
            Self::GuardianReplied => "ended with a guardian's answer",
            Self::Acknowledged => "ended with an acknowledgment",
        }
    }
}

/// What one chain did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// Lines of dialogue in the chain, the opening CHAT included.
    pub exchanges: u32,
    /// Why it stopped.
    pub end: ChainEnd,
}

/// The line a listener is made to say when its reply holds no CHAT.
pub fn acknowledgment(speaker_name: &str) -> String {
    format!("I heard you, {speaker_name}.")
}

/// The prompt a listener reacts to. Guardians are asked for a brief,
/// majestic answer; everyone else may carry the conversation on or act.
pub fn reaction_prompt(
    speaker_name: &str,
    speaker_id: &AgentId,
    content: &str,
    listener: Archetype,
) -> String {
    let said = format!("{speaker_name} (id: {speaker_id}) says to you: \"{content}\".");
    match listener {
        Archetype::Guardian => format!(
            "{said} Answer briefly, with the majesty of a guardian, and do not repeat yourself."
        ),
        Archetype::Hero | Archetype::Townsfolk => format!(
            "{said} Respond naturally and vary your wording. You may continue the conversation or take another action."
        ),
    }
}

impl Simulation {
    /// Run the chain opened by `opener` saying `content` to `target`.
    ///
    /// The opening CHAT must already have been resolved.
    pub(crate) async fn run_chain(
        &mut self,
        opener: &AgentId,
        target: &str,
        content: &str,
        summary: &mut DaySummary,
        callback: &mut dyn UpdateCallback,
    ) -> ChainReport {
        let max_depth = self.config.scheduler.max_chain_depth;
        let mut speaker = opener.clone();
        let mut target = target.to_owned();
        let mut content = content.to_owned();
        let mut depth: u32 = 1;

        let end = loop {
            if depth >= max_depth {
                break ChainEnd::DepthLimit;
            }
            let Some(listener) = find_agent(&self.world, &target) else {
                break ChainEnd::UnresolvedTarget;
            };
            let listener_id = listener.id.clone();
            let listener_archetype = listener.archetype();
            let listener_is_guardian = listener_archetype == Archetype::Guardian;
            if listener_id == speaker {
                break ChainEnd::SelfAddressed;
            }
            if !self.providers.contains_key(&listener_id) {
                break ChainEnd::ListenerSilent;
            }

            let speaker_name = self.world.agent_name(speaker.as_str()).to_owned();
            let prompt = reaction_prompt(&speaker_name, &speaker, &content, listener_archetype);
            let reply = self.decide(&listener_id, Some(&prompt)).await;

            let mut next_line = None;
            for action in &reply {
                if next_line.is_none()
                    && let Action::Chat { target_id, content } = action
                {
                    next_line = Some((target_id.clone(), content.clone()));
                }
                self.resolve(&listener_id, action, summary, callback);
            }

            match next_line {
                None => {
                    let ack = Action::Chat {
                        target_id: speaker.to_string(),
                        content: acknowledgment(&speaker_name),
                    };
                    self.resolve(&listener_id, &ack, summary, callback);
                    depth = depth.saturating_add(1);
                    break ChainEnd::Acknowledged;
                }
                Some(_) if listener_is_guardian => {
                    depth = depth.saturating_add(1);
                    break ChainEnd::GuardianReplied;
                }
                Some((next_target, next_content)) => {
                    speaker = listener_id;
                    target = next_target;
                    content = next_content;
                    depth = depth.saturating_add(1);
                }
            }
        };

        let opener_name = self.world.agent_name(opener.as_str()).to_owned();
        let importance = match end {
            ChainEnd::GuardianReplied | ChainEnd::Acknowledged => Importance::Medium,
            _ => Importance::Low,
        };
        self.world.push_log(
            LogDraft::new(
                LogKind::Action,
                importance,
                format!(
                    "A conversation started by {opener_name} {} after {depth} exchanges",
                    end.describe()
                ),
            )
            .agent(opener)
            .tag("conversation")
            .tag(format!("{end:?}").to_ascii_lowercase()),
        );
        debug!(opener = %opener, exchanges = depth, end = ?end, "Conversation chain finished");

        ChainReport {
            exchanges: depth,
            end,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_types::{ChatMessage, WorldState};
    use chronicle_world::{add_agent, create_starting_world, guardian_status, hero_status};

    use super::*;
    use crate::config::SimulationConfig;
    use crate::decision::ScriptedProvider;
    use crate::runner::NoOpCallback;

    fn chat(target: &str, content: &str) -> Action {
        Action::Chat {
            target_id: target.to_owned(),
            content: content.to_owned(),
        }
    }

    fn world() -> WorldState {
        let mut world = create_starting_world();
        add_agent(
            &mut world,
            hero_status("hero_1", "Phainon", "burden", "city-of-dawn"),
        )
        .unwrap();
        add_agent(
            &mut world,
            hero_status("hero_2", "Mydei", "strife", "city-of-dawn"),
        )
        .unwrap();
        add_agent(
            &mut world,
            guardian_status("guardian_1", "Aquila", "sky", "city-of-dawn", None),
        )
        .unwrap();
        world
    }

    fn simulation(max_chain_depth: u32) -> Simulation {
        let mut config = SimulationConfig::default();
        config.scheduler.seed = Some(1);
        config.scheduler.max_chain_depth = max_chain_depth;
        Simulation::new(world(), config).unwrap()
    }

    async fn open(sim: &mut Simulation, from: &str, to: &str) -> ChainReport {
        let mut summary = DaySummary::default();
        let opener = AgentId::new(from);
        sim.resolve(&opener, &chat(to, "hello"), &mut summary, &mut NoOpCallback);
        sim.run_chain(&opener, to, "hello", &mut summary, &mut NoOpCallback)
            .await
    }

    fn delivered(sim: &Simulation) -> Vec<&ChatMessage> {
        sim.resolver().comms().all_messages().collect()
    }

    #[tokio::test]
    async fn ping_pong_stops_at_the_depth_limit() {
        let mut sim = simulation(6);
        sim.add_provider(
            AgentId::new("hero_1"),
            Box::new(ScriptedProvider::repeating(vec![chat("Mydei", "again")])),
        )
        .unwrap();
        sim.add_provider(
            AgentId::new("hero_2"),
            Box::new(ScriptedProvider::repeating(vec![chat("phainon", "again")])),
        )
        .unwrap();

        let report = open(&mut sim, "hero_1", "hero_2").await;
        assert_eq!(report.end, ChainEnd::DepthLimit);
        assert_eq!(report.exchanges, 6);
        assert_eq!(delivered(&sim).len(), 6);
    }

    #[tokio::test]
    async fn chains_never_exceed_the_limit() {
        for limit in 1..=4 {
            let mut sim = simulation(limit);
            for id in ["hero_1", "hero_2"] {
                let other = if id == "hero_1" { "hero_2" } else { "hero_1" };
                sim.add_provider(
                    AgentId::new(id),
                    Box::new(ScriptedProvider::repeating(vec![chat(other, "more")])),
                )
                .unwrap();
            }
            let report = open(&mut sim, "hero_1", "hero_2").await;
            assert!(report.exchanges <= limit);
        }
    }

    #[tokio::test]
    async fn silent_reply_is_acknowledged() {
        let mut sim = simulation(6);
        let listener = ScriptedProvider::repeating(vec![Action::Rest]);
        let transcript = listener.transcript();
        sim.add_provider(AgentId::new("hero_2"), Box::new(listener))
            .unwrap();

        let report = open(&mut sim, "hero_1", "Mydei").await;
        assert_eq!(report.end, ChainEnd::Acknowledged);
        assert_eq!(report.exchanges, 2);

        let prompt = transcript.lock().unwrap().first().cloned().flatten().unwrap();
        assert!(prompt.starts_with("Phainon (id: hero_1) says to you: \"hello\"."));
        assert!(prompt.contains("continue the conversation or take another action"));

        let last = delivered(&sim).last().copied().unwrap();
        assert_eq!(last.sender, AgentId::new("hero_2"));
        assert_eq!(last.content, "I heard you, Phainon.");
    }

    #[tokio::test]
    async fn guardians_answer_once() {
        let mut sim = simulation(6);
        let guardian = ScriptedProvider::repeating(vec![chat("hero_1", "Prove yourself.")]);
        let heard = guardian.transcript();
        sim.add_provider(AgentId::new("guardian_1"), Box::new(guardian))
            .unwrap();
        let hero = ScriptedProvider::repeating(vec![chat("guardian_1", "I will.")]);
        let transcript = hero.transcript();
        sim.add_provider(AgentId::new("hero_1"), Box::new(hero))
            .unwrap();

        let report = open(&mut sim, "hero_1", "aquila").await;
        assert_eq!(report.end, ChainEnd::GuardianReplied);
        assert_eq!(report.exchanges, 2);
        assert!(transcript.lock().unwrap().is_empty());

        let prompt = heard.lock().unwrap().first().cloned().flatten().unwrap();
        assert!(prompt.contains("majesty of a guardian"));
        assert!(!prompt.contains("continue the conversation"));
    }

    #[tokio::test]
    async fn reply_side_actions_run_immediately() {
        let mut sim = simulation(6);
        sim.add_provider(
            AgentId::new("hero_2"),
            Box::new(ScriptedProvider::new([vec![
                Action::Forage,
                chat("hero_1", "Found food!"),
            ]])),
        )
        .unwrap();
        let report = open(&mut sim, "hero_1", "hero_2").await;
        // hero_1 has no provider, so the chain stops after Mydei's reply.
        assert_eq!(report.end, ChainEnd::ListenerSilent);
        assert!(sim.world().agents.get("hero_2").unwrap().held("food") >= 1);
    }

    #[tokio::test]
    async fn unresolved_and_self_targets_end_quietly() {
        let mut sim = simulation(6);
        assert_eq!(
            open(&mut sim, "hero_1", "nobody at all").await.end,
            ChainEnd::UnresolvedTarget
        );
        assert_eq!(
            open(&mut sim, "hero_1", "Phainon").await.end,
            ChainEnd::SelfAddressed
        );
    }
}
