//! The daily cycle: `DayStart -> PerAgentTurn* -> WorldEvolution -> DayEnd
//! -> LogRetention`.
//!
//! Day end is logged before retention, not after it, so the closing entry
//! of a day is never trimmed away on that same day.
//!
//! 1. **Day start** -- advance the day counter and log the new day.
//!
//! 2. **Turns** -- every agent with a decision provider, in a freshly
//!    shuffled order. Guardians are skipped: they only speak when spoken to
//!    inside a conversation chain. Each turn asks the provider for actions
//!    (under a deadline, falling back to REST) and resolves them one by one
//!    against the day's interaction budget. The budget is checked before
//!    each action; once it is spent, the rest of the day's actions are
//!    dropped. A CHAT may open a conversation chain; an INSPECT hands its
//!    report back to the inspector for an immediate follow-up decision.
//!    After each decision the provider is given the chance to settle
//!    (memory write-back) with no deadline.
//!
//! 3. **World evolution** -- passive corruption spread, regeneration, and
//!    prosperity drift, then the world event generator.
//!
//! 4. **Day end** -- log the end of the day.
//!
//! 5. **Log retention** -- trim the world log back under its cap and report
//!    a [`DaySummary`].
//!
//! Turns run strictly one after another. The only suspension points are
//! provider calls (decide, then settle), and the world is never touched
//! while one is pending.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::json;
use tracing::{debug, info, warn};

use chronicle_agents::{Resolver, find_agent};
use chronicle_types::{Action, AgentId, Archetype, Importance, LogDraft, LogKind, WorldState};
use chronicle_world::{evolve, validate_world};

use crate::config::SimulationConfig;
use crate::decision::{AiCallRecord, DecisionProvider};
use crate::error::CoreError;
use crate::events::{EventGenerator, GENERATOR_ID};
use crate::retention::trim_logs;
use crate::runner::{SimulationUpdate, UpdateCallback};

/// Characters of prompt and response kept in an AI call log entry.
const AI_CALL_PREVIEW_CHARS: usize = 200;

/// What one day did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaySummary {
    /// The day that ran.
    pub day: u64,
    /// Agents that took a proactive turn.
    pub turns_taken: u32,
    /// Actions passed to the resolver, including chain replies and
    /// generator output.
    pub actions_resolved: u32,
    /// Interaction budget consumed. The action that crosses the budget is
    /// still charged in full, so this can exceed it.
    pub budget_spent: u32,
    /// Whether the budget ran out before every turn finished.
    pub budget_exhausted: bool,
    /// Conversation chains run.
    pub chains: u32,
    /// World events that started at the end of the day.
    pub events_started: u32,
    /// World events that ended at the end of the day.
    pub events_ended: u32,
    /// Log entries removed by retention.
    pub logs_trimmed: usize,
}

/// A running simulation: the world plus everything allowed to change it.
///
/// The world is owned here and mutated only by the resolver and the event
/// generator. Providers and callbacks see it read-only.
pub struct Simulation {
    pub(crate) world: WorldState,
    pub(crate) resolver: Resolver,
    pub(crate) providers: BTreeMap<AgentId, Box<dyn DecisionProvider>>,
    pub(crate) events: EventGenerator,
    pub(crate) config: SimulationConfig,
    pub(crate) rng: StdRng,
}

impl core::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Simulation")
            .field("day", &self.world.day)
            .field("agents", &self.world.agents.len())
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Wrap a validated world.
    ///
    /// The RNG is seeded from `config.scheduler.seed` when set, otherwise
    /// from the operating system.
    pub fn new(world: WorldState, config: SimulationConfig) -> Result<Self, CoreError> {
        config.validate()?;
        validate_world(&world)?;
        let rng = config
            .scheduler
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Ok(Self {
            world,
            resolver: Resolver::default(),
            providers: BTreeMap::new(),
            events: EventGenerator::new(config.events.clone()),
            config,
            rng,
        })
    }

    /// Register the decision provider for an agent already in the world.
    pub fn add_provider(
        &mut self,
        agent_id: AgentId,
        provider: Box<dyn DecisionProvider>,
    ) -> Result<(), CoreError> {
        if !self.world.agents.contains(agent_id.as_str()) {
            return Err(CoreError::UnknownAgent(agent_id));
        }
        if self.providers.contains_key(&agent_id) {
            return Err(CoreError::DuplicateProvider(agent_id));
        }
        self.providers.insert(agent_id, provider);
        Ok(())
    }

    /// Replace the world event generator.
    pub fn set_event_generator(&mut self, generator: EventGenerator) {
        self.events = generator;
    }

    /// Read-only view of the world.
    pub const fn world(&self) -> &WorldState {
        &self.world
    }

    /// The configuration in force.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The resolver, for inspecting chat history.
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Mutable access to the resolver, for subscribing to chat.
    pub const fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Consume the simulation and return its world.
    pub fn into_world(self) -> WorldState {
        self.world
    }

    // -----------------------------------------------------------------------
    // Daily cycle
    // -----------------------------------------------------------------------

    /// Run one full day.
    pub async fn run_day(&mut self, callback: &mut dyn UpdateCallback) -> DaySummary {
        // Stage 1: day start.
        self.world.day = self.world.day.saturating_add(1);
        let day = self.world.day;
        let mut summary = DaySummary {
            day,
            ..DaySummary::default()
        };
        self.world.push_log(
            LogDraft::new(LogKind::Action, Importance::High, format!("Day {day} begins"))
                .tag("day_start"),
        );
        info!(day, "Day started");
        callback.on_update(&SimulationUpdate::DayStarted { day }, &self.world);

        // Stage 2: agent turns.
        self.run_turns(&mut summary, callback).await;

        // Stage 3: world evolution and events.
        let evolution = evolve(&mut self.world, &self.config.evolution, &mut self.rng);
        debug!(
            day,
            areas_spread = evolution.corruption_gain.len(),
            cities_regenerated = evolution.regeneration.len(),
            "Evolution applied"
        );
        let cycle = self.events.run_cycle(&mut self.world, &mut self.rng);
        let generator = AgentId::new(GENERATOR_ID);
        for action in &cycle.actions {
            self.resolve(&generator, action, &mut summary, callback);
        }
        summary.events_started = saturating_u32(cycle.started.len());
        summary.events_ended = saturating_u32(cycle.ended.len());

        // Stage 4: day end.
        self.world.push_log(
            LogDraft::new(LogKind::Action, Importance::High, format!("Day {day} ends"))
                .tag("day_end")
                .metadata(json!({
                    "actionsResolved": summary.actions_resolved,
                    "budgetSpent": summary.budget_spent,
                    "chains": summary.chains,
                })),
        );

        // Stage 5: log retention. Runs last so the cap holds between days.
        summary.logs_trimmed = trim_logs(&mut self.world.logs, &self.config.retention);
        if summary.logs_trimmed > 0 {
            debug!(day, removed = summary.logs_trimmed, "World log trimmed");
        }

        info!(
            day,
            turns = summary.turns_taken,
            actions = summary.actions_resolved,
            budget_spent = summary.budget_spent,
            budget_exhausted = summary.budget_exhausted,
            chains = summary.chains,
            "Day ended"
        );
        callback.on_update(
            &SimulationUpdate::DayEnded {
                summary: summary.clone(),
            },
            &self.world,
        );
        summary
    }

    async fn run_turns(&mut self, summary: &mut DaySummary, callback: &mut dyn UpdateCallback) {
        let mut order: Vec<AgentId> = self.providers.keys().cloned().collect();
        order.shuffle(&mut self.rng);
        let budget = self.config.scheduler.interaction_budget;

        'turns: for agent_id in order {
            let name = self.world.agent_name(agent_id.as_str()).to_owned();
            match self.world.agents.archetype_of(agent_id.as_str()) {
                Some(Archetype::Guardian) => {
                    self.world.push_log(
                        LogDraft::new(
                            LogKind::Action,
                            Importance::Low,
                            format!("{name} watches in silence"),
                        )
                        .agent(&agent_id)
                        .tag("turn_skipped"),
                    );
                    continue;
                }
                None => continue,
                Some(_) => {}
            }

            summary.turns_taken = summary.turns_taken.saturating_add(1);
            self.world.push_log(
                LogDraft::new(
                    LogKind::Action,
                    Importance::Medium,
                    format!("{name} starts deciding"),
                )
                .agent(&agent_id)
                .tag("turn_start"),
            );

            let mut queue: VecDeque<Action> = self.decide(&agent_id, None).await.into();
            while let Some(action) = queue.pop_front() {
                if summary.budget_spent >= budget {
                    summary.budget_exhausted = true;
                    self.world.push_log(
                        LogDraft::new(
                            LogKind::Action,
                            Importance::Medium,
                            format!(
                                "Interaction budget exhausted; {name}'s {} and all remaining turns are skipped",
                                action.kind()
                            ),
                        )
                        .tag("budget_exhausted"),
                    );
                    info!(day = self.world.day, agent_id = %agent_id, "Interaction budget exhausted");
                    break 'turns;
                }
                let cost = if action.is_chat() {
                    self.config.scheduler.chat_cost
                } else {
                    self.config.scheduler.action_cost
                };
                summary.budget_spent = summary.budget_spent.saturating_add(cost);
                self.dispatch(&agent_id, &action, &mut queue, summary, callback)
                    .await;
            }
        }
    }

    /// Resolve one action from a turn and run whatever it sets off.
    async fn dispatch(
        &mut self,
        agent_id: &AgentId,
        action: &Action,
        queue: &mut VecDeque<Action>,
        summary: &mut DaySummary,
        callback: &mut dyn UpdateCallback,
    ) {
        let reply = self.resolve(agent_id, action, summary, callback);
        match action {
            Action::Chat { target_id, content } => {
                if find_agent(&self.world, target_id).is_some() {
                    summary.chains = summary.chains.saturating_add(1);
                    self.run_chain(agent_id, target_id, content, summary, callback)
                        .await;
                }
            }
            Action::Inspect { target_id } => {
                if let Some(report) = reply {
                    let prompt = format!("You inspected {target_id} and got: {report}");
                    let follow_up = self.decide(agent_id, Some(&prompt)).await;
                    for next in follow_up.into_iter().rev() {
                        queue.push_front(next);
                    }
                }
            }
            _ => {}
        }
    }

    /// Pass one action to the resolver and notify the callback.
    pub(crate) fn resolve(
        &mut self,
        actor: &AgentId,
        action: &Action,
        summary: &mut DaySummary,
        callback: &mut dyn UpdateCallback,
    ) -> Option<String> {
        let reply = self
            .resolver
            .apply(&mut self.world, actor, action, &mut self.rng);
        summary.actions_resolved = summary.actions_resolved.saturating_add(1);
        callback.on_update(
            &SimulationUpdate::ActionResolved {
                agent_id: actor.clone(),
                kind: action.kind().to_owned(),
            },
            &self.world,
        );
        reply
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    /// Ask an agent's provider for actions under the configured deadline.
    ///
    /// A missing provider yields no actions. A provider that misses the
    /// deadline yields the safe default. The deadline covers the decision
    /// only; a provider that answered in time is then settled without one.
    pub(crate) async fn decide(&mut self, agent_id: &AgentId, context: Option<&str>) -> Vec<Action> {
        let deadline = Duration::from_millis(self.config.scheduler.decision_timeout_ms);
        let Some(provider) = self.providers.get_mut(agent_id) else {
            return Vec::new();
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(deadline, provider.decide(&self.world, context)).await;
        if outcome.is_ok() {
            provider.settle().await;
        }
        let records = provider.drain_call_records();
        self.log_call_records(agent_id, records);

        match outcome {
            Ok(actions) => {
                debug!(
                    agent_id = %agent_id,
                    actions = actions.len(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Decision received"
                );
                actions
            }
            Err(_elapsed) => {
                warn!(
                    agent_id = %agent_id,
                    timeout_ms = self.config.scheduler.decision_timeout_ms,
                    "Decision timed out, falling back to rest"
                );
                let name = self.world.agent_name(agent_id.as_str()).to_owned();
                self.world.push_log(
                    LogDraft::new(
                        LogKind::Action,
                        Importance::Low,
                        format!("{name} could not decide in time and rests instead"),
                    )
                    .agent(agent_id)
                    .tag("decision_timeout"),
                );
                vec![Action::safe_default()]
            }
        }
    }

    fn log_call_records(&mut self, agent_id: &AgentId, records: Vec<AiCallRecord>) {
        for record in records {
            let name = self.world.agent_name(agent_id.as_str()).to_owned();
            let verdict = if record.success { "answered" } else { "failed" };
            self.world.push_log(
                LogDraft::new(
                    LogKind::AiCall,
                    Importance::Low,
                    format!("Decision call for {name} {verdict} in {} ms", record.duration_ms),
                )
                .agent(agent_id)
                .tag("ai_call")
                .metadata(json!({
                    "prompt": preview(&record.prompt),
                    "response": preview(&record.response),
                    "durationMs": record.duration_ms,
                    "success": record.success,
                })),
            );
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(AI_CALL_PREVIEW_CHARS).collect()
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_types::{AgentId, CityId};
    use chronicle_world::{add_agent, create_starting_world, guardian_status, hero_status};

    use super::*;
    use crate::config::EventsConfig;
    use crate::decision::{ScriptedProvider, StubDecisionProvider};
    use crate::runner::NoOpCallback;

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.scheduler.seed = Some(7);
        config.events = EventsConfig {
            enabled: false,
            ..EventsConfig::default()
        };
        config
    }

    fn world_with_hero() -> WorldState {
        let mut world = create_starting_world();
        add_agent(
            &mut world,
            hero_status("hero_1", "Phainon", "burden", "city-of-dawn"),
        )
        .unwrap();
        world
    }

    #[test]
    fn providers_must_match_agents() {
        let mut sim = Simulation::new(world_with_hero(), config()).unwrap();
        assert!(
            sim.add_provider(AgentId::new("hero_1"), Box::new(StubDecisionProvider))
                .is_ok()
        );
        assert!(matches!(
            sim.add_provider(AgentId::new("hero_1"), Box::new(StubDecisionProvider)),
            Err(CoreError::DuplicateProvider(_))
        ));
        assert!(matches!(
            sim.add_provider(AgentId::new("ghost"), Box::new(StubDecisionProvider)),
            Err(CoreError::UnknownAgent(_))
        ));
    }

    #[tokio::test]
    async fn day_boundaries_are_logged() {
        let mut sim = Simulation::new(world_with_hero(), config()).unwrap();
        sim.add_provider(AgentId::new("hero_1"), Box::new(StubDecisionProvider))
            .unwrap();
        let summary = sim.run_day(&mut NoOpCallback).await;
        assert_eq!(summary.day, 1);
        assert_eq!(summary.turns_taken, 1);
        assert_eq!(summary.actions_resolved, 1);
        let messages: Vec<&str> = sim.world().logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages.first().copied(), Some("Day 1 begins"));
        assert_eq!(messages.last().copied(), Some("Day 1 ends"));
    }

    #[tokio::test]
    async fn day_end_survives_its_own_trim() {
        let mut config = config();
        config.retention.max_logs = 3;
        let mut sim = Simulation::new(world_with_hero(), config).unwrap();
        sim.add_provider(AgentId::new("hero_1"), Box::new(StubDecisionProvider))
            .unwrap();
        let summary = sim.run_day(&mut NoOpCallback).await;
        assert!(summary.logs_trimmed > 0);
        assert!(sim.world().logs.len() <= 3);
        let last = sim.world().logs.last().unwrap();
        assert_eq!(last.message, "Day 1 ends");
    }

    #[tokio::test]
    async fn guardians_take_no_turn() {
        let mut world = world_with_hero();
        add_agent(
            &mut world,
            guardian_status("guardian_1", "Aquila", "sky", "city-of-dawn", None),
        )
        .unwrap();
        let guardian = ScriptedProvider::repeating(vec![Action::Forage]);
        let transcript = guardian.transcript();
        let mut sim = Simulation::new(world, config()).unwrap();
        sim.add_provider(AgentId::new("guardian_1"), Box::new(guardian))
            .unwrap();
        let summary = sim.run_day(&mut NoOpCallback).await;
        assert_eq!(summary.turns_taken, 0);
        assert!(transcript.lock().unwrap().is_empty());
        assert!(sim.world().logs.iter().any(|l| l.tags.iter().any(|t| t == "turn_skipped")));
    }

    #[tokio::test]
    async fn inspect_report_feeds_a_follow_up_decision() {
        let mut world = world_with_hero();
        add_agent(
            &mut world,
            hero_status("hero_2", "Mydei", "strife", "city-of-dawn"),
        )
        .unwrap();
        let provider = ScriptedProvider::new([
            vec![Action::Inspect {
                target_id: AgentId::new("hero_2"),
            }],
            vec![Action::Move {
                target_city: CityId::new("mystic-grove"),
            }],
        ]);
        let transcript = provider.transcript();
        let mut sim = Simulation::new(world, config()).unwrap();
        sim.add_provider(AgentId::new("hero_1"), Box::new(provider))
            .unwrap();
        sim.run_day(&mut NoOpCallback).await;

        let calls = transcript.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert!(calls.first().unwrap().is_none());
        assert!(
            calls
                .get(1)
                .unwrap()
                .as_deref()
                .unwrap()
                .starts_with("You inspected hero_2 and got: ")
        );
        assert_eq!(
            sim.world().agents.get("hero_1").unwrap().location,
            CityId::new("mystic-grove")
        );
    }

    #[tokio::test]
    async fn seeded_runs_are_reproducible() {
        async fn run() -> Vec<String> {
            let mut world = world_with_hero();
            add_agent(
                &mut world,
                hero_status("hero_2", "Mydei", "strife", "ember-forges"),
            )
            .unwrap();
            let mut sim = Simulation::new(world, config()).unwrap();
            for id in ["hero_1", "hero_2"] {
                sim.add_provider(
                    AgentId::new(id),
                    Box::new(ScriptedProvider::repeating(vec![Action::Forage])),
                )
                .unwrap();
            }
            sim.run_day(&mut NoOpCallback).await;
            sim.world().logs.iter().map(|l| l.message.clone()).collect()
        }
        assert_eq!(run().await, run().await);
    }

    #[test]
    fn previews_are_truncated_by_characters() {
        let long = "é".repeat(300);
        assert_eq!(preview(&long).chars().count(), AI_CALL_PREVIEW_CHARS);
    }
}
