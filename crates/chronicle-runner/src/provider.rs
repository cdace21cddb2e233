//! The LLM-backed decision provider.
//!
//! One provider per agent. Each decision:
//!
//! 1. renders the world context for the agent;
//! 2. recalls memory relevant to the reaction prompt or the day;
//! 3. renders the persona, situation, memory and action menu;
//! 4. asks the model for a forced `perform_actions` call;
//! 5. parses the arguments into actions.
//!
//! Writing the exchange back into memory, which may compact it, happens in
//! [`DecisionProvider::settle`] so that a slow summarization never eats into
//! the decision deadline. A decision still pending write-back when the
//! next one starts is written back first.
//!
//! Any failure along the way becomes `[REST]`. A reply without a tool call
//! is a deliberate "do nothing" and yields no actions.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, warn};

use chronicle_core::{AiCallRecord, DecisionProvider, build_world_context};
use chronicle_memory::{AgentMemory, MemoryBackend, MemoryConfig, Recall};
use chronicle_types::{Action, AgentId, AgentStatus, ArchetypeProfile, MessageRole, WorldState};
use chronicle_world::role_profile;

use crate::error::RunnerError;
use crate::llm::LlmClient;
use crate::memory_backend::LlmMemoryBackend;
use crate::parse::parse_actions;
use crate::prompt::{PromptEngine, RenderedPrompt};

/// Something that answers a rendered prompt with `perform_actions`
/// arguments.
pub trait DecisionModel: Send + Sync {
    /// The raw tool arguments, or `None` if the model declined to call the
    /// tool.
    fn choose(
        &self,
        prompt: &RenderedPrompt,
    ) -> impl Future<Output = Result<Option<String>, RunnerError>> + Send;
}

impl DecisionModel for LlmClient {
    async fn choose(&self, prompt: &RenderedPrompt) -> Result<Option<String>, RunnerError> {
        self.complete_with_tool(prompt).await
    }
}

// ---------------------------------------------------------------------------
// Prompt context
// ---------------------------------------------------------------------------

const HERO_ACTIONS: &[&str] = &[
    "MOVE (targetCity): travel to another city",
    "INSPECT (targetId): size up another agent",
    "CHAT (targetId, content): speak to someone by id or name",
    "NEGOTIATE (targetId, proposal): put a proposal to someone",
    "FORM_ALLIANCE (targetId): become allies",
    "ATTACK (targetId, power): fight",
    "BUILD_DEFENSE (cityId, defenseType WALL|WATCHTOWER): fortify the city you are in",
    "FORAGE: look for food",
    "GATHER_RESOURCES (resource WOOD|STONE|MANA_CRYSTAL|FOOD): draw from the city's stock",
    "CRAFT_ITEM (itemName, materials): make gear from a recipe",
    "TRADE (targetId, offer, request): swap goods with someone in your city",
    "GIFT (targetId, items, resources): give to someone in your city",
    "CLEANSE_CORRUPTION (areaId, power): push back corruption at the cost of hp",
    "USE_ABILITY (abilityName, targetId): use one of your abilities",
    "REST: recover hp",
];

const GUARDIAN_ACTIONS: &[&str] = &[
    "CHAT (targetId, content): answer a challenger",
    "INSPECT (targetId): size up a challenger",
    "ATTACK (targetId, power): strike down the unworthy",
    "USE_ABILITY (abilityName, targetId): wield your domain",
    "REST: return to silence",
];

const TOWNSFOLK_ACTIONS: &[&str] = &[
    "MOVE (targetCity): travel to another city",
    "CHAT (targetId, content): speak to someone by id or name",
    "NEGOTIATE (targetId, proposal): put a proposal to someone",
    "FORAGE: look for food",
    "GATHER_RESOURCES (resource WOOD|STONE|MANA_CRYSTAL|FOOD): draw from the city's stock",
    "CRAFT_ITEM (itemName, materials): make goods from a recipe",
    "TRADE (targetId, offer, request): swap goods with someone in your city",
    "GIFT (targetId, items, resources): give to someone in your city",
    "BUILD_DEFENSE (cityId, defenseType WALL|WATCHTOWER): fortify the city you are in",
    "REST: take a break",
];

#[derive(Serialize)]
struct PromptContext<'a> {
    name: &'a str,
    id: &'a str,
    archetype: String,
    calling: String,
    skills: Vec<String>,
    urgent: Option<&'a str>,
    world_context: &'a str,
    status: StatusView<'a>,
    memory: MemoryView,
    actions: &'static [&'static str],
}

#[derive(Serialize)]
struct StatusView<'a> {
    location: &'a str,
    hp: u32,
    max_hp: u32,
    power: u32,
    inventory: &'a std::collections::BTreeMap<String, u32>,
    allies: Vec<&'a str>,
}

#[derive(Serialize)]
struct MemoryView {
    long_term: String,
    recent: Vec<String>,
}

impl<'a> PromptContext<'a> {
    fn new(
        status: &'a AgentStatus,
        world_context: &'a str,
        urgent: Option<&'a str>,
        recall: Recall,
    ) -> Self {
        let (calling, skills, actions) = match &status.profile {
            ArchetypeProfile::Hero { path, .. } => (path.clone(), Vec::new(), HERO_ACTIONS),
            ArchetypeProfile::Guardian { domain, .. } => {
                (domain.clone(), Vec::new(), GUARDIAN_ACTIONS)
            }
            ArchetypeProfile::Townsfolk {
                role, occupation, ..
            } => role_profile(*role).map_or_else(
                || (occupation.clone(), Vec::new(), TOWNSFOLK_ACTIONS),
                |p| (p.title.clone(), p.skills.clone(), TOWNSFOLK_ACTIONS),
            ),
        };

        Self {
            name: &status.name,
            id: status.id.as_str(),
            archetype: status.archetype().to_string(),
            calling,
            skills,
            urgent,
            world_context,
            status: StatusView {
                location: status.location.as_str(),
                hp: status.hp,
                max_hp: status.max_hp,
                power: status.power,
                inventory: &status.inventory,
                allies: status.allies.iter().map(AgentId::as_str).collect(),
            },
            memory: MemoryView {
                long_term: recall.long_term_summary,
                recent: recall
                    .recent_messages
                    .iter()
                    .map(|m| format!("{}: {}", m.role, m.content))
                    .collect(),
            },
            actions,
        }
    }
}

// ---------------------------------------------------------------------------
// LlmDecisionProvider
// ---------------------------------------------------------------------------

/// Decision provider for one agent, backed by a model and a memory.
pub struct LlmDecisionProvider<M = LlmClient, B = LlmMemoryBackend> {
    agent_id: AgentId,
    model: M,
    prompts: Arc<PromptEngine>,
    memory: AgentMemory<B>,
    records: Vec<AiCallRecord>,
    /// Human text and chosen actions not yet written to memory.
    pending: Option<(String, Vec<Action>)>,
}

impl<M, B> std::fmt::Debug for LlmDecisionProvider<M, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmDecisionProvider")
            .field("agent_id", &self.agent_id)
            .field("pending_records", &self.records.len())
            .field("pending_write_back", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl LlmDecisionProvider {
    /// A provider that talks to `client` for both decisions and memory.
    pub fn for_agent(
        agent_id: AgentId,
        client: &LlmClient,
        prompts: Arc<PromptEngine>,
        memory_config: MemoryConfig,
    ) -> Self {
        let memory = AgentMemory::new(memory_config, LlmMemoryBackend::new(client.clone()));
        Self::new(agent_id, client.clone(), prompts, memory)
    }
}

impl<M: DecisionModel, B: MemoryBackend> LlmDecisionProvider<M, B> {
    /// Assemble a provider from its parts.
    pub const fn new(
        agent_id: AgentId,
        model: M,
        prompts: Arc<PromptEngine>,
        memory: AgentMemory<B>,
    ) -> Self {
        Self {
            agent_id,
            model,
            prompts,
            memory,
            records: Vec::new(),
            pending: None,
        }
    }

    /// The agent this provider decides for.
    pub const fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// The agent's memory.
    pub const fn memory(&self) -> &AgentMemory<B> {
        &self.memory
    }

    /// The agent's memory, mutably (for import).
    pub const fn memory_mut(&mut self) -> &mut AgentMemory<B> {
        &mut self.memory
    }

    async fn decide_for(&mut self, world: &WorldState, context: Option<&str>) -> Vec<Action> {
        self.flush().await;
        let Some(status) = world.agents.get(self.agent_id.as_str()) else {
            warn!(agent_id = %self.agent_id, "Agent missing from world; resting");
            return vec![Action::safe_default()];
        };

        let world_context = build_world_context(world);
        let human_text = context.map_or_else(
            || world_context.clone(),
            |c| format!("[URGENT] {c} {world_context}"),
        );
        let recall = self.memory.recall(context.unwrap_or(&world_context)).await;

        let prompt = match self
            .prompts
            .render(&PromptContext::new(status, &world_context, context, recall))
        {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(agent_id = %self.agent_id, error = %e, "Prompt render failed; resting");
                return vec![Action::safe_default()];
            }
        };

        let started = Instant::now();
        let outcome = self.model.choose(&prompt).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (response, success, actions) = match outcome {
            Ok(Some(arguments)) => match parse_actions(&arguments) {
                Ok(actions) => (arguments, true, Some(actions)),
                Err(e) => {
                    warn!(agent_id = %self.agent_id, error = %e, "Unparseable decision; resting");
                    (arguments, false, None)
                }
            },
            Ok(None) => {
                debug!(agent_id = %self.agent_id, "Model made no tool call");
                self.push_record(&prompt, "no tool call".to_owned(), duration_ms, false);
                return Vec::new();
            }
            Err(e) => {
                warn!(agent_id = %self.agent_id, error = %e, "Decision call failed; resting");
                (e.to_string(), false, None)
            }
        };
        self.push_record(&prompt, response, duration_ms, success);

        let Some(actions) = actions else {
            return vec![Action::safe_default()];
        };
        self.pending = Some((human_text, actions.clone()));
        debug!(
            agent_id = %self.agent_id,
            actions = actions.len(),
            duration_ms,
            "Decision made"
        );
        actions
    }

    /// Write the pending exchange, if any, into memory.
    async fn flush(&mut self) {
        let Some((human_text, actions)) = self.pending.take() else {
            return;
        };
        let decided = serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_owned());
        self.memory.remember(MessageRole::Human, human_text).await;
        self.memory
            .remember(MessageRole::Ai, format!("I decided: {decided}"))
            .await;
    }

    fn push_record(&mut self, prompt: &RenderedPrompt, response: String, duration_ms: u64, success: bool) {
        self.records.push(AiCallRecord {
            prompt: prompt.joined(),
            response,
            duration_ms,
            success,
        });
    }
}

impl<M, B> DecisionProvider for LlmDecisionProvider<M, B>
where
    M: DecisionModel,
    B: MemoryBackend,
{
    fn decide<'a>(
        &'a mut self,
        world: &'a WorldState,
        context: Option<&'a str>,
    ) -> BoxFuture<'a, Vec<Action>> {
        Box::pin(self.decide_for(world, context))
    }

    fn settle(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(self.flush())
    }

    fn drain_call_records(&mut self) -> Vec<AiCallRecord> {
        std::mem::take(&mut self.records)
    }
}
