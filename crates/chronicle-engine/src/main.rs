//! Engine binary for the Chronicle simulation.
//!
//! Wires the seed world, the roster, and one decision provider per agent
//! into a [`Simulation`], then runs the configured number of days.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration (path from the first argument, else
//!    `chronicle-config.yaml` if present, else defaults)
//! 3. Build the starting world and spawn the roster
//! 4. Attach LLM providers when `CHRONICLE_LLM_API_KEY` is set, resting
//!    stubs otherwise
//! 5. Run the daily cycle
//! 6. Log the result

mod error;
mod spawner;
mod summary_callback;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chronicle_core::{DecisionProvider, Simulation, SimulationConfig, StubDecisionProvider};
use chronicle_memory::MemoryConfig;
use chronicle_runner::{API_KEY_VAR, LlmClient, LlmConfig, LlmDecisionProvider, PromptEngine};
use chronicle_types::AgentId;

use crate::error::EngineError;
use crate::spawner::RosterConfig;
use crate::summary_callback::DaySummaryLogger;

const DEFAULT_CONFIG_FILE: &str = "chronicle-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, world seeding, or provider set-up
/// fails. The simulation itself never fails once started.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("chronicle-engine starting");

    // 2. Load configuration.
    let config_path = config_path();
    let config = load_config(config_path.as_deref())?;
    let roster = load_roster_config(config_path.as_deref())?;
    info!(
        config_file = config_path
            .as_ref()
            .map_or_else(|| "<defaults>".to_owned(), |p| p.display().to_string()),
        days = config.simulation.days,
        interaction_budget = config.scheduler.interaction_budget,
        max_chain_depth = config.scheduler.max_chain_depth,
        decision_timeout_ms = config.scheduler.decision_timeout_ms,
        seed = ?config.scheduler.seed,
        "Configuration loaded"
    );

    // 3. Build the world and its roster.
    let mut world = chronicle_world::create_starting_world();
    let mut rng = config
        .scheduler
        .seed
        .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let agent_ids = spawner::spawn_roster(&roster, &mut world, &mut rng)?;
    info!(
        cities = world.cities.len(),
        agents = world.agents.len(),
        embers = world.embers.total,
        "Starting world created"
    );

    // 4. Attach decision providers.
    let memory_config = config.memory.clone();
    let decision_timeout = Duration::from_millis(config.scheduler.decision_timeout_ms);
    let mut sim = Simulation::new(world, config)?;
    let providers = build_providers(&agent_ids, &memory_config, decision_timeout)?;
    for (agent_id, provider) in providers {
        sim.add_provider(agent_id, provider)?;
    }

    // 5. Run.
    let mut callback = DaySummaryLogger::new();
    let summary = sim.run_configured(&mut callback).await;

    // 6. Log the result.
    info!(
        days_logged = callback.days_logged(),
        final_day = summary.final_day,
        actions = summary.actions_resolved,
        "chronicle-engine shutdown complete"
    );
    Ok(())
}

/// The config file to read, if any.
fn config_path() -> Option<PathBuf> {
    std::env::args_os().nth(1).map(PathBuf::from).or_else(|| {
        let default = Path::new(DEFAULT_CONFIG_FILE);
        default.exists().then(|| default.to_path_buf())
    })
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig, EngineError> {
    match path {
        Some(path) => Ok(SimulationConfig::from_file(path)?),
        None => {
            info!("Config file not found, using defaults");
            Ok(SimulationConfig::default())
        }
    }
}

/// Read the `roster` section of the config file. Missing file or section
/// means the built-in roster.
fn load_roster_config(path: Option<&Path>) -> Result<RosterConfig, EngineError> {
    let Some(path) = path else {
        return Ok(RosterConfig::default());
    };
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Spawner {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Spawner {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    raw.get("roster").map_or_else(
        || Ok(RosterConfig::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Spawner {
                message: format!("failed to parse roster config: {e}"),
            })
        },
    )
}

/// One provider per agent: LLM-backed when an API key is configured,
/// resting stubs otherwise.
fn build_providers(
    agent_ids: &[AgentId],
    memory_config: &MemoryConfig,
    decision_timeout: Duration,
) -> Result<Vec<(AgentId, Box<dyn DecisionProvider>)>, EngineError> {
    if std::env::var_os(API_KEY_VAR).is_none() {
        warn!("{API_KEY_VAR} not set; every agent will rest");
        return Ok(agent_ids
            .iter()
            .map(|id| {
                let provider: Box<dyn DecisionProvider> = Box::new(StubDecisionProvider::new());
                (id.clone(), provider)
            })
            .collect());
    }

    let llm_config = LlmConfig::from_env()?;
    let prompts = Arc::new(PromptEngine::from_dir(llm_config.templates_dir.as_deref())?);
    info!(
        base_url = llm_config.base_url,
        model = llm_config.model,
        embedding_model = llm_config.embedding_model,
        "LLM decision providers configured"
    );
    if llm_config.timeout > decision_timeout {
        warn!(
            llm_timeout_ms = u64::try_from(llm_config.timeout.as_millis()).unwrap_or(u64::MAX),
            decision_timeout_ms = u64::try_from(decision_timeout.as_millis()).unwrap_or(u64::MAX),
            "LLM request timeout exceeds the decision deadline; slow replies will become REST"
        );
    }
    let client = LlmClient::new(llm_config)?;

    Ok(agent_ids
        .iter()
        .map(|id| {
            let provider: Box<dyn DecisionProvider> = Box::new(LlmDecisionProvider::for_agent(
                id.clone(),
                &client,
                Arc::clone(&prompts),
                memory_config.clone(),
            ));
            (id.clone(), provider)
        })
        .collect())
}
