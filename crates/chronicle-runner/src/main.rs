//! One-shot decision smoke test against a live endpoint.
//!
//! Seeds the starting world with a single hero, asks the configured model
//! for that hero's decision, and prints the resulting actions. Useful for
//! checking credentials, model choice and prompt templates before a full
//! run.

use std::sync::Arc;

use anyhow::Context as _;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chronicle_core::DecisionProvider;
use chronicle_memory::MemoryConfig;
use chronicle_runner::{LlmClient, LlmConfig, LlmDecisionProvider, PromptEngine};
use chronicle_types::AgentId;
use chronicle_world::{add_agent, create_starting_world, hero_status};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = LlmConfig::from_env().context("loading LLM configuration")?;
    info!(
        base_url = config.base_url,
        model = config.model,
        templates_dir = config.templates_dir.as_deref().unwrap_or("<built-in>"),
        "chronicle-runner smoke test starting"
    );

    let prompts = PromptEngine::from_dir(config.templates_dir.as_deref())
        .context("loading prompt templates")?;
    let client = LlmClient::new(config).context("building LLM client")?;

    let mut world = create_starting_world();
    let hero = AgentId::new("hero_smoke");
    add_agent(
        &mut world,
        hero_status(hero.as_str(), "Phainon", "burden", "city-of-dawn"),
    )
    .context("seeding the smoke-test hero")?;

    let mut provider =
        LlmDecisionProvider::for_agent(hero, &client, Arc::new(prompts), MemoryConfig::default());
    let actions = provider.decide(&world, None).await;

    for record in provider.drain_call_records() {
        info!(
            success = record.success,
            duration_ms = record.duration_ms,
            "model call finished"
        );
    }
    println!("{}", serde_json::to_string_pretty(&actions)?);
    Ok(())
}
