//! LLM-backed decision making for Chronicle agents.
//!
//! - [`config`] -- `CHRONICLE_LLM_*` environment configuration
//! - [`llm`] -- OpenAI-compatible chat, tool-call and embeddings client
//! - [`prompt`] -- `minijinja` prompt templates
//! - [`parse`] -- lenient parsing of tool arguments into actions
//! - [`provider`] -- the per-agent [`LlmDecisionProvider`]
//! - [`memory_backend`] -- agent memory summarized and embedded by the LLM

pub mod config;
pub mod error;
pub mod llm;
pub mod memory_backend;
pub mod parse;
pub mod prompt;
pub mod provider;

pub use config::{API_KEY_VAR, LlmConfig};
pub use error::RunnerError;
pub use llm::{LlmClient, TOOL_NAME};
pub use memory_backend::LlmMemoryBackend;
pub use parse::parse_actions;
pub use prompt::{PromptEngine, RenderedPrompt};
pub use provider::{DecisionModel, LlmDecisionProvider};
