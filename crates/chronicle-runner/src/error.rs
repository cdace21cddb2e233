//! Error types for the decision runner.
//!
//! Uses `thiserror` for typed errors that surface through the decision
//! pipeline: configuration, LLM calls, prompt rendering, response parsing.
//! None of them reach the scheduler; the provider turns every failure into
//! the safe default action.

/// Errors that can occur while producing a decision.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM endpoint returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The LLM response could not be parsed into actions.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
