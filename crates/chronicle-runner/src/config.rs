//! Configuration for the LLM decision runner.
//!
//! All configuration is loaded from `CHRONICLE_LLM_*` environment
//! variables, so the same binary can be pointed at `OpenAI`, `DeepSeek`, or
//! a local Ollama endpoint without recompiling.

use std::time::Duration;

use crate::error::RunnerError;

/// Environment variable holding the API key. Its presence decides whether
/// the engine uses LLM-backed agents at all.
pub const API_KEY_VAR: &str = "CHRONICLE_LLM_API_KEY";

/// Connection and sampling settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// API key for bearer authentication.
    pub api_key: String,
    /// Chat model identifier.
    pub model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Completion token cap per call.
    pub max_tokens: u32,
    /// Sampling temperature. Ignored for reasoning models.
    pub temperature: f32,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Path to the prompt templates directory. `None` uses the built-in
    /// templates.
    pub templates_dir: Option<String>,
}

impl LlmConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `CHRONICLE_LLM_API_KEY` -- bearer token
    ///
    /// Optional:
    /// - `CHRONICLE_LLM_BASE_URL` -- API base URL (default `https://api.openai.com/v1`)
    /// - `CHRONICLE_LLM_MODEL` -- chat model (default `gpt-4o-mini`)
    /// - `CHRONICLE_LLM_EMBEDDING_MODEL` -- embedding model (default `text-embedding-3-small`)
    /// - `CHRONICLE_LLM_MAX_TOKENS` -- completion cap (default 1024)
    /// - `CHRONICLE_LLM_TEMPERATURE` -- sampling temperature (default 0.8)
    /// - `CHRONICLE_LLM_TIMEOUT_MS` -- HTTP timeout in milliseconds (default 30000)
    /// - `CHRONICLE_LLM_TEMPLATES_DIR` -- prompt templates directory
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RunnerError> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| RunnerError::Config(format!("missing required env var {API_KEY_VAR}")))?;
        let var = |suffix: &str, default: &str| {
            lookup(&format!("CHRONICLE_LLM_{suffix}")).unwrap_or_else(|| default.to_owned())
        };

        let max_tokens: u32 = var("MAX_TOKENS", "1024")
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid CHRONICLE_LLM_MAX_TOKENS: {e}")))?;
        let temperature: f32 = var("TEMPERATURE", "0.8")
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid CHRONICLE_LLM_TEMPERATURE: {e}")))?;
        let timeout_ms: u64 = var("TIMEOUT_MS", "30000")
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid CHRONICLE_LLM_TIMEOUT_MS: {e}")))?;

        Ok(Self {
            base_url: var("BASE_URL", "https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_owned(),
            api_key,
            model: var("MODEL", "gpt-4o-mini"),
            embedding_model: var("EMBEDDING_MODEL", "text-embedding-3-small"),
            max_tokens,
            temperature,
            timeout: Duration::from_millis(timeout_ms),
            templates_dir: lookup("CHRONICLE_LLM_TEMPLATES_DIR"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_the_key() {
        let config = LlmConfig::from_lookup(lookup(&[(API_KEY_VAR, "sk-test")])).unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.templates_dir.is_none());
    }

    #[test]
    fn missing_or_blank_key_is_an_error() {
        assert!(LlmConfig::from_lookup(lookup(&[])).is_err());
        assert!(LlmConfig::from_lookup(lookup(&[(API_KEY_VAR, "  ")])).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = LlmConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-test"),
            ("CHRONICLE_LLM_BASE_URL", "http://localhost:11434/v1/"),
            ("CHRONICLE_LLM_MAX_TOKENS", "256"),
            ("CHRONICLE_LLM_TEMPLATES_DIR", "prompts"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.templates_dir.as_deref(), Some("prompts"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let result = LlmConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-test"),
            ("CHRONICLE_LLM_TEMPERATURE", "warm"),
        ]));
        assert!(matches!(result, Err(RunnerError::Config(_))));
    }
}
