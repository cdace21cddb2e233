//! OpenAI-compatible chat-completions and embeddings client.
//!
//! Decisions are requested through a single forced function call named
//! [`TOOL_NAME`] whose arguments carry `{"actions": [...]}`. Memory
//! compaction uses plain text completions and recall uses the embeddings
//! endpoint. All calls go over HTTP via `reqwest`.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

/// Name of the function the model is forced to call.
pub const TOOL_NAME: &str = "perform_actions";

/// HTTP client for one OpenAI-compatible endpoint.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Build a client with the configured request timeout.
    pub fn new(config: LlmConfig) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RunnerError::LlmBackend(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The chat model in use.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask for a decision and return the raw `perform_actions` arguments.
    ///
    /// `Ok(None)` means the model answered without calling the tool.
    pub async fn complete_with_tool(
        &self,
        prompt: &RenderedPrompt,
    ) -> Result<Option<String>, RunnerError> {
        let body = tool_request_body(&self.config, prompt);
        let json = self.post("chat/completions", &body).await?;
        Ok(extract_tool_arguments(&json))
    }

    /// Plain text completion for a single user message.
    pub async fn complete_text(&self, user: &str) -> Result<String, RunnerError> {
        let mut body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": user}],
            "max_tokens": self.config.max_tokens,
        });
        apply_temperature(&mut body, &self.config);
        let json = self.post("chat/completions", &body).await?;
        extract_openai_content(&json)
    }

    /// Embed a text with the configured embedding model.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RunnerError> {
        let body = json!({
            "model": self.config.embedding_model,
            "input": text,
        });
        let json = self.post("embeddings", &body).await?;
        extract_embedding(json)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, RunnerError> {
        let url = format!("{}/{path}", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(RunnerError::LlmBackend(format!(
                "{path} returned {status}: {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackend(format!("{path} response parse failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Reasoning models reject the `temperature` parameter.
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("o1")
}

fn apply_temperature(body: &mut Value, config: &LlmConfig) {
    if !is_reasoning_model(&config.model)
        && let Some(object) = body.as_object_mut()
    {
        object.insert("temperature".to_owned(), json!(config.temperature));
    }
}

/// The JSON schema of the forced decision tool.
pub fn perform_actions_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Carry out one or more actions chosen for this turn.",
            "parameters": {
                "type": "object",
                "properties": {
                    "actions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": {
                                    "type": "string",
                                    "description": "Action kind, e.g. MOVE, CHAT, GATHER_RESOURCES, REST"
                                }
                            },
                            "required": ["type"],
                            "additionalProperties": true
                        }
                    }
                },
                "required": ["actions"]
            }
        }
    })
}

fn tool_request_body(config: &LlmConfig, prompt: &RenderedPrompt) -> Value {
    let mut body = json!({
        "model": config.model,
        "messages": [
            {"role": "system", "content": prompt.system},
            {"role": "user", "content": prompt.user}
        ],
        "max_tokens": config.max_tokens,
        "tools": [perform_actions_tool()],
        "tool_choice": {"type": "function", "function": {"name": TOOL_NAME}},
    });
    apply_temperature(&mut body, config);
    body
}

// ---------------------------------------------------------------------------
// Response extraction
// ---------------------------------------------------------------------------

/// Extract the text content from a chat completions response.
fn extract_openai_content(json: &Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackend("response missing choices[0].message.content".to_owned())
        })
}

/// Arguments of the first tool call, if the model made one.
fn extract_tool_arguments(json: &Value) -> Option<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("tool_calls"))
        .and_then(|calls| calls.get(0))
        .and_then(|call| call.get("function"))
        .and_then(|f| f.get("arguments"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

fn extract_embedding(json: Value) -> Result<Vec<f32>, RunnerError> {
    let response: EmbeddingResponse = serde_json::from_value(json)?;
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| RunnerError::LlmBackend("embeddings response had no data".to_owned()))
}
