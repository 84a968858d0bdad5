/// LLM Client: the single point of entry for all inference calls.
///
/// ARCHITECTURAL RULE: pipeline steps never talk HTTP themselves. Every call goes
/// through an `InferenceEndpoint`, which is injected into the runner. Production
/// uses `OllamaClient`; tests use in-memory endpoints.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::InferenceSettings;

#[cfg(test)]
pub mod mock;
pub mod prompts;

const CHAT_PATH: &str = "/api/chat";
const TAGS_PATH: &str = "/api/tags";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Endpoint still failing after {retries} attempts")]
    RateLimited { retries: u32 },

    #[error("Inference endpoint returned no message")]
    EmptyContent,
}

/// A prior step's output as seen by a later step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub step_id: String,
    pub output: String,
}

/// One reasoning call: instruction plus context in, text out.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceRequest {
    pub step_id: String,
    pub model: String,
    /// Persona prompt for the step's agent.
    pub system: String,
    /// Fully assembled instruction, dependency outputs already templated in.
    pub instruction: String,
    pub context: Vec<ContextEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceReply {
    pub text: String,
    pub model: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// The injected reasoning interface. Implement this to swap the backend
/// without touching the runner or the workflow.
#[async_trait]
pub trait InferenceEndpoint: Send + Sync {
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceReply, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Ollama wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: Option<ReplyMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// A model available on the local daemon, as listed by `/api/tags`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelTag {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

// ────────────────────────────────────────────────────────────────────────────
// OllamaClient
// ────────────────────────────────────────────────────────────────────────────

/// HTTP client for a local Ollama daemon.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    temperature: Option<f32>,
    max_attempts: u32,
}

impl OllamaClient {
    pub fn new(settings: &InferenceSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    fn with_client(client: Client, settings: &InferenceSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            temperature: settings.temperature,
            max_attempts: settings.max_attempts.max(1),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Makes one chat call. Retries on 429 and 5xx with exponential backoff,
    /// up to `max_attempts` total attempts.
    pub async fn chat(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<InferenceReply, LlmError> {
        let request_body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: self.temperature.map(|temperature| ChatOptions { temperature }),
        };
        let url = format!("{}{CHAT_PATH}", self.base_url);

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1).min(5)));
                warn!(
                    "Inference attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(&request_body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Inference endpoint returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
            }

            let body = response.text().await?;
            let chat: ChatResponse = serde_json::from_str(&body)?;
            let message = chat.message.ok_or(LlmError::EmptyContent)?;

            debug!(
                "Inference call succeeded: model={}, prompt_tokens={:?}, completion_tokens={:?}",
                chat.model, chat.prompt_eval_count, chat.eval_count
            );

            return Ok(InferenceReply {
                text: message.content,
                model: chat.model,
                prompt_tokens: chat.prompt_eval_count,
                completion_tokens: chat.eval_count,
            });
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.max_attempts,
        }))
    }

    /// Lists the models pulled on the daemon.
    pub async fn list_models(&self) -> Result<Vec<ModelTag>, LlmError> {
        let url = format!("{}{TAGS_PATH}", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_message(body),
            });
        }

        let tags: TagsResponse = serde_json::from_str(&body)?;
        Ok(tags.models)
    }
}

#[async_trait]
impl InferenceEndpoint for OllamaClient {
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceReply, LlmError> {
        self.chat(&request.model, &request.system, &request.instruction)
            .await
    }
}

/// True when `wanted` is among `available`, treating a bare name as `name:latest`.
pub fn model_is_available(wanted: &str, available: &[ModelTag]) -> bool {
    let normalized = if wanted.contains(':') {
        wanted.to_string()
    } else {
        format!("{wanted}:latest")
    };
    available
        .iter()
        .any(|tag| tag.name == wanted || tag.name == normalized)
}

/// Pulls the `error` field out of an Ollama error body, falling back to the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<OllamaError>(&body)
        .map(|e| e.error)
        .unwrap_or(body)
}
