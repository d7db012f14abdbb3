/// LLM Client — the single point of entry for every text-generation call.
///
/// ARCHITECTURAL RULE: Stage agents never talk to a backend directly.
/// They hold an `Arc<dyn TextGenerator>` and all HTTP traffic goes through here.
///
/// Backends: Ollama and Nebius (OpenAI-compatible chat completions) and the
/// Anthropic Messages API. The backend is chosen per client from `LlmConfig`.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{LlmConfig, LlmProvider};

pub mod parse;
pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No API key configured for provider '{0}'")]
    MissingApiKey(&'static str),
}

/// Anything that can turn a system + user prompt into free-form text.
/// The returned text carries no format guarantee.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

/// Builds the generator for one request's backend selection.
pub trait GeneratorFactory: Send + Sync {
    fn generator(&self, config: LlmConfig) -> Arc<dyn TextGenerator>;
}

// ── Anthropic wire types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ── OpenAI-compatible wire types ────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Error bodies differ per provider; both shapes carry `error.message`.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP client for one configured backend. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            config,
        }
    }

    /// Same connection pool, different backend selection.
    pub fn with_config(&self, config: LlmConfig) -> Self {
        Self {
            client: self.client.clone(),
            config,
        }
    }

    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Makes one logical call, returning the response text.
    /// Retries on transport errors, 429 and 5xx with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.build_request(prompt, system)?.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!(
                    "{} API returned {}: {}",
                    self.config.provider.as_str(),
                    status,
                    body
                );
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            return self.read_text(&body);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    fn build_request(&self, prompt: &str, system: &str) -> Result<RequestBuilder, LlmError> {
        let messages = |with_system: bool| {
            let mut messages = Vec::with_capacity(2);
            if with_system {
                messages.push(ChatMessage {
                    role: "system",
                    content: system,
                });
            }
            messages.push(ChatMessage {
                role: "user",
                content: prompt,
            });
            messages
        };

        match self.config.provider {
            LlmProvider::Anthropic => {
                let api_key = self
                    .config
                    .api_key
                    .as_deref()
                    .ok_or(LlmError::MissingApiKey("anthropic"))?;
                Ok(self
                    .client
                    .post(ANTHROPIC_API_URL)
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .header("content-type", "application/json")
                    .json(&AnthropicRequest {
                        model: &self.config.model,
                        max_tokens: MAX_TOKENS,
                        system,
                        messages: messages(false),
                    }))
            }
            LlmProvider::Ollama | LlmProvider::Nebius => {
                let url = chat_completions_url(&self.config.base_url);
                let mut request = self.client.post(url).json(&ChatRequest {
                    model: &self.config.model,
                    messages: messages(true),
                    temperature: TEMPERATURE,
                });
                match (&self.config.api_key, self.config.provider) {
                    (Some(key), _) => request = request.bearer_auth(key),
                    (None, LlmProvider::Nebius) => return Err(LlmError::MissingApiKey("nebius")),
                    // Ollama ignores the key but the OpenAI wire format expects one
                    (None, _) => request = request.bearer_auth("ollama"),
                }
                Ok(request)
            }
        }
    }

    fn read_text(&self, body: &str) -> Result<String, LlmError> {
        let text = match self.config.provider {
            LlmProvider::Anthropic => {
                let response: AnthropicResponse = serde_json::from_str(body)?;
                if let Some(usage) = &response.usage {
                    debug!(
                        "LLM call succeeded: input_tokens={}, output_tokens={}",
                        usage.input_tokens, usage.output_tokens
                    );
                }
                response
                    .content
                    .into_iter()
                    .find(|b| b.block_type == "text")
                    .and_then(|b| b.text)
            }
            LlmProvider::Ollama | LlmProvider::Nebius => {
                let response: ChatResponse = serde_json::from_str(body)?;
                if let Some(usage) = &response.usage {
                    debug!(
                        "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                        usage.prompt_tokens, usage.completion_tokens
                    );
                }
                response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
            }
        };

        text.filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.call(prompt, system).await
    }
}

impl GeneratorFactory for LlmClient {
    fn generator(&self, config: LlmConfig) -> Arc<dyn TextGenerator> {
        Arc::new(self.with_config(config))
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}
