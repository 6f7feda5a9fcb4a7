//! Local model daemon provider
//!
//! Talks to an Ollama-compatible daemon. Uses `/api/generate` first and falls
//! back to `/api/chat` when the generate endpoint returns no text.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const BASE_URL_ENV_VAR: &str = "OLLAMA_BASE_URL";

const KEEP_ALIVE: &str = "15m";
const NUM_PREDICT: u32 = 2000;
const NUM_CTX: u32 = 8192;

/// Provider for a local model daemon
pub struct OllamaProvider {
    model: String,
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    /// Create a new local daemon provider
    ///
    /// The base URL comes from the argument, then `OLLAMA_BASE_URL`, then the
    /// default localhost port.
    pub fn new(model: &str, base_url: Option<&str>) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(LlmError::ConfigError(
                "No model configured for the local daemon".into(),
            ));
        }

        let base_url = base_url
            .map(str::to_string)
            .or_else(|| std::env::var(BASE_URL_ENV_VAR).ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Unreachable {
                endpoint: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                message,
                status_code: Some(status.as_u16()),
            });
        }

        response.json().await.map_err(|e| LlmError::InvalidResponse {
            provider: "Ollama".to_string(),
            message: format!("{} returned invalid JSON: {}", path, e),
        })
    }
}

// Daemon request/response types

#[derive(Debug, Clone, Serialize)]
struct DaemonOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    num_predict: u32,
    num_ctx: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    keep_alive: &'a str,
    options: DaemonOptions,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    keep_alive: &'a str,
    options: DaemonOptions,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct DaemonResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    final_response: Option<String>,
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl DaemonResponse {
    /// First non-empty text field, checked in the order the daemon versions use.
    fn text(&self) -> String {
        [
            self.response.as_deref(),
            self.final_response.as_deref(),
            self.message.as_ref().and_then(|m| m.content.as_deref()),
        ]
        .into_iter()
        .flatten()
        .find(|t| !t.trim().is_empty())
        .unwrap_or_default()
        .to_string()
    }

    fn usage(&self, prompt: &str, text: &str) -> TokenUsage {
        let estimated = TokenUsage::estimate(prompt, text);
        TokenUsage {
            input_tokens: self.prompt_eval_count.unwrap_or(estimated.input_tokens),
            output_tokens: self.eval_count.unwrap_or(estimated.output_tokens),
            ..estimated
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let options = DaemonOptions {
            temperature: request.temperature,
            num_predict: NUM_PREDICT,
            num_ctx: NUM_CTX,
        };

        log::debug!(
            "Generating with local model={} at {}",
            self.model,
            self.base_url
        );

        let generate = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            keep_alive: KEEP_ALIVE,
            options: options.clone(),
        };
        let data: DaemonResponse = self.post("/api/generate", &generate).await?;
        let text = data.text();
        let mut usage = data.usage(&request.prompt, &text);

        if !text.trim().is_empty() {
            return Ok(LlmResponse {
                content: text,
                usage: Some(usage),
            });
        }

        log::debug!("Empty /api/generate response, retrying through /api/chat");
        let chat = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            stream: false,
            keep_alive: KEEP_ALIVE,
            options,
        };
        let data: DaemonResponse = self.post("/api/chat", &chat).await?;
        let text = data.text();
        // The empty generate call still consumed prompt tokens
        usage += data.usage(&request.prompt, &text);

        Ok(LlmResponse {
            content: text,
            usage: Some(usage),
        })
    }

    fn name(&self) -> &'static str {
        "Ollama"
    }
}
