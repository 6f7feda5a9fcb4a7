//! Hosted inference API provider
//!
//! HTTP implementation for the Hugging Face text-generation inference API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

const MAX_NEW_TOKENS: u32 = 512;
const TOP_P: f32 = 0.95;
const REPETITION_PENALTY: f32 = 1.05;

/// Provider for the hosted inference API
pub struct HuggingFaceProvider {
    model: String,
    api_token: String,
    base_url: String,
    client: Client,
}

impl HuggingFaceProvider {
    /// Create a new hosted provider
    pub fn new(model: &str, api_token: String, base_url: Option<&str>) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(LlmError::ConfigError(
                "No model configured for the hosted API".into(),
            ));
        }

        Ok(Self {
            model: model.to_string(),
            api_token,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: Client::new(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

// Inference API request/response types

#[derive(Debug, Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
    options: GenerationOptions,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    top_p: f32,
    repetition_penalty: f32,
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct GenerationOptions {
    wait_for_model: bool,
}

/// The API answers with either a list of generations or a single object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Many(Vec<GeneratedText>),
    One(GeneratedText),
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

fn parse_generation(body: &str) -> Result<String> {
    let parsed: GenerationResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse {
            provider: "Hugging Face".to_string(),
            message: format!("Failed to parse response: {}", e),
        })?;

    let text = match parsed {
        GenerationResponse::Many(items) => items
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .unwrap_or_default(),
        GenerationResponse::One(item) => item.generated_text,
    };

    Ok(text.trim().to_string())
}

#[async_trait]
impl LlmProvider for HuggingFaceProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let api_request = GenerationRequest {
            inputs: request.prompt.clone(),
            parameters: GenerationParameters {
                max_new_tokens: MAX_NEW_TOKENS,
                temperature: request.temperature,
                top_p: TOP_P,
                repetition_penalty: REPETITION_PENALTY,
                return_full_text: false,
            },
            options: GenerationOptions {
                wait_for_model: true,
            },
        };

        let url = self.endpoint();
        log::debug!(
            "Generating with hosted model={} temperature={:?}",
            self.model,
            request.temperature
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::Unreachable {
                endpoint: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::InvalidResponse {
            provider: "Hugging Face".to_string(),
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LlmError::ApiError {
                message,
                status_code: Some(status.as_u16()),
            });
        }

        let content = parse_generation(&body)?;
        let usage = Some(TokenUsage::estimate(&request.prompt, &content));

        Ok(LlmResponse {
            content,
            usage,
        })
    }

    fn name(&self) -> &'static str {
        "Hugging Face Inference API"
    }
}
