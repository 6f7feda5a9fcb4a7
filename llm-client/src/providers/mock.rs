//! Mock LLM provider for testing
//!
//! Provides a configurable mock provider that can simulate various behaviors
//! like failures, retries, and successful responses. It implements both the
//! low-level [`LlmProvider`] trait and the [`TextGenerator`] boundary used by
//! the processing pipeline.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::client::{Generation, GenerationRequest, TextGenerator};
use crate::config::ModelSource;
use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};

/// A mock provider for testing retry and fallback behavior
pub struct MockProvider {
    /// Number of times to fail before succeeding (0 = always succeed)
    fail_count: AtomicUsize,
    /// Current call count
    call_count: AtomicUsize,
    /// Error to return on failure (None = always succeed)
    fail_with: Mutex<Option<LlmError>>,
    /// Queued responses, consumed one per successful call
    queued: Mutex<VecDeque<String>>,
    /// Response content once the queue is empty
    success_response: String,
    /// Usage reported with every successful call (None = estimate)
    usage: Option<TokenUsage>,
    /// Every prompt received, in order
    prompts: Mutex<Vec<String>>,
    /// Every temperature received, in order
    temperatures: Mutex<Vec<f32>>,
    /// Provider name for display
    name: &'static str,
}

impl MockProvider {
    fn build(fail_count: usize, error: Option<LlmError>, response: &str) -> Self {
        Self {
            fail_count: AtomicUsize::new(fail_count),
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(error),
            queued: Mutex::new(VecDeque::new()),
            success_response: response.to_string(),
            usage: None,
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
            name: "mock",
        }
    }

    /// Create a provider that fails `n` times with the given error, then succeeds
    pub fn fails_then_succeeds(n: usize, error: LlmError, response: &str) -> Self {
        Self::build(n, Some(error), response)
    }

    /// Create a provider that always fails with the given error
    pub fn always_fails(error: LlmError) -> Self {
        Self::build(usize::MAX, Some(error), "")
    }

    /// Create a provider that always succeeds
    pub fn always_succeeds(response: &str) -> Self {
        Self::build(0, None, response)
    }

    /// Create a provider that returns the given responses in order, then
    /// repeats the last one
    pub fn sequence(responses: &[&str]) -> Self {
        let last = responses.last().copied().unwrap_or_default();
        let provider = Self::build(0, None, last);
        if let Ok(mut queue) = provider.queued.lock() {
            queue.extend(responses.iter().map(|r| r.to_string()));
        }
        provider
    }

    /// Report fixed usage instead of estimating it
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Set a custom provider name (useful for testing fallback scenarios)
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Get the number of times the mock was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Temperatures received so far
    pub fn temperatures(&self) -> Vec<f32> {
        self.temperatures
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    fn respond(&self, prompt: &str, temperature: Option<f32>) -> Result<(String, TokenUsage)> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let (Some(t), Ok(mut temps)) = (temperature, self.temperatures.lock()) {
            temps.push(t);
        }

        let fail_count = self.fail_count.load(Ordering::SeqCst);
        if call_num < fail_count {
            if let Ok(error) = self.fail_with.lock() {
                if let Some(err) = error.as_ref() {
                    return Err(clone_error(err));
                }
            }
        }

        let content = self
            .queued
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.success_response.clone());
        let usage = self
            .usage
            .unwrap_or_else(|| TokenUsage::estimate(prompt, &content));

        Ok((content, usage))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let (content, usage) = self.respond(&request.prompt, request.temperature)?;

        Ok(LlmResponse {
            content,
            usage: Some(usage),
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl TextGenerator for MockProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation> {
        let temperature = request.source.clamp_temperature(request.temperature);
        let (text, usage) = self.respond(&request.prompt, Some(temperature))?;
        Ok(Generation { text, usage })
    }

    fn check_ready(&self, _source: ModelSource) -> Result<()> {
        Ok(())
    }
}

/// Clone an LlmError (needed because LlmError doesn't implement Clone)
fn clone_error(err: &LlmError) -> LlmError {
    match err {
        LlmError::MissingApiToken { provider, env_var } => LlmError::MissingApiToken {
            provider: provider.clone(),
            env_var: env_var.clone(),
        },
        LlmError::Unreachable { endpoint, message } => LlmError::Unreachable {
            endpoint: endpoint.clone(),
            message: message.clone(),
        },
        LlmError::ApiError {
            message,
            status_code,
        } => LlmError::ApiError {
            message: message.clone(),
            status_code: *status_code,
        },
        LlmError::InvalidResponse { provider, message } => LlmError::InvalidResponse {
            provider: provider.clone(),
            message: message.clone(),
        },
        LlmError::Timeout { timeout } => LlmError::Timeout { timeout: *timeout },
        LlmError::Cancelled => LlmError::Cancelled,
        LlmError::ConfigError(s) => LlmError::ConfigError(s.clone()),
        // For Io and Toml errors, we create a generic error since they can't be cloned
        LlmError::Io(_) => LlmError::ConfigError("IO error (mock)".to_string()),
        LlmError::TomlParse(_) => LlmError::ConfigError("TOML parse error (mock)".to_string()),
        LlmError::TomlSerialize(_) => {
            LlmError::ConfigError("TOML serialize error (mock)".to_string())
        }
    }
}
