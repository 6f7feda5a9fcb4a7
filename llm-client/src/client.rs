//! Generation boundary used by the processing pipeline.
//!
//! [`TextGenerator`] is the single capability the pipeline depends on:
//! "generate text from a prompt under a model configuration".
//! [`GenerationClient`] is the real implementation. It picks a provider per
//! request, clamps the temperature, bounds the call with a timeout and aborts
//! it when the caller's [`CancelSignal`] fires.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::{Config, ModelSource, TokenStore};
use crate::error::{LlmError, Result};
use crate::provider::{LlmRequest, TokenUsage};
use crate::providers::{get_api_token, get_provider};

/// One generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub source: ModelSource,
    pub model: String,
    /// Requested temperature, clamped by the generator before use
    pub temperature: f32,
}

/// Generated text plus the usage it cost
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub usage: TokenUsage,
}

/// Anything that can turn a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt
    async fn generate(&self, request: GenerationRequest) -> Result<Generation>;

    /// Fail early when the source cannot be used at all (e.g. no credential)
    fn check_ready(&self, source: ModelSource) -> Result<()>;
}

/// Cooperative cancellation shared between a caller and in-flight calls
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Abort every current and future call observing this signal
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`CancelSignal::cancel`] has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Generation client backed by the hosted API or the local daemon
pub struct GenerationClient {
    config: Config,
    tokens: TokenStore,
    timeout: Duration,
    cancel: CancelSignal,
}

impl GenerationClient {
    /// Create a client from backend configuration
    pub fn new(config: Config) -> Self {
        let tokens = TokenStore::new(config.hosted.api_token.clone());
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        Self {
            config,
            tokens,
            timeout,
            cancel: CancelSignal::new(),
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Observe a caller-owned cancellation signal
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle to the token slot; setting a blank token clears it
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation> {
        if self.cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        // Resolved per call so token changes take effect without a restart
        let provider = get_provider(request.source, &request.model, &self.tokens, &self.config)?;
        let temperature = request.source.clamp_temperature(request.temperature);

        let llm_request = LlmRequest {
            prompt: request.prompt.clone(),
            temperature: Some(temperature),
        };

        let start = Instant::now();
        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(LlmError::Cancelled),
            result = tokio::time::timeout(self.timeout, provider.complete(llm_request)) => {
                result.map_err(|_| LlmError::Timeout {
                    timeout: self.timeout,
                })??
            }
        };
        log::debug!(
            "{} generation completed in {:.2}s",
            provider.name(),
            start.elapsed().as_secs_f64()
        );

        let usage = response
            .usage
            .unwrap_or_else(|| TokenUsage::estimate(&request.prompt, &response.content));

        Ok(Generation {
            text: response.content,
            usage,
        })
    }

    fn check_ready(&self, source: ModelSource) -> Result<()> {
        match source {
            ModelSource::HostedApi => get_api_token(&self.tokens).map(|_| ()),
            ModelSource::LocalDaemon => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_request() -> GenerationRequest {
        GenerationRequest {
            prompt: "Clean this.".to_string(),
            source: ModelSource::LocalDaemon,
            model: "llama3.1:8b".to_string(),
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn test_cancel_signal_resolves() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());

        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        signal.cancel();

        handle.await.unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_client_refuses_to_generate() {
        let signal = CancelSignal::new();
        signal.cancel();
        let client = GenerationClient::new(Config::default()).with_cancel_signal(signal);

        let result = client.generate(local_request()).await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_generation_error() {
        let mut config = Config::default();
        // Port 9 (discard) is closed on test machines
        config.local.base_url = Some("http://127.0.0.1:9".to_string());
        let client = GenerationClient::new(config).with_timeout(Duration::from_secs(5));

        let err = client.generate(local_request()).await.unwrap_err();
        assert!(!err.is_configuration());
    }

    /// Local daemon address that accepts connections but never answers.
    fn silent_daemon() -> Config {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = Config::default();
        config.local.base_url = Some(format!("http://{}", listener.local_addr().unwrap()));

        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming() {
                held.push(stream);
            }
        });
        config
    }

    #[tokio::test]
    async fn test_in_flight_call_times_out() {
        let client = GenerationClient::new(silent_daemon()).with_timeout(Duration::from_millis(300));

        let start = Instant::now();
        let err = client.generate(local_request()).await.unwrap_err();

        assert!(
            matches!(err, LlmError::Timeout { timeout } if timeout == Duration::from_millis(300)),
            "expected timeout, got {:?}",
            err
        );
        assert!(!err.is_configuration());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_in_flight_call_is_cancelled() {
        let signal = CancelSignal::new();
        let client = GenerationClient::new(silent_daemon())
            .with_timeout(Duration::from_secs(30))
            .with_cancel_signal(signal.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            signal.cancel();
        });

        let start = Instant::now();
        let err = client.generate(local_request()).await.unwrap_err();

        assert!(matches!(err, LlmError::Cancelled), "expected cancel, got {:?}", err);
        assert!(!err.is_configuration());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_check_ready_uses_explicit_token() {
        let client = GenerationClient::new(Config::default());
        assert!(client.check_ready(ModelSource::LocalDaemon).is_ok());

        client.tokens().set("hf_explicit");
        assert!(client.check_ready(ModelSource::HostedApi).is_ok());
    }
}
