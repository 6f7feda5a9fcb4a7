//! LLM provider implementations

mod huggingface;
pub mod mock;
mod ollama;

pub use huggingface::HuggingFaceProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;

use crate::config::{Config, ModelSource, TOKEN_ENV_VARS, TokenStore};
use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;

/// Create a provider instance for a model source.
///
/// The hosted token is resolved from `tokens` on every call so that a token
/// set or cleared after startup takes effect on the next request.
pub fn get_provider(
    source: ModelSource,
    model: &str,
    tokens: &TokenStore,
    config: &Config,
) -> Result<Box<dyn LlmProvider>> {
    match source {
        ModelSource::HostedApi => {
            let api_token = get_api_token(tokens)?;
            Ok(Box::new(HuggingFaceProvider::new(
                model,
                api_token,
                config.hosted.base_url.as_deref(),
            )?))
        }
        ModelSource::LocalDaemon => Ok(Box::new(OllamaProvider::new(
            model,
            config.local.base_url.as_deref(),
        )?)),
    }
}

/// Get the hosted API token or a configuration error naming where to set it
pub fn get_api_token(tokens: &TokenStore) -> Result<String> {
    tokens.resolve().ok_or_else(|| LlmError::MissingApiToken {
        provider: "Hugging Face".to_string(),
        env_var: TOKEN_ENV_VARS[0].to_string(),
    })
}
