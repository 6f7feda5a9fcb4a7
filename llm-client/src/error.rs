use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error(
        "API token not configured for {provider}. Set {env_var} or run `narration-prep config set-token`."
    )]
    MissingApiToken { provider: String, env_var: String },

    #[error("Failed to reach {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("API error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("Generation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl LlmError {
    /// Whether this error comes from missing or invalid configuration rather
    /// than from talking to a backend. Configuration problems are not worth
    /// retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingApiToken { .. } | Self::ConfigError(_) | Self::TomlParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
