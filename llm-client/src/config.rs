use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::error::{LlmError, Result};

/// Environment variables consulted for the hosted API token, in order.
pub const TOKEN_ENV_VARS: &[&str] = &["HUGGINGFACE_API_TOKEN", "HF_TOKEN"];

const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Which backend serves generation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelSource {
    /// Hosted text-generation inference API
    #[default]
    #[serde(alias = "api")]
    HostedApi,
    /// Model-serving daemon on this machine
    #[serde(alias = "ollama")]
    LocalDaemon,
}

impl ModelSource {
    /// Valid temperature range for this backend (inclusive).
    pub fn temperature_range(&self) -> (f32, f32) {
        match self {
            Self::HostedApi => (0.0, 1.5),
            Self::LocalDaemon => (0.0, 2.0),
        }
    }

    /// Clamp a temperature into this backend's valid range.
    pub fn clamp_temperature(&self, temperature: f32) -> f32 {
        let (min, max) = self.temperature_range();
        if temperature.is_nan() {
            return min;
        }
        temperature.clamp(min, max)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HostedApi => "hosted-api",
            Self::LocalDaemon => "local-daemon",
        }
    }
}

impl FromStr for ModelSource {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hosted-api" | "hosted_api" | "hosted" | "api" => Ok(Self::HostedApi),
            "local-daemon" | "local_daemon" | "local" | "ollama" => Ok(Self::LocalDaemon),
            _ => Err(LlmError::ConfigError(format!("Unknown model source: {}", s))),
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend configuration stored in `~/.config/narration-prep/llm.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted inference API settings
    #[serde(default)]
    pub hosted: HostedConfig,

    /// Local model daemon settings
    #[serde(default)]
    pub local: LocalConfig,

    /// Upper bound for a single generation call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostedConfig {
    /// API token (optional, the environment is checked first)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Custom base URL for the inference API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Daemon base URL (falls back to OLLAMA_BASE_URL, then localhost)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, returning defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| LlmError::ConfigError("HOME not set".into()))?;
        Ok(PathBuf::from(home).join(".config/narration-prep/llm.toml"))
    }

    /// Store or clear the hosted API token. Blank values clear it.
    pub fn set_api_token(&mut self, token: &str) {
        let token = token.trim();
        self.hosted.api_token = if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        };
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosted: HostedConfig::default(),
            local: LocalConfig::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Settable credential for the hosted API.
///
/// Cloning shares the underlying slot, so a token set through one handle is
/// seen by every client holding another. Resolution happens on every call to
/// [`TokenStore::resolve`], never cached.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    explicit: Arc<RwLock<Option<String>>>,
    stored: Option<String>,
}

impl TokenStore {
    /// Create a store with an optional token loaded from the config file
    pub fn new(stored: Option<String>) -> Self {
        Self {
            explicit: Arc::new(RwLock::new(None)),
            stored: stored.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Set the token. Empty or whitespace-only values clear it.
    pub fn set(&self, token: &str) {
        let token = token.trim();
        let value = if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        };
        match self.explicit.write() {
            Ok(mut slot) => *slot = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    /// The token set through [`TokenStore::set`], if any
    pub fn explicit(&self) -> Option<String> {
        match self.explicit.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Resolve the current token: explicit, then environment, then config file
    pub fn resolve(&self) -> Option<String> {
        if let Some(token) = self.explicit() {
            return Some(token);
        }

        TOKEN_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .or_else(|| self.stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.hosted.api_token.is_none());
        assert!(config.local.base_url.is_none());
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn test_model_source_parsing() {
        assert_eq!(
            "hosted-api".parse::<ModelSource>().unwrap(),
            ModelSource::HostedApi
        );
        assert_eq!("api".parse::<ModelSource>().unwrap(), ModelSource::HostedApi);
        assert_eq!(
            "Ollama".parse::<ModelSource>().unwrap(),
            ModelSource::LocalDaemon
        );
        assert!("carrier-pigeon".parse::<ModelSource>().is_err());
    }

    #[test]
    fn test_temperature_clamping() {
        assert_eq!(ModelSource::HostedApi.clamp_temperature(1.9), 1.5);
        assert_eq!(ModelSource::LocalDaemon.clamp_temperature(1.9), 1.9);
        assert_eq!(ModelSource::LocalDaemon.clamp_temperature(3.0), 2.0);
        assert_eq!(ModelSource::HostedApi.clamp_temperature(-0.5), 0.0);
        assert_eq!(ModelSource::HostedApi.clamp_temperature(f32::NAN), 0.0);
    }

    #[test]
    fn test_config_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/llm.toml");

        let mut config = Config::default();
        config.set_api_token("  hf_secret  ");
        config.local.base_url = Some("http://gpu-box:11434".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.hosted.api_token.as_deref(), Some("hf_secret"));
        assert_eq!(
            loaded.local.base_url.as_deref(),
            Some("http://gpu-box:11434")
        );
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn test_blank_token_clears_config() {
        let mut config = Config::default();
        config.set_api_token("abc");
        config.set_api_token("   ");
        assert!(config.hosted.api_token.is_none());
    }

    #[test]
    fn test_token_store_set_and_clear() {
        let store = TokenStore::new(None);
        let shared = store.clone();

        store.set("hf_live");
        assert_eq!(shared.explicit().as_deref(), Some("hf_live"));
        assert_eq!(shared.resolve().as_deref(), Some("hf_live"));

        store.set("");
        assert!(shared.explicit().is_none());
    }
}
