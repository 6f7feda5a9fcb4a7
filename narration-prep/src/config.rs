//! Processing defaults stored in `~/.config/narration-prep/config.toml`.

use anyhow::Result;
use llm_client::ModelSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PrepError;
use crate::speaker::SpeakerConfig;
use crate::text::CleaningOptions;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_HOSTED_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B-Instruct";
const DEFAULT_LOCAL_MODEL: &str = "llama3.1:8b";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Sentences per chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub model_source: ModelSource,

    /// Model id used with the hosted API
    #[serde(default = "default_hosted_model")]
    pub hosted_model: String,

    /// Model name used with the local daemon
    #[serde(default = "default_local_model")]
    pub local_model: String,

    /// Sampling temperature, clamped per backend
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Label speakers in the same call that cleans the text
    #[serde(default)]
    pub single_pass: bool,

    /// Add worked examples to the speaker prompt
    #[serde(default)]
    pub extended_examples: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,

    /// Skip the deterministic pre-clean; generation still runs
    #[serde(default)]
    pub llm_cleaning_disabled: bool,

    #[serde(default)]
    pub cleaning: CleaningOptions,

    /// Absent or `mode = "none"` disables speaker prompting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<SpeakerConfig>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_hosted_model() -> String {
    DEFAULT_HOSTED_MODEL.to_string()
}

fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            cleaning: CleaningOptions::default(),
            speaker: None,
            model_source: ModelSource::default(),
            hosted_model: default_hosted_model(),
            local_model: default_local_model(),
            temperature: default_temperature(),
            single_pass: false,
            extended_examples: false,
            custom_instructions: None,
            llm_cleaning_disabled: false,
        }
    }
}

impl ProcessingConfig {
    /// Get the config file path: ~/.config/narration-prep/config.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("narration-prep")
            .join("config.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: ProcessingConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Model identifier for the selected source
    pub fn active_model(&self) -> &str {
        match self.model_source {
            ModelSource::HostedApi => &self.hosted_model,
            ModelSource::LocalDaemon => &self.local_model,
        }
    }

    /// Store a model identifier for the selected source
    pub fn set_active_model(&mut self, model: &str) {
        match self.model_source {
            ModelSource::HostedApi => self.hosted_model = model.to_string(),
            ModelSource::LocalDaemon => self.local_model = model.to_string(),
        }
    }

    /// Speaker settings, only when speaker prompting is on
    pub fn active_speaker(&self) -> Option<&SpeakerConfig> {
        self.speaker.as_ref().filter(|s| s.is_enabled())
    }

    /// Reject settings no document can be processed with
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.batch_size == 0 {
            return Err(PrepError::Configuration(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.active_model().trim().is_empty() {
            return Err(PrepError::Configuration(format!(
                "no model configured for {}",
                self.model_source
            )));
        }
        if let Some(speaker) = self.active_speaker() {
            if speaker.speaker_count == 0 {
                return Err(PrepError::Configuration(
                    "speaker count must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
