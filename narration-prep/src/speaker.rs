//! Multi-speaker labelling configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{PrepError, Result};

/// How dialogue is labelled by speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeakerMode {
    /// No speaker prompting at all
    #[default]
    None,
    /// Add labels, leave attribution tags untouched
    Format,
    /// Add labels and rewrite attribution per [`NarratorAttribution`]
    Intelligent,
}

impl SpeakerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Format => "format",
            Self::Intelligent => "intelligent",
        }
    }
}

impl FromStr for SpeakerMode {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "format" => Ok(Self::Format),
            "intelligent" => Ok(Self::Intelligent),
            _ => Err(PrepError::Configuration(format!(
                "Unknown speaker mode: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for SpeakerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a speaker label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelFormat {
    /// `Speaker 1:`
    #[default]
    #[serde(alias = "speaker")]
    SpeakerNumbered,
    /// `[1]:`
    #[serde(alias = "bracket")]
    BracketNumbered,
}

impl LabelFormat {
    /// Label without the trailing colon, e.g. `Speaker 2` or `[2]`
    pub fn tag(&self, number: u32) -> String {
        match self {
            Self::SpeakerNumbered => format!("Speaker {}", number),
            Self::BracketNumbered => format!("[{}]", number),
        }
    }

    /// Label as it appears at the start of a line
    pub fn label(&self, number: u32) -> String {
        format!("{}:", self.tag(number))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpeakerNumbered => "speaker-numbered",
            Self::BracketNumbered => "bracket-numbered",
        }
    }
}

impl FromStr for LabelFormat {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "speaker-numbered" | "speaker" => Ok(Self::SpeakerNumbered),
            "bracket-numbered" | "bracket" => Ok(Self::BracketNumbered),
            _ => Err(PrepError::Configuration(format!(
                "Unknown label format: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to attribution tags like "she said" in intelligent mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NarratorAttribution {
    #[default]
    Remove,
    Verbatim,
    Contextual,
}

impl NarratorAttribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Verbatim => "verbatim",
            Self::Contextual => "contextual",
        }
    }
}

impl FromStr for NarratorAttribution {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "remove" => Ok(Self::Remove),
            "verbatim" => Ok(Self::Verbatim),
            "contextual" => Ok(Self::Contextual),
            _ => Err(PrepError::Configuration(format!(
                "Unknown narrator attribution: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for NarratorAttribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named character pinned to a speaker number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMapping {
    pub name: String,
    pub speaker_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerConfig {
    pub mode: SpeakerMode,

    /// Expected number of speakers (advisory)
    pub speaker_count: u32,

    pub label_format: LabelFormat,

    /// Keep narration as `Narrator:` lines instead of dropping it
    pub include_narrator: bool,

    pub narrator_attribution: NarratorAttribution,

    /// Sentences sampled for character discovery (advisory)
    pub sample_size: u32,

    /// Ordered; names are unique, numbers may repeat
    pub character_mapping: Vec<CharacterMapping>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrator_character_name: Option<String>,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            mode: SpeakerMode::None,
            speaker_count: 2,
            label_format: LabelFormat::default(),
            include_narrator: false,
            narrator_attribution: NarratorAttribution::default(),
            sample_size: 50,
            character_mapping: Vec::new(),
            narrator_character_name: None,
        }
    }
}

impl SpeakerConfig {
    /// Default settings for the given mode
    pub fn with_mode(mode: SpeakerMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != SpeakerMode::None
    }

    /// Narrator name with surrounding whitespace removed, if one is set
    pub fn narrator_name(&self) -> Option<&str> {
        self.narrator_character_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Parse `Name = Number` lines into character mappings.
///
/// Blank lines are skipped. Every other line must have a non-empty name and
/// a positive integer, and names may not repeat.
pub fn parse_character_mapping(raw: &str) -> Result<Vec<CharacterMapping>> {
    let mut mappings = Vec::new();
    let mut seen = HashSet::new();

    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let invalid = |reason: &str| PrepError::MappingParse {
            line_number: idx + 1,
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let (name, number) = line
            .split_once('=')
            .ok_or_else(|| invalid("expected `Name = SpeakerNumber`"))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("character name is empty"));
        }

        let speaker_number = match number.trim().parse::<i64>() {
            Ok(n) if n > 0 => u32::try_from(n).map_err(|_| invalid("speaker number is too large"))?,
            Ok(_) => return Err(invalid("speaker number must be positive")),
            Err(_) => return Err(invalid("speaker number is not an integer")),
        };

        if !seen.insert(name.to_string()) {
            return Err(invalid("duplicate character name"));
        }

        mappings.push(CharacterMapping {
            name: name.to_string(),
            speaker_number,
        });
    }

    Ok(mappings)
}
