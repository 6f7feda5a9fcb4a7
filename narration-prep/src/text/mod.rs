//! Deterministic text processing: cleaning, lexicon lookups and chunking.

pub mod chunker;
pub mod cleaner;
pub mod lexicon;
mod splitter;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use chunker::{split_into_chunks, split_into_sentences};
pub use cleaner::{CleaningOutcome, clean, clean_with_lexicon};
pub use lexicon::Lexicon;

/// Independent toggles for the cleaning steps.
///
/// `correct_spelling` and `add_punctuation` have no deterministic step; they
/// only add directives to the generative cleaning prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningOptions {
    pub replace_smart_quotes: bool,
    pub fix_ocr_errors: bool,
    pub correct_spelling: bool,
    pub remove_urls: bool,
    pub remove_footnotes: bool,
    pub add_punctuation: bool,
    pub fix_hyphenation: bool,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            replace_smart_quotes: true,
            fix_ocr_errors: true,
            correct_spelling: false,
            remove_urls: true,
            remove_footnotes: true,
            add_punctuation: true,
            fix_hyphenation: false,
        }
    }
}

impl CleaningOptions {
    /// Every toggle off; useful as a base for enabling single steps.
    pub fn none() -> Self {
        Self {
            replace_smart_quotes: false,
            fix_ocr_errors: false,
            correct_spelling: false,
            remove_urls: false,
            remove_footnotes: false,
            add_punctuation: false,
            fix_hyphenation: false,
        }
    }
}

/// When a cleaning pass runs relative to generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Before generation; footnote removal only runs here
    #[default]
    Pre,
    /// Over generated output
    Post,
}

/// Named record that a transformation changed the text.
///
/// Variants are declared in pipeline order; sorting restores that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppliedStep {
    ReplaceSmartQuotes,
    RemoveUrls,
    RemoveFootnotes,
    FixHyphenation,
    SplitCamelCase,
    SplitMergedWords,
    LlmCleaning,
    LlmSpeakerFormatting,
    LlmSpeakerSinglePass,
}

impl AppliedStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReplaceSmartQuotes => "replaceSmartQuotes",
            Self::RemoveUrls => "removeUrls",
            Self::RemoveFootnotes => "removeFootnotes",
            Self::FixHyphenation => "fixHyphenation",
            Self::SplitCamelCase => "splitCamelCase",
            Self::SplitMergedWords => "splitMergedWords",
            Self::LlmCleaning => "llmCleaning",
            Self::LlmSpeakerFormatting => "llmSpeakerFormatting",
            Self::LlmSpeakerSinglePass => "llmSpeakerSinglePass",
        }
    }
}

impl fmt::Display for AppliedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CleaningOptions::default();
        assert!(options.replace_smart_quotes);
        assert!(options.fix_ocr_errors);
        assert!(!options.correct_spelling);
        assert!(!options.fix_hyphenation);
    }

    #[test]
    fn test_partial_options_fill_defaults() {
        let options: CleaningOptions = toml::from_str("fix_hyphenation = true").unwrap();
        assert!(options.fix_hyphenation);
        assert!(options.remove_urls);
    }

    #[test]
    fn test_step_names_match_serde() {
        let json = serde_json::to_string(&AppliedStep::LlmSpeakerSinglePass).unwrap();
        assert_eq!(json, "\"llmSpeakerSinglePass\"");
        assert_eq!(AppliedStep::SplitMergedWords.to_string(), "splitMergedWords");
    }
}
