//! Prompts sent to the generation backend.

use crate::speaker::{LabelFormat, NarratorAttribution, SpeakerConfig, SpeakerMode};
use crate::text::CleaningOptions;

const DEFAULT_EXAMPLE_NAMES: [&str; 3] = ["Alice", "Bob", "Charlie"];

fn custom(instructions: Option<&str>) -> Option<&str> {
    instructions.map(str::trim).filter(|s| !s.is_empty())
}

/// Build the stage-one cleaning prompt.
///
/// Every enabled toggle contributes one directive, including the ones that
/// have no deterministic counterpart.
pub fn build_cleaning_prompt(
    text: &str,
    options: &CleaningOptions,
    custom_instructions: Option<&str>,
) -> String {
    let mut tasks = Vec::new();
    if options.replace_smart_quotes {
        tasks.push("* Replace smart quotes with standard ASCII quotes.");
    }
    if options.fix_ocr_errors {
        tasks.push("* Fix OCR errors such as merged words or missing spaces.");
    }
    if options.fix_hyphenation {
        tasks.push("* Repair hyphenation splits introduced by line breaks.");
    }
    if options.correct_spelling {
        tasks.push("* Correct obvious spelling mistakes and typos.");
    }
    if options.remove_urls {
        tasks.push("* Remove URLs, web links, and email addresses.");
    }
    if options.remove_footnotes {
        tasks.push("* Remove footnote markers, metadata, or bracketed references.");
    }
    if options.add_punctuation {
        tasks.push("* Ensure stray headings or numbers end with appropriate punctuation.");
    }

    let mut prompt = String::from(
        "You are a TTS preprocessing assistant. Clean and repair the text using ONLY the listed transformations.\n\n",
    );
    prompt.push_str("Preprocessing Steps:\n");
    prompt.push_str(&tasks.join("\n"));
    prompt.push_str("\n\nRules:\n");
    prompt.push_str("- Preserve the original meaning and paragraph structure.\n");
    prompt.push_str("- Only fix errors; do not rewrite or summarize.\n");
    prompt.push_str("- Return ONLY the cleaned text with no commentary.\n");

    if let Some(extra) = custom(custom_instructions) {
        prompt.push_str(&format!("\nAdditional custom instructions:\n{}\n", extra));
    }

    prompt.push_str(&format!("\nText:\n{}\n\nCleaned:", text));
    prompt
}

/// Build the speaker-labelling prompt, used as stage two or as the only
/// stage in single-pass mode.
pub fn build_speaker_prompt(
    text: &str,
    config: &SpeakerConfig,
    custom_instructions: Option<&str>,
    extended_examples: bool,
) -> String {
    let labels = config.label_format;

    let labelling = match labels {
        LabelFormat::BracketNumbered => {
            "Identify unique speaking characters. Label them dynamically using bracket format: the first character is [1]:, the next is [2]:, etc."
        }
        LabelFormat::SpeakerNumbered => {
            "Identify unique speaking characters. Label them dynamically as Speaker 1:, Speaker 2:, etc."
        }
    };

    let narrator_rule = if config.include_narrator {
        "All non-quoted narration must use the Narrator: tag; never attribute narration to speakers."
    } else {
        "Omit narration; output only spoken dialogue with speaker labels."
    };

    let attribution_rule = match (config.mode, config.narrator_attribution) {
        (SpeakerMode::None | SpeakerMode::Format, _) => {
            "Do not transform attribution tags. Preserve text and punctuation; only add speaker labels."
        }
        (SpeakerMode::Intelligent, NarratorAttribution::Remove) => {
            "Remove redundant attribution tags (e.g., he said) because the speaker label replaces them."
        }
        (SpeakerMode::Intelligent, NarratorAttribution::Verbatim) => {
            "Move attribution tags into a Narrator: line immediately after the spoken line, preserving punctuation."
        }
        (SpeakerMode::Intelligent, NarratorAttribution::Contextual) => {
            "Transform attribution or action tags into concise Narrator: lines, omitting redundant verbs."
        }
    };

    let mut parts: Vec<String> = vec![
        "You are a dialogue structuring assistant for multi-speaker TTS.".to_string(),
        labelling.to_string(),
        narrator_rule.to_string(),
        "Remove quotation marks from dialogue.".to_string(),
        attribution_rule.to_string(),
    ];

    if !config.character_mapping.is_empty() {
        let assignments: Vec<String> = config
            .character_mapping
            .iter()
            .map(|m| format!("{} = {}", m.name, labels.tag(m.speaker_number)))
            .collect();
        parts.push(format!(
            "Character Assignments: {}. Always use these labels for these characters.",
            assignments.join("; ")
        ));
    }

    if let Some(name) = config.narrator_name() {
        parts.push(format!("Narrator Identity: The narrator is \"{}\".", name));
    }

    if let Some(extra) = custom(custom_instructions) {
        parts.push(format!("Additional instructions: {}", extra));
    }

    if extended_examples && config.mode == SpeakerMode::Intelligent {
        let names: Vec<&str> = if config.character_mapping.is_empty() {
            DEFAULT_EXAMPLE_NAMES.to_vec()
        } else {
            config
                .character_mapping
                .iter()
                .map(|m| m.name.as_str())
                .collect()
        };
        let first = names[0];
        let second = names.get(1).copied().unwrap_or(DEFAULT_EXAMPLE_NAMES[1]);

        let mut examples = format!(
            "Examples:\n\
             Input: \"Are you coming to the party?\" {first} asked.\n\
             Output: {} Are you coming to the party?\n\
             Input: \"It's a beautiful day,\" {second} said, looking up.\n\
             Output: {} It's a beautiful day.",
            labels.label(1),
            labels.label(2),
        );
        if config.include_narrator {
            examples.push_str("\nNarrator: They looked up at the sky.");
        }
        parts.push(examples);
    }

    parts.push(format!("\nText:\n{}\n\nFormatted:", text));
    parts.join("\n")
}
