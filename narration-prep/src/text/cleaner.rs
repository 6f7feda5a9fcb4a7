//! Deterministic text cleaning for TTS preparation.
//!
//! Steps run in a fixed order and each is recorded only when it changed the
//! text. Regex rules are applied until stable so overlapping matches (for
//! example `a-\nb-\nc`) are all handled, and whole passes repeat until nothing
//! changes. Cleaning its own output is therefore a no-op.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::lexicon::Lexicon;
use super::splitter::WordSplitter;
use super::{AppliedStep, CleaningOptions, Phase};

/// Characters normalized by the smart-quote step and their replacements.
const SMART_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{201c}', "\""),  // Left double quote
    ('\u{201d}', "\""),  // Right double quote
    ('\u{201e}', "\""),  // Double low-9 quote
    ('\u{00ab}', "\""),  // Left-pointing double angle quote
    ('\u{00bb}', "\""),  // Right-pointing double angle quote
    ('\u{2039}', "\""),  // Single left-pointing angle quote
    ('\u{203a}', "\""),  // Single right-pointing angle quote
    ('\u{2018}', "'"),   // Left single quote
    ('\u{2019}', "'"),   // Right single quote
    ('\u{201a}', "'"),   // Single low-9 quote
    ('\u{201b}', "'"),   // Single high-reversed-9 quote
    ('\u{2013}', "-"),   // En dash
    ('\u{2014}', "-"),   // Em dash
    ('\u{2212}', "-"),   // Minus sign
    ('\u{2010}', "-"),   // Hyphen
    ('\u{2011}', "-"),   // Non-breaking hyphen
    ('\u{2012}', "-"),   // Figure dash
    ('\u{2026}', "..."), // Ellipsis
    ('\u{2022}', "-"),   // Bullet
    ('\u{00b7}', "-"),   // Middle dot
    ('\u{00a0}', " "),   // Non-breaking space
];

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>()]+").unwrap());
static BRACKET_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[\s*(?:[0-9]+|[ivxlcdmIVXLCDM]+)(?:[\s,.;:-]*(?:[0-9]+|[ivxlcdmIVXLCDM]+))*\s*\]",
    )
    .unwrap()
});
static PAREN_FOOTNOTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\(\s*(?:[0-9]+|[ivxlcdmIVXLCDM]+)(?:[\s,.;:-]*(?:[0-9]+|[ivxlcdmIVXLCDM]+))*\s*\)",
    )
    .unwrap()
});
static HYPHEN_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z])-\s*\n\s*([A-Za-z])").unwrap());
static LINE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z])[ \t]*\n[ \t]*([A-Za-z])").unwrap());
static CAMEL_CASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z][a-z]+)").unwrap());
static MERGED_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]{6,}\b").unwrap());
static SPACE_BEFORE_NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());
static SPACE_AFTER_NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]+").unwrap());
static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static EXCESS_NEWLINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Upper bound on full passes over the text.
const MAX_PASSES: usize = 8;

/// Upper bound on re-applying a single regex rule.
const MAX_RULE_ITERATIONS: usize = 64;

/// Cleaned text and the steps that changed it, in pipeline order.
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningOutcome {
    pub text: String,
    pub applied: Vec<AppliedStep>,
}

/// Clean text using the process-wide lexicon.
///
/// The lexicon is only loaded when OCR repair is enabled.
pub fn clean(text: &str, options: &CleaningOptions, phase: Phase) -> CleaningOutcome {
    if options.fix_ocr_errors {
        let lexicon = Lexicon::shared();
        Cleaner::new(options, phase, Some(lexicon.as_ref())).run(text)
    } else {
        Cleaner::new(options, phase, None).run(text)
    }
}

/// Clean text against an explicit lexicon.
pub fn clean_with_lexicon(
    text: &str,
    options: &CleaningOptions,
    phase: Phase,
    lexicon: &Lexicon,
) -> CleaningOutcome {
    Cleaner::new(options, phase, Some(lexicon)).run(text)
}

struct Cleaner<'a> {
    options: &'a CleaningOptions,
    phase: Phase,
    splitter: Option<WordSplitter<'a>>,
}

impl<'a> Cleaner<'a> {
    fn new(options: &'a CleaningOptions, phase: Phase, lexicon: Option<&'a Lexicon>) -> Self {
        Self {
            options,
            phase,
            splitter: lexicon.map(WordSplitter::new),
        }
    }

    fn run(mut self, input: &str) -> CleaningOutcome {
        let mut applied = Vec::new();
        let mut text = input.to_string();

        for _ in 0..MAX_PASSES {
            let next = self.pass(&text, &mut applied);
            if next == text {
                break;
            }
            text = next;
        }

        applied.sort();
        CleaningOutcome { text, applied }
    }

    fn pass(&mut self, input: &str, applied: &mut Vec<AppliedStep>) -> String {
        let mut text = input.to_string();

        if self.options.replace_smart_quotes {
            text = apply_step(text, AppliedStep::ReplaceSmartQuotes, applied, |t| {
                replace_smart_punctuation(t)
            });
        }

        if self.options.remove_urls {
            text = apply_step(text, AppliedStep::RemoveUrls, applied, remove_urls);
        }

        if self.options.remove_footnotes && self.phase == Phase::Pre {
            text = apply_step(text, AppliedStep::RemoveFootnotes, applied, remove_references);
        }

        if self.options.fix_hyphenation {
            text = apply_step(text, AppliedStep::FixHyphenation, applied, fix_hyphenation);
        }

        if self.options.fix_ocr_errors {
            text = apply_step(text, AppliedStep::SplitCamelCase, applied, split_camel_case);
            if let Some(splitter) = self.splitter.as_mut() {
                text = apply_step(text, AppliedStep::SplitMergedWords, applied, |t| {
                    split_merged_words(t, splitter)
                });
            }
        }

        normalize_spacing(&text)
    }
}

/// Run one step, recording it (once) if it changed the text.
fn apply_step<F>(text: String, step: AppliedStep, applied: &mut Vec<AppliedStep>, f: F) -> String
where
    F: FnOnce(&str) -> String,
{
    let changed = f(&text);
    if changed == text {
        return text;
    }
    if !applied.contains(&step) {
        applied.push(step);
    }
    changed
}

/// Apply a rewrite until it stops changing the text.
fn until_stable<F>(text: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut current = text.to_string();
    for _ in 0..MAX_RULE_ITERATIONS {
        let next = f(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn replace_smart_punctuation(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match SMART_REPLACEMENTS.iter().find(|(ch, _)| *ch == c) {
            Some((_, replacement)) => result.push_str(replacement),
            None => result.push(c),
        }
    }
    result
}

fn remove_urls(text: &str) -> String {
    URL_RE.replace_all(text, " ").into_owned()
}

fn remove_references(text: &str) -> String {
    until_stable(text, |t| {
        let t = BRACKET_REFERENCE_RE.replace_all(t, " ");
        PAREN_FOOTNOTE_RE.replace_all(&t, " ").into_owned()
    })
}

fn fix_hyphenation(text: &str) -> String {
    let joined = until_stable(text, |t| {
        HYPHEN_BREAK_RE.replace_all(t, "${1}${2}").into_owned()
    });
    until_stable(&joined, |t| {
        LINE_BREAK_RE.replace_all(t, "${1} ${2}").into_owned()
    })
}

fn split_camel_case(text: &str) -> String {
    until_stable(text, |t| {
        CAMEL_CASE_RE.replace_all(t, "${1} ${2}").into_owned()
    })
}

fn split_merged_words(text: &str, splitter: &mut WordSplitter<'_>) -> String {
    MERGED_WORD_RE
        .replace_all(text, |caps: &Captures| {
            let word = &caps[0];
            match splitter.split(word) {
                Some(parts) => parts.join(" "),
                None => word.to_string(),
            }
        })
        .into_owned()
}

/// Tidy whitespace around newlines, collapse runs of spaces and blank lines, trim.
fn normalize_spacing(text: &str) -> String {
    let text = SPACE_BEFORE_NEWLINE_RE.replace_all(text, "\n");
    let text = SPACE_AFTER_NEWLINE_RE.replace_all(&text, "\n");
    let text = MULTI_SPACE_RE.replace_all(&text, " ");
    let text = EXCESS_NEWLINES_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn only(f: impl FnOnce(&mut CleaningOptions)) -> CleaningOptions {
        let mut options = CleaningOptions::none();
        f(&mut options);
        options
    }

    fn all_enabled() -> CleaningOptions {
        CleaningOptions {
            replace_smart_quotes: true,
            fix_ocr_errors: true,
            correct_spelling: true,
            remove_urls: true,
            remove_footnotes: true,
            add_punctuation: true,
            fix_hyphenation: true,
        }
    }

    fn run(text: &str, options: &CleaningOptions, phase: Phase) -> CleaningOutcome {
        clean_with_lexicon(text, options, phase, &Lexicon::fallback())
    }

    #[test]
    fn test_smart_quotes() {
        let options = only(|o| o.replace_smart_quotes = true);
        let outcome = run("He said \u{201c}hi\u{201d}", &options, Phase::Pre);
        assert_eq!(outcome.text, "He said \"hi\"");
        assert_eq!(outcome.applied, vec![AppliedStep::ReplaceSmartQuotes]);
    }

    #[test]
    fn test_dashes_ellipsis_and_nbsp() {
        let options = only(|o| o.replace_smart_quotes = true);
        let outcome = run(
            "one\u{2013}two\u{2014}three\u{2026} \u{00ab}x\u{00bb}\u{00a0}\u{2022} it\u{2019}s",
            &options,
            Phase::Pre,
        );
        assert_eq!(outcome.text, "one-two-three... \"x\" - it's");
    }

    #[test]
    fn test_url_removal() {
        let options = only(|o| o.remove_urls = true);
        let outcome = run("Visit https://x.io/y now", &options, Phase::Pre);
        assert!(!outcome.text.contains("http"));
        assert_eq!(outcome.text, "Visit now");
        assert_eq!(outcome.applied, vec![AppliedStep::RemoveUrls]);

        let outcome = run("See WWW.Example.com/page (or not)", &options, Phase::Pre);
        assert_eq!(outcome.text, "See (or not)");
    }

    #[test]
    fn test_footnotes_only_in_pre_phase() {
        let options = only(|o| o.remove_footnotes = true);

        let pre = run("Fact[1] stated.", &options, Phase::Pre);
        assert_eq!(pre.text, "Fact stated.");
        assert_eq!(pre.applied, vec![AppliedStep::RemoveFootnotes]);

        let post = run("Fact[1] stated.", &options, Phase::Post);
        assert_eq!(post.text, "Fact[1] stated.");
        assert!(post.applied.is_empty());
    }

    #[test]
    fn test_footnote_variants() {
        let options = only(|o| o.remove_footnotes = true);
        let outcome = run(
            "A claim [12, 14-16] and another (iv) and (3; 5) remain.",
            &options,
            Phase::Pre,
        );
        assert_eq!(outcome.text, "A claim and another and remain.");
    }

    #[test]
    fn test_footnotes_keep_parenthetical_prose() {
        let options = only(|o| o.remove_footnotes = true);
        let text = "He left (as he always did) before [the end].";
        let outcome = run(text, &options, Phase::Pre);
        assert_eq!(outcome.text, text);
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_nested_reference_fully_removed() {
        let options = only(|o| o.remove_footnotes = true);
        let outcome = run("Text [1[2]] here.", &options, Phase::Pre);
        assert_eq!(outcome.text, "Text here.");
    }

    #[test]
    fn test_hyphenation_repair() {
        let options = only(|o| o.fix_hyphenation = true);
        let outcome = run("an exam-\nple of line\nbreaks", &options, Phase::Pre);
        assert_eq!(outcome.text, "an example of line breaks");
        assert_eq!(outcome.applied, vec![AppliedStep::FixHyphenation]);
    }

    #[test]
    fn test_hyphenation_chains() {
        let options = only(|o| o.fix_hyphenation = true);
        assert_eq!(run("a-\nb-\nc", &options, Phase::Pre).text, "abc");
        assert_eq!(run("a\nb\nc", &options, Phase::Pre).text, "a b c");
    }

    #[test]
    fn test_hyphenation_keeps_paragraphs() {
        let options = only(|o| o.fix_hyphenation = true);
        let outcome = run("End of one.\n\nStart of two", &options, Phase::Pre);
        assert_eq!(outcome.text, "End of one.\n\nStart of two");
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_camel_case_split() {
        let options = only(|o| o.fix_ocr_errors = true);
        let outcome = run("the endOf the road", &options, Phase::Pre);
        assert_eq!(outcome.text, "the end Of the road");
        assert_eq!(outcome.applied, vec![AppliedStep::SplitCamelCase]);
    }

    #[test]
    fn test_merged_word_split() {
        let options = only(|o| o.fix_ocr_errors = true);
        let lexicon = Lexicon::from_words(["the", "book"]);
        let outcome = clean_with_lexicon("thebook", &options, Phase::Pre, &lexicon);
        assert_eq!(outcome.text, "the book");
        assert_eq!(outcome.applied, vec![AppliedStep::SplitMergedWords]);

        let outcome = clean_with_lexicon("zzzqqqxxx", &options, Phase::Pre, &lexicon);
        assert_eq!(outcome.text, "zzzqqqxxx");
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_whitespace_normalization_always_runs() {
        let outcome = run(
            "  Hello   world \n\n\n\n\t New\tparagraph  ",
            &CleaningOptions::none(),
            Phase::Pre,
        );
        assert_eq!(outcome.text, "Hello world\n\nNew\tparagraph");
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_steps_reported_in_pipeline_order() {
        let outcome = run(
            "\u{201c}Read[2] www.a.io the exam-\nple\u{201d} endOf",
            &all_enabled(),
            Phase::Pre,
        );
        assert_eq!(
            outcome.applied,
            vec![
                AppliedStep::ReplaceSmartQuotes,
                AppliedStep::RemoveUrls,
                AppliedStep::RemoveFootnotes,
                AppliedStep::FixHyphenation,
                AppliedStep::SplitCamelCase,
            ]
        );
    }

    #[test]
    fn test_cross_step_cascade_is_resolved() {
        // Hyphenation repair reveals a URL that only a second pass can remove.
        let options = only(|o| {
            o.remove_urls = true;
            o.fix_hyphenation = true;
        });
        let outcome = run("see ww-\nw.example.com today", &options, Phase::Pre);
        assert_eq!(outcome.text, "see today");

        let again = run(&outcome.text, &options, Phase::Pre);
        assert_eq!(again.text, outcome.text);
        assert!(again.applied.is_empty());
    }

    #[test]
    fn test_clean_without_ocr_skips_lexicon() {
        let options = only(|o| o.replace_smart_quotes = true);
        let outcome = clean("teh book.  it was gud.", &options, Phase::Pre);
        assert_eq!(outcome.text, "teh book. it was gud.");
    }

    proptest! {
        #[test]
        fn prop_cleaning_is_idempotent(
            text in "[a-zA-Z0-9 .,()\\[\\]\n\t-]{0,60}|[a-z \u{201c}\u{201d}\u{2019}\u{2014}\u{2026}\u{00a0}wth:/.]{0,60}",
            pre in any::<bool>(),
        ) {
            let options = all_enabled();
            let phase = if pre { Phase::Pre } else { Phase::Post };
            let once = run(&text, &options, phase);
            let twice = run(&once.text, &options, phase);
            prop_assert_eq!(&twice.text, &once.text);
            prop_assert!(twice.applied.is_empty());
        }
    }
}
