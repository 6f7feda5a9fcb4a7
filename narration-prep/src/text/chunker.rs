//! Sentence splitting and grouping into generation-sized chunks.

use once_cell::sync::Lazy;
use regex::Regex;

/// A run of non-terminal characters closed by terminal punctuation or end of text.
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+(?:[.!?]+|$)").unwrap());

/// Split text into trimmed, non-empty sentences.
///
/// Text with no sentence match at all is returned as a single sentence.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() && !text.trim().is_empty() {
        sentences.push(text.trim().to_string());
    }

    sentences
}

/// Group sentences into chunks of `batch_size` sentences joined by spaces.
///
/// The final chunk may be shorter. A batch size of zero is treated as one.
///
/// # Returns
/// Chunks in input order; empty only for blank input.
pub fn split_into_chunks(text: &str, batch_size: usize) -> Vec<String> {
    let batch_size = batch_size.max(1);

    split_into_sentences(text)
        .chunks(batch_size)
        .map(|group| group.join(" "))
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let sentences = split_into_sentences("Hello world. How are you?! Fine...");
        assert_eq!(sentences, vec!["Hello world.", "How are you?!", "Fine..."]);
    }

    #[test]
    fn test_trailing_fragment_is_a_sentence() {
        let sentences = split_into_sentences("First one. and a dangling tail");
        assert_eq!(sentences, vec!["First one.", "and a dangling tail"]);
    }

    #[test]
    fn test_no_terminal_punctuation() {
        let chunks = split_into_chunks("just some words without an end", 3);
        assert_eq!(chunks, vec!["just some words without an end"]);
    }

    #[test]
    fn test_only_punctuation_is_kept_whole() {
        assert_eq!(split_into_sentences("..."), vec!["..."]);
    }

    #[test]
    fn test_chunk_sizes() {
        let text = "One. Two. Three. Four. Five. Six. Seven.";
        let chunks = split_into_chunks(text, 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "One. Two. Three.");
        assert_eq!(chunks[1], "Four. Five. Six.");
        assert_eq!(chunks[2], "Seven.");

        let sizes: Vec<usize> = chunks
            .iter()
            .map(|c| split_into_sentences(c).len())
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);

        let rejoined = chunks.join(" ");
        assert_eq!(split_into_sentences(&rejoined), split_into_sentences(text));
    }

    #[test]
    fn test_newlines_collapse_into_chunk() {
        let chunks = split_into_chunks("Line one.\n\nLine two!\nLine three?", 10);
        assert_eq!(chunks, vec!["Line one. Line two! Line three?"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(split_into_chunks("", 5).is_empty());
        assert!(split_into_chunks("   \n\n  ", 5).is_empty());
    }

    #[test]
    fn test_zero_batch_size_is_one() {
        let chunks = split_into_chunks("A. B.", 0);
        assert_eq!(chunks, vec!["A.", "B."]);
    }
}
