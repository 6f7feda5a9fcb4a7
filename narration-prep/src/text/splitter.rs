//! Dictionary-guided splitting of words that OCR glued together.
//!
//! The search is greedy: split points are tried from the longest valid left
//! prefix down, the first one whose remainder is a word (or can itself be
//! split) wins. Results are memoized per splitter, so a splitter should live
//! for one cleaning call.

use std::collections::HashMap;

use super::lexicon::Lexicon;

/// Tokens shorter than this are never split.
pub const MIN_TOKEN_LEN: usize = 6;

/// Tokens longer than this are left alone.
pub const MAX_TOKEN_LEN: usize = 30;

/// Shortest fragment on either side of a split.
const MIN_FRAGMENT_LEN: usize = 3;

/// Deepest recursion into the right-hand remainder.
const MAX_DEPTH: usize = 3;

pub struct WordSplitter<'a> {
    lexicon: &'a Lexicon,
    /// (lowercased fragment, depth) -> fragment lengths of the split
    memo: HashMap<(String, usize), Option<Vec<usize>>>,
}

impl<'a> WordSplitter<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self {
            lexicon,
            memo: HashMap::new(),
        }
    }

    /// Split an ASCII-alphabetic token into lexicon words, keeping the
    /// token's original casing. Returns `None` when no split applies.
    pub fn split<'t>(&mut self, token: &'t str) -> Option<Vec<&'t str>> {
        if token.len() < MIN_TOKEN_LEN
            || token.len() > MAX_TOKEN_LEN
            || !token.bytes().all(|b| b.is_ascii_alphabetic())
        {
            return None;
        }

        let lower = token.to_ascii_lowercase();
        if self.lexicon.contains(&lower) {
            return None;
        }

        let lengths = self.find(&lower, 0)?;
        let mut parts = Vec::with_capacity(lengths.len());
        let mut start = 0;
        for len in lengths {
            parts.push(&token[start..start + len]);
            start += len;
        }
        Some(parts)
    }

    fn find(&mut self, lower: &str, depth: usize) -> Option<Vec<usize>> {
        if depth > MAX_DEPTH || lower.len() < MIN_TOKEN_LEN || self.lexicon.contains(lower) {
            return None;
        }

        let key = (lower.to_string(), depth);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }

        let mut found = None;
        for i in (MIN_FRAGMENT_LEN..=lower.len() - MIN_FRAGMENT_LEN).rev() {
            let (left, right) = lower.split_at(i);
            if !self.lexicon.contains(left) {
                continue;
            }
            if self.lexicon.contains(right) {
                found = Some(vec![i, right.len()]);
                break;
            }
            if let Some(rest) = self.find(right, depth + 1) {
                let mut lengths = Vec::with_capacity(rest.len() + 1);
                lengths.push(i);
                lengths.extend(rest);
                found = Some(lengths);
                break;
            }
        }

        self.memo.insert(key, found.clone());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::from_words(["the", "book", "was", "open", "here", "there", "and", "table"])
    }

    #[test]
    fn test_two_word_split() {
        let lexicon = lexicon();
        let mut splitter = WordSplitter::new(&lexicon);
        assert_eq!(splitter.split("thebook"), Some(vec!["the", "book"]));
    }

    #[test]
    fn test_preserves_case() {
        let lexicon = lexicon();
        let mut splitter = WordSplitter::new(&lexicon);
        assert_eq!(splitter.split("TheBook"), Some(vec!["The", "Book"]));
    }

    #[test]
    fn test_prefers_longest_left_prefix() {
        let lexicon = lexicon();
        let mut splitter = WordSplitter::new(&lexicon);
        // "there" + "book" beats "the" + "rebook"
        assert_eq!(splitter.split("therebook"), Some(vec!["there", "book"]));
    }

    #[test]
    fn test_recursive_split() {
        let lexicon = lexicon();
        let mut splitter = WordSplitter::new(&lexicon);
        assert_eq!(
            splitter.split("thebookwasopen"),
            Some(vec!["the", "book", "was", "open"])
        );
    }

    #[test]
    fn test_no_split_found() {
        let lexicon = lexicon();
        let mut splitter = WordSplitter::new(&lexicon);
        assert_eq!(splitter.split("zzzqqqxxx"), None);
    }

    #[test]
    fn test_known_word_untouched() {
        let lexicon = Lexicon::from_words(["the", "book", "thebook"]);
        let mut splitter = WordSplitter::new(&lexicon);
        assert_eq!(splitter.split("thebook"), None);
    }

    #[test]
    fn test_length_bounds() {
        let lexicon = lexicon();
        let mut splitter = WordSplitter::new(&lexicon);
        assert_eq!(splitter.split("theand"), Some(vec!["the", "and"]));
        assert_eq!(splitter.split("thebk"), None);

        let long = "thebook".repeat(5);
        assert!(long.len() > MAX_TOKEN_LEN);
        assert_eq!(splitter.split(&long), None);
    }

    #[test]
    fn test_depth_limit() {
        let lexicon = lexicon();
        let mut splitter = WordSplitter::new(&lexicon);
        // Needs four nested splits of the remainder; the cap allows three.
        assert_eq!(
            splitter.split("thebookwasopenthe"),
            Some(vec!["the", "book", "was", "open", "the"])
        );
        assert_eq!(splitter.split("thebookwasopenthebook"), None);
    }
}
