//! Word list used by the merged-word splitter.
//!
//! The process-wide lexicon is built on first use from a bundled fallback list
//! plus whatever system dictionaries exist, then shared read-only.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// System dictionaries scanned in order; missing files are skipped.
pub const DICTIONARY_PATHS: &[&str] = &[
    "/usr/share/dict/words",
    "/usr/share/dict/american-english",
    "/usr/share/dict/english",
    "/usr/share/dict/british-english",
];

/// Hard cap on lexicon entries.
pub const MAX_LEXICON_SIZE: usize = 60_000;

/// Global lexicon instance (lazy initialization).
static SHARED: OnceLock<Arc<Lexicon>> = OnceLock::new();

#[rustfmt::skip]
const FALLBACK_WORDS: &[&str] = &[
    "a", "able", "about", "above", "after", "again", "against", "air", "all", "along", "also",
    "always", "among", "an", "and", "another", "answer", "any", "anything", "are", "around",
    "as", "ask", "asked", "at", "away", "back", "be", "because", "become", "been", "before",
    "began", "behind", "being", "below", "between", "book", "books", "both", "boy", "brought",
    "but", "by", "call", "called", "can", "cannot", "chapter", "child", "children", "city",
    "come", "could", "dark", "day", "did", "didn", "do", "does", "done", "door", "down", "each",
    "end", "enough", "even", "evening", "ever", "every", "face", "fact", "family", "far",
    "feel", "felt", "few", "find", "first", "for", "form", "found", "friend", "from", "gave",
    "get", "girl", "give", "given", "go", "good", "got", "great", "had", "half", "hand", "has",
    "have", "having", "he", "head", "hear", "heard", "help", "her", "here", "high", "him",
    "his", "home", "house", "how", "however", "if", "in", "into", "is", "it", "its", "just",
    "keep", "king", "knew", "know", "known", "land", "large", "last", "later", "least", "leave",
    "left", "let", "life", "light", "like", "little", "long", "look", "looked", "made", "make",
    "man", "many", "may", "mean", "men", "might", "mind", "moment", "more", "morning", "most",
    "mother", "much", "must", "near", "need", "never", "new", "night", "no", "not", "nothing",
    "now", "of", "off", "old", "on", "once", "one", "only", "open", "or", "other", "our", "out",
    "over", "own", "page", "part", "people", "place", "point", "put", "queen", "read", "right",
    "road", "room", "said", "same", "saw", "say", "says", "see", "seem", "seemed", "shall",
    "she", "should", "side", "since", "small", "so", "some", "someone", "something", "soon",
    "still", "story", "street", "such", "take", "taken", "tell", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "thing", "think", "this", "those", "though",
    "thought", "three", "through", "time", "to", "told", "too", "took", "toward", "turn", "two",
    "under", "up", "upon", "us", "use", "very", "voice", "want", "was", "water", "way", "we",
    "well", "went", "were", "what", "when", "where", "which", "while", "who", "whole", "why",
    "will", "window", "with", "within", "without", "woman", "women", "word", "words", "work",
    "would", "year", "years", "yes", "you", "young", "your",
];

/// Set of lowercase alphabetic words.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    words: HashSet<String>,
}

impl Lexicon {
    /// Lexicon with only the bundled fallback words.
    pub fn fallback() -> Self {
        Self::from_words(FALLBACK_WORDS.iter().copied())
    }

    /// Build a lexicon from arbitrary words. Entries are lowercased; empty or
    /// non-alphabetic entries are ignored.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lexicon = Self::default();
        for word in words {
            lexicon.insert(word.as_ref());
        }
        lexicon
    }

    /// Fallback words plus every dictionary file found, up to
    /// [`MAX_LEXICON_SIZE`] entries.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut lexicon = Self::fallback();
        for path in paths {
            if lexicon.len() >= MAX_LEXICON_SIZE {
                break;
            }
            let path = path.as_ref();
            match std::fs::read(path) {
                Ok(bytes) => {
                    let before = lexicon.len();
                    lexicon.extend_from_dictionary(&String::from_utf8_lossy(&bytes));
                    log::debug!(
                        "Loaded {} words from {}",
                        lexicon.len() - before,
                        path.display()
                    );
                }
                Err(_) => continue,
            }
        }
        lexicon
    }

    /// The process-wide lexicon, loading it on first call.
    pub fn shared() -> Arc<Lexicon> {
        SHARED
            .get_or_init(|| {
                let lexicon = Self::load(DICTIONARY_PATHS);
                log::debug!("Lexicon ready with {} words", lexicon.len());
                Arc::new(lexicon)
            })
            .clone()
    }

    /// Membership test for an already-lowercased word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn insert(&mut self, word: &str) -> bool {
        let word = word.trim();
        if word.is_empty() || !word.chars().all(char::is_alphabetic) {
            return false;
        }
        self.words.insert(word.to_lowercase())
    }

    fn extend_from_dictionary(&mut self, content: &str) {
        for line in content.lines() {
            if self.len() >= MAX_LEXICON_SIZE {
                break;
            }
            self.insert(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fallback_has_common_words() {
        let lexicon = Lexicon::fallback();
        assert!(lexicon.len() > 250);
        assert!(lexicon.contains("the"));
        assert!(lexicon.contains("book"));
        assert!(!lexicon.contains("zzzqqqxxx"));
    }

    #[test]
    fn test_from_words_normalizes() {
        let lexicon = Lexicon::from_words(["Hello", "  world ", "it's", "", "abc123"]);
        assert_eq!(lexicon.len(), 2);
        assert!(lexicon.contains("hello"));
        assert!(lexicon.contains("world"));
    }

    #[test]
    fn test_load_reads_dictionary_and_skips_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Zeppelin\nquixotic\n\nnot-a-word\n42").unwrap();

        let lexicon = Lexicon::load(&[
            std::path::PathBuf::from("/definitely/not/here"),
            file.path().to_path_buf(),
        ]);
        assert!(lexicon.contains("zeppelin"));
        assert!(lexicon.contains("quixotic"));
        assert!(!lexicon.contains("not-a-word"));
        assert!(lexicon.contains("the"));
    }

    #[test]
    fn test_dictionary_scan_respects_cap() {
        let mut lexicon = Lexicon::fallback();
        let words: String = (0..MAX_LEXICON_SIZE + 500)
            .map(|i| format!("{}\n", synthetic_word(i)))
            .collect();
        lexicon.extend_from_dictionary(&words);
        assert_eq!(lexicon.len(), MAX_LEXICON_SIZE);
    }

    #[test]
    fn test_shared_is_memoized() {
        let first = Lexicon::shared();
        let second = Lexicon::shared();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.contains("the"));
    }

    /// Distinct alphabetic word for an index: base-26 letters.
    fn synthetic_word(mut i: usize) -> String {
        let mut word = String::from("q");
        loop {
            word.push((b'a' + (i % 26) as u8) as char);
            i /= 26;
            if i == 0 {
                break;
            }
        }
        word
    }
}
