//! Text normalization
//!
//! Deterministic cleaning applied to every message before vectorization.
//! The exact same transform must run at serving time and during any offline
//! evaluation; a second, laxer profile that kept short tokens used to feed
//! the same persisted model, so the stricter profile is now the only one.
//!
//! The stopword set is part of the profile and must match the one the model
//! was trained with. The default is the compact NLTK English list; an
//! aggressive list would swallow discriminative tokens ("free", "click")
//! before the classifier ever sees them.

use std::collections::HashSet;

use regex::Regex;
use stop_words::{get, LANGUAGE};
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

/// Minimum surviving token length, in characters
pub const MIN_TOKEN_LENGTH: usize = 3;

/// The default English stopword set
#[must_use]
pub fn default_stopwords() -> HashSet<String> {
    get(LANGUAGE::English)
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Deterministic text cleaner: lowercase, letters-only, stopword and
/// short-token removal
pub struct TextNormalizer {
    non_letter_regex: Regex,
    extra_spaces_regex: Regex,
    stopwords: HashSet<String>,
    min_token_length: usize,
}

impl TextNormalizer {
    /// Create a normalizer with the default English profile
    pub fn new() -> Result<Self> {
        Self::with_min_token_length(MIN_TOKEN_LENGTH)
    }

    /// Create a normalizer with a custom short-token cutoff
    pub fn with_min_token_length(min_token_length: usize) -> Result<Self> {
        Self::with_profile(default_stopwords(), min_token_length)
    }

    /// Create a normalizer with a caller-supplied stopword set and cutoff
    pub fn with_profile(stopwords: HashSet<String>, min_token_length: usize) -> Result<Self> {
        // Runs after lowercasing, so uppercase letters are already gone
        let non_letter_regex = Regex::new(r"[^a-z\s]")
            .map_err(|e| anyhow::anyhow!("Failed to compile letter regex: {e}"))?;
        let extra_spaces_regex = Regex::new(r"\s+")
            .map_err(|e| anyhow::anyhow!("Failed to compile spaces regex: {e}"))?;

        Ok(Self {
            non_letter_regex,
            extra_spaces_regex,
            stopwords,
            min_token_length,
        })
    }

    /// Clean a message for classification.
    ///
    /// Fails closed: empty or whitespace-only input yields an empty string.
    /// Digits and punctuation are stripped outright, which also dismantles
    /// URLs and email addresses; their signal is preserved separately by the
    /// feature extractor, which reads the raw message.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        // Normalize unicode, then lowercase
        let lowered = text.nfc().collect::<String>().to_lowercase();

        // Keep only ascii letters and whitespace
        let letters_only = self.non_letter_regex.replace_all(&lowered, "");

        // Collapse whitespace runs and trim
        let collapsed = self
            .extra_spaces_regex
            .replace_all(&letters_only, " ")
            .trim()
            .to_string();

        // Drop stopwords and short tokens, rejoin with single spaces
        collapsed
            .split_whitespace()
            .filter(|word| !self.stopwords.contains(*word) && word.len() >= self.min_token_length)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True if the token would be removed by normalization
    #[must_use]
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new().expect("Failed to create normalizer")
    }

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        let n = normalizer();
        assert_eq!(n.normalize("FREE Prize!!!"), "free prize");
    }

    #[test]
    fn test_strips_digits_and_urls() {
        let n = normalizer();
        let cleaned = n.normalize("Click http://bit.ly/123 now, win 5000");
        assert!(!cleaned.contains('5'));
        assert!(!cleaned.contains("://"));
        assert!(cleaned.contains("click"));
        assert!(cleaned.contains("win"));
    }

    #[test]
    fn test_collapses_whitespace() {
        let n = normalizer();
        assert_eq!(n.normalize("  winner   winner    lottery "), "winner winner lottery");
    }

    #[test]
    fn test_removes_stopwords_and_short_tokens() {
        let n = normalizer();
        let cleaned = n.normalize("this is a go ok winning lottery ticket");
        assert!(!cleaned.contains("this"));
        assert!(!cleaned.split_whitespace().any(|w| w == "go"));
        assert!(!cleaned.split_whitespace().any(|w| w == "ok"));
        assert!(cleaned.contains("winning"));
        assert!(cleaned.contains("lottery"));
    }

    #[test]
    fn test_default_profile_keeps_discriminative_tokens() {
        // Common spam markers must survive cleaning or the classifier
        // never sees them
        let n = normalizer();
        for word in ["free", "click", "winner", "prize", "cash"] {
            assert!(!n.is_stopword(word), "{word} must not be a stopword");
        }
        assert!(n.is_stopword("the"));
        assert!(n.is_stopword("your"));

        let cleaned = n.normalize("Congratulations! You WON a FREE iphone! Click http://bit.ly/x now!!!");
        assert!(cleaned.contains("free"));
        assert!(cleaned.contains("click"));
        assert!(cleaned.contains("congratulations"));
    }

    #[test]
    fn test_custom_stopword_profile() {
        let stopwords: HashSet<String> = ["lottery".to_string()].into_iter().collect();
        let n = TextNormalizer::with_profile(stopwords, 1)
            .expect("Failed to create normalizer");
        assert_eq!(n.normalize("the lottery winner"), "the winner");
    }

    #[test]
    fn test_fails_closed_on_empty_input() {
        let n = normalizer();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   \t\n"), "");
    }

    #[test]
    fn test_stopword_only_message_normalizes_to_empty() {
        let n = normalizer();
        assert_eq!(n.normalize("the a an !!!"), "");
    }

    proptest! {
        #[test]
        fn normalize_is_deterministic(s in ".*") {
            let n = normalizer();
            prop_assert_eq!(n.normalize(&s), n.normalize(&s));
        }

        #[test]
        fn normalize_emits_only_letters_and_spaces(s in ".*") {
            let n = normalizer();
            let cleaned = n.normalize(&s);
            prop_assert!(cleaned
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == ' '));
        }
    }
}
