//! Structural feature extraction
//!
//! Derives lightweight signals from the raw message, independent of the
//! classifier. Normalization strips digits, URLs and casing, so these
//! features must be read off the original text or the signal is gone.

use regex::Regex;

use crate::error::Result;
use crate::models::FeatureSet;

/// Extracts structural features from raw message text
pub struct FeatureExtractor {
    email_regex: Regex,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new() -> Result<Self> {
        let email_regex = Regex::new(r"\S+@\S+")
            .map_err(|e| anyhow::anyhow!("Failed to compile email regex: {e}"))?;
        Ok(Self { email_regex })
    }

    /// Extract features from the raw (pre-normalization) message.
    ///
    /// Empty input produces zeroed defaults; there are no failure modes.
    #[must_use]
    pub fn extract(&self, raw_text: &str) -> FeatureSet {
        let word_count = raw_text.split_whitespace().count();
        let char_count = raw_text.chars().count();
        let uppercase_count = raw_text.chars().filter(|c| c.is_uppercase()).count();
        let lowered = raw_text.to_lowercase();

        FeatureSet {
            word_count,
            char_count,
            avg_word_length: char_count as f64 / word_count.max(1) as f64,
            has_url: lowered.contains("http") || lowered.contains("www"),
            has_email: self.email_regex.is_match(raw_text),
            has_numbers: raw_text.chars().any(|c| c.is_ascii_digit()),
            uppercase_ratio: uppercase_count as f64 / char_count.max(1) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new().expect("Failed to create feature extractor")
    }

    #[test]
    fn test_counts() {
        let features = extractor().extract("Hello world");
        assert_eq!(features.word_count, 2);
        assert_eq!(features.char_count, 11);
        assert!((features.avg_word_length - 5.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_url_and_email_signals() {
        let e = extractor();
        assert!(e.extract("visit http://example.com").has_url);
        assert!(e.extract("go to WWW.EXAMPLE.COM").has_url);
        assert!(!e.extract("no links here").has_url);

        assert!(e.extract("contact me at bob@mail.com").has_email);
        assert!(!e.extract("no at sign").has_email);
    }

    #[test]
    fn test_digit_and_uppercase_signals() {
        let e = extractor();
        assert!(e.extract("win 5000 dollars").has_numbers);
        assert!(!e.extract("no digits").has_numbers);

        let features = e.extract("FREE");
        assert!((features.uppercase_ratio - 1.0).abs() < f64::EPSILON);
        let features = e.extract("free");
        assert!(features.uppercase_ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_input_defaults() {
        let features = extractor().extract("");
        assert_eq!(features.word_count, 0);
        assert_eq!(features.char_count, 0);
        assert!(features.avg_word_length.abs() < f64::EPSILON);
        assert!(!features.has_url);
        assert!(!features.has_email);
        assert!(!features.has_numbers);
        assert!(features.uppercase_ratio.abs() < f64::EPSILON);
    }
}
