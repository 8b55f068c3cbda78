//! Data models for classification and statistics
//!
//! This module contains all data structures used throughout the application:
//! prediction results, structural message features, daily rollups and trend
//! signals.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Binary classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Legitimate message (negative class)
    Ham,
    /// Unsolicited message (positive class)
    Spam,
}

impl Label {
    /// Integer encoding used in the database (0 = ham, 1 = spam)
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Ham => 0,
            Self::Spam => 1,
        }
    }

    /// Decode the database integer representation
    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        if value == 1 {
            Self::Spam
        } else {
            Self::Ham
        }
    }

    /// True for the positive class
    #[must_use]
    pub const fn is_spam(self) -> bool {
        matches!(self, Self::Spam)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ham => write!(f, "ham"),
            Self::Spam => write!(f, "spam"),
        }
    }
}

/// Structural features derived from the raw (pre-normalization) message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Number of whitespace-separated tokens
    pub word_count: usize,
    /// Number of unicode scalar values
    pub char_count: usize,
    /// char_count / max(word_count, 1)
    pub avg_word_length: f64,
    /// True if the lowercased text contains "http" or "www"
    pub has_url: bool,
    /// True if any token looks like an email address
    pub has_email: bool,
    /// True if any ascii digit is present
    pub has_numbers: bool,
    /// Uppercase characters / max(char_count, 1), in [0, 1]
    pub uppercase_ratio: f64,
}

/// Result of classifying one message. Created once by the pipeline and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// The original, unmodified input
    pub raw_message: String,
    /// Normalizer output; may be empty when no tokens survive cleaning
    pub normalized_message: String,
    /// Predicted class
    pub label: Label,
    /// Probability mass of the predicted label
    pub confidence: f64,
    /// Probability of the ham class
    pub ham_probability: f64,
    /// Probability of the spam class
    pub spam_probability: f64,
    /// Structural evidence extracted from the raw message
    pub features: FeatureSet,
    /// Version tag of the classifier bundle that produced this result
    pub model_version: String,
    /// Creation timestamp (UTC)
    pub created_at: NaiveDateTime,
}

/// A prediction as stored in the history, with its assigned row id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPrediction {
    /// Database primary key, monotonically increasing
    pub id: i64,
    /// The persisted prediction
    #[serde(flatten)]
    pub result: PredictionResult,
}

/// Per-calendar-day rollup of classification activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Calendar date (unique key)
    pub date: NaiveDate,
    /// Total predictions on that date
    pub total: i64,
    /// Spam predictions on that date
    pub spam_count: i64,
    /// Ham predictions on that date
    pub ham_count: i64,
    /// Mean confidence over the day, in [0, 1]
    pub avg_confidence: f64,
}

/// Whole-history statistics, computed server-side in a single pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Total predictions ever recorded
    pub total: i64,
    /// Predictions labelled spam
    pub spam_count: i64,
    /// Predictions labelled ham
    pub ham_count: i64,
    /// Mean confidence over all predictions
    pub avg_confidence: f64,
    /// Mean confidence over spam predictions only
    pub avg_spam_confidence: f64,
    /// Mean confidence over ham predictions only
    pub avg_ham_confidence: f64,
    /// spam_count / total, as a percentage
    pub spam_percentage: f64,
    /// ham_count / total, as a percentage
    pub ham_percentage: f64,
}

/// Direction of the recent spam-rate trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Recent half-window averages more than 10% above the older half
    Increasing,
    /// Recent half-window averages more than 10% below the older half
    Decreasing,
    /// Change within the threshold band
    Stable,
    /// Not enough information to analyze (zero-length window)
    Unknown,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increasing => write!(f, "increasing"),
            Self::Decreasing => write!(f, "decreasing"),
            Self::Stable => write!(f, "stable"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Directional summary of spam volume, computed on demand and never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    /// Classified trajectory
    pub direction: TrendDirection,
    /// Signed percentage change between the two half-windows
    pub change_percent: f64,
    /// Mean daily spam count over the recent half-window
    pub recent_avg: f64,
    /// Mean daily spam count over the older half-window
    pub older_avg: f64,
}

impl TrendSignal {
    /// The defined default for an empty analysis window
    #[must_use]
    pub const fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            change_percent: 0.0,
            recent_avg: 0.0,
            older_avg: 0.0,
        }
    }
}

/// Summary of the classifier bundle currently serving predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Bundle version tag
    pub version: String,
    /// Training algorithm name
    pub algorithm: String,
    /// Size of the feature space shared by vectorizer and classifier
    pub feature_count: usize,
    /// Offline evaluation metrics recorded by the training side, if any
    pub metrics: Option<EvaluationMetrics>,
}

/// Offline evaluation metrics attached to a classifier bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Test-set accuracy
    pub accuracy: f64,
    /// Test-set precision for the spam class
    pub precision: f64,
    /// Test-set recall for the spam class
    pub recall: f64,
    /// Test-set F1 for the spam class
    pub f1: f64,
}

/// Output format for exported history and statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values format
    Csv,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = crate::error::SpamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(crate::error::SpamError::Validation(format!(
                "Unsupported export format: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip() {
        assert_eq!(Label::from_i64(Label::Spam.as_i64()), Label::Spam);
        assert_eq!(Label::from_i64(Label::Ham.as_i64()), Label::Ham);
        assert_eq!(Label::from_i64(42), Label::Ham);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::Spam.to_string(), "spam");
        assert_eq!(Label::Ham.to_string(), "ham");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().ok(), Some(OutputFormat::Csv));
        assert_eq!("json".parse::<OutputFormat>().ok(), Some(OutputFormat::Json));
        assert!("pdf".parse::<OutputFormat>().is_err());
    }
}
