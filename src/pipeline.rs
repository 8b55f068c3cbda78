//! Prediction pipeline
//!
//! Orchestrates validation, normalization, classification and feature
//! extraction into a single `PredictionResult`. The pipeline has no side
//! effects; recording a result is the caller's explicit choice, so
//! computing a verdict and persisting it stay independently testable.

use chrono::Utc;
use tracing::{debug, warn};

use crate::classifier::VectorizingClassifier;
use crate::error::Result;
use crate::features::FeatureExtractor;
use crate::models::PredictionResult;
use crate::normalize::TextNormalizer;
use crate::validation::InputValidator;

/// Default maximum accepted message length, in characters
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 10_000;

/// Stateless-per-call classification pipeline. Safe to share across
/// threads; the loaded model artifacts are read-only.
pub struct PredictionPipeline {
    normalizer: TextNormalizer,
    extractor: FeatureExtractor,
    classifier: VectorizingClassifier,
    max_message_length: usize,
}

impl PredictionPipeline {
    /// Create a pipeline around an already-loaded classifier bundle
    pub fn new(classifier: VectorizingClassifier, max_message_length: usize) -> Result<Self> {
        Self::with_normalizer(classifier, max_message_length, TextNormalizer::new()?)
    }

    /// Create a pipeline with a custom normalization profile. The profile
    /// must match the one the bundle was trained with.
    pub fn with_normalizer(
        classifier: VectorizingClassifier,
        max_message_length: usize,
        normalizer: TextNormalizer,
    ) -> Result<Self> {
        Ok(Self {
            normalizer,
            extractor: FeatureExtractor::new()?,
            classifier,
            max_message_length,
        })
    }

    /// Classify a single message.
    ///
    /// Empty (after trim) or oversized input fails with
    /// `SpamError::Validation` and no classification takes place. A message
    /// that normalizes to nothing gets the neutral 50/50 HAM verdict.
    pub fn predict(&self, raw_message: &str) -> Result<PredictionResult> {
        InputValidator::validate_message(raw_message, self.max_message_length)?;

        let normalized = self.normalizer.normalize(raw_message);
        let classification = self.classifier.classify(&normalized);
        let features = self.extractor.extract(raw_message);

        let confidence = classification
            .ham_probability
            .max(classification.spam_probability);

        debug!(
            label = %classification.label,
            confidence = confidence,
            "Message classified"
        );

        Ok(PredictionResult {
            raw_message: raw_message.to_string(),
            normalized_message: normalized,
            label: classification.label,
            confidence,
            ham_probability: classification.ham_probability,
            spam_probability: classification.spam_probability,
            features,
            model_version: self.classifier.version().to_string(),
            created_at: Utc::now().naive_utc(),
        })
    }

    /// Classify a batch of messages, order-preserving.
    ///
    /// Each element is classified independently; one bad message never
    /// aborts the rest. Per-item outcomes are returned so callers can
    /// decide how to surface failures.
    pub fn predict_batch(&self, messages: &[String]) -> Vec<Result<PredictionResult>> {
        messages
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let result = self.predict(message);
                if let Err(error) = &result {
                    warn!(index, %error, "Skipping message in batch");
                }
                result
            })
            .collect()
    }

    /// Change the maximum accepted message length; applies to the next call
    pub fn set_max_message_length(&mut self, max_message_length: usize) {
        self.max_message_length = max_message_length;
    }

    /// Version tag of the classifier bundle behind this pipeline
    #[must_use]
    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    /// Summary of the classifier bundle behind this pipeline
    #[must_use]
    pub fn model_info(&self) -> crate::models::ModelInfo {
        self.classifier.model_info()
    }
}

/// Check the probability invariant on an assembled result
#[must_use]
pub fn probabilities_consistent(result: &PredictionResult) -> bool {
    (result.ham_probability + result.spam_probability - 1.0).abs() < 1e-6
        && (result.confidence - result.ham_probability.max(result.spam_probability)).abs()
            < f64::EPSILON
}
