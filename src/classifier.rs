//! Pre-trained classifier bundle
//!
//! Holds and applies the artifacts produced by the offline training side: a
//! fitted TF-IDF vectorizer and a probabilistic binary classifier. This
//! module never trains anything; it loads the bundle at startup, validates
//! that the two artifacts agree on the feature space, and scores normalized
//! text.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SpamError};
use crate::models::{EvaluationMetrics, Label, ModelInfo};

/// File name of the vectorizer artifact inside the bundle directory
pub const VECTORIZER_FILE: &str = "vectorizer.json";
/// File name of the classifier artifact inside the bundle directory
pub const CLASSIFIER_FILE: &str = "classifier.json";

/// Fitted TF-IDF vectorizer: vocabulary plus inverse-document-frequency
/// weights, owned by the training collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Bundle version tag, must match the classifier artifact
    pub version: String,
    /// Token to feature-index mapping
    pub vocabulary: HashMap<String, usize>,
    /// Per-feature idf weights, indexed by feature index
    pub idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Dimensionality of the feature space
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.idf.len()
    }

    /// Transform normalized text into a sparse, L2-normalized tf-idf vector
    fn transform(&self, normalized_text: &str) -> Vec<(usize, f64)> {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in normalized_text.split_whitespace() {
            if let Some(&index) = self.vocabulary.get(token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: Vec<(usize, f64)> = counts
            .into_iter()
            .filter_map(|(index, tf)| self.idf.get(index).map(|idf| (index, tf * idf)))
            .collect();

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for entry in &mut vector {
                entry.1 /= norm;
            }
        }

        vector.sort_unstable_by_key(|&(index, _)| index);
        vector
    }
}

/// Fitted classifier weights, tagged by training algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ClassifierWeights {
    /// Multinomial Naive Bayes: per-class log-priors and feature
    /// log-probabilities
    NaiveBayes {
        /// log P(class), indexed [ham, spam]
        class_log_prior: [f64; 2],
        /// log P(feature | class), indexed [ham, spam]
        feature_log_prob: [Vec<f64>; 2],
    },
    /// Binary logistic regression on the spam class
    LogisticRegression {
        /// Per-feature weights
        coefficients: Vec<f64>,
        /// Bias term
        intercept: f64,
    },
}

impl ClassifierWeights {
    /// Dimensionality the classifier expects from the vectorizer
    #[must_use]
    pub fn feature_count(&self) -> usize {
        match self {
            Self::NaiveBayes {
                feature_log_prob, ..
            } => feature_log_prob[0].len(),
            Self::LogisticRegression { coefficients, .. } => coefficients.len(),
        }
    }

    /// Training algorithm name as recorded in the model registry
    #[must_use]
    pub const fn algorithm(&self) -> &'static str {
        match self {
            Self::NaiveBayes { .. } => "naive_bayes",
            Self::LogisticRegression { .. } => "logistic_regression",
        }
    }
}

/// Classifier artifact as serialized by the training side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    /// Bundle version tag, must match the vectorizer artifact
    pub version: String,
    /// The fitted weights
    #[serde(flatten)]
    pub weights: ClassifierWeights,
    /// Offline evaluation metrics, if the training side recorded them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EvaluationMetrics>,
}

/// Outcome of scoring one normalized message
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Argmax class
    pub label: Label,
    /// Probability of the ham class
    pub ham_probability: f64,
    /// Probability of the spam class
    pub spam_probability: f64,
}

impl Classification {
    /// The defined neutral verdict for text that normalizes to nothing.
    /// A degenerate all-zeros vector would let the model emit a confident
    /// answer on no real signal, so the model is not consulted at all.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            label: Label::Ham,
            ham_probability: 0.5,
            spam_probability: 0.5,
        }
    }
}

/// Wraps the loaded vectorizer + classifier pair behind a single
/// `classify` contract. Read-only after construction, safe to share across
/// threads.
pub struct VectorizingClassifier {
    vectorizer: TfidfVectorizer,
    artifact: ClassifierArtifact,
}

impl VectorizingClassifier {
    /// Load the artifact bundle from a directory containing
    /// `vectorizer.json` and `classifier.json`.
    ///
    /// Any read, parse, version or dimensionality problem is a fatal
    /// `ModelUnavailable` error; nothing is silently coerced.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let vectorizer_path = model_dir.join(VECTORIZER_FILE);
        let classifier_path = model_dir.join(CLASSIFIER_FILE);

        let vectorizer: TfidfVectorizer = read_artifact(&vectorizer_path)?;
        let artifact: ClassifierArtifact = read_artifact(&classifier_path)?;

        let classifier = Self::from_parts(vectorizer, artifact)?;
        info!(
            version = classifier.version(),
            algorithm = classifier.artifact.weights.algorithm(),
            features = classifier.vectorizer.feature_count(),
            "Classifier bundle loaded"
        );
        Ok(classifier)
    }

    /// Assemble a classifier from already-deserialized artifacts,
    /// validating their mutual compatibility
    pub fn from_parts(vectorizer: TfidfVectorizer, artifact: ClassifierArtifact) -> Result<Self> {
        if vectorizer.version != artifact.version {
            return Err(SpamError::ModelUnavailable(format!(
                "Artifact version mismatch: vectorizer is '{}', classifier is '{}'",
                vectorizer.version, artifact.version
            )));
        }

        let vocab_size = vectorizer.vocabulary.len();
        if vocab_size != vectorizer.idf.len() {
            return Err(SpamError::ModelUnavailable(format!(
                "Vectorizer is internally inconsistent: {vocab_size} vocabulary entries but {} idf weights",
                vectorizer.idf.len()
            )));
        }
        if let Some(bad) = vectorizer
            .vocabulary
            .values()
            .find(|&&index| index >= vectorizer.idf.len())
        {
            return Err(SpamError::ModelUnavailable(format!(
                "Vectorizer vocabulary index {bad} is out of range"
            )));
        }

        let expected = artifact.weights.feature_count();
        if vocab_size != expected {
            return Err(SpamError::ModelUnavailable(format!(
                "Feature space mismatch: vectorizer produces {vocab_size} features, classifier expects {expected}"
            )));
        }
        if let ClassifierWeights::NaiveBayes {
            feature_log_prob, ..
        } = &artifact.weights
        {
            if feature_log_prob[0].len() != feature_log_prob[1].len() {
                return Err(SpamError::ModelUnavailable(
                    "Naive Bayes classes disagree on feature count".to_string(),
                ));
            }
        }

        Ok(Self {
            vectorizer,
            artifact,
        })
    }

    /// Classify normalized text.
    ///
    /// Empty input short-circuits to the neutral 50/50 HAM verdict without
    /// invoking the model. Otherwise returns the argmax label and the two
    /// class probabilities, which sum to 1.
    #[must_use]
    pub fn classify(&self, normalized_text: &str) -> Classification {
        if normalized_text.trim().is_empty() {
            return Classification::neutral();
        }

        let vector = self.vectorizer.transform(normalized_text);
        let (ham_probability, spam_probability) = match &self.artifact.weights {
            ClassifierWeights::NaiveBayes {
                class_log_prior,
                feature_log_prob,
            } => {
                let mut joint = [class_log_prior[0], class_log_prior[1]];
                for &(index, value) in &vector {
                    for (class, log_prob) in feature_log_prob.iter().enumerate() {
                        if let Some(lp) = log_prob.get(index) {
                            joint[class] += value * lp;
                        }
                    }
                }
                log_posterior_to_probabilities(joint)
            }
            ClassifierWeights::LogisticRegression {
                coefficients,
                intercept,
            } => {
                let mut score = *intercept;
                for &(index, value) in &vector {
                    if let Some(w) = coefficients.get(index) {
                        score += value * w;
                    }
                }
                let spam = 1.0 / (1.0 + (-score).exp());
                (1.0 - spam, spam)
            }
        };

        let label = if spam_probability > ham_probability {
            Label::Spam
        } else {
            Label::Ham
        };

        Classification {
            label,
            ham_probability,
            spam_probability,
        }
    }

    /// Version tag of the loaded bundle
    #[must_use]
    pub fn version(&self) -> &str {
        &self.artifact.version
    }

    /// Summary of the loaded bundle for the model registry
    #[must_use]
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            version: self.artifact.version.clone(),
            algorithm: self.artifact.weights.algorithm().to_string(),
            feature_count: self.vectorizer.feature_count(),
            metrics: self.artifact.metrics.clone(),
        }
    }
}

/// Convert per-class log-posteriors into normalized probabilities using the
/// log-sum-exp trick
fn log_posterior_to_probabilities(joint: [f64; 2]) -> (f64, f64) {
    let max = joint[0].max(joint[1]);
    let exp_ham = (joint[0] - max).exp();
    let exp_spam = (joint[1] - max).exp();
    let total = exp_ham + exp_spam;
    (exp_ham / total, exp_spam / total)
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|e| {
        SpamError::ModelUnavailable(format!("Cannot read artifact {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        SpamError::ModelUnavailable(format!("Cannot parse artifact {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tiny_vectorizer() -> TfidfVectorizer {
        let vocabulary: HashMap<String, usize> = [
            ("free".to_string(), 0),
            ("winner".to_string(), 1),
            ("prize".to_string(), 2),
            ("lunch".to_string(), 3),
            ("meeting".to_string(), 4),
        ]
        .into_iter()
        .collect();
        TfidfVectorizer {
            version: "2.0.0".to_string(),
            vocabulary,
            idf: vec![1.0; 5],
        }
    }

    fn tiny_nb() -> ClassifierArtifact {
        // Spam-leaning mass on {free, winner, prize}, ham-leaning on
        // {lunch, meeting}
        ClassifierArtifact {
            version: "2.0.0".to_string(),
            weights: ClassifierWeights::NaiveBayes {
                class_log_prior: [0.5_f64.ln(), 0.5_f64.ln()],
                feature_log_prob: [
                    vec![-4.0, -4.0, -4.0, -1.0, -1.0],
                    vec![-1.0, -1.0, -1.0, -4.0, -4.0],
                ],
            },
            metrics: None,
        }
    }

    fn tiny_classifier() -> VectorizingClassifier {
        VectorizingClassifier::from_parts(tiny_vectorizer(), tiny_nb())
            .expect("Failed to assemble classifier")
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let classifier = tiny_classifier();
        let result = classifier.classify("free prize winner");
        assert!((result.ham_probability + result.spam_probability - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_spam_and_ham_separation() {
        let classifier = tiny_classifier();

        let spam = classifier.classify("free winner prize");
        assert_eq!(spam.label, Label::Spam);
        assert!(spam.spam_probability > spam.ham_probability);

        let ham = classifier.classify("lunch meeting");
        assert_eq!(ham.label, Label::Ham);
        assert!(ham.ham_probability > ham.spam_probability);
    }

    #[test]
    fn test_empty_text_returns_neutral_without_model() {
        let classifier = tiny_classifier();
        let result = classifier.classify("");
        assert_eq!(result, Classification::neutral());
        assert_eq!(result.label, Label::Ham);
        assert!((result.ham_probability - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_out_of_vocabulary_text_scores_by_prior() {
        let classifier = tiny_classifier();
        // No token matches the vocabulary, so only the priors contribute
        let result = classifier.classify("completely unrelated words");
        assert!((result.ham_probability + result.spam_probability - 1.0).abs() < 1e-6);
        assert!((result.ham_probability - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_version_mismatch_is_fatal() {
        let mut artifact = tiny_nb();
        artifact.version = "1.9.0".to_string();
        let err = VectorizingClassifier::from_parts(tiny_vectorizer(), artifact)
            .err()
            .expect("version mismatch must fail");
        assert!(matches!(err, SpamError::ModelUnavailable(_)));
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let artifact = ClassifierArtifact {
            version: "2.0.0".to_string(),
            weights: ClassifierWeights::LogisticRegression {
                coefficients: vec![0.1, 0.2],
                intercept: 0.0,
            },
            metrics: None,
        };
        let err = VectorizingClassifier::from_parts(tiny_vectorizer(), artifact)
            .err()
            .expect("feature mismatch must fail");
        assert!(matches!(err, SpamError::ModelUnavailable(_)));
    }

    #[test]
    fn test_logistic_regression_scoring() {
        let artifact = ClassifierArtifact {
            version: "2.0.0".to_string(),
            weights: ClassifierWeights::LogisticRegression {
                coefficients: vec![3.0, 3.0, 3.0, -3.0, -3.0],
                intercept: 0.0,
            },
            metrics: None,
        };
        let classifier = VectorizingClassifier::from_parts(tiny_vectorizer(), artifact)
            .expect("Failed to assemble classifier");

        let spam = classifier.classify("free winner");
        assert_eq!(spam.label, Label::Spam);
        let ham = classifier.classify("meeting lunch");
        assert_eq!(ham.label, Label::Ham);
        assert!((spam.ham_probability + spam.spam_probability - 1.0).abs() < 1e-9);
    }
}
