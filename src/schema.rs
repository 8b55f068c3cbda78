//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Predictions table schema
pub mod predictions {
    /// Table name
    pub const TABLE: &str = "predictions";
    /// Primary key column
    pub const ID: &str = "id";
    /// Original message text column
    pub const RAW_MESSAGE: &str = "raw_message";
    /// Normalized message text column
    pub const NORMALIZED_MESSAGE: &str = "normalized_message";
    /// Predicted label column (0 = ham, 1 = spam)
    pub const LABEL: &str = "label";
    /// Confidence of the predicted label column
    pub const CONFIDENCE: &str = "confidence";
    /// Ham probability column
    pub const HAM_PROBABILITY: &str = "ham_probability";
    /// Spam probability column
    pub const SPAM_PROBABILITY: &str = "spam_probability";
    /// Structural features JSON column
    pub const FEATURES: &str = "features";
    /// Model version tag column
    pub const MODEL_VERSION: &str = "model_version";
    /// Prediction timestamp column (UTC)
    pub const CREATED_AT: &str = "created_at";
}

/// Daily statistics table schema
pub mod daily_stats {
    /// Table name
    pub const TABLE: &str = "daily_stats";
    /// Calendar date column (unique key)
    pub const DATE: &str = "date";
    /// Total predictions for the day column
    pub const TOTAL: &str = "total";
    /// Spam count column
    pub const SPAM_COUNT: &str = "spam_count";
    /// Ham count column
    pub const HAM_COUNT: &str = "ham_count";
    /// Average confidence column
    pub const AVG_CONFIDENCE: &str = "avg_confidence";
}

/// Model registry table schema
pub mod models {
    /// Table name
    pub const TABLE: &str = "models";
    /// Model version column (unique)
    pub const VERSION: &str = "version";
    /// Training algorithm column
    pub const ALGORITHM: &str = "algorithm";
    /// Offline accuracy column
    pub const ACCURACY: &str = "accuracy";
    /// Offline precision column
    pub const PRECISION_SCORE: &str = "precision_score";
    /// Offline recall column
    pub const RECALL_SCORE: &str = "recall_score";
    /// Offline F1 column
    pub const F1_SCORE: &str = "f1_score";
    /// Feature space size column
    pub const FEATURE_COUNT: &str = "feature_count";
    /// Timestamp the bundle was loaded column
    pub const LOADED_AT: &str = "loaded_at";
}
