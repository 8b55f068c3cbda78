//! Spam Detector - Message Classification and Statistics
//!
//! A Rust library for classifying short text messages as spam or ham,
//! recording every verdict, and reporting on classification activity.
//!
//! # Features
//!
//! - Text normalization and TF-IDF vectorization
//! - Naive Bayes and logistic regression scoring from pre-trained artifacts
//! - Append-only prediction history in SQLite
//! - Daily rollups and whole-history statistics
//! - Spam-volume trend analysis
//! - Export to CSV and JSON

/// Classifier artifacts and scoring
pub mod classifier;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Export of history and statistics to files
pub mod export;
/// Structural feature extraction
pub mod features;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Text normalization
pub mod normalize;
/// The classification pipeline
pub mod pipeline;
/// Database schema definitions
pub mod schema;
/// The spam detection service facade
pub mod service;
/// Trend analysis over daily rollups
pub mod trend;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use classifier::VectorizingClassifier;
pub use db::Database;
pub use error::{Result, SpamError};
pub use models::{Label, OutputFormat, PredictionResult, TrendSignal};
pub use pipeline::PredictionPipeline;
pub use service::SpamDetector;
