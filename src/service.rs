//! Spam detection service
//!
//! The facade the presentation layer talks to: classification through the
//! pipeline, history and statistics through the store, trend signals on
//! demand. Persistence is always the caller's explicit choice so a verdict
//! stays valid and returnable even when the subsequent write fails.

use std::time::Instant;

use tracing::{info, warn};

use crate::config::{AppConfig, ConfigEvent, ConfigObserver};
use crate::classifier::VectorizingClassifier;
use crate::db::Database;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::models::{
    DailyAggregate, ModelInfo, PredictionResult, StatsSummary, StoredPrediction, TrendSignal,
};
use crate::pipeline::PredictionPipeline;
use crate::trend::TrendAnalyzer;
use crate::validation::InputValidator;

/// Default retention window when none is configured, in days
const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Classification, history and statistics behind one interface
pub struct SpamDetector {
    pipeline: PredictionPipeline,
    db: Database,
    analyzer: TrendAnalyzer,
    metrics: MetricsCollector,
    retention_days: u32,
}

impl SpamDetector {
    /// Build the service from configuration: load the classifier bundle
    /// (fatal on failure), open the store, and record the bundle in the
    /// model registry.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let model_dir = config.get_model_directory();
        let classifier = VectorizingClassifier::load(std::path::Path::new(&model_dir))?;
        let mut stopwords = crate::normalize::default_stopwords();
        stopwords.extend(config.pipeline.extra_stopwords.iter().cloned());
        let normalizer = crate::normalize::TextNormalizer::with_profile(
            stopwords,
            config.pipeline.min_token_length,
        )?;
        let pipeline = PredictionPipeline::with_normalizer(
            classifier,
            config.pipeline.max_message_length,
            normalizer,
        )?;
        let db = Database::new(&config.get_database_url())?;
        let analyzer = TrendAnalyzer::new(
            config.trend.increase_threshold,
            config.trend.decrease_threshold,
        );

        let detector = Self {
            pipeline,
            db,
            analyzer,
            metrics: MetricsCollector::default(),
            retention_days: config.retention.days,
        };
        detector.db.record_model(&detector.pipeline.model_info())?;
        info!(
            model_version = detector.pipeline.model_version(),
            "Spam detector ready"
        );
        Ok(detector)
    }

    /// Assemble the service from already-constructed parts
    #[must_use]
    pub fn new(pipeline: PredictionPipeline, db: Database, analyzer: TrendAnalyzer) -> Self {
        Self {
            pipeline,
            db,
            analyzer,
            metrics: MetricsCollector::default(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    /// Classify one message, optionally recording the result.
    ///
    /// A storage failure after a successful classification propagates as a
    /// distinct error; the caller can still obtain the verdict by retrying
    /// with `persist = false`.
    pub fn predict(&self, message: &str, persist: bool) -> Result<PredictionResult> {
        let start = Instant::now();
        let result = self.pipeline.predict(message);
        self.metrics
            .record_prediction(&result, start.elapsed());
        let result = result?;

        if persist {
            self.record(&result)?;
        }
        Ok(result)
    }

    /// Classify a batch of messages, order-preserving.
    ///
    /// Failed items are omitted from the output and reported on the log
    /// channel; one bad message never aborts the rest.
    pub fn predict_batch(&self, messages: &[String], persist: bool) -> Vec<PredictionResult> {
        let outcomes = self.pipeline.predict_batch(messages);
        let mut results = Vec::with_capacity(outcomes.len());

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => {
                    if persist {
                        if let Err(error) = self.record(&result) {
                            warn!(index, %error, "Prediction computed but not recorded");
                        }
                    }
                    results.push(result);
                }
                Err(error) => {
                    self.metrics.record_error("batch_item", "predict_batch");
                    warn!(index, %error, "Message dropped from batch");
                }
            }
        }

        info!(
            classified = results.len(),
            submitted = messages.len(),
            "Batch prediction complete"
        );
        results
    }

    /// Append a prediction to the history; returns the assigned id
    pub fn record(&self, result: &PredictionResult) -> Result<i64> {
        let start = Instant::now();
        let outcome = self.db.add_prediction(result);
        self.metrics
            .record_db_operation("add_prediction", start.elapsed(), outcome.is_ok());
        outcome
    }

    /// The most recent predictions, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredPrediction>> {
        InputValidator::validate_limit(limit)?;
        self.db.get_predictions(limit, 0)
    }

    /// A page of the prediction history, newest first
    pub fn history(&self, limit: usize, offset: usize) -> Result<Vec<StoredPrediction>> {
        InputValidator::validate_limit(limit)?;
        self.db.get_predictions(limit, offset)
    }

    /// Whole-history statistics
    pub fn global_stats(&self) -> Result<StatsSummary> {
        self.db.global_stats()
    }

    /// Daily rollups for the last N calendar days, newest first
    pub fn daily_stats(&self, days: u32) -> Result<Vec<DailyAggregate>> {
        InputValidator::validate_days(days)?;
        self.db.get_daily_stats(days)
    }

    /// Directional spam-volume signal over the last N days
    pub fn trend(&self, days: u32) -> Result<TrendSignal> {
        InputValidator::validate_days(days)?;
        let aggregates = self.db.get_daily_stats(days)?;
        Ok(self.analyzer.analyze(&aggregates, days as usize))
    }

    /// Remove predictions older than N days; `days = 0` clears everything
    pub fn delete_older_than(&self, days: u32) -> Result<usize> {
        let start = Instant::now();
        let outcome = self.db.delete_older_than(days);
        self.metrics
            .record_db_operation("delete_older_than", start.elapsed(), outcome.is_ok());
        outcome
    }

    /// Remove predictions older than the configured retention window
    pub fn cleanup(&self) -> Result<usize> {
        self.delete_older_than(self.retention_days)
    }

    /// The configured retention window, in days
    #[must_use]
    pub const fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Summary of the classifier bundle currently serving predictions
    #[must_use]
    pub fn model_info(&self) -> ModelInfo {
        self.pipeline.model_info()
    }

    /// Access to the underlying store, for export and maintenance paths
    #[must_use]
    pub const fn store(&self) -> &Database {
        &self.db
    }
}

impl ConfigObserver for SpamDetector {
    fn on_config_event(&mut self, event: &ConfigEvent) {
        match event {
            ConfigEvent::TrendThresholdsChanged { increase, decrease } => {
                self.analyzer = TrendAnalyzer::new(*increase, *decrease);
                info!(increase, decrease, "Trend thresholds updated");
            }
            ConfigEvent::RetentionChanged(days) => {
                self.retention_days = *days;
                info!(days, "Retention window updated");
            }
            ConfigEvent::MaxMessageLengthChanged(max) => {
                self.pipeline.set_max_message_length(*max);
                info!(max, "Maximum message length updated");
            }
            ConfigEvent::ModelDirectoryChanged(directory) => {
                // The serving bundle is immutable once loaded; a new
                // directory takes effect on the next restart
                info!(%directory, "Model directory changed, effective on reload");
            }
        }
    }
}
