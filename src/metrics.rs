use anyhow::Result;
use metrics::{counter, histogram, Label};
use std::time::Duration;

use crate::error::Result as SpamResult;
use crate::models::PredictionResult;

/// Metrics collection and management
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    // Prediction metrics
    pub predictions_total: &'static str,
    pub prediction_duration: &'static str,
    pub prediction_confidence: &'static str,

    // Database metrics
    pub db_operations_total: &'static str,
    pub db_operation_duration: &'static str,

    // Export metrics
    pub export_operations_total: &'static str,
    pub export_rows_total: &'static str,

    // Error metrics
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            predictions_total: "spam_detector_predictions_total",
            prediction_duration: "spam_detector_prediction_duration_seconds",
            prediction_confidence: "spam_detector_prediction_confidence",

            db_operations_total: "spam_detector_db_operations_total",
            db_operation_duration: "spam_detector_db_operation_duration_seconds",

            export_operations_total: "spam_detector_export_operations_total",
            export_rows_total: "spam_detector_export_rows_total",

            errors_total: "spam_detector_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Initialize metrics collection
    pub fn init() -> Result<()> {
        // No exporter is wired in; the recorder keeps macro call sites cheap
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|e| anyhow::anyhow!("Failed to initialize metrics recorder: {}", e))?;

        Ok(())
    }

    /// Record the outcome and latency of one classification
    pub fn record_prediction(&self, outcome: &SpamResult<PredictionResult>, duration: Duration) {
        let verdict = match outcome {
            Ok(result) => result.label.to_string(),
            Err(_) => "error".to_string(),
        };
        let labels = vec![Label::new("verdict", verdict)];

        counter!(self.predictions_total, labels.clone()).increment(1);
        histogram!(self.prediction_duration, labels).record(duration.as_secs_f64());

        if let Ok(result) = outcome {
            histogram!(self.prediction_confidence).record(result.confidence);
        } else {
            self.record_error("validation", "predict");
        }
    }

    /// Record database operation metrics
    pub fn record_db_operation(&self, operation: &str, duration: Duration, success: bool) {
        let labels = vec![
            Label::new("operation", operation.to_string()),
            Label::new("status", if success { "success" } else { "error" }),
        ];

        counter!(self.db_operations_total, labels.clone()).increment(1);
        histogram!(self.db_operation_duration, labels).record(duration.as_secs_f64());

        if !success {
            self.record_error("database", operation);
        }
    }

    /// Record export operation metrics
    pub fn record_export(&self, format: &str, rows: usize) {
        let labels = vec![Label::new("format", format.to_string())];

        counter!(self.export_operations_total, labels.clone()).increment(1);
        counter!(self.export_rows_total, labels).increment(rows as u64);
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &str, operation: &str) {
        let labels = vec![
            Label::new("type", error_type.to_string()),
            Label::new("operation", operation.to_string()),
        ];

        counter!(self.errors_total, labels).increment(1);
    }
}
