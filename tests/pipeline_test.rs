use std::collections::HashMap;
use std::fs;

use spam_detector_rust::config::{ConfigEvent, ConfigObserver};
use spam_detector_rust::classifier::{
    ClassifierArtifact, ClassifierWeights, TfidfVectorizer, VectorizingClassifier,
    CLASSIFIER_FILE, VECTORIZER_FILE,
};
use spam_detector_rust::db::Database;
use spam_detector_rust::models::{Label, TrendDirection};
use spam_detector_rust::pipeline::PredictionPipeline;
use spam_detector_rust::service::SpamDetector;
use spam_detector_rust::trend::TrendAnalyzer;
use spam_detector_rust::SpamError;

fn write_bundle(dir: &std::path::Path) {
    let vocabulary: HashMap<String, usize> = [
        ("free".to_string(), 0),
        ("winner".to_string(), 1),
        ("prize".to_string(), 2),
        ("click".to_string(), 3),
        ("congratulations".to_string(), 4),
        ("lunch".to_string(), 5),
        ("meeting".to_string(), 6),
        ("tomorrow".to_string(), 7),
    ]
    .into_iter()
    .collect();
    let vectorizer = TfidfVectorizer {
        version: "2.0.0".to_string(),
        vocabulary,
        idf: vec![1.0; 8],
    };
    let artifact = ClassifierArtifact {
        version: "2.0.0".to_string(),
        weights: ClassifierWeights::NaiveBayes {
            class_log_prior: [0.5_f64.ln(), 0.5_f64.ln()],
            feature_log_prob: [
                vec![-5.0, -5.0, -5.0, -5.0, -5.0, -1.0, -1.0, -1.0],
                vec![-1.0, -1.0, -1.0, -1.0, -1.0, -5.0, -5.0, -5.0],
            ],
        },
        metrics: None,
    };

    fs::write(
        dir.join(VECTORIZER_FILE),
        serde_json::to_string(&vectorizer).expect("serialize vectorizer"),
    )
    .expect("write vectorizer");
    fs::write(
        dir.join(CLASSIFIER_FILE),
        serde_json::to_string(&artifact).expect("serialize classifier"),
    )
    .expect("write classifier");
}

fn detector(dir: &tempfile::TempDir) -> SpamDetector {
    let model_dir = dir.path().join("models");
    fs::create_dir_all(&model_dir).expect("create model dir");
    write_bundle(&model_dir);

    let classifier = VectorizingClassifier::load(&model_dir).expect("Failed to load bundle");
    let pipeline = PredictionPipeline::new(classifier, 10_000).expect("Failed to create pipeline");

    let db_url = format!("sqlite:{}", dir.path().join("test.db").display());
    let db = Database::new(&db_url).expect("Failed to create database");

    SpamDetector::new(pipeline, db, TrendAnalyzer::default())
}

#[test]
fn test_bundle_loads_from_disk() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let model_dir = dir.path().join("models");
    fs::create_dir_all(&model_dir).expect("create model dir");
    write_bundle(&model_dir);

    let classifier = VectorizingClassifier::load(&model_dir).expect("Failed to load bundle");
    assert_eq!(classifier.version(), "2.0.0");
    let info = classifier.model_info();
    assert_eq!(info.algorithm, "naive_bayes");
    assert_eq!(info.feature_count, 8);
}

#[test]
fn test_missing_bundle_is_fatal() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let err = VectorizingClassifier::load(&dir.path().join("nowhere"))
        .err()
        .expect("loading a missing bundle must fail");
    assert!(matches!(err, SpamError::ModelUnavailable(_)));
}

#[test]
fn test_corrupt_artifact_is_fatal() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let model_dir = dir.path().join("models");
    fs::create_dir_all(&model_dir).expect("create model dir");
    write_bundle(&model_dir);
    fs::write(model_dir.join(CLASSIFIER_FILE), "{ not json").expect("overwrite classifier");

    let err = VectorizingClassifier::load(&model_dir)
        .err()
        .expect("loading a corrupt bundle must fail");
    assert!(matches!(err, SpamError::ModelUnavailable(_)));
}

#[test]
fn test_predict_and_persist_end_to_end() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let service = detector(&dir);

    let spam = service
        .predict(
            "Congratulations! You are a WINNER, click for your FREE prize!",
            true,
        )
        .expect("Prediction failed");
    assert_eq!(spam.label, Label::Spam);

    let ham = service
        .predict("are we still on for lunch tomorrow?", true)
        .expect("Prediction failed");
    assert_eq!(ham.label, Label::Ham);

    let history = service.recent(10).expect("Failed to read history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].result.label, Label::Ham);
    assert_eq!(history[1].result.label, Label::Spam);

    let stats = service.global_stats().expect("Failed to read stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.spam_count, 1);
    assert_eq!(stats.ham_count, 1);
}

#[test]
fn test_predict_without_persist_leaves_history_untouched() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let service = detector(&dir);

    let result = service
        .predict("free prize winner", false)
        .expect("Prediction failed");
    assert_eq!(result.label, Label::Spam);

    assert_eq!(service.global_stats().expect("stats").total, 0);
}

#[test]
fn test_determinism_across_calls() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let service = detector(&dir);
    let message = "Congratulations, you won a free prize";

    let first = service.predict(message, false).expect("Prediction failed");
    let second = service.predict(message, false).expect("Prediction failed");

    assert_eq!(first.label, second.label);
    assert!((first.confidence - second.confidence).abs() < f64::EPSILON);
    assert!((first.spam_probability - second.spam_probability).abs() < f64::EPSILON);
    assert_eq!(first.normalized_message, second.normalized_message);
}

#[test]
fn test_batch_skips_invalid_messages() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let service = detector(&dir);

    let messages = vec![
        "free prize winner".to_string(),
        "   ".to_string(),
        "lunch tomorrow".to_string(),
    ];
    let results = service.predict_batch(&messages, true);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].label, Label::Spam);
    assert_eq!(results[1].label, Label::Ham);
    assert_eq!(service.global_stats().expect("stats").total, 2);
}

#[test]
fn test_trend_after_recorded_activity() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let service = detector(&dir);

    service
        .predict("free prize winner, click now", true)
        .expect("Prediction failed");
    service
        .predict("meeting moved to tomorrow", true)
        .expect("Prediction failed");

    // One day of history: everything lands in the recent half
    let signal = service.trend(7).expect("Trend failed");
    assert_eq!(signal.direction, TrendDirection::Increasing);
    assert!(signal.recent_avg >= 1.0);
    assert!(signal.older_avg.abs() < f64::EPSILON);
}

#[test]
fn test_settings_changes_take_effect_on_live_service() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let mut service = detector(&dir);

    service
        .predict("free prize winner, click now", true)
        .expect("Prediction failed");
    assert_eq!(
        service.trend(7).expect("Trend failed").direction,
        TrendDirection::Increasing
    );

    // Raising the thresholds reclassifies the same history as stable
    service.on_config_event(&ConfigEvent::TrendThresholdsChanged {
        increase: 200.0,
        decrease: -200.0,
    });
    assert_eq!(
        service.trend(7).expect("Trend failed").direction,
        TrendDirection::Stable
    );

    // Tightening the length cap applies to the next prediction
    service.on_config_event(&ConfigEvent::MaxMessageLengthChanged(5));
    assert!(matches!(
        service.predict("free prize winner", false),
        Err(SpamError::Validation(_))
    ));
}

#[test]
fn test_retention_change_drives_cleanup() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let mut service = detector(&dir);
    assert_eq!(service.retention_days(), 90);

    // Backdate the row so a zero-day cutoff lands strictly after it
    let mut result = service
        .predict("free prize winner", false)
        .expect("Prediction failed");
    result.created_at -= chrono::Duration::hours(1);
    service.record(&result).expect("Failed to record");

    service.on_config_event(&ConfigEvent::RetentionChanged(0));
    assert_eq!(service.retention_days(), 0);
    assert_eq!(service.cleanup().expect("Cleanup failed"), 1);
    assert_eq!(service.global_stats().expect("stats").total, 0);
}

#[test]
fn test_validation_error_surfaces() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let service = detector(&dir);

    assert!(matches!(
        service.predict("", true),
        Err(SpamError::Validation(_))
    ));
    assert!(matches!(service.recent(0), Err(SpamError::Validation(_))));
    assert!(matches!(service.trend(0), Err(SpamError::Validation(_))));
}
