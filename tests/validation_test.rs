use std::path::Path;

use spam_detector_rust::validation::InputValidator;

#[test]
fn test_message_bounds() {
    assert!(InputValidator::validate_message("hello there", 100).is_ok());
    assert!(InputValidator::validate_message("", 100).is_err());
    assert!(InputValidator::validate_message("\t \n", 100).is_err());

    let exactly_max = "a".repeat(100);
    assert!(InputValidator::validate_message(&exactly_max, 100).is_ok());
    let over_max = "a".repeat(101);
    assert!(InputValidator::validate_message(&over_max, 100).is_err());
}

#[test]
fn test_message_length_counts_characters_not_bytes() {
    // Four characters, twelve bytes
    let message = "ééé é";
    assert!(InputValidator::validate_message(message, 5).is_ok());
}

#[test]
fn test_query_parameter_bounds() {
    assert!(InputValidator::validate_limit(1).is_ok());
    assert!(InputValidator::validate_limit(100_000).is_ok());
    assert!(InputValidator::validate_limit(0).is_err());
    assert!(InputValidator::validate_limit(100_001).is_err());

    assert!(InputValidator::validate_days(1).is_ok());
    assert!(InputValidator::validate_days(3650).is_ok());
    assert!(InputValidator::validate_days(0).is_err());
    assert!(InputValidator::validate_days(3651).is_err());
}

#[test]
fn test_model_version_format() {
    assert!(InputValidator::validate_model_version("2.0.0").is_ok());
    assert!(InputValidator::validate_model_version("nb-2024_12").is_ok());
    assert!(InputValidator::validate_model_version("").is_err());
    assert!(InputValidator::validate_model_version("v2;drop table").is_err());
}

#[test]
fn test_output_path_rejects_traversal() {
    assert!(InputValidator::validate_output_path(Path::new("output/report.csv")).is_ok());
    assert!(InputValidator::validate_output_path(Path::new("../outside.csv")).is_err());
    assert!(InputValidator::validate_output_path(Path::new("~/outside.csv")).is_err());
}

#[test]
fn test_database_url_scheme() {
    assert!(InputValidator::validate_database_url("sqlite:data/app.db").is_ok());
    assert!(InputValidator::validate_database_url("").is_err());
    assert!(InputValidator::validate_database_url("mysql://host/db").is_err());
}

#[test]
fn test_sanitize_strips_control_characters() {
    assert_eq!(
        InputValidator::sanitize_text("hello\u{1}\u{2} world"),
        "hello world"
    );
    assert_eq!(
        InputValidator::sanitize_text("  keep\ttabs\nand newlines  "),
        "keep\ttabs\nand newlines"
    );
}
