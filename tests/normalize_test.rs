use spam_detector_rust::features::FeatureExtractor;
use spam_detector_rust::normalize::TextNormalizer;

#[test]
fn test_normalization_profile() {
    let normalizer = TextNormalizer::new().expect("Failed to build normalizer");

    // Lowercase, punctuation and digits stripped, stopwords and short
    // tokens dropped, single spaces between what survives
    assert_eq!(
        normalizer.normalize("LOTTERY!!! Winner: claim your PRIZE, 555-0199"),
        "lottery winner claim prize"
    );
    assert_eq!(normalizer.normalize("   "), "");
    assert_eq!(normalizer.normalize("the of an"), "");
    assert_eq!(normalizer.normalize("it is ok"), "");
}

#[test]
fn test_normalization_is_deterministic() {
    let normalizer = TextNormalizer::new().expect("Failed to build normalizer");
    let input = "Congratulations! You've WON a £1000 prize";
    assert_eq!(normalizer.normalize(input), normalizer.normalize(input));
}

#[test]
fn test_short_token_threshold_is_configurable() {
    let permissive =
        TextNormalizer::with_min_token_length(1).expect("Failed to build normalizer");
    let strict = TextNormalizer::new().expect("Failed to build normalizer");

    assert!(permissive
        .normalize("xy lottery")
        .split_whitespace()
        .any(|w| w == "xy"));
    assert!(!strict
        .normalize("xy lottery")
        .split_whitespace()
        .any(|w| w == "xy"));
}

#[test]
fn test_features_come_from_raw_text() {
    let extractor = FeatureExtractor::new().expect("Failed to build extractor");

    let features = extractor.extract("WIN NOW!!! visit http://spam.example or mail win@spam.example, offer ends in 24 hours");
    assert!(features.has_url);
    assert!(features.has_email);
    assert!(features.has_numbers);
    assert!(features.uppercase_ratio > 0.0);
    assert!(features.word_count > 5);

    let plain = extractor.extract("quiet dinner plans");
    assert!(!plain.has_url);
    assert!(!plain.has_email);
    assert!(!plain.has_numbers);
    assert_eq!(plain.word_count, 3);
}

#[test]
fn test_uppercase_ratio_bounds() {
    let extractor = FeatureExtractor::new().expect("Failed to build extractor");

    let shouting = extractor.extract("FREE MONEY");
    assert!(shouting.uppercase_ratio > 0.5);
    assert!(shouting.uppercase_ratio <= 1.0);

    let calm = extractor.extract("free money");
    assert!(calm.uppercase_ratio.abs() < f64::EPSILON);
}
