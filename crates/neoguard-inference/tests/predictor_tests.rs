//! Predictor integration tests
//!
//! Exercise the full align → classify → map → bucket path against mock
//! classifiers.

mod common;

use common::{feature_order, record, FailingClassifier, MockClassifier};
use neoguard_core::{Condition, Error, FeatureRecord, RiskLevel};
use neoguard_inference::{FeatureAligner, MissingValuePolicy, RiskPredictor, RiskThresholds};
use std::sync::Arc;

fn predictor(classifier: Arc<MockClassifier>) -> RiskPredictor {
    RiskPredictor::new(classifier, feature_order()).unwrap()
}

fn summary(outcome: &neoguard_core::PredictionOutcome) -> Vec<(Condition, RiskLevel, f64)> {
    outcome
        .results
        .iter()
        .map(|r| (r.condition, r.risk_level, r.confidence))
        .collect()
}

#[test]
fn test_reference_prediction() {
    let predictor = predictor(Arc::new(MockClassifier::new()));

    let outcome = predictor.predict(&record("Baby A", 8.0, 140.0, 97.0)).unwrap();

    assert_eq!(outcome.name.as_deref(), Some("Baby A"));
    assert_eq!(
        summary(&outcome),
        vec![
            (Condition::Jaundice, RiskLevel::Low, 0.42),
            (Condition::Cardiac, RiskLevel::Medium, 0.51),
            (Condition::Respiratory, RiskLevel::Medium, 0.45),
        ]
    );
}

#[test]
fn test_single_and_bulk_agree() {
    let predictor = predictor(Arc::new(MockClassifier::new().driven_by_first_feature()));
    let r = record("Baby B", 37.0, 150.0, 95.0);

    let single = predictor.predict(&r).unwrap();
    let bulk = predictor.predict_bulk(std::slice::from_ref(&r)).unwrap();

    assert_eq!(bulk, vec![single]);
}

#[test]
fn test_bulk_preserves_order() {
    let classifier = Arc::new(MockClassifier::new().driven_by_first_feature());
    let predictor = predictor(classifier.clone());

    let records = vec![
        record("first", 90.0, 140.0, 97.0),
        record("second", 10.0, 140.0, 97.0),
        record("third", 60.0, 140.0, 97.0),
    ];
    let outcomes = predictor.predict_bulk(&records).unwrap();

    let names: Vec<_> = outcomes.iter().map(|o| o.name.as_deref()).collect();
    assert_eq!(names, vec![Some("first"), Some("second"), Some("third")]);

    let cardiac: Vec<_> = outcomes
        .iter()
        .map(|o| o.result_for(Condition::Cardiac).unwrap().risk_level)
        .collect();
    assert_eq!(cardiac, vec![RiskLevel::High, RiskLevel::Low, RiskLevel::Medium]);

    // whole batch goes through the classifier at once
    assert_eq!(classifier.call_count(), 1);
}

#[test]
fn test_empty_bulk_skips_classifier() {
    let classifier = Arc::new(MockClassifier::new());
    let predictor = predictor(classifier.clone());

    assert!(predictor.predict_bulk(&[]).unwrap().is_empty());
    assert_eq!(classifier.call_count(), 0);
}

#[test]
fn test_names_passed_through_unchanged() {
    let predictor = predictor(Arc::new(MockClassifier::new()));
    let unnamed = FeatureRecord::new().with("heart_rate_bpm", 130.0);

    let outcomes = predictor
        .predict_bulk(&[unnamed, record("  spaced  ", 1.0, 1.0, 1.0)])
        .unwrap();

    assert_eq!(outcomes[0].name, None);
    assert_eq!(outcomes[1].name.as_deref(), Some("  spaced  "));
}

#[test]
fn test_classifier_failure_fails_whole_batch() {
    let classifier = Arc::new(FailingClassifier::new().with_error("backend unavailable"));
    let predictor = RiskPredictor::new(classifier.clone(), feature_order()).unwrap();

    let records = vec![record("a", 1.0, 1.0, 1.0), record("b", 2.0, 2.0, 2.0)];
    let err = predictor.predict_bulk(&records).unwrap_err();

    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("backend unavailable"));
    assert_eq!(classifier.call_count(), 1);
}

#[test]
fn test_row_count_mismatch_is_inference_error() {
    let predictor = predictor(Arc::new(MockClassifier::new().dropping_a_row()));

    let records = vec![record("a", 1.0, 1.0, 1.0), record("b", 2.0, 2.0, 2.0)];
    let err = predictor.predict_bulk(&records).unwrap_err();

    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("returned 1 rows for 2 inputs"));
}

#[test]
fn test_invalid_probabilities_rejected() {
    let predictor = predictor(Arc::new(MockClassifier::new().with_raw_output([0.5, 0.5, 0.5])));

    let err = predictor.predict(&record("a", 1.0, 1.0, 1.0)).unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[test]
fn test_missing_features_filled_with_batch_median() {
    let classifier = Arc::new(MockClassifier::new());
    let predictor = predictor(classifier.clone());

    let records = vec![
        record("a", 10.0, 120.0, 95.0),
        FeatureRecord::new()
            .with_name("b")
            .with("jaundice_level_mg_dl", 12.0),
        record("c", 14.0, 160.0, 99.0),
    ];
    predictor.predict_bulk(&records).unwrap();

    let batch = classifier.last_batch().unwrap();
    assert_eq!(batch.row(1), &[12.0, 140.0, 97.0]);
}

#[test]
fn test_all_null_row_is_forwarded() {
    let classifier = Arc::new(MockClassifier::new());
    let predictor = predictor(classifier.clone());

    let records = vec![
        record("known", 10.0, 120.0, 95.0),
        FeatureRecord::new().with_name("empty"),
    ];
    let outcomes = predictor.predict_bulk(&records).unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[1].name.as_deref(), Some("empty"));
    assert_eq!(classifier.last_batch().unwrap().row(1), &[10.0, 120.0, 95.0]);
}

#[test]
fn test_single_row_gap_stays_missing_under_batch_median() {
    let classifier = Arc::new(MockClassifier::new());
    let predictor = predictor(classifier.clone());

    let partial = FeatureRecord::new().with("heart_rate_bpm", 130.0);
    predictor.predict(&partial).unwrap();

    let batch = classifier.last_batch().unwrap();
    assert!(batch.get(0, 0).is_nan());
    assert_eq!(batch.get(0, 1), 130.0);
}

#[test]
fn test_reject_policy_stops_before_classifier() {
    let classifier = Arc::new(MockClassifier::new());
    let aligner =
        FeatureAligner::with_policy(feature_order(), MissingValuePolicy::Reject, None).unwrap();
    let predictor = predictor(classifier.clone()).with_aligner(aligner).unwrap();

    let err = predictor
        .predict(&FeatureRecord::new().with("heart_rate_bpm", 130.0))
        .unwrap_err();

    assert!(matches!(err, Error::Alignment(_)));
    assert_eq!(classifier.call_count(), 0);
}

#[test]
fn test_custom_thresholds() {
    let predictor = predictor(Arc::new(MockClassifier::new()))
        .with_thresholds(RiskThresholds::new(0.2, 0.5).unwrap());

    let outcome = predictor.predict(&record("a", 1.0, 1.0, 1.0)).unwrap();
    let levels: Vec<_> = outcome.results.iter().map(|r| r.risk_level).collect();
    assert_eq!(levels, vec![RiskLevel::Medium, RiskLevel::High, RiskLevel::Medium]);
}

#[test]
fn test_incompatible_classifier_rejected_at_construction() {
    let wrong_width = Arc::new(MockClassifier::new().with_num_features(5));
    let err = RiskPredictor::new(wrong_width, feature_order()).unwrap_err();
    assert!(err.is_startup());

    let wrong_names = Arc::new(MockClassifier::new().with_feature_names(&[
        "oxygen_saturation",
        "heart_rate_bpm",
        "jaundice_level_mg_dl",
    ]));
    assert!(RiskPredictor::new(wrong_names, feature_order()).is_err());
}

#[test]
fn test_shared_across_threads() {
    let predictor = predictor(Arc::new(MockClassifier::new().driven_by_first_feature()));
    let expected = predictor.predict(&record("t", 70.0, 1.0, 1.0)).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| predictor.predict(&record("t", 70.0, 1.0, 1.0)).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
