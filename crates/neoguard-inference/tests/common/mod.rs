//! Mock classifiers for testing
//!
//! Configurable implementations of `ProbabilisticClassifier` for exercising
//! the predictor without a trained model.

#![allow(dead_code)]

use neoguard_core::{ClassProbabilities, Error, FeatureRecord, Result};
use neoguard_inference::{FeatureMatrix, FeatureOrder, ProbabilisticClassifier};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Features used by most integration tests
pub const FEATURES: [&str; 3] = ["jaundice_level_mg_dl", "heart_rate_bpm", "oxygen_saturation"];

pub fn feature_order() -> FeatureOrder {
    FeatureOrder::new(FEATURES.iter().map(|s| s.to_string()).collect()).unwrap()
}

pub fn record(name: &str, jaundice: f64, heart_rate: f64, spo2: f64) -> FeatureRecord {
    FeatureRecord::new()
        .with_name(name)
        .with("jaundice_level_mg_dl", jaundice)
        .with("heart_rate_bpm", heart_rate)
        .with("oxygen_saturation", spo2)
}

/// How the mock turns a row into probabilities
#[derive(Debug, Clone)]
enum Behavior {
    /// Same vector for every row
    Fixed([f64; 3]),
    /// `P(High)` = first column / 100, the rest split evenly
    FirstColumn,
    /// Like `Fixed`, but drops the last row
    DropRow([f64; 3]),
    /// Raw values, skipping validation
    Raw([f64; 3]),
}

/// A configurable mock classifier for testing
pub struct MockClassifier {
    name: String,
    num_features: usize,
    feature_names: Option<Vec<String>>,
    behavior: Behavior,
    call_count: AtomicU32,
    last_batch: Mutex<Option<FeatureMatrix>>,
}

impl MockClassifier {
    /// Mock over [`FEATURES`] returning `(0.10, 0.30, 0.60)` for every row
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            num_features: FEATURES.len(),
            feature_names: None,
            behavior: Behavior::Fixed([0.10, 0.30, 0.60]),
            call_count: AtomicU32::new(0),
            last_batch: Mutex::new(None),
        }
    }

    /// Set the probabilities returned for every row
    pub fn with_probabilities(mut self, low: f64, medium: f64, high: f64) -> Self {
        self.behavior = Behavior::Fixed([low, medium, high]);
        self
    }

    /// Derive `P(High)` from the first feature so rows are distinguishable
    pub fn driven_by_first_feature(mut self) -> Self {
        self.behavior = Behavior::FirstColumn;
        self
    }

    /// Return one row fewer than requested
    pub fn dropping_a_row(mut self) -> Self {
        self.behavior = Behavior::DropRow([0.2, 0.3, 0.5]);
        self
    }

    /// Return an arbitrary, possibly invalid vector
    pub fn with_raw_output(mut self, values: [f64; 3]) -> Self {
        self.behavior = Behavior::Raw(values);
        self
    }

    /// Set the number of input features
    pub fn with_num_features(mut self, n: usize) -> Self {
        self.num_features = n;
        self
    }

    /// Report feature names as stored in a model artifact
    pub fn with_feature_names(mut self, names: &[&str]) -> Self {
        self.feature_names = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Get the number of times predict_proba was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The buffer passed to the most recent call
    pub fn last_batch(&self) -> Option<FeatureMatrix> {
        self.last_batch.lock().unwrap().clone()
    }
}

impl ProbabilisticClassifier for MockClassifier {
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<ClassProbabilities>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_batch.lock().unwrap() = Some(features.clone());

        let fixed = |[l, m, h]: [f64; 3]| ClassProbabilities::new(l, m, h);

        let rows = features.iter_rows();
        Ok(match self.behavior {
            Behavior::Fixed(p) | Behavior::Raw(p) => rows.map(|_| fixed(p)).collect(),
            Behavior::DropRow(p) => rows.skip(1).map(|_| fixed(p)).collect(),
            Behavior::FirstColumn => rows
                .map(|row| {
                    let high = (row[0] / 100.0).clamp(0.0, 1.0);
                    let rest = (1.0 - high) / 2.0;
                    ClassProbabilities::new(rest, rest, high)
                })
                .collect(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}

/// A classifier that always fails - for testing error paths
pub struct FailingClassifier {
    error_message: String,
    call_count: AtomicU32,
}

impl FailingClassifier {
    pub fn new() -> Self {
        Self {
            error_message: "Simulated classifier failure".to_string(),
            call_count: AtomicU32::new(0),
        }
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl ProbabilisticClassifier for FailingClassifier {
    fn predict_proba(&self, _features: &FeatureMatrix) -> Result<Vec<ClassProbabilities>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Err(Error::inference(&self.error_message))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn num_features(&self) -> usize {
        FEATURES.len()
    }
}
