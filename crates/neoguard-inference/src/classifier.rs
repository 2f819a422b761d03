//! Classifier trait

use crate::aligner::FeatureMatrix;
use neoguard_core::{ClassProbabilities, Result};

/// Trait for pre-trained 3-class risk models
///
/// Implementations are loaded once at startup and shared read-only, so
/// `predict_proba` takes `&self` and must be safe to call concurrently.
pub trait ProbabilisticClassifier: Send + Sync {
    /// Class probabilities `[P(Low), P(Medium), P(High)]` for every row, in row order
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<ClassProbabilities>>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Number of input columns the model was trained on
    fn num_features(&self) -> usize;

    /// Feature names stored in the model artifact, if any
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}
