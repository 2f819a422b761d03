//! NeoGuard Inference
//!
//! Turns neonatal feature records into per-condition risk assessments.
//!
//! The pipeline runs in five steps:
//! - [`aligner`]: reindex records to the model's [`FeatureOrder`] and fill gaps
//! - [`classifier`]: run a pre-trained 3-class model (`predict_proba`)
//! - [`mapper`]: derive jaundice, cardiac, and respiratory probabilities
//! - [`risk`]: bucket each probability into Low, Medium, or High
//! - [`predictor`]: orchestrate single and bulk requests
//!
//! Everything loaded at startup (model, feature order, thresholds) is held by
//! an immutable [`RiskPredictor`] that is safe to share across threads.

pub mod aligner;
pub mod classifier;
pub mod config;
pub mod feature_order;
pub mod mapper;
pub mod model_loader;
pub mod models;
pub mod predictor;
pub mod reference;
pub mod risk;

pub use aligner::{align, AlignedBatch, AlignmentReport, FeatureAligner, FeatureMatrix};
pub use classifier::ProbabilisticClassifier;
pub use config::{DeviceSpec, InferenceSettings, MissingValuePolicy};
pub use feature_order::FeatureOrder;
pub use mapper::map_to_conditions;
pub use model_loader::{load_classifier, verify_compatibility, ModelFormat};
pub use models::GradientBoostedTrees;
#[cfg(feature = "linear-models")]
pub use models::LinearSoftmax;
pub use predictor::RiskPredictor;
pub use reference::ReferenceMedians;
pub use risk::{bucket, interpret, RiskThresholds};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aligner::FeatureMatrix;
    pub use crate::classifier::ProbabilisticClassifier;
    pub use crate::config::InferenceSettings;
    pub use crate::feature_order::FeatureOrder;
    pub use crate::predictor::RiskPredictor;
    pub use crate::risk::RiskThresholds;
    pub use neoguard_core::prelude::*;
}
