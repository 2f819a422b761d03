//! NeoGuard Core
//!
//! Core types and error handling shared across NeoGuard components.
//!
//! This crate provides:
//! - The error type and result alias used throughout the pipeline
//! - The statically keyed neonatal [`FeatureRecord`]
//! - Class, condition, and risk types produced by inference
//! - Clinical range validation for inbound records

pub mod error;
pub mod record;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use record::{FeatureRecord, KNOWN_FEATURES};
pub use types::{
    ClassProbabilities, Condition, ConditionProbabilities, PredictionOutcome, RiskLevel,
    RiskResult,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::record::FeatureRecord;
    pub use crate::types::{
        ClassProbabilities, Condition, ConditionProbabilities, PredictionOutcome, RiskLevel,
        RiskResult,
    };
}
