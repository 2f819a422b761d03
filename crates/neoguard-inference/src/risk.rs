//! Risk bucketing

use neoguard_core::{ConditionProbabilities, Error, Result, RiskLevel, RiskResult};
use serde::{Deserialize, Serialize};

/// Two-threshold step function from probability to [`RiskLevel`].
///
/// `p < low` is Low, `low <= p < medium` is Medium, everything else High.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct RiskThresholds {
    low: f64,
    medium: f64,
}

/// Unchecked wire form; deserialization goes through [`RiskThresholds::new`]
#[derive(Deserialize)]
struct RawThresholds {
    low: f64,
    medium: f64,
}

impl TryFrom<RawThresholds> for RiskThresholds {
    type Error = Error;

    fn try_from(raw: RawThresholds) -> Result<Self> {
        Self::new(raw.low, raw.medium)
    }
}

impl RiskThresholds {
    pub const DEFAULT_LOW: f64 = 0.45;
    pub const DEFAULT_MEDIUM: f64 = 0.60;

    /// Create thresholds; requires `0 <= low < medium <= 1`.
    pub fn new(low: f64, medium: f64) -> Result<Self> {
        let valid = low.is_finite()
            && medium.is_finite()
            && (0.0..=1.0).contains(&low)
            && (0.0..=1.0).contains(&medium)
            && low < medium;

        if !valid {
            return Err(Error::config(format!(
                "risk thresholds must satisfy 0 <= low < medium <= 1 (low = {}, medium = {})",
                low, medium
            )));
        }

        Ok(Self { low, medium })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn medium(&self) -> f64 {
        self.medium
    }

    /// Bucket a single probability
    pub fn bucket(&self, probability: f64) -> RiskLevel {
        bucket(probability, self)
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: Self::DEFAULT_LOW,
            medium: Self::DEFAULT_MEDIUM,
        }
    }
}

/// Bucket a probability against the thresholds
pub fn bucket(probability: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if probability < thresholds.low {
        RiskLevel::Low
    } else if probability < thresholds.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// One [`RiskResult`] per condition, in Jaundice, Cardiac, Respiratory order.
pub fn interpret(
    conditions: &ConditionProbabilities,
    thresholds: &RiskThresholds,
) -> Vec<RiskResult> {
    conditions
        .iter()
        .map(|(condition, p)| RiskResult::new(condition, bucket(p, thresholds), p))
        .collect()
}
