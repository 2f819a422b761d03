//! Core types for NeoGuard

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall risk class predicted by the model, and the bucket assigned to a
/// condition probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// All levels in class-index order
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    /// Label used in responses and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinical condition scored from the class probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Jaundice,
    Cardiac,
    Respiratory,
}

impl Condition {
    /// Conditions in result order
    pub const ALL: [Condition; 3] = [
        Condition::Jaundice,
        Condition::Cardiac,
        Condition::Respiratory,
    ];

    /// Display name used in responses and reports
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Jaundice => "Jaundice",
            Self::Cardiac => "Cardiac",
            Self::Respiratory => "Respiratory",
        }
    }

    /// Key of the derived probability (`p_jaundice`, ...)
    pub fn probability_key(&self) -> &'static str {
        match self {
            Self::Jaundice => "p_jaundice",
            Self::Cardiac => "p_cardiac",
            Self::Respiratory => "p_respiratory",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Class probability vector `[P(Low), P(Medium), P(High)]` for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl ClassProbabilities {
    /// Tolerance accepted on the sum of the three probabilities
    pub const SUM_TOLERANCE: f64 = 1e-4;

    /// Create a new probability vector without validation
    pub fn new(low: f64, medium: f64, high: f64) -> Self {
        Self { low, medium, high }
    }

    /// Build from a model output row, checking length, range, and sum.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let [low, medium, high] = values else {
            return Err(Error::inference(format!(
                "expected 3 class probabilities, got {}",
                values.len()
            )));
        };

        let probs = Self::new(*low, *medium, *high);
        probs.validate()?;
        Ok(probs)
    }

    /// Check every entry is a finite value in [0, 1] and the vector sums to 1.
    pub fn validate(&self) -> Result<()> {
        for (level, p) in RiskLevel::ALL.iter().zip(self.as_array()) {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(Error::inference(format!(
                    "probability for class {} is out of range: {}",
                    level, p
                )));
            }
        }

        let sum: f64 = self.as_array().iter().sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(Error::inference(format!(
                "class probabilities sum to {sum}, expected 1"
            )));
        }

        Ok(())
    }

    /// Values in class-index order
    pub fn as_array(&self) -> [f64; 3] {
        [self.low, self.medium, self.high]
    }

    /// Most probable class (first wins on ties)
    pub fn most_likely(&self) -> RiskLevel {
        let values = self.as_array();
        let mut best = 0;
        for (i, p) in values.iter().enumerate().skip(1) {
            if *p > values[best] {
                best = i;
            }
        }
        RiskLevel::ALL[best]
    }
}

/// Per-condition probabilities derived from a [`ClassProbabilities`].
///
/// Each value lies in [0, 1]; the three are independent scores, not a
/// distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionProbabilities {
    #[serde(rename = "p_jaundice")]
    pub jaundice: f64,
    #[serde(rename = "p_cardiac")]
    pub cardiac: f64,
    #[serde(rename = "p_respiratory")]
    pub respiratory: f64,
}

impl ConditionProbabilities {
    /// Probability for a single condition
    pub fn get(&self, condition: Condition) -> f64 {
        match condition {
            Condition::Jaundice => self.jaundice,
            Condition::Cardiac => self.cardiac,
            Condition::Respiratory => self.respiratory,
        }
    }

    /// Iterate in result order: Jaundice, Cardiac, Respiratory
    pub fn iter(&self) -> impl Iterator<Item = (Condition, f64)> + '_ {
        Condition::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Risk assessment for one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub condition: Condition,
    pub risk_level: RiskLevel,
    pub confidence: f64,
}

impl RiskResult {
    /// Create a result; `probability` is rounded to 2 decimals for the confidence.
    pub fn new(condition: Condition, risk_level: RiskLevel, probability: f64) -> Self {
        Self {
            condition,
            risk_level,
            confidence: round_confidence(probability),
        }
    }
}

/// Prediction for one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    /// Subject label, passed through from the input record
    pub name: Option<String>,

    /// One result per condition, in [`Condition::ALL`] order
    pub results: Vec<RiskResult>,
}

impl PredictionOutcome {
    /// Create a new outcome
    pub fn new(name: Option<String>, results: Vec<RiskResult>) -> Self {
        Self { name, results }
    }

    /// Result for a single condition
    pub fn result_for(&self, condition: Condition) -> Option<&RiskResult> {
        self.results.iter().find(|r| r.condition == condition)
    }

    /// Highest risk level across all conditions
    pub fn max_risk(&self) -> Option<RiskLevel> {
        self.results.iter().map(|r| r.risk_level).max()
    }
}

/// Round a probability to 2 decimals.
///
/// Goes through decimal formatting so rounding applies to the exact binary
/// value rather than to a scaled product.
pub fn round_confidence(probability: f64) -> f64 {
    format!("{probability:.2}").parse().unwrap_or(probability)
}
