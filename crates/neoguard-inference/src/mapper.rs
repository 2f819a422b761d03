//! Class probabilities to per-condition probabilities

use neoguard_core::{ClassProbabilities, ConditionProbabilities};

/// Weights of `(P(Medium), P(High))` for each condition
pub const JAUNDICE_WEIGHTS: (f64, f64) = (0.6, 0.4);
pub const CARDIAC_WEIGHTS: (f64, f64) = (0.3, 0.7);
pub const RESPIRATORY_WEIGHTS: (f64, f64) = (0.5, 0.5);

/// Derive jaundice, cardiac, and respiratory probabilities.
///
/// ```text
/// p_jaundice    = 0.6 * medium + 0.4 * high
/// p_cardiac     = 0.3 * medium + 0.7 * high
/// p_respiratory = 0.5 * medium + 0.5 * high
/// ```
///
/// `P(Low)` does not contribute. The outputs are independent scores in
/// [0, 1] and are not normalised against each other.
pub fn map_to_conditions(probs: &ClassProbabilities) -> ConditionProbabilities {
    let (medium, high) = (probs.medium, probs.high);

    let respiratory = RESPIRATORY_WEIGHTS.0 * medium + RESPIRATORY_WEIGHTS.1 * high;
    // cardiac = respiratory + 0.2 * (high - medium): keeps cardiac >= respiratory
    // exactly whenever high >= medium
    let cardiac = respiratory + (CARDIAC_WEIGHTS.1 - RESPIRATORY_WEIGHTS.1) * (high - medium);
    let jaundice = JAUNDICE_WEIGHTS.0 * medium + JAUNDICE_WEIGHTS.1 * high;

    ConditionProbabilities {
        jaundice: settle(jaundice),
        cardiac: settle(cardiac),
        respiratory: settle(respiratory),
    }
}

/// Drop binary noise below 1e-12 so a value such as 0.45 lands on the
/// threshold it is written as, and clamp to [0, 1].
fn settle(p: f64) -> f64 {
    ((p * 1e12).round() / 1e12).clamp(0.0, 1.0)
}
