//! Clinical range validation for inbound feature records.
//!
//! This is the upstream schema layer: the inference pipeline itself never
//! calls it and accepts any numeric record.

use crate::error::{Error, Result};
use crate::record::FeatureRecord;

/// Accepted range for one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRule {
    pub name: &'static str,
    pub min: f64,
    /// Whether `min` itself is rejected
    pub min_exclusive: bool,
    pub max: f64,
    /// Value must be a whole number
    pub integer: bool,
}

impl FieldRule {
    const fn int(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            min_exclusive: false,
            max,
            integer: true,
        }
    }

    const fn closed(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            min_exclusive: false,
            max,
            integer: false,
        }
    }

    const fn open_low(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            min_exclusive: true,
            max,
            integer: false,
        }
    }

    /// Check a single value against this rule
    pub fn accepts(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        if self.integer && value.fract() != 0.0 {
            return false;
        }
        let above_min = if self.min_exclusive {
            value > self.min
        } else {
            value >= self.min
        };
        above_min && value <= self.max
    }
}

/// Ranges enforced on inbound neonatal records.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule::int("gender", 0.0, 1.0),
    FieldRule::int("gestational_age_weeks", 22.0, 42.0),
    FieldRule::open_low("birth_weight_kg", 0.5, 6.0),
    FieldRule::open_low("birth_length_cm", 30.0, 60.0),
    FieldRule::open_low("birth_head_circumference_cm", 20.0, 40.0),
    FieldRule::int("age_days", 0.0, 28.0),
    FieldRule::open_low("weight_kg", 0.5, 6.0),
    FieldRule::open_low("length_cm", 30.0, 60.0),
    FieldRule::open_low("head_circumference_cm", 20.0, 40.0),
    FieldRule::closed("temperature_c", 35.0, 42.0),
    FieldRule::int("heart_rate_bpm", 60.0, 220.0),
    FieldRule::int("respiratory_rate_bpm", 20.0, 90.0),
    FieldRule::closed("oxygen_saturation", 70.0, 100.0),
    FieldRule::int("feeding_type", 0.0, 1.0),
    FieldRule::int("feeding_frequency_per_day", 1.0, 12.0),
    FieldRule::int("urine_output_count", 0.0, 10.0),
    FieldRule::int("stool_count", 0.0, 10.0),
    FieldRule::closed("jaundice_level_mg_dl", 0.1, 30.0),
    FieldRule::int("apgar_score", 0.0, 10.0),
    FieldRule::int("immunizations_done", 0.0, 1.0),
    FieldRule::int("reflexes_normal", 0.0, 1.0),
];

impl FeatureRecord {
    /// Validate present values against [`FIELD_RULES`].
    ///
    /// With `require_all`, a missing known feature is also reported. Returns
    /// [`Error::Validation`] carrying the sorted names of every invalid field.
    pub fn validate(&self, require_all: bool) -> Result<()> {
        let mut invalid: Vec<String> = FIELD_RULES
            .iter()
            .filter(|rule| match self.get(rule.name) {
                Some(value) => !rule.accepts(value),
                None => require_all,
            })
            .map(|rule| rule.name.to_string())
            .collect();

        if require_all && self.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            invalid.push("name".to_string());
        }

        if invalid.is_empty() {
            return Ok(());
        }

        invalid.sort();
        invalid.dedup();
        Err(Error::Validation(invalid))
    }
}
