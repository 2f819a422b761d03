//! Statically keyed neonatal feature record.
//!
//! Every feature the classifier was trained on has a typed, optional field.
//! A missing field is a missing cell for the aligner to fill, never a zero.
//! Numeric keys outside the known set are kept in [`FeatureRecord::extra`] so
//! a model artifact naming additional features can still be served. Other
//! unknown keys (identifiers, dates, nulls) are dropped.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

macro_rules! feature_record {
    ($( $(#[$doc:meta])* $field:ident ),+ $(,)?) => {
        /// One neonatal observation: vitals, anthropometrics, and care flags.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct FeatureRecord {
            /// Subject label, passed through to the prediction unchanged
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub name: Option<String>,

            $(
                $(#[$doc])*
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<f64>,
            )+

            /// Additional numeric features not covered by the typed fields
            #[serde(flatten, deserialize_with = "numeric_extras")]
            pub extra: BTreeMap<String, f64>,
        }

        /// Names of the typed features, in training column order.
        pub const KNOWN_FEATURES: &[&str] = &[$(stringify!($field)),+];

        impl FeatureRecord {
            /// Look up a feature value by name.
            pub fn get(&self, feature: &str) -> Option<f64> {
                match feature {
                    $(stringify!($field) => self.$field,)+
                    other => self.extra.get(other).copied(),
                }
            }

            /// Set a feature value by name; unknown names land in `extra`.
            pub fn set(&mut self, feature: &str, value: f64) {
                match feature {
                    $(stringify!($field) => self.$field = Some(value),)+
                    other => {
                        self.extra.insert(other.to_string(), value);
                    }
                }
            }

            /// Remove a feature value by name, returning the previous value.
            pub fn clear(&mut self, feature: &str) -> Option<f64> {
                match feature {
                    $(stringify!($field) => self.$field.take(),)+
                    other => self.extra.remove(other),
                }
            }

            /// Iterate over every present `(feature, value)` pair, typed fields first.
            pub fn present(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
                let typed = [$((stringify!($field), self.$field)),+];
                typed
                    .into_iter()
                    .filter_map(|(name, value)| value.map(|v| (name, v)))
                    .chain(self.extra.iter().map(|(k, v)| (k.as_str(), *v)))
            }
        }
    };
}

feature_record! {
    /// 0 = female, 1 = male
    gender,
    gestational_age_weeks,
    birth_weight_kg,
    birth_length_cm,
    birth_head_circumference_cm,
    /// Age at observation, in days since birth
    age_days,
    weight_kg,
    length_cm,
    head_circumference_cm,
    /// Body temperature in degrees Celsius
    temperature_c,
    heart_rate_bpm,
    respiratory_rate_bpm,
    /// SpO2, percent
    oxygen_saturation,
    /// 0 = breastfed, 1 = formula
    feeding_type,
    feeding_frequency_per_day,
    urine_output_count,
    stool_count,
    /// Serum bilirubin, mg/dL
    jaundice_level_mg_dl,
    apgar_score,
    immunizations_done,
    reflexes_normal,
}

/// Keep unknown keys only when their value is a number.
fn numeric_extras<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
        .collect())
}

impl FeatureRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the subject label
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a feature value by name
    pub fn with(mut self, feature: &str, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    /// Build a record from `(feature, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let mut record = Self::new();
        for (feature, value) in pairs {
            record.set(feature, value);
        }
        record
    }

    /// Whether no feature value is present at all
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}
