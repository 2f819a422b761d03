//! Shipped reference medians used to fill missing features

use crate::feature_order::FeatureOrder;
use neoguard_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-feature fill values computed offline from the training data.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMedians {
    medians: BTreeMap<String, f64>,
}

impl ReferenceMedians {
    /// Create from a feature → median map; every value must be finite.
    pub fn new(medians: BTreeMap<String, f64>) -> Result<Self> {
        if let Some((name, value)) = medians.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::config(format!(
                "reference median for '{}' is not finite: {}",
                name, value
            )));
        }
        Ok(Self { medians })
    }

    /// Load from a JSON object mapping feature names to medians.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::artifact(path, format!("failed to read reference medians: {}", e))
        })?;
        let medians: BTreeMap<String, f64> = serde_json::from_str(&content)
            .map_err(|e| Error::artifact(path, format!("invalid reference medians: {}", e)))?;

        Self::new(medians).map_err(|e| Error::artifact(path, e.to_string()))
    }

    /// Median for one feature
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.medians.get(feature).copied()
    }

    /// Medians laid out in column order; `None` where a feature has no entry.
    pub fn for_order(&self, order: &FeatureOrder) -> Vec<Option<f64>> {
        order.names().iter().map(|name| self.get(name)).collect()
    }

    /// Medians in column order, failing if any feature is not covered.
    pub fn covering(&self, order: &FeatureOrder) -> Result<Vec<f64>> {
        let missing: Vec<&str> = order
            .names()
            .iter()
            .filter(|name| !self.medians.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            return Err(Error::config(format!(
                "reference medians missing for: {}",
                missing.join(", ")
            )));
        }

        Ok(order
            .names()
            .iter()
            .filter_map(|name| self.get(name))
            .collect())
    }
}
