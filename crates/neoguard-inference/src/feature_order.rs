//! Ordered feature schema the classifier was trained on

use neoguard_core::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Fixed, ordered list of input feature names.
///
/// Loaded once at startup and immutable afterwards; cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOrder {
    names: Arc<[String]>,
}

impl FeatureOrder {
    /// Create a feature order, rejecting empty, blank, or duplicate names.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::config("feature order is empty"));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(Error::config("feature order contains a blank name"));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::config(format!(
                    "feature order contains '{}' more than once",
                    name
                )));
            }
        }

        Ok(Self {
            names: names.into(),
        })
    }

    /// Load from a JSON array, or a YAML sequence for `.yaml`/`.yml` files.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::artifact(path, format!("failed to read feature order: {}", e)))?;

        let names: Vec<String> = if is_yaml(path) {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::artifact(path, format!("invalid feature order: {}", e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::artifact(path, format!("invalid feature order: {}", e)))?
        };

        Self::new(names).map_err(|e| Error::artifact(path, e.to_string()))
    }

    /// Feature names in model order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: an empty order cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Column index of a feature
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Iterate over `(column, name)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.names.iter().map(String::as_str).enumerate()
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}
