//! Startup settings for the inference pipeline
//!
//! Sources are layered: built-in defaults, then an optional YAML file, then
//! `NEOGUARD_*` environment variables. Relative artifact paths are taken
//! from the config file's directory when a file is given.

use crate::model_loader::ModelFormat;
use crate::risk::RiskThresholds;
use neoguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable prefix (`NEOGUARD_MODEL_ARTIFACT_PATH`, ...)
pub const ENV_PREFIX: &str = "NEOGUARD";

/// Inference settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    /// Serialized classifier
    #[serde(default)]
    pub model_artifact_path: Option<PathBuf>,

    /// Serialized feature order
    #[serde(default)]
    pub feature_order_artifact_path: Option<PathBuf>,

    /// Probabilities below this are Low risk
    #[serde(default = "default_low_threshold")]
    pub low_risk_threshold: f64,

    /// Probabilities at or above this are High risk
    #[serde(default = "default_medium_threshold")]
    pub medium_risk_threshold: f64,

    /// Model format; inferred from the artifact extension when absent
    #[serde(default)]
    pub model_format: Option<ModelFormat>,

    /// Compute device for the linear backend
    #[serde(default)]
    pub device: DeviceSpec,

    /// How missing feature values are filled
    #[serde(default)]
    pub missing_values: MissingValuePolicy,

    /// JSON object of feature → median
    #[serde(default)]
    pub reference_medians_path: Option<PathBuf>,
}

impl InferenceSettings {
    /// Create settings for the given artifacts with every other key at its default
    pub fn new(model_path: impl Into<PathBuf>, feature_order_path: impl Into<PathBuf>) -> Self {
        Self {
            model_artifact_path: Some(model_path.into()),
            feature_order_artifact_path: Some(feature_order_path.into()),
            ..Default::default()
        }
    }

    /// Load from defaults, an optional YAML file, and `NEOGUARD_*` variables
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(config_path, ENV_PREFIX)
    }

    /// Load with a custom environment prefix
    pub fn load_with_prefix(config_path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        Self::load_layered(config_path, config::Environment::with_prefix(env_prefix))
    }

    fn load_layered(config_path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let mut settings: Self = builder
            .add_source(environment.try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::config(e.to_string()))?;

        if let Some(dir) = config_path.and_then(Path::parent) {
            settings.resolve_relative_to(dir);
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Self =
            serde_yaml::from_str(yaml).map_err(|e| Error::config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file, without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;

        let mut settings: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::config(e.to_string()))?;
        if let Some(dir) = path.parent() {
            settings.resolve_relative_to(dir);
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Anchor relative artifact paths at `base` (the config file's directory)
    fn resolve_relative_to(&mut self, base: &Path) {
        let paths = [
            &mut self.model_artifact_path,
            &mut self.feature_order_artifact_path,
            &mut self.reference_medians_path,
        ];
        for path in paths.into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Check required keys and threshold ordering
    pub fn validate(&self) -> Result<()> {
        self.model_path()?;
        self.feature_order_path()?;
        self.thresholds()?;

        if self.missing_values == MissingValuePolicy::ReferenceMedian
            && self.reference_medians_path.is_none()
        {
            return Err(Error::config(
                "missing_values = reference_median requires reference_medians_path",
            ));
        }

        Ok(())
    }

    pub fn model_path(&self) -> Result<&Path> {
        self.model_artifact_path
            .as_deref()
            .ok_or_else(|| Error::config("model_artifact_path is required"))
    }

    pub fn feature_order_path(&self) -> Result<&Path> {
        self.feature_order_artifact_path
            .as_deref()
            .ok_or_else(|| Error::config("feature_order_artifact_path is required"))
    }

    /// Configured risk thresholds
    pub fn thresholds(&self) -> Result<RiskThresholds> {
        RiskThresholds::new(self.low_risk_threshold, self.medium_risk_threshold)
    }

    pub fn with_thresholds(mut self, low: f64, medium: f64) -> Self {
        self.low_risk_threshold = low;
        self.medium_risk_threshold = medium;
        self
    }

    pub fn with_missing_values(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_values = policy;
        self
    }

    pub fn with_reference_medians(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_medians_path = Some(path.into());
        self
    }

    pub fn with_model_format(mut self, format: ModelFormat) -> Self {
        self.model_format = Some(format);
        self
    }
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            model_artifact_path: None,
            feature_order_artifact_path: None,
            low_risk_threshold: default_low_threshold(),
            medium_risk_threshold: default_medium_threshold(),
            model_format: None,
            device: DeviceSpec::default(),
            missing_values: MissingValuePolicy::default(),
            reference_medians_path: None,
        }
    }
}

/// Missing-value fill policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Median of the column over the current batch, falling back to the
    /// reference median for columns the batch cannot fill
    #[default]
    BatchMedian,
    /// Always the shipped reference median
    ReferenceMedian,
    /// Batch median, but fail the request if any cell stays unfilled
    Reject,
}

impl MissingValuePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BatchMedian => "batch_median",
            Self::ReferenceMedian => "reference_median",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for MissingValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

impl DeviceSpec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::Metal => "metal",
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_low_threshold() -> f64 {
    RiskThresholds::DEFAULT_LOW
}

fn default_medium_threshold() -> f64 {
    RiskThresholds::DEFAULT_MEDIUM
}
