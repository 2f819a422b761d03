//! Model loading and startup compatibility checks

use crate::classifier::ProbabilisticClassifier;
use crate::config::DeviceSpec;
use crate::feature_order::FeatureOrder;
use crate::models::GradientBoostedTrees;
use neoguard_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Serialized model format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFormat {
    /// XGBoost JSON model dump (gradient-boosted trees)
    #[serde(rename = "xgboost-json")]
    XgboostJson,
    /// SafeTensors weights for the linear softmax model
    #[serde(rename = "safetensors")]
    SafeTensors,
}

impl ModelFormat {
    /// Infer from the artifact extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::XgboostJson),
            Some("safetensors") => Some(Self::SafeTensors),
            _ => None,
        }
    }

    /// Use the configured format, or infer it from the path
    pub fn resolve(path: &Path, configured: Option<ModelFormat>) -> Result<Self> {
        configured
            .or_else(|| Self::from_extension(path))
            .ok_or_else(|| {
                Error::config(format!(
                    "cannot infer model format of {}; set model_format",
                    path.display()
                ))
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XgboostJson => "xgboost-json",
            Self::SafeTensors => "safetensors",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load a classifier from disk
pub fn load_classifier(
    path: &Path,
    format: ModelFormat,
    device: DeviceSpec,
) -> Result<Arc<dyn ProbabilisticClassifier>> {
    match format {
        ModelFormat::XgboostJson => {
            if device != DeviceSpec::Cpu {
                tracing::warn!(%device, "Tree models always run on the CPU");
            }
            Ok(Arc::new(GradientBoostedTrees::load(path)?))
        }
        ModelFormat::SafeTensors => load_linear(path, device),
    }
}

#[cfg(feature = "linear-models")]
fn load_linear(path: &Path, device: DeviceSpec) -> Result<Arc<dyn ProbabilisticClassifier>> {
    let device = create_device(device)?;
    Ok(Arc::new(crate::models::LinearSoftmax::load(path, &device)?))
}

#[cfg(not(feature = "linear-models"))]
fn load_linear(path: &Path, _device: DeviceSpec) -> Result<Arc<dyn ProbabilisticClassifier>> {
    Err(Error::config(format!(
        "{} is a safetensors model but linear-models support is not compiled in",
        path.display()
    )))
}

/// Create Candle device from device spec
#[cfg(feature = "linear-models")]
fn create_device(spec: DeviceSpec) -> Result<candle_core::Device> {
    use candle_core::Device;

    match spec {
        DeviceSpec::Cpu => Ok(Device::Cpu),
        DeviceSpec::Cuda => Device::new_cuda(0)
            .map_err(|e| Error::config(format!("Failed to create CUDA device: {}", e))),
        DeviceSpec::Metal => Device::new_metal(0)
            .map_err(|e| Error::config(format!("Failed to create Metal device: {}", e))),
    }
}

/// Check that a loaded classifier fits the feature order.
///
/// The feature counts must match, and if the model stores its own feature
/// names they must equal the order exactly.
pub fn verify_compatibility(
    classifier: &dyn ProbabilisticClassifier,
    order: &FeatureOrder,
) -> Result<()> {
    if classifier.num_features() != order.len() {
        return Err(Error::config(format!(
            "model '{}' expects {} features but the feature order lists {}",
            classifier.name(),
            classifier.num_features(),
            order.len()
        )));
    }

    if let Some(names) = classifier.feature_names() {
        if let Some((i, (model, listed))) = names
            .iter()
            .zip(order.names())
            .enumerate()
            .find(|(_, (a, b))| a != b)
        {
            return Err(Error::config(format!(
                "feature {} is '{}' in model '{}' but '{}' in the feature order",
                i,
                model,
                classifier.name(),
                listed
            )));
        }
    }

    Ok(())
}
