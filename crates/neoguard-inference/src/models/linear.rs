//! Multinomial logistic regression on Candle
//!
//! Weights come from a safetensors file:
//! - `weight` `[3, n]` and `bias` `[3]`
//! - optional `mean` and `scale` `[n]`, applied as `(x - mean) / scale`

use crate::aligner::FeatureMatrix;
use crate::classifier::ProbabilisticClassifier;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Linear, Module};
use neoguard_core::{ClassProbabilities, Error, Result};
use std::path::Path;
use tracing::info;

/// Linear softmax classifier for the three risk classes.
#[derive(Debug, Clone)]
pub struct LinearSoftmax {
    name: String,
    linear: Linear,
    standardize: Option<(Tensor, Tensor)>,
    num_features: usize,
    device: Device,
}

impl LinearSoftmax {
    /// Number of classes this backend produces
    pub const NUM_CLASSES: usize = 3;

    /// Load weights from a safetensors file onto `device`
    pub fn load(path: impl AsRef<Path>, device: &Device) -> Result<Self> {
        let path = path.as_ref();
        let tensors = candle_core::safetensors::load(path, device)
            .map_err(|e| Error::artifact(path, format!("failed to load safetensors: {}", e)))?;

        let tensor = |key: &str| -> Result<Option<Tensor>> {
            tensors
                .get(key)
                .map(|t| t.to_dtype(DType::F32))
                .transpose()
                .map_err(|e| Error::artifact(path, format!("tensor '{}': {}", key, e)))
        };

        let weight = tensor("weight")?
            .ok_or_else(|| Error::artifact(path, "missing tensor 'weight'"))?;
        let bias =
            tensor("bias")?.ok_or_else(|| Error::artifact(path, "missing tensor 'bias'"))?;
        let standardize = match (tensor("mean")?, tensor("scale")?) {
            (Some(mean), Some(scale)) => Some((mean, scale)),
            (None, None) => None,
            _ => {
                return Err(Error::artifact(
                    path,
                    "'mean' and 'scale' must be provided together",
                ))
            }
        };

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("linear")
            .to_string();

        let model = Self::from_tensors(weight, bias, standardize, device)
            .map_err(|e| Error::artifact(path, e.to_string()))?
            .with_name(name);

        info!(
            path = %path.display(),
            num_features = model.num_features,
            standardized = model.standardize.is_some(),
            "Loaded linear softmax model"
        );

        Ok(model)
    }

    /// Build from already loaded tensors, checking their shapes
    pub fn from_tensors(
        weight: Tensor,
        bias: Tensor,
        standardize: Option<(Tensor, Tensor)>,
        device: &Device,
    ) -> Result<Self> {
        let (classes, num_features) = weight
            .dims2()
            .map_err(|e| Error::config(format!("'weight' must be 2-dimensional: {}", e)))?;
        if classes != Self::NUM_CLASSES {
            return Err(Error::config(format!(
                "model has {} classes, expected {}",
                classes,
                Self::NUM_CLASSES
            )));
        }
        check_vector(&bias, "bias", Self::NUM_CLASSES)?;

        if let Some((mean, scale)) = &standardize {
            check_vector(mean, "mean", num_features)?;
            check_vector(scale, "scale", num_features)?;
            let scale_values = scale.to_vec1::<f32>().map_err(candle_error)?;
            if scale_values.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(Error::config("'scale' contains zero or non-finite values"));
            }
        }

        Ok(Self {
            name: "linear".to_string(),
            linear: Linear::new(weight, Some(bias)),
            standardize,
            num_features,
            device: device.clone(),
        })
    }

    /// Set the classifier name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn forward(&self, features: &FeatureMatrix) -> candle_core::Result<Vec<Vec<f32>>> {
        let data: Vec<f32> = features.as_slice().iter().map(|v| *v as f32).collect();
        let mut x = Tensor::from_vec(data, (features.rows(), features.cols()), &self.device)?;

        if let Some((mean, scale)) = &self.standardize {
            x = x.broadcast_sub(mean)?.broadcast_div(scale)?;
        }

        let logits = self.linear.forward(&x)?;
        candle_nn::ops::softmax(&logits, D::Minus1)?.to_vec2::<f32>()
    }
}

impl ProbabilisticClassifier for LinearSoftmax {
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<ClassProbabilities>> {
        if features.cols() != self.num_features {
            return Err(Error::inference(format!(
                "model expects {} features, got {}",
                self.num_features,
                features.cols()
            )));
        }
        if features.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(i) = features.as_slice().iter().position(|v| !v.is_finite()) {
            return Err(Error::inference(format!(
                "linear model cannot score missing or non-finite input (row {}, column {})",
                i / self.num_features,
                i % self.num_features
            )));
        }

        self.forward(features)
            .map_err(candle_error)?
            .into_iter()
            .map(|row| {
                let row: Vec<f64> = row.into_iter().map(f64::from).collect();
                ClassProbabilities::from_slice(&row)
            })
            .collect()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_features(&self) -> usize {
        self.num_features
    }
}

fn check_vector(tensor: &Tensor, key: &str, len: usize) -> Result<()> {
    match tensor.dims1() {
        Ok(n) if n == len => Ok(()),
        Ok(n) => Err(Error::config(format!(
            "'{}' has {} entries, expected {}",
            key, n, len
        ))),
        Err(e) => Err(Error::config(format!(
            "'{}' must be 1-dimensional: {}",
            key, e
        ))),
    }
}

fn candle_error(e: candle_core::Error) -> Error {
    Error::inference(format!("candle: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use neoguard_core::RiskLevel;
    use std::collections::HashMap;

    /// Only the High logit depends on the single feature.
    fn tensors(with_standardize: bool) -> HashMap<String, Tensor> {
        let device = Device::Cpu;
        let mut tensors = HashMap::new();
        tensors.insert(
            "weight".to_string(),
            Tensor::new(&[[0f32], [0.0], [1.0]], &device).unwrap(),
        );
        tensors.insert(
            "bias".to_string(),
            Tensor::new(&[0f32, 0.0, 0.0], &device).unwrap(),
        );
        if with_standardize {
            tensors.insert("mean".to_string(), Tensor::new(&[10f32], &device).unwrap());
            tensors.insert("scale".to_string(), Tensor::new(&[2f32], &device).unwrap());
        }
        tensors
    }

    fn save(dir: &tempfile::TempDir, tensors: &HashMap<String, Tensor>) -> std::path::PathBuf {
        let path = dir.path().join("linear.safetensors");
        candle_core::safetensors::save(tensors, &path).unwrap();
        path
    }

    #[test]
    fn test_load_and_predict() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(&dir, &tensors(false));
        let model = LinearSoftmax::load(&path, &Device::Cpu).unwrap();

        assert_eq!(model.name(), "linear");
        assert_eq!(model.num_features(), 1);

        let features = FeatureMatrix::from_rows(&[vec![0.0], vec![5.0]]).unwrap();
        let probs = model.predict_proba(&features).unwrap();

        // zero logits everywhere: uniform
        assert!((probs[0].low - 1.0 / 3.0).abs() < 1e-6);
        assert!((probs[0].high - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(probs[1].most_likely(), RiskLevel::High);
    }

    #[test]
    fn test_standardization_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(&dir, &tensors(true));
        let model = LinearSoftmax::load(&path, &Device::Cpu).unwrap();

        // (10 - 10) / 2 = 0: uniform
        let features = FeatureMatrix::from_rows(&[vec![10.0]]).unwrap();
        let probs = model.predict_proba(&features).unwrap();
        assert!((probs[0].medium - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let model = LinearSoftmax::load(save(&dir, &tensors(false)), &Device::Cpu).unwrap();

        let features = FeatureMatrix::from_rows(&[vec![f64::NAN]]).unwrap();
        let err = model.predict_proba(&features).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_rejects_wrong_class_count() {
        let mut tensors = tensors(false);
        tensors.insert(
            "weight".to_string(),
            Tensor::new(&[[0f32], [1.0]], &Device::Cpu).unwrap(),
        );
        let dir = tempfile::tempdir().unwrap();

        let err = LinearSoftmax::load(save(&dir, &tensors), &Device::Cpu).unwrap_err();
        assert!(err.is_startup());
        assert!(err.to_string().contains("2 classes"));
    }

    #[test]
    fn test_rejects_half_standardization() {
        let mut tensors = tensors(true);
        tensors.remove("scale");
        let dir = tempfile::tempdir().unwrap();

        assert!(LinearSoftmax::load(save(&dir, &tensors), &Device::Cpu).is_err());
    }

    #[test]
    fn test_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let model = LinearSoftmax::load(save(&dir, &tensors(false)), &Device::Cpu).unwrap();

        let features = FeatureMatrix::new(0, 1, Vec::new()).unwrap();
        assert!(model.predict_proba(&features).unwrap().is_empty());
    }
}
