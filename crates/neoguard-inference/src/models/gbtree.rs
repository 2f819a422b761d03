//! Gradient-boosted tree ensemble loaded from an XGBoost JSON model
//!
//! Supports the `gbtree` booster with numerical splits and a
//! `multi:softprob`/`multi:softmax` objective. Scoring follows XGBoost: each
//! tree adds its leaf value to the margin of the class it was grown for,
//! features are compared in `f32` as `x < threshold`, and a missing (`NaN`)
//! feature takes the node's default direction.

use crate::aligner::FeatureMatrix;
use crate::classifier::ProbabilisticClassifier;
use neoguard_core::{ClassProbabilities, Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: LearnerSection,
}

#[derive(Debug, Deserialize)]
struct LearnerSection {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: BoosterSection,
    learner_model_param: LearnerModelParam,
    #[serde(default)]
    objective: Option<ObjectiveSection>,
}

#[derive(Debug, Deserialize)]
struct BoosterSection {
    name: String,
    #[serde(default)]
    model: Option<TreeEnsemble>,
}

#[derive(Debug, Deserialize)]
struct TreeEnsemble {
    trees: Vec<TreeSection>,
    tree_info: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct TreeSection {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// XGBoost writes boolean arrays as `0`/`1` in some versions and as
/// `true`/`false` in others.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// Model parameters are serialised as strings
#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    #[serde(default)]
    base_score: Option<String>,
    num_class: String,
    num_feature: String,
}

#[derive(Debug, Deserialize)]
struct ObjectiveSection {
    name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_section(index: usize, section: TreeSection, num_features: usize) -> Result<Self> {
        let len = section.left_children.len();
        if [
            section.right_children.len(),
            section.split_indices.len(),
            section.split_conditions.len(),
            section.default_left.len(),
        ]
        .iter()
        .any(|&l| l != len)
        {
            return Err(Error::config(format!(
                "tree {} has node arrays of different lengths",
                index
            )));
        }
        if len == 0 {
            return Err(Error::config(format!("tree {} has no nodes", index)));
        }
        if section.split_type.iter().any(|&t| t != 0) {
            return Err(Error::config(format!(
                "tree {} uses categorical splits, which are not supported",
                index
            )));
        }

        let mut nodes = Vec::with_capacity(len);
        for i in 0..len {
            let left = section.left_children[i];
            if left == -1 {
                nodes.push(Node::Leaf(section.split_conditions[i]));
                continue;
            }

            let right = section.right_children[i];
            let feature = section.split_indices[i];
            // children always follow their parent, so traversal terminates
            let in_tree = |c: i64| c > i as i64 && (c as usize) < len;
            if !in_tree(left) || !in_tree(right) {
                return Err(Error::config(format!(
                    "tree {} node {} has invalid children ({}, {})",
                    index, i, left, right
                )));
            }
            if feature < 0 || feature as usize >= num_features {
                return Err(Error::config(format!(
                    "tree {} node {} splits on feature {} (model has {})",
                    index, i, feature, num_features
                )));
            }

            nodes.push(Node::Split {
                feature: feature as usize,
                threshold: section.split_conditions[i],
                left: left as usize,
                right: right as usize,
                default_left: section.default_left[i].is_set(),
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, row: &[f64]) -> f32 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[feature];
                    index = if x.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if (x as f32) < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Gradient-boosted tree classifier for the three risk classes.
#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    name: String,
    trees: Vec<Tree>,
    /// Class each tree contributes to
    tree_class: Vec<usize>,
    base_score: [f32; 3],
    num_features: usize,
    feature_names: Option<Vec<String>>,
}

impl GradientBoostedTrees {
    /// Number of classes this backend produces
    pub const NUM_CLASSES: usize = 3;

    /// Load an XGBoost JSON model from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::artifact(path, format!("failed to read model: {}", e)))?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("xgboost")
            .to_string();

        let model = Self::from_json_str(&content)
            .map_err(|e| Error::artifact(path, e.to_string()))?
            .with_name(name);

        info!(
            path = %path.display(),
            trees = model.trees.len(),
            num_features = model.num_features,
            "Loaded gradient-boosted tree model"
        );

        Ok(model)
    }

    /// Parse an XGBoost JSON model document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ModelFile = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("not an XGBoost JSON model: {}", e)))?;
        let learner = file.learner;

        if let Some(objective) = &learner.objective {
            if !objective.name.starts_with("multi:") {
                return Err(Error::config(format!(
                    "objective '{}' is not a multi-class objective",
                    objective.name
                )));
            }
        }

        if learner.gradient_booster.name != "gbtree" {
            return Err(Error::config(format!(
                "booster '{}' is not supported, expected 'gbtree'",
                learner.gradient_booster.name
            )));
        }
        let ensemble = learner
            .gradient_booster
            .model
            .ok_or_else(|| Error::config("gbtree booster has no model section"))?;

        let params = &learner.learner_model_param;
        let num_class: usize = params
            .num_class
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("invalid num_class '{}'", params.num_class)))?;
        if num_class != Self::NUM_CLASSES {
            return Err(Error::config(format!(
                "model has {} classes, expected {}",
                num_class,
                Self::NUM_CLASSES
            )));
        }

        let num_features: usize = params.num_feature.trim().parse().map_err(|_| {
            Error::config(format!("invalid num_feature '{}'", params.num_feature))
        })?;
        let base_score = parse_base_score(params.base_score.as_deref())?;

        if ensemble.tree_info.len() != ensemble.trees.len() {
            return Err(Error::config(format!(
                "tree_info has {} entries for {} trees",
                ensemble.tree_info.len(),
                ensemble.trees.len()
            )));
        }
        if let Some(class) = ensemble.tree_info.iter().find(|&&c| c >= num_class) {
            return Err(Error::config(format!(
                "tree assigned to class {} of {}",
                class, num_class
            )));
        }

        let trees = ensemble
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, section)| Tree::from_section(i, section, num_features))
            .collect::<Result<Vec<_>>>()?;

        let feature_names = if learner.feature_names.is_empty() {
            None
        } else {
            Some(learner.feature_names)
        };

        Ok(Self {
            name: "xgboost".to_string(),
            trees,
            tree_class: ensemble.tree_info,
            base_score,
            num_features,
            feature_names,
        })
    }

    /// Set the classifier name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of trees in the ensemble
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw per-class margins for one row
    fn margins(&self, row: &[f64]) -> [f32; 3] {
        let mut margins = self.base_score;
        for (tree, &class) in self.trees.iter().zip(&self.tree_class) {
            margins[class] += tree.leaf_value(row);
        }
        margins
    }
}

impl ProbabilisticClassifier for GradientBoostedTrees {
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<ClassProbabilities>> {
        if features.cols() != self.num_features {
            return Err(Error::inference(format!(
                "model expects {} features, got {}",
                self.num_features,
                features.cols()
            )));
        }

        features
            .iter_rows()
            .map(|row| ClassProbabilities::from_slice(&softmax(self.margins(row))))
            .collect()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}

/// `base_score` is a scalar (`"5E-1"`) or, in newer releases, a per-class
/// vector (`"[3.3E-1,3.3E-1,3.3E-1]"`).
fn parse_base_score(raw: Option<&str>) -> Result<[f32; 3]> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok([0.5; 3]);
    };

    let parse = |s: &str| -> Result<f32> {
        s.trim()
            .parse::<f32>()
            .map_err(|_| Error::config(format!("invalid base_score '{}'", raw)))
    };

    match raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        Some(list) => {
            let values = list.split(',').map(parse).collect::<Result<Vec<_>>>()?;
            match values.as_slice() {
                [single] => Ok([*single; 3]),
                [a, b, c] => Ok([*a, *b, *c]),
                _ => Err(Error::config(format!(
                    "base_score has {} entries, expected 1 or 3",
                    values.len()
                ))),
            }
        }
        None => Ok([parse(raw)?; 3]),
    }
}

fn softmax(margins: [f32; 3]) -> [f64; 3] {
    let max = margins.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exp = margins.map(|m| (m as f64 - max).exp());
    let sum: f64 = exp.iter().sum();
    exp.map(|e| e / sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neoguard_core::RiskLevel;
    use serde_json::json;

    fn stump(left: f32, right: f32, default_left: serde_json::Value) -> serde_json::Value {
        json!({
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [0, 0, 0],
            "split_conditions": [0.5, left, right],
            "default_left": default_left,
            "split_type": [0, 0, 0],
            "base_weights": [0.0, left, right]
        })
    }

    /// One stump per class on feature 0: low below 0.5, high above.
    fn model_json() -> serde_json::Value {
        json!({
            "learner": {
                "feature_names": ["jaundice_level_mg_dl", "heart_rate_bpm"],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "trees": [
                            stump(1.0, -1.0, json!([1, 0, 0])),
                            stump(0.0, 0.0, json!([true, false, false])),
                            stump(-1.0, 1.0, json!([1, 0, 0]))
                        ],
                        "tree_info": [0, 1, 2]
                    }
                },
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": "3",
                    "num_feature": "2"
                },
                "objective": { "name": "multi:softprob" }
            },
            "version": [2, 0, 3]
        })
    }

    fn model() -> GradientBoostedTrees {
        GradientBoostedTrees::from_json_str(&model_json().to_string()).unwrap()
    }

    #[test]
    fn test_parses_model() {
        let model = model();
        assert_eq!(model.num_trees(), 3);
        assert_eq!(model.num_features(), 2);
        assert_eq!(
            model.feature_names().unwrap(),
            ["jaundice_level_mg_dl", "heart_rate_bpm"]
        );
    }

    #[test]
    fn test_predict_proba_softmax() {
        let features = FeatureMatrix::from_rows(&[vec![0.0, 120.0], vec![1.0, 120.0]]).unwrap();
        let probs = model().predict_proba(&features).unwrap();

        assert_eq!(probs.len(), 2);
        // margins [1.5, 0.5, -0.5]; base score shifts every class equally
        let expected_low = 1f64.exp() / (1f64.exp() + 1.0 + (-1f64).exp());
        assert!((probs[0].low - expected_low).abs() < 1e-6);
        assert_eq!(probs[0].most_likely(), RiskLevel::Low);
        assert_eq!(probs[1].most_likely(), RiskLevel::High);
        assert!((probs[1].high - expected_low).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_strict_less_than() {
        let features = FeatureMatrix::from_rows(&[vec![0.5, 0.0]]).unwrap();
        let probs = model().predict_proba(&features).unwrap();
        assert_eq!(probs[0].most_likely(), RiskLevel::High);
    }

    #[test]
    fn test_missing_value_follows_default_direction() {
        let features = FeatureMatrix::from_rows(&[vec![f64::NAN, 0.0], vec![0.0, 0.0]]).unwrap();
        let probs = model().predict_proba(&features).unwrap();
        assert_eq!(probs[0], probs[1]);
    }

    #[test]
    fn test_rejects_wrong_feature_count() {
        let features = FeatureMatrix::from_rows(&[vec![0.0]]).unwrap();
        let err = model().predict_proba(&features).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_rejects_non_three_class_models() {
        let mut doc = model_json();
        doc["learner"]["learner_model_param"]["num_class"] = json!("2");
        let err = GradientBoostedTrees::from_json_str(&doc.to_string()).unwrap_err();
        assert!(err.to_string().contains("2 classes"));
    }

    #[test]
    fn test_rejects_categorical_splits() {
        let mut doc = model_json();
        doc["learner"]["gradient_booster"]["model"]["trees"][0]["split_type"] = json!([1, 0, 0]);
        let err = GradientBoostedTrees::from_json_str(&doc.to_string()).unwrap_err();
        assert!(err.to_string().contains("categorical"));
    }

    #[test]
    fn test_rejects_out_of_range_split_feature() {
        let mut doc = model_json();
        doc["learner"]["gradient_booster"]["model"]["trees"][1]["split_indices"] = json!([5, 0, 0]);
        assert!(GradientBoostedTrees::from_json_str(&doc.to_string()).is_err());
    }

    #[test]
    fn test_rejects_dart_booster() {
        let mut doc = model_json();
        doc["learner"]["gradient_booster"]["name"] = json!("dart");
        assert!(GradientBoostedTrees::from_json_str(&doc.to_string()).is_err());
    }

    #[test]
    fn test_parse_base_score() {
        assert_eq!(parse_base_score(None).unwrap(), [0.5; 3]);
        assert_eq!(parse_base_score(Some("5E-1")).unwrap(), [0.5; 3]);
        assert_eq!(
            parse_base_score(Some("[1E-1,2E-1,7E-1]")).unwrap(),
            [0.1, 0.2, 0.7]
        );
        assert!(parse_base_score(Some("[1,2]")).is_err());
        assert!(parse_base_score(Some("half")).is_err());
    }

    #[test]
    fn test_load_wraps_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{\"learner\": {}}").unwrap();

        let err = GradientBoostedTrees::load(&path).unwrap_err();
        assert!(matches!(err, Error::Artifact { .. }));

        std::fs::write(&path, model_json().to_string()).unwrap();
        let model = GradientBoostedTrees::load(&path).unwrap();
        assert_eq!(model.name(), "model");
    }
}
