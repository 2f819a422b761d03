//! Subcommand implementations

use crate::PredictArgs;
use anyhow::{Context, Result};
use neoguard_core::{FeatureRecord, PredictionOutcome};
use neoguard_inference::{InferenceSettings, RiskPredictor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Input file contents: one record or a list of records
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PredictionInput {
    Bulk(Vec<FeatureRecord>),
    Single(FeatureRecord),
}

impl PredictionInput {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .context("input must be a JSON object of numeric features or an array of them")
    }

    fn records(&self) -> &[FeatureRecord] {
        match self {
            Self::Bulk(records) => records,
            Self::Single(record) => std::slice::from_ref(record),
        }
    }
}

/// Bulk output envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkResponse {
    pub message: &'static str,
    pub count: usize,
    pub result: Vec<PredictionOutcome>,
}

impl BulkResponse {
    pub fn new(result: Vec<PredictionOutcome>) -> Self {
        Self {
            message: "Bulk prediction completed",
            count: result.len(),
            result,
        }
    }
}

/// One (subject, condition) row of a flattened report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRow {
    pub name: Option<String>,
    pub condition: neoguard_core::Condition,
    pub risk_level: neoguard_core::RiskLevel,
    pub confidence: f64,
}

pub fn flatten(outcomes: &[PredictionOutcome]) -> Vec<FlatRow> {
    outcomes
        .iter()
        .flat_map(|outcome| {
            outcome.results.iter().map(|r| FlatRow {
                name: outcome.name.clone(),
                condition: r.condition,
                risk_level: r.risk_level,
                confidence: r.confidence,
            })
        })
        .collect()
}

/// Give bulk rows without a usable name the label `Infant {i+1}`
pub fn assign_placeholder_names(records: &mut [FeatureRecord]) {
    for (i, record) in records.iter_mut().enumerate() {
        if record.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            record.name = Some(format!("Infant {}", i + 1));
        }
    }
}

/// Run range validation on every record, naming the first failing one
pub fn validate_records(records: &[FeatureRecord]) -> Result<()> {
    for (i, record) in records.iter().enumerate() {
        let name = record.name.as_deref().unwrap_or("unnamed");
        record
            .validate(true)
            .with_context(|| format!("record {} ({})", i + 1, name))?;
    }
    Ok(())
}

/// Score an input and build the JSON document to emit
pub fn run_predictions(
    predictor: &RiskPredictor,
    mut input: PredictionInput,
    strict: bool,
    flat: bool,
) -> Result<serde_json::Value> {
    if let PredictionInput::Bulk(records) = &mut input {
        assign_placeholder_names(records);
    }
    if strict {
        validate_records(input.records())?;
    }

    let value = match input {
        PredictionInput::Single(record) => {
            let outcome = predictor.predict(&record)?;
            if flat {
                serde_json::to_value(flatten(std::slice::from_ref(&outcome)))?
            } else {
                serde_json::to_value(outcome)?
            }
        }
        PredictionInput::Bulk(records) => {
            let outcomes = predictor.predict_bulk(&records)?;
            info!(count = outcomes.len(), "Bulk prediction completed");
            if flat {
                serde_json::to_value(flatten(&outcomes))?
            } else {
                serde_json::to_value(BulkResponse::new(outcomes))?
            }
        }
    };

    Ok(value)
}

/// `neoguard predict`
pub fn predict(config: Option<&Path>, args: &PredictArgs) -> Result<()> {
    let settings = InferenceSettings::load(config).context("failed to load settings")?;
    let predictor = RiskPredictor::from_settings(&settings)?;

    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let input = PredictionInput::from_json(&content)?;

    let value = run_predictions(&predictor, input, args.strict, args.flat)?;
    let rendered = serde_json::to_string_pretty(&value)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Predictions written");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// `neoguard check`
pub fn check(config: Option<&Path>) -> Result<()> {
    let settings = InferenceSettings::load(config).context("failed to load settings")?;
    let predictor = RiskPredictor::from_settings(&settings)?;
    let thresholds = predictor.thresholds();

    println!("model:          {}", predictor.classifier_name());
    if let Ok(path) = settings.model_path() {
        println!("model artifact: {}", path.display());
    }
    println!("features:       {}", predictor.feature_order().len());
    println!(
        "thresholds:     low < {} <= medium < {} <= high",
        thresholds.low(),
        thresholds.medium()
    );
    println!("missing values: {}", predictor.policy());
    println!("device:         {}", settings.device);

    Ok(())
}
