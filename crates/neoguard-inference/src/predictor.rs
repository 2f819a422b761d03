//! Prediction orchestration
//!
//! [`RiskPredictor`] holds everything loaded at startup and runs
//! align → predict_proba → map → bucket for single and bulk requests.

use crate::aligner::{FeatureAligner, FeatureMatrix};
use crate::classifier::ProbabilisticClassifier;
use crate::config::{InferenceSettings, MissingValuePolicy};
use crate::feature_order::FeatureOrder;
use crate::mapper::map_to_conditions;
use crate::model_loader::{load_classifier, verify_compatibility, ModelFormat};
use crate::reference::ReferenceMedians;
use crate::risk::{interpret, RiskThresholds};
use neoguard_core::{ClassProbabilities, Error, FeatureRecord, PredictionOutcome, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, error, info};

/// Immutable prediction service
///
/// Cheap to clone and safe to share across threads; calls never mutate it.
#[derive(Clone)]
pub struct RiskPredictor {
    classifier: Arc<dyn ProbabilisticClassifier>,
    aligner: FeatureAligner,
    thresholds: RiskThresholds,
}

impl RiskPredictor {
    /// Create a predictor with batch-median fill and default thresholds.
    ///
    /// Fails if the classifier does not fit the feature order.
    pub fn new(classifier: Arc<dyn ProbabilisticClassifier>, order: FeatureOrder) -> Result<Self> {
        verify_compatibility(classifier.as_ref(), &order)?;
        Ok(Self {
            classifier,
            aligner: FeatureAligner::new(order),
            thresholds: RiskThresholds::default(),
        })
    }

    /// Load the model, feature order, and reference medians named in `settings`
    pub fn from_settings(settings: &InferenceSettings) -> Result<Self> {
        settings.validate()?;

        let order = FeatureOrder::load(settings.feature_order_path()?)?;
        let model_path = settings.model_path()?;
        let format = ModelFormat::resolve(model_path, settings.model_format)?;
        let classifier = load_classifier(model_path, format, settings.device)?;

        let reference = settings
            .reference_medians_path
            .as_deref()
            .map(ReferenceMedians::load)
            .transpose()?;
        let aligner =
            FeatureAligner::with_policy(order.clone(), settings.missing_values, reference.as_ref())?;

        let predictor = Self::new(classifier, order)?
            .with_aligner(aligner)?
            .with_thresholds(settings.thresholds()?);

        info!(
            model = predictor.classifier_name(),
            format = %format,
            features = predictor.feature_order().len(),
            low_risk_threshold = predictor.thresholds.low(),
            medium_risk_threshold = predictor.thresholds.medium(),
            missing_values = %predictor.policy(),
            "Risk predictor ready"
        );

        Ok(predictor)
    }

    /// Replace the risk thresholds
    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Replace the aligner; its feature order must match the current one
    pub fn with_aligner(mut self, aligner: FeatureAligner) -> Result<Self> {
        if aligner.order() != self.aligner.order() {
            return Err(Error::config(
                "aligner feature order differs from the classifier's feature order",
            ));
        }
        self.aligner = aligner;
        Ok(self)
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn feature_order(&self) -> &FeatureOrder {
        self.aligner.order()
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn policy(&self) -> MissingValuePolicy {
        self.aligner.policy()
    }

    /// Predict risks for one record
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionOutcome> {
        self.run(std::slice::from_ref(record), "single")?
            .pop()
            .ok_or_else(|| Error::inference("no prediction produced for record"))
    }

    /// Predict risks for a batch; one outcome per record, in input order.
    ///
    /// Any failure fails the whole batch.
    pub fn predict_bulk(&self, records: &[FeatureRecord]) -> Result<Vec<PredictionOutcome>> {
        self.run(records, "bulk")
    }

    fn run(&self, records: &[FeatureRecord], mode: &'static str) -> Result<Vec<PredictionOutcome>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let span = debug_span!("predict", mode, rows = records.len());
        let _enter = span.enter();
        let start = Instant::now();

        let batch = self.aligner.align(records)?;
        let probabilities = match self.classify(&batch.matrix, records.len()) {
            Ok(probabilities) => probabilities,
            Err(e) => {
                metrics::counter!("neoguard_inference_errors_total").increment(1);
                error!(model = self.classifier.name(), error = %e, "Inference failed");
                return Err(e);
            }
        };

        let outcomes: Vec<PredictionOutcome> = records
            .iter()
            .zip(&probabilities)
            .map(|(record, probs)| {
                let results = interpret(&map_to_conditions(probs), &self.thresholds);
                for result in &results {
                    metrics::counter!(
                        "neoguard_risk_levels_total",
                        "condition" => result.condition.display_name(),
                        "level" => result.risk_level.as_str()
                    )
                    .increment(1);
                }
                PredictionOutcome::new(record.name.clone(), results)
            })
            .collect();

        let elapsed = start.elapsed();
        metrics::counter!("neoguard_predictions_total", "mode" => mode)
            .increment(records.len() as u64);
        metrics::histogram!("neoguard_inference_latency_us", "mode" => mode)
            .record(elapsed.as_micros() as f64);

        debug!(
            rows = records.len(),
            degenerate_rows = batch.report.degenerate_rows.len(),
            latency_us = elapsed.as_micros() as u64,
            "Prediction completed"
        );

        Ok(outcomes)
    }

    fn classify(
        &self,
        features: &FeatureMatrix,
        expected_rows: usize,
    ) -> Result<Vec<ClassProbabilities>> {
        let probabilities = self.classifier.predict_proba(features)?;

        if probabilities.len() != expected_rows {
            return Err(Error::inference(format!(
                "classifier '{}' returned {} rows for {} inputs",
                self.classifier.name(),
                probabilities.len(),
                expected_rows
            )));
        }
        for probs in &probabilities {
            probs.validate()?;
        }

        Ok(probabilities)
    }
}

impl std::fmt::Debug for RiskPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskPredictor")
            .field("classifier", &self.classifier.name())
            .field("aligner", &self.aligner)
            .field("thresholds", &self.thresholds)
            .finish()
    }
}
