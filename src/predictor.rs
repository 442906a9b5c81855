//! Heart-failure predictor facade.
//!
//! Wraps the Data Preparer and the shared classifier behind a small,
//! infallible-where-possible surface used by the HTTP layer.

use crate::data_preparer::{DataPreparer, Scaling, ScalingMode};
use crate::error::{ModelError, PredictError};
use crate::models::classifier::Classifier;
use crate::models::loader::LoadedModel;
use crate::models::voting::Voting;
use crate::types::prediction::{BatchEntry, FailedPrediction, PredictionResult};
use crate::types::record::{RawRecord, FEATURE_NAMES};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Description of the loaded model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub loaded: bool,
    pub name: Option<String>,
    pub voting: Option<Voting>,
    pub scaling: ScalingMode,
    pub n_features: usize,
}

/// Process-wide predictor; immutable after construction and shared via `Arc`.
pub struct HeartFailurePredictor {
    model: Option<Arc<dyn Classifier>>,
    name: Option<String>,
    voting: Option<Voting>,
    preparer: DataPreparer,
}

impl HeartFailurePredictor {
    /// Predictor backed by a loaded model
    pub fn new(model: LoadedModel) -> Self {
        Self {
            model: Some(model.classifier),
            name: Some(model.name),
            voting: model.voting,
            preparer: DataPreparer::new(model.scaling),
        }
    }

    /// Predictor without a model; every prediction is `UNKNOWN`
    pub fn unloaded() -> Self {
        Self {
            model: None,
            name: None,
            voting: None,
            preparer: DataPreparer::new(Scaling::Identity),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            loaded: self.is_loaded(),
            name: self.name.clone(),
            voting: self.voting,
            scaling: self.preparer.scaling().mode(),
            n_features: self.preparer.feature_count(),
        }
    }

    /// Score a single record
    pub fn predict(&self, record: &RawRecord) -> Result<PredictionResult, PredictError> {
        let Some(model) = self.model.as_ref() else {
            warn!("Prediction requested but no model is loaded");
            return Ok(PredictionResult::unknown());
        };

        let features = self.preparer.prepare(record).map_err(|e| {
            error!(error = %e, "Record preparation failed");
            e
        })?;

        let label = model.predict_class(&features).map_err(|e| {
            error!(model = %model.name(), error = %e, "Inference failed");
            PredictError::from(e)
        })?;

        let result = match model.predict_proba(&features) {
            Ok(probs) => PredictionResult::new(label, Some(&probs)),
            Err(ModelError::ProbabilityUnavailable(_)) => PredictionResult::new(label, None),
            Err(e) => {
                warn!(model = %model.name(), error = %e, "Probability retrieval failed");
                PredictionResult::new(label, None)
            }
        };

        debug!(
            label = result.death_event,
            risk = ?result.risk,
            confidence = result.confidence,
            "Prediction complete"
        );
        Ok(result)
    }

    /// Score each record independently; failures become error entries.
    pub fn predict_batch(&self, records: &[RawRecord]) -> Vec<BatchEntry> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| match self.predict(record) {
                Ok(result) => BatchEntry::Scored(result),
                Err(e) => {
                    error!(index = index, error = %e, "Batch record failed");
                    BatchEntry::Failed(FailedPrediction::new(e.to_string()))
                }
            })
            .collect()
    }

    /// Per-feature importances keyed by contract field name, or empty when
    /// the model does not expose them.
    pub fn feature_importance(&self) -> BTreeMap<String, f64> {
        let importances = self
            .model
            .as_ref()
            .and_then(|model| model.feature_importances())
            .unwrap_or_default();

        if !importances.is_empty() && importances.len() != FEATURE_NAMES.len() {
            warn!(
                expected = FEATURE_NAMES.len(),
                actual = importances.len(),
                "Importance vector does not match the feature contract"
            );
            return BTreeMap::new();
        }

        FEATURE_NAMES
            .iter()
            .zip(importances)
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}
