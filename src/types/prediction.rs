//! Prediction result data structures

use serde::{Deserialize, Serialize};

/// Risk classification attached to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    HighRisk,
    LowRisk,
    /// No model was available to score the record
    Unknown,
    /// The record could not be scored
    Error,
}

impl RiskCategory {
    /// Derive the risk category from a predicted label
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            RiskCategory::HighRisk
        } else {
            RiskCategory::LowRisk
        }
    }
}

/// Outcome of scoring a single patient record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted label (0 = survived, 1 = death event)
    #[serde(rename = "DEATH_EVENT")]
    pub death_event: u8,

    /// Risk category derived from the label
    pub risk: RiskCategory,

    /// Highest class probability (0.0 - 1.0)
    pub confidence: f64,

    /// Probability of the death event class (0.0 - 1.0)
    pub probability_death: f64,
}

impl PredictionResult {
    /// Build a result from a label and optional class probabilities.
    ///
    /// Without probabilities the confidence is 0.0 and the death probability
    /// mirrors the label.
    pub fn new(label: u8, probabilities: Option<&[f64]>) -> Self {
        let (confidence, probability_death) = match probabilities {
            Some(probs) => {
                let death = if probs.len() > 1 { probs[1] } else { 0.0 };
                let max = probs.iter().copied().fold(0.0, f64::max);
                (max, death)
            }
            None => (0.0, f64::from(label)),
        };

        Self {
            death_event: label,
            risk: RiskCategory::from_label(label),
            confidence: round4(confidence),
            probability_death: round4(probability_death),
        }
    }

    /// Safe default returned when no model is loaded
    pub fn unknown() -> Self {
        Self {
            death_event: 0,
            risk: RiskCategory::Unknown,
            confidence: 0.0,
            probability_death: 0.0,
        }
    }
}

/// Placeholder for a record that failed inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPrediction {
    /// Always -1
    pub prediction: i8,
    /// Always `ERROR`
    pub risk: RiskCategory,
    pub confidence: f64,
    pub probability_death: f64,
    /// Why the record could not be scored
    pub error: String,
}

impl FailedPrediction {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            prediction: -1,
            risk: RiskCategory::Error,
            confidence: 0.0,
            probability_death: 0.0,
            error: error.into(),
        }
    }
}

/// One entry of a batch prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Failed(FailedPrediction),
    Scored(PredictionResult),
}

impl BatchEntry {
    /// Predicted label, or -1 for failed entries
    pub fn label(&self) -> i8 {
        match self {
            BatchEntry::Scored(result) => result.death_event as i8,
            BatchEntry::Failed(failed) => failed.prediction,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BatchEntry::Scored(_) => None,
            BatchEntry::Failed(failed) => Some(&failed.error),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_from_label() {
        assert_eq!(RiskCategory::from_label(1), RiskCategory::HighRisk);
        assert_eq!(RiskCategory::from_label(0), RiskCategory::LowRisk);
    }

    #[test]
    fn test_result_with_probabilities() {
        let result = PredictionResult::new(1, Some(&[0.33333, 0.66667]));
        assert_eq!(result.risk, RiskCategory::HighRisk);
        assert_eq!(result.confidence, 0.6667);
        assert_eq!(result.probability_death, 0.6667);
    }

    #[test]
    fn test_result_without_probabilities() {
        let result = PredictionResult::new(1, None);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.probability_death, 1.0);

        let result = PredictionResult::new(0, None);
        assert_eq!(result.probability_death, 0.0);
    }

    #[test]
    fn test_unknown_serialization() {
        let json = serde_json::to_value(PredictionResult::unknown()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "DEATH_EVENT": 0,
                "risk": "UNKNOWN",
                "confidence": 0.0,
                "probability_death": 0.0
            })
        );
    }

    #[test]
    fn test_failed_entry_serialization() {
        let entry = BatchEntry::Failed(FailedPrediction::new("bad value"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["prediction"], -1);
        assert_eq!(json["risk"], "ERROR");
        assert_eq!(json["error"], "bad value");
        assert_eq!(entry.label(), -1);
    }
}
