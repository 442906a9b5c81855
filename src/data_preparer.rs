//! Record preparation for model inference.
//!
//! Turns a loosely-typed patient record into the fixed-order feature vector
//! the classifier was trained on.

use crate::error::PredictError;
use crate::models::scaler::StandardScaler;
use crate::types::record::{RawRecord, FEATURE_COUNT, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Configured rescaling mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Scaler fitted once on training data and reused
    #[default]
    Fitted,
    /// Scaler refitted on every incoming row (collapses rows to zero)
    PerRecord,
    /// No rescaling
    Identity,
}

impl fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingMode::Fitted => f.write_str("fitted"),
            ScalingMode::PerRecord => f.write_str("per_record"),
            ScalingMode::Identity => f.write_str("identity"),
        }
    }
}

/// Rescaling applied after the raw vector is assembled
#[derive(Debug, Clone, PartialEq)]
pub enum Scaling {
    Fitted(StandardScaler),
    PerRecord,
    Identity,
}

impl Scaling {
    pub fn mode(&self) -> ScalingMode {
        match self {
            Scaling::Fitted(_) => ScalingMode::Fitted,
            Scaling::PerRecord => ScalingMode::PerRecord,
            Scaling::Identity => ScalingMode::Identity,
        }
    }

    fn apply(&self, raw: Vec<f64>) -> Vec<f64> {
        match self {
            Scaling::Fitted(scaler) => scaler.transform(&raw),
            Scaling::PerRecord => StandardScaler::fit_transform_row(&raw),
            Scaling::Identity => raw,
        }
    }
}

/// Converts records into contract-ordered, rescaled feature vectors.
pub struct DataPreparer {
    scaling: Scaling,
}

impl DataPreparer {
    pub fn new(scaling: Scaling) -> Self {
        Self { scaling }
    }

    pub fn scaling(&self) -> &Scaling {
        &self.scaling
    }

    /// Extract the raw contract vector: label dropped, unknown fields
    /// ignored, missing fields zero.
    pub fn extract(&self, record: &RawRecord) -> Result<Vec<f64>, PredictError> {
        let mut features = Vec::with_capacity(FEATURE_COUNT);

        for name in FEATURE_NAMES {
            let value = match record.get(name) {
                Some(value) => coerce(name, value)?,
                None => 0.0,
            };
            features.push(value);
        }

        Ok(features)
    }

    /// Extract and rescale a record
    pub fn prepare(&self, record: &RawRecord) -> Result<Vec<f64>, PredictError> {
        let raw = self.extract(record)?;
        let prepared = self.scaling.apply(raw);
        debug!(
            features = prepared.len(),
            scaling = %self.scaling.mode(),
            "Record prepared"
        );
        Ok(prepared)
    }

    /// Number of features produced
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }
}

impl Default for DataPreparer {
    fn default() -> Self {
        Self::new(Scaling::Identity)
    }
}

/// Coerce a JSON value to a finite float
fn coerce(field: &str, value: &Value) -> Result<f64, PredictError> {
    let number = match value {
        Value::Null => return Ok(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| PredictError::data(field, format!("unrepresentable number {}", n)))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| PredictError::data(field, format!("not a number: {:?}", s)))?,
        Value::Array(_) | Value::Object(_) => {
            return Err(PredictError::data(field, "expected a scalar value"));
        }
    };

    if !number.is_finite() {
        return Err(PredictError::data(field, "value is not finite"));
    }
    Ok(number)
}
