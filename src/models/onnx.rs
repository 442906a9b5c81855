//! Externally trained classifier served through ONNX Runtime

use crate::error::ModelError;
use crate::models::classifier::{argmax, Classifier, CLASS_COUNT};
use crate::types::record::FEATURE_COUNT;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Binary classifier exported to ONNX (e.g. via skl2onnx with zipmap disabled)
pub struct OnnxClassifier {
    /// Sessions need exclusive access to run
    session: Mutex<Session>,
    input_name: String,
    /// Probability output, when the export has one
    proba_output: Option<String>,
    label_output: Option<String>,
}

impl OnnxClassifier {
    /// Load a model file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let proba_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        info!(
            input = %input_name,
            probabilities = ?proba_output,
            label = ?label_output,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            proba_output,
            label_output,
        })
    }

    fn input_tensor(features: &[f64]) -> Result<Tensor<f32>, ModelError> {
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        Tensor::from_array((vec![1_i64, features.len() as i64], data))
            .map_err(|e| ModelError::Runtime(format!("input tensor: {}", e)))
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn n_features(&self) -> usize {
        FEATURE_COUNT
    }

    fn predict_class(&self, features: &[f64]) -> Result<u8, ModelError> {
        if self.proba_output.is_some() {
            return self.predict_proba(features).map(|p| argmax(&p) as u8);
        }

        self.check_width(features)?;
        let output = self
            .label_output
            .as_deref()
            .ok_or_else(|| ModelError::Runtime("model has no label output".into()))?;

        let input = Self::input_tensor(features)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| ModelError::Runtime(format!("lock error: {}", e)))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ModelError::Runtime(e.to_string()))?;

        let (_, labels) = outputs[output]
            .try_extract_tensor::<i64>()
            .map_err(|e| ModelError::Runtime(e.to_string()))?;
        let label = labels
            .first()
            .copied()
            .ok_or_else(|| ModelError::Runtime("empty label output".into()))?;

        u8::try_from(label)
            .ok()
            .filter(|l| usize::from(*l) < CLASS_COUNT)
            .ok_or(ModelError::InvalidLabel(label.clamp(0, 255) as u8))
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.check_width(features)?;
        let output = self
            .proba_output
            .as_deref()
            .ok_or_else(|| ModelError::ProbabilityUnavailable("onnx model".into()))?;

        let input = Self::input_tensor(features)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| ModelError::Runtime(format!("lock error: {}", e)))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ModelError::Runtime(e.to_string()))?;

        let (_, data) = outputs[output]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Runtime(e.to_string()))?;

        if data.len() < CLASS_COUNT {
            return Err(ModelError::Runtime(format!(
                "expected {} class probabilities, got {}",
                CLASS_COUNT,
                data.len()
            )));
        }

        let probs: Vec<f64> = data[..CLASS_COUNT].iter().map(|&p| f64::from(p)).collect();
        debug!(probabilities = ?probs, "ONNX inference complete");
        Ok(probs)
    }
}
