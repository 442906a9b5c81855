//! Model construction: bootstrap ensemble or external ONNX classifier

use crate::config::ModelConfig;
use crate::data_preparer::{Scaling, ScalingMode};
use crate::models::classifier::Classifier;
use crate::models::forest::{ForestParams, RandomForest};
use crate::models::knn::KNeighbors;
use crate::models::scaler::StandardScaler;
use crate::models::synthetic::{make_classification, SyntheticSpec};
use crate::models::tree::{DecisionTree, TreeParams};
use crate::models::voting::{Voting, VotingClassifier};
use crate::types::record::FEATURE_COUNT;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

/// Fitted classifier together with the rescaling it expects
#[derive(Clone)]
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// Shared, read-only classifier
    pub classifier: Arc<dyn Classifier>,
    /// Rescaling applied to records before inference
    pub scaling: Scaling,
    /// Vote rule, for ensembles
    pub voting: Option<Voting>,
}

impl LoadedModel {
    pub fn new(name: &str, classifier: Arc<dyn Classifier>, scaling: Scaling) -> Self {
        Self {
            name: name.to_string(),
            classifier,
            scaling,
            voting: None,
        }
    }

    pub fn with_voting(mut self, voting: Voting) -> Self {
        self.voting = Some(voting);
        self
    }
}

/// Builds the process-wide model from configuration
pub struct ModelLoader {
    config: ModelConfig,
}

impl ModelLoader {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Load the configured external model, or train the bootstrap ensemble
    pub fn load(&self) -> Result<LoadedModel> {
        match self.config.onnx_path.as_deref() {
            Some(path) => self.load_external(path),
            None => self.build_ensemble(),
        }
    }

    /// Fit the voting ensemble (k-NN, decision tree, random forest) on
    /// synthetic data so the service always has a callable model.
    pub fn build_ensemble(&self) -> Result<LoadedModel> {
        let spec = SyntheticSpec {
            seed: self.config.random_state,
            ..SyntheticSpec::default()
        };
        let data = make_classification(&spec).context("Failed to generate bootstrap data")?;

        let (training, scaling) = match self.config.scaling {
            ScalingMode::Fitted => {
                let scaler = StandardScaler::fit(&data.features);
                let scaled = data.map_rows(|row| scaler.transform(row));
                (scaled, Scaling::Fitted(scaler))
            }
            ScalingMode::PerRecord => (data, Scaling::PerRecord),
            ScalingMode::Identity => (data, Scaling::Identity),
        };

        let knn = KNeighbors::fit(self.config.n_neighbors, &training)?;
        let tree_params = TreeParams {
            max_depth: self.config.max_depth,
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(&training, &tree_params, self.config.random_state)?;
        let forest_params = ForestParams {
            n_estimators: self.config.n_estimators,
            max_depth: self.config.max_depth,
        };
        let forest = RandomForest::fit(&training, &forest_params, self.config.random_state)?;

        let ensemble = VotingClassifier::new(self.config.voting)
            .with_member("knn", Box::new(knn))
            .with_member("dt", Box::new(tree))
            .with_member("rf", Box::new(forest));

        info!(
            samples = training.len(),
            members = ?ensemble.member_names(),
            voting = %self.config.voting,
            scaling = %scaling.mode(),
            "Bootstrap ensemble trained"
        );

        Ok(LoadedModel::new("bootstrap_ensemble", Arc::new(ensemble), scaling)
            .with_voting(self.config.voting))
    }

    /// Rescaling for an external model: saved scaler parameters when
    /// provided, otherwise the configured mode without fitted statistics.
    fn external_scaling(&self) -> Result<Scaling> {
        if let Some(path) = self.config.scaler_path.as_deref() {
            let scaler = StandardScaler::load(path)?;
            if scaler.n_features() != FEATURE_COUNT || scaler.scale.len() != FEATURE_COUNT {
                bail!(
                    "Scaler {} has {} features, expected {}",
                    path,
                    scaler.n_features(),
                    FEATURE_COUNT
                );
            }
            return Ok(Scaling::Fitted(scaler));
        }
        Ok(match self.config.scaling {
            ScalingMode::PerRecord => Scaling::PerRecord,
            _ => Scaling::Identity,
        })
    }

    #[cfg(feature = "onnx")]
    fn load_external(&self, path: &str) -> Result<LoadedModel> {
        let classifier = crate::models::onnx::OnnxClassifier::load(path)?;
        let scaling = self.external_scaling()?;
        info!(path = %path, scaling = %scaling.mode(), "External model loaded");
        Ok(LoadedModel::new("onnx", Arc::new(classifier), scaling))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_external(&self, path: &str) -> Result<LoadedModel> {
        // validate the scaler file anyway so misconfiguration surfaces early
        self.external_scaling()?;
        bail!(
            "Cannot load {}: built without the `onnx` feature",
            path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::ModelError;

    fn small_config() -> ModelConfig {
        ModelConfig {
            n_estimators: 10,
            ..AppConfig::default().model
        }
    }

    #[test]
    fn test_bootstrap_ensemble_is_callable() {
        let model = ModelLoader::new(&small_config()).build_ensemble().unwrap();

        assert_eq!(model.classifier.n_features(), FEATURE_COUNT);
        assert!(matches!(model.scaling, Scaling::Fitted(_)));

        let label = model.classifier.predict_class(&[0.0; FEATURE_COUNT]).unwrap();
        assert!(label <= 1);
    }

    #[test]
    fn test_hard_voting_bootstrap_has_no_probabilities() {
        let model = ModelLoader::new(&small_config()).build_ensemble().unwrap();
        assert!(matches!(
            model.classifier.predict_proba(&[0.0; FEATURE_COUNT]),
            Err(ModelError::ProbabilityUnavailable(_))
        ));
    }

    #[test]
    fn test_soft_voting_bootstrap_has_probabilities() {
        let config = ModelConfig {
            voting: Voting::Soft,
            ..small_config()
        };
        let model = ModelLoader::new(&config).build_ensemble().unwrap();
        let probs = model.classifier.predict_proba(&[0.5; FEATURE_COUNT]).unwrap();
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_per_record_mode_trains_on_raw_data() {
        let config = ModelConfig {
            scaling: ScalingMode::PerRecord,
            ..small_config()
        };
        let model = ModelLoader::new(&config).load().unwrap();
        assert_eq!(model.scaling, Scaling::PerRecord);
    }

    #[test]
    fn test_bootstrap_is_deterministic() {
        let a = ModelLoader::new(&small_config()).build_ensemble().unwrap();
        let b = ModelLoader::new(&small_config()).build_ensemble().unwrap();
        let row = [0.3, -1.2, 0.8, 0.0, 1.5, -0.4, 0.2, 0.9, -0.7, 1.1, 0.0, -2.0];
        assert_eq!(
            a.classifier.predict_class(&row).unwrap(),
            b.classifier.predict_class(&row).unwrap()
        );
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_external_model_requires_feature() {
        let config = ModelConfig {
            onnx_path: Some("models/heart_failure.onnx".into()),
            ..small_config()
        };
        assert!(ModelLoader::new(&config).load().is_err());
    }

    fn write_scaler(name: &str, width: usize) -> String {
        let scaler = StandardScaler {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        };
        let path = std::env::temp_dir().join(format!("hf-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, serde_json::to_vec(&scaler).unwrap()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_saved_scaler_width_is_checked() {
        let narrow = ModelConfig {
            scaler_path: Some(write_scaler("narrow-scaler", 5)),
            ..small_config()
        };
        let err = ModelLoader::new(&narrow).external_scaling().unwrap_err();
        assert!(err.to_string().contains("expected 12"));

        let full = ModelConfig {
            scaler_path: Some(write_scaler("full-scaler", FEATURE_COUNT)),
            ..small_config()
        };
        let scaling = ModelLoader::new(&full).external_scaling().unwrap();
        assert!(matches!(scaling, Scaling::Fitted(s) if s.n_features() == FEATURE_COUNT));
    }
}
