//! Random forest of bootstrapped CART trees

use crate::error::ModelError;
use crate::models::classifier::{argmax, Classifier, Dataset, CLASS_COUNT};
use crate::models::tree::{DecisionTree, TreeParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Forest hyper-parameters
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 3,
        }
    }
}

pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit `n_estimators` trees, each on a bootstrap sample of the rows and
    /// considering sqrt(n_features) candidate features per split.
    pub fn fit(data: &Dataset, params: &ForestParams, seed: u64) -> Result<Self, ModelError> {
        if data.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let n_features = data.n_features();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            max_features: Some(((n_features as f64).sqrt() as usize).max(1)),
            ..TreeParams::default()
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let n = data.len();
        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit_on(data, sample, &tree_params, rng.gen())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { trees, n_features })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_class(&self, features: &[f64]) -> Result<u8, ModelError> {
        let probs = self.predict_proba(features)?;
        Ok(argmax(&probs) as u8)
    }

    /// Mean of the per-tree leaf distributions
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.check_width(features)?;

        let mut probs = vec![0.0; CLASS_COUNT];
        for tree in &self.trees {
            for (p, t) in probs.iter_mut().zip(tree.predict_proba(features)?) {
                *p += t;
            }
        }
        let count = self.trees.len() as f64;
        Ok(probs.into_iter().map(|p| p / count).collect())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        let mut importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(tree_importances) = tree.feature_importances() {
                for (acc, v) in importances.iter_mut().zip(tree_importances) {
                    *acc += v;
                }
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        Some(importances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> Dataset {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = i as f64;
            features.push(vec![x, (i % 5) as f64, 1.0, 0.5]);
            labels.push(u8::from(i >= 20));
        }
        Dataset::new(features, labels).unwrap()
    }

    #[test]
    fn test_fits_requested_number_of_trees() {
        let params = ForestParams {
            n_estimators: 10,
            max_depth: 3,
        };
        let forest = RandomForest::fit(&separable(), &params, 42).unwrap();
        assert_eq!(forest.tree_count(), 10);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let forest = RandomForest::fit(&separable(), &ForestParams::default(), 42).unwrap();
        let probs = forest.predict_proba(&[12.0, 2.0, 1.0, 0.5]).unwrap();
        assert_eq!(probs.len(), 2);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_classifies_extremes() {
        let forest = RandomForest::fit(&separable(), &ForestParams::default(), 42).unwrap();
        assert_eq!(forest.predict_class(&[0.0, 0.0, 1.0, 0.5]).unwrap(), 0);
        assert_eq!(forest.predict_class(&[39.0, 4.0, 1.0, 0.5]).unwrap(), 1);
    }

    #[test]
    fn test_importances_are_normalized() {
        let forest = RandomForest::fit(&separable(), &ForestParams::default(), 42).unwrap();
        let importances = forest.feature_importances().unwrap();
        assert_eq!(importances.len(), 4);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[2]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let a = RandomForest::fit(&separable(), &ForestParams::default(), 7).unwrap();
        let b = RandomForest::fit(&separable(), &ForestParams::default(), 7).unwrap();
        let row = [19.5, 3.0, 1.0, 0.5];
        assert_eq!(a.predict_proba(&row).unwrap(), b.predict_proba(&row).unwrap());
    }
}
