//! k-nearest-neighbours classifier (uniform weights, euclidean distance)

use crate::error::ModelError;
use crate::models::classifier::{argmax, Classifier, Dataset, CLASS_COUNT};

pub struct KNeighbors {
    k: usize,
    training: Dataset,
}

impl KNeighbors {
    /// Memorize the training set; `k` is clamped to the number of samples
    pub fn fit(k: usize, training: &Dataset) -> Result<Self, ModelError> {
        if training.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        Ok(Self {
            k: k.clamp(1, training.len()),
            training: training.clone(),
        })
    }

    /// Indices of the `k` closest training rows; ties keep training order
    fn neighbours(&self, features: &[f64]) -> Vec<usize> {
        let mut distances: Vec<(usize, f64)> = self
            .training
            .features
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let d: f64 = row
                    .iter()
                    .zip(features)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
                (i, d)
            })
            .collect();

        distances.sort_by(|a, b| a.1.total_cmp(&b.1));
        distances.into_iter().take(self.k).map(|(i, _)| i).collect()
    }
}

impl Classifier for KNeighbors {
    fn name(&self) -> &str {
        "knn"
    }

    fn n_features(&self) -> usize {
        self.training.n_features()
    }

    fn predict_class(&self, features: &[f64]) -> Result<u8, ModelError> {
        let probs = self.predict_proba(features)?;
        Ok(argmax(&probs) as u8)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.check_width(features)?;

        let mut votes = vec![0.0; CLASS_COUNT];
        for i in self.neighbours(features) {
            votes[usize::from(self.training.labels[i])] += 1.0;
        }
        Ok(votes.into_iter().map(|v| v / self.k as f64).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> Dataset {
        Dataset::new(
            vec![
                vec![0.0, 0.0],
                vec![0.1, 0.0],
                vec![0.0, 0.1],
                vec![5.0, 5.0],
                vec![5.1, 5.0],
                vec![5.0, 5.1],
            ],
            vec![0, 0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_predicts_nearest_cluster() {
        let knn = KNeighbors::fit(3, &toy()).unwrap();
        assert_eq!(knn.predict_class(&[0.05, 0.05]).unwrap(), 0);
        assert_eq!(knn.predict_class(&[4.9, 5.2]).unwrap(), 1);
    }

    #[test]
    fn test_probabilities_are_vote_fractions() {
        let data = Dataset::new(
            vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0]],
            vec![0, 1, 1, 0],
        )
        .unwrap();
        let knn = KNeighbors::fit(3, &data).unwrap();
        let probs = knn.predict_proba(&[1.0]).unwrap();
        assert!((probs[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((probs[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let knn = KNeighbors::fit(3, &toy()).unwrap();
        assert!(matches!(
            knn.predict_class(&[1.0]),
            Err(ModelError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_no_feature_importances() {
        let knn = KNeighbors::fit(3, &toy()).unwrap();
        assert!(knn.feature_importances().is_none());
    }
}
