//! Classifier abstraction shared by the bootstrap ensemble and external models

use crate::error::ModelError;

/// Number of outcome classes (survived / death event)
pub const CLASS_COUNT: usize = 2;

/// A fitted binary classifier over dense feature rows.
///
/// Implementations are read-only after fitting and may be queried from many
/// request tasks at once.
pub trait Classifier: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Width of the feature rows the classifier was fitted on
    fn n_features(&self) -> usize;

    /// Predict the class label (0 or 1) for a single row
    fn predict_class(&self, features: &[f64]) -> Result<u8, ModelError>;

    /// Class probabilities for a single row, indexed by label.
    ///
    /// Classifiers that cannot produce probabilities return
    /// [`ModelError::ProbabilityUnavailable`].
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Normalized per-feature importances, when the classifier exposes them
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// Reject rows whose width differs from the training data
    fn check_width(&self, features: &[f64]) -> Result<(), ModelError> {
        if features.len() != self.n_features() {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features(),
                actual: features.len(),
            });
        }
        Ok(())
    }
}

/// Labelled training rows
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    /// Build a dataset, checking that every row has a label and the same width
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<u8>) -> Result<Self, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(ModelError::LabelMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if let Some(&label) = labels.iter().find(|&&l| usize::from(l) >= CLASS_COUNT) {
            return Err(ModelError::InvalidLabel(label));
        }
        let width = features[0].len();
        if let Some(row) = features.iter().find(|row| row.len() != width) {
            return Err(ModelError::FeatureMismatch {
                expected: width,
                actual: row.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Width of each feature row
    pub fn n_features(&self) -> usize {
        self.features.first().map(Vec::len).unwrap_or(0)
    }

    /// Apply a row transform to every feature row
    pub fn map_rows(&self, f: impl Fn(&[f64]) -> Vec<f64>) -> Self {
        Self {
            features: self.features.iter().map(|row| f(row)).collect(),
            labels: self.labels.clone(),
        }
    }
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_rejects_ragged_rows() {
        let result = Dataset::new(vec![vec![1.0, 2.0], vec![3.0]], vec![0, 1]);
        assert!(matches!(
            result,
            Err(ModelError::FeatureMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_dataset_rejects_missing_labels() {
        let result = Dataset::new(vec![vec![1.0], vec![2.0]], vec![0]);
        assert!(matches!(result, Err(ModelError::LabelMismatch { .. })));
    }

    #[test]
    fn test_dataset_rejects_non_binary_labels() {
        let result = Dataset::new(vec![vec![1.0]], vec![2]);
        assert!(matches!(result, Err(ModelError::InvalidLabel(2))));
    }

    #[test]
    fn test_dataset_rejects_empty() {
        assert!(matches!(
            Dataset::new(Vec::new(), Vec::new()),
            Err(ModelError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_argmax_prefers_lowest_index_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.8]), 1);
    }
}
