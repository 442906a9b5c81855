//! Standard scaler (zero mean, unit variance per feature)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-feature standardization parameters.
///
/// Features with zero variance keep a scale of 1.0 so they map to 0 instead
/// of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation on the given rows
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; width];
        for row in rows {
            for ((v, &x), &m) in variance.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }

        let scale = variance
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    /// Standardize one row with the fitted parameters
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect()
    }

    /// Fit on a single row and transform it in one go
    pub fn fit_transform_row(row: &[f64]) -> Vec<f64> {
        Self::fit(&[row.to_vec()]).transform(row)
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Load scaler parameters saved as JSON next to an external model
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read scaler parameters from {:?}", path))?;
        serde_json::from_slice(&bytes).context("Failed to parse scaler parameters")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows);

        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[3.0, 12.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_single_row_fit_collapses_to_zero() {
        let scaled = StandardScaler::fit_transform_row(&[60.0, 1.0, 250000.0]);
        assert_eq!(scaled, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_parameters_roundtrip_through_json() {
        let scaler = StandardScaler::fit(&[vec![0.0, 4.0], vec![2.0, 8.0]]);
        let json = serde_json::to_string(&scaler).unwrap();
        let restored: StandardScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(scaler, restored);
    }
}
