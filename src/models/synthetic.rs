//! Synthetic classification data for the bootstrap model.
//!
//! Gaussian clusters placed on the vertices of a hypercube spanning the
//! informative features, linear combinations of them as redundant features,
//! pure noise for the rest, and a small fraction of flipped labels.

use crate::error::ModelError;
use crate::models::classifier::{Dataset, CLASS_COUNT};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub n_samples: usize,
    pub n_features: usize,
    pub n_informative: usize,
    pub n_redundant: usize,
    pub n_clusters_per_class: usize,
    /// Fraction of samples whose label is reassigned at random
    pub flip_y: f64,
    /// Half the side length of the hypercube
    pub class_sep: f64,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            n_samples: 100,
            n_features: 12,
            n_informative: 8,
            n_redundant: 2,
            n_clusters_per_class: 2,
            flip_y: 0.01,
            class_sep: 1.0,
            seed: 42,
        }
    }
}

/// Generate a labelled dataset following `spec`
pub fn make_classification(spec: &SyntheticSpec) -> Result<Dataset, ModelError> {
    if spec.n_samples == 0 || spec.n_informative == 0 {
        return Err(ModelError::EmptyTrainingSet);
    }
    if spec.n_informative + spec.n_redundant > spec.n_features {
        return Err(ModelError::FeatureMismatch {
            expected: spec.n_features,
            actual: spec.n_informative + spec.n_redundant,
        });
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let n_clusters = CLASS_COUNT * spec.n_clusters_per_class.max(1);
    let centroids = hypercube_vertices(n_clusters, spec.n_informative, spec.class_sep, &mut rng);

    // per-cluster random linear transform of the informative block
    let transforms: Vec<Vec<Vec<f64>>> = (0..n_clusters)
        .map(|_| uniform_matrix(spec.n_informative, spec.n_informative, &mut rng))
        .collect();
    let redundant = uniform_matrix(spec.n_informative, spec.n_redundant, &mut rng);
    let n_noise = spec.n_features - spec.n_informative - spec.n_redundant;

    let mut features = Vec::with_capacity(spec.n_samples);
    let mut labels = Vec::with_capacity(spec.n_samples);

    for sample in 0..spec.n_samples {
        let cluster = sample % n_clusters;
        let z: Vec<f64> = (0..spec.n_informative)
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();

        let mut row: Vec<f64> = (0..spec.n_informative)
            .map(|j| {
                let mixed: f64 = z
                    .iter()
                    .enumerate()
                    .map(|(k, zk)| zk * transforms[cluster][k][j])
                    .sum();
                mixed + centroids[cluster][j]
            })
            .collect();

        let informative = row.clone();
        row.extend((0..spec.n_redundant).map(|r| {
            informative
                .iter()
                .enumerate()
                .map(|(k, x)| x * redundant[k][r])
                .sum::<f64>()
        }));
        row.extend((0..n_noise).map(|_| rng.sample::<f64, _>(StandardNormal)));

        let mut label = (cluster % CLASS_COUNT) as u8;
        if rng.gen_bool(spec.flip_y.clamp(0.0, 1.0)) {
            label = rng.gen_range(0..CLASS_COUNT) as u8;
        }

        features.push(row);
        labels.push(label);
    }

    let mut order: Vec<usize> = (0..spec.n_samples).collect();
    order.shuffle(&mut rng);
    let features = order.iter().map(|&i| features[i].clone()).collect();
    let labels = order.iter().map(|&i| labels[i]).collect();

    Dataset::new(features, labels)
}

/// Distinct hypercube vertices scaled to `[-sep, sep]`
fn hypercube_vertices(count: usize, dims: usize, sep: f64, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut vertices: Vec<Vec<f64>> = Vec::with_capacity(count);
    while vertices.len() < count {
        let vertex: Vec<f64> = (0..dims)
            .map(|_| if rng.gen_bool(0.5) { sep } else { -sep })
            .collect();
        // with very few dimensions there may be fewer vertices than clusters
        if !vertices.contains(&vertex) || vertices.len() >= 1 << dims.min(30) {
            vertices.push(vertex);
        }
    }
    vertices
}

fn uniform_matrix(rows: usize, cols: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|_| (0..cols).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shape() {
        let data = make_classification(&SyntheticSpec::default()).unwrap();
        assert_eq!(data.len(), 100);
        assert_eq!(data.n_features(), 12);
    }

    #[test]
    fn test_both_classes_present() {
        let data = make_classification(&SyntheticSpec::default()).unwrap();
        let positives = data.labels.iter().filter(|&&l| l == 1).count();
        assert!(positives > 30 && positives < 70);
    }

    #[test]
    fn test_seeded_output_is_reproducible() {
        let a = make_classification(&SyntheticSpec::default()).unwrap();
        let b = make_classification(&SyntheticSpec::default()).unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_rejects_too_many_informative_features() {
        let spec = SyntheticSpec {
            n_features: 4,
            n_informative: 4,
            n_redundant: 2,
            ..SyntheticSpec::default()
        };
        assert!(make_classification(&spec).is_err());
    }
}
