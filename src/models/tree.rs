//! CART decision tree (gini impurity, binary splits on numeric thresholds)

use crate::error::ModelError;
use crate::models::classifier::{argmax, Classifier, Dataset, CLASS_COUNT};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Growth limits for a single tree
#[derive(Debug, Clone)]
pub struct TreeParams {
    /// Maximum depth of the tree (root is depth 0)
    pub max_depth: usize,
    /// Features sampled as split candidates at each node (all when `None`)
    pub max_features: Option<usize>,
    /// Minimum samples a node needs before it may split
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_features: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        distribution: [f64; CLASS_COUNT],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

pub struct DecisionTree {
    root: Node,
    n_features: usize,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Fit a tree on the full dataset
    pub fn fit(data: &Dataset, params: &TreeParams, seed: u64) -> Result<Self, ModelError> {
        let indices: Vec<usize> = (0..data.len()).collect();
        Self::fit_on(data, indices, params, seed)
    }

    /// Fit a tree on a (possibly repeated) subset of rows
    pub(crate) fn fit_on(
        data: &Dataset,
        indices: Vec<usize>,
        params: &TreeParams,
        seed: u64,
    ) -> Result<Self, ModelError> {
        if indices.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let n_features = data.n_features();
        let mut builder = Builder {
            data,
            params,
            rng: StdRng::seed_from_u64(seed),
            importances: vec![0.0; n_features],
        };
        let root = builder.grow(indices, 0);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(Self {
            root,
            n_features,
            importances,
        })
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }

    fn leaf_for(&self, features: &[f64]) -> &[f64; CLASS_COUNT] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &str {
        "decision_tree"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_class(&self, features: &[f64]) -> Result<u8, ModelError> {
        let probs = self.predict_proba(features)?;
        Ok(argmax(&probs) as u8)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.check_width(features)?;
        Ok(self.leaf_for(features).to_vec())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.importances.clone())
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    /// Sample-weighted impurity of both children
    weighted_impurity: f64,
}

struct Builder<'a> {
    data: &'a Dataset,
    params: &'a TreeParams,
    rng: StdRng,
    importances: Vec<f64>,
}

impl Builder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> Node {
        let counts = self.class_counts(&indices);
        let impurity = gini(&counts);

        if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || impurity <= 0.0
        {
            return leaf(&counts);
        }

        let Some(split) = self.best_split(&indices, impurity) else {
            return leaf(&counts);
        };

        let n = indices.len() as f64;
        self.importances[split.feature] += n * impurity - split.weighted_impurity;

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.data.features[i][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(left, depth + 1)),
            right: Box::new(self.grow(right, depth + 1)),
        }
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n = self.data.n_features();
        let mut features: Vec<usize> = (0..n).collect();
        if let Some(k) = self.params.max_features.filter(|&k| k > 0 && k < n) {
            features.shuffle(&mut self.rng);
            features.truncate(k);
            features.sort_unstable();
        }
        features
    }

    fn best_split(&mut self, indices: &[usize], parent_impurity: f64) -> Option<Split> {
        let data = self.data;
        let x = &data.features;
        let n = indices.len() as f64;
        let total = self.class_counts(indices);
        let mut best: Option<Split> = None;

        for feature in self.candidate_features() {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let mut left = [0.0; CLASS_COUNT];
            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                left[usize::from(data.labels[i])] += 1.0;

                let current = x[i][feature];
                let next = x[sorted[pos + 1]][feature];
                if next <= current {
                    continue;
                }

                let right = [total[0] - left[0], total[1] - left[1]];
                let n_left = (pos + 1) as f64;
                let weighted = n_left * gini(&left) + (n - n_left) * gini(&right);

                if best
                    .as_ref()
                    .map_or(true, |b| weighted < b.weighted_impurity - 1e-12)
                {
                    best = Some(Split {
                        feature,
                        threshold: current + (next - current) / 2.0,
                        weighted_impurity: weighted,
                    });
                }
            }
        }

        best.filter(|b| b.weighted_impurity < n * parent_impurity - 1e-12)
    }

    fn class_counts(&self, indices: &[usize]) -> [f64; CLASS_COUNT] {
        let mut counts = [0.0; CLASS_COUNT];
        for &i in indices {
            counts[usize::from(self.data.labels[i])] += 1.0;
        }
        counts
    }
}

fn gini(counts: &[f64; CLASS_COUNT]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total == 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn leaf(counts: &[f64; CLASS_COUNT]) -> Node {
    let total: f64 = counts.iter().sum();
    let mut distribution = [0.0; CLASS_COUNT];
    if total > 0.0 {
        for (d, c) in distribution.iter_mut().zip(counts) {
            *d = c / total;
        }
    }
    Node::Leaf { distribution }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_data() -> Dataset {
        // label is 1 exactly when the second feature exceeds 5
        let features: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![(i % 3) as f64, i as f64 / 2.0])
            .collect();
        let labels = features.iter().map(|r| u8::from(r[1] > 5.0)).collect();
        Dataset::new(features, labels).unwrap()
    }

    #[test]
    fn test_learns_single_threshold() {
        let tree = DecisionTree::fit(&threshold_data(), &TreeParams::default(), 42).unwrap();

        assert_eq!(tree.predict_class(&[0.0, 1.0]).unwrap(), 0);
        assert_eq!(tree.predict_class(&[0.0, 9.0]).unwrap(), 1);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_importance_goes_to_split_feature() {
        let tree = DecisionTree::fit(&threshold_data(), &TreeParams::default(), 42).unwrap();
        let importances = tree.feature_importances().unwrap();

        assert_eq!(importances.len(), 2);
        assert!((importances[1] - 1.0).abs() < 1e-9);
        assert_eq!(importances[0], 0.0);
    }

    #[test]
    fn test_respects_max_depth() {
        let features: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let labels = (0..64).map(|i| (i % 2) as u8).collect();
        let data = Dataset::new(features, labels).unwrap();

        let params = TreeParams {
            max_depth: 3,
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(&data, &params, 0).unwrap();
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let data = Dataset::new(vec![vec![1.0], vec![2.0]], vec![1, 1]).unwrap();
        let tree = DecisionTree::fit(&data, &TreeParams::default(), 0).unwrap();

        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict_proba(&[7.0]).unwrap(), vec![0.0, 1.0]);
        assert_eq!(tree.feature_importances().unwrap(), vec![0.0]);
    }
}
