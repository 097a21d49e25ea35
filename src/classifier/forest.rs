//! Bagged decision-tree ensemble, the default [`Classifier`].
//!
//! Each tree is grown on a bootstrap resample of the batch with Gini-impurity
//! splits over a random sqrt-sized feature subset. Prediction averages the
//! per-tree leaf probabilities and accepts at 0.5. The ensemble is
//! deterministic for a fixed `(data, labels, seed)` and serializes to JSON
//! for checkpointing.

use serde::{Deserialize, Serialize};

use super::Classifier;
use crate::error::{Error, Result};

/// Configuration for the tree ensemble.
///
/// | Option | Default | Description |
/// |--------|---------|-------------|
/// | `n_trees` | 64 | Number of bootstrap trees |
/// | `max_depth` | `None` | Depth cap per tree (`None` = grow until pure) |
/// | `min_samples_split` | 2 | Minimum samples required to split a node |
/// | `min_samples_leaf` | 1 | Minimum samples required in each child |
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Maximum depth of each tree. `None` for unlimited.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node.
    pub min_samples_leaf: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 64,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// A node in a classification tree (arena-allocated).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        /// Fraction of positive (accepted) samples at this leaf.
        prob: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single Gini-split classification tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct ClassificationTree {
    nodes: Vec<TreeNode>,
}

impl ClassificationTree {
    /// Build a tree from the given data using the specified bootstrap indices.
    fn build(
        data: &[Vec<f64>],
        labels: &[bool],
        indices: &[usize],
        config: &ForestConfig,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build_node(data, labels, indices, 0, config, rng);
        tree
    }

    #[allow(clippy::cast_precision_loss)]
    fn build_node(
        &mut self,
        data: &[Vec<f64>],
        labels: &[bool],
        indices: &[usize],
        depth: usize,
        config: &ForestConfig,
        rng: &mut fastrand::Rng,
    ) -> usize {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| labels[i]).count();
        let prob = positives as f64 / n as f64;

        // Stopping conditions
        if n < config.min_samples_split
            || config.max_depth.is_some_and(|d| depth >= d)
            || positives == 0
            || positives == n
        {
            let idx = self.nodes.len();
            self.nodes.push(TreeNode::Leaf { prob });
            return idx;
        }

        let n_features = data[0].len();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_features = ((n_features as f64).sqrt().ceil() as usize)
            .max(1)
            .min(n_features);
        let candidates = partial_shuffle(n_features, max_features, rng);

        let parent_impurity = gini(positives, n);

        let mut best_score = 0.0;
        let mut best_feature = 0;
        let mut best_threshold = 0.0;

        for &feat in &candidates {
            let mut values: Vec<f64> = indices.iter().map(|&i| data[i][feat]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
            values.dedup();

            if values.len() < 2 {
                continue;
            }

            for w in values.windows(2) {
                let threshold = f64::midpoint(w[0], w[1]);
                let (l_pos, l_n, r_pos, r_n) =
                    split_counts(data, labels, indices, feat, threshold);

                if l_n < config.min_samples_leaf || r_n < config.min_samples_leaf {
                    continue;
                }

                // Weighted Gini decrease of the split
                let score = parent_impurity
                    - (l_n as f64 / n as f64) * gini(l_pos, l_n)
                    - (r_n as f64 / n as f64) * gini(r_pos, r_n);

                if score > best_score {
                    best_score = score;
                    best_feature = feat;
                    best_threshold = threshold;
                }
            }
        }

        if best_score <= 0.0 {
            let idx = self.nodes.len();
            self.nodes.push(TreeNode::Leaf { prob });
            return idx;
        }

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| data[i][best_feature] <= best_threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            let idx = self.nodes.len();
            self.nodes.push(TreeNode::Leaf { prob });
            return idx;
        }

        // Reserve slot for this split node (placeholder replaced below)
        let node_idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { prob: 0.0 });

        let left = self.build_node(data, labels, &left_indices, depth + 1, config, rng);
        let right = self.build_node(data, labels, &right_indices, depth + 1, config, rng);

        self.nodes[node_idx] = TreeNode::Split {
            feature: best_feature,
            threshold: best_threshold,
            left,
            right,
        };

        node_idx
    }

    /// Probability of the positive class for one feature vector.
    fn predict_prob(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { prob } => return prob,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Gini impurity of a node with `positives` of `n` samples.
#[allow(clippy::cast_precision_loss)]
fn gini(positives: usize, n: usize) -> f64 {
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Select `k` random indices from `0..n` using partial Fisher-Yates shuffle.
fn partial_shuffle(n: usize, k: usize, rng: &mut fastrand::Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let k = k.min(n);
    for i in 0..k {
        let j = rng.usize(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

/// Per-side positive/total counts for a candidate split.
fn split_counts(
    data: &[Vec<f64>],
    labels: &[bool],
    indices: &[usize],
    feature: usize,
    threshold: f64,
) -> (usize, usize, usize, usize) {
    let (mut l_pos, mut l_n, mut r_pos, mut r_n) = (0usize, 0usize, 0usize, 0usize);

    for &i in indices {
        if data[i][feature] <= threshold {
            l_n += 1;
            l_pos += usize::from(labels[i]);
        } else {
            r_n += 1;
            r_pos += usize::from(labels[i]);
        }
    }

    (l_pos, l_n, r_pos, r_n)
}

/// The default classifier: a bagged ensemble of Gini classification trees.
///
/// # Examples
///
/// ```
/// use shac::{Classifier, ForestClassifier};
///
/// let data: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
/// let labels: Vec<bool> = (0..20).map(|i| i < 10).collect();
///
/// let mut forest = ForestClassifier::default();
/// forest.fit(&data, &labels, 42).unwrap();
/// assert!(forest.predict_one(&[2.0]));
/// assert!(!forest.predict_one(&[17.0]));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ForestClassifier {
    config: ForestConfig,
    trees: Vec<ClassificationTree>,
}

impl ForestClassifier {
    /// Creates an untrained ensemble with the given configuration.
    #[must_use]
    pub fn with_config(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
        }
    }

    /// Whether the ensemble has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

impl Classifier for ForestClassifier {
    fn fit(&mut self, data: &[Vec<f64>], labels: &[bool], seed: u64) -> Result<()> {
        if data.is_empty() {
            return Err(Error::Internal("cannot fit a classifier on an empty batch"));
        }
        if data.len() != labels.len() {
            return Err(Error::DimensionMismatch {
                expected: data.len(),
                got: labels.len(),
            });
        }
        let dims = data[0].len();
        if data.iter().any(|row| row.len() != dims) {
            return Err(Error::Internal("inconsistent feature dimensions in batch"));
        }

        let n = data.len();
        let mut rng = fastrand::Rng::with_seed(seed);
        self.trees = (0..self.config.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.usize(0..n)).collect();
                ClassificationTree::build(data, labels, &bootstrap, &self.config, &mut rng)
            })
            .collect();
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict_one(&self, features: &[f64]) -> bool {
        // An unfitted forest accepts everything.
        if self.trees.is_empty() {
            return true;
        }
        let mean_prob = self
            .trees
            .iter()
            .map(|t| t.predict_prob(features))
            .sum::<f64>()
            / self.trees.len() as f64;
        mean_prob >= 0.5
    }
}
