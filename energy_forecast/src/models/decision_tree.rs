//! CART regression tree
//!
//! Splits minimise the summed squared error of the two children. Nodes live
//! in a flat arena and refer to their children by index.

use crate::error::{ForecastError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Growth limits for one tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Candidate features drawn per split; all when `None`
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Rows going left once sorted by `feature`
    left_len: usize,
    sse: f64,
}

/// Fitted regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Unnormalised squared-error reduction per feature
    importances: Vec<f64>,
}

fn sum_squared_error(targets: &[f64], rows: &[usize]) -> f64 {
    let n = rows.len() as f64;
    let (sum, sum_sq) = rows.iter().fold((0.0, 0.0), |(s, sq), &i| {
        (s + targets[i], sq + targets[i] * targets[i])
    });
    (sum_sq - sum * sum / n).max(0.0)
}

fn mean(targets: &[f64], rows: &[usize]) -> f64 {
    rows.iter().map(|&i| targets[i]).sum::<f64>() / rows.len() as f64
}

impl RegressionTree {
    /// Grow a tree over `rows` (indices into `features`/`targets`, repeats allowed)
    pub fn fit(
        features: &[Vec<f64>],
        targets: &[f64],
        rows: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if rows.is_empty() || features.is_empty() || features.len() != targets.len() {
            return Err(ForecastError::ModelError(
                "Tree needs a non-empty sample with one target per row".to_string(),
            ));
        }
        let n_features = features[0].len();
        if n_features == 0 {
            return Err(ForecastError::ModelError(
                "Tree needs at least one feature".to_string(),
            ));
        }

        let mut tree = Self {
            nodes: Vec::new(),
            n_features,
            importances: vec![0.0; n_features],
        };
        tree.grow(features, targets, rows.to_vec(), 0, params, rng);
        Ok(tree)
    }

    fn grow(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        mut rows: Vec<usize>,
        depth: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let node = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: mean(targets, &rows),
        });

        let parent_sse = sum_squared_error(targets, &rows);
        if depth >= params.max_depth || rows.len() < params.min_samples_split || parent_sse <= 1e-12
        {
            return node;
        }

        let Some(best) = self.best_split(features, targets, &rows, params, rng) else {
            return node;
        };

        self.importances[best.feature] += parent_sse - best.sse;

        rows.sort_by(|&a, &b| features[a][best.feature].total_cmp(&features[b][best.feature]));
        let right_rows = rows.split_off(best.left_len);
        let left = self.grow(features, targets, rows, depth + 1, params, rng);
        let right = self.grow(features, targets, right_rows, depth + 1, params, rng);

        self.nodes[node] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node
    }

    fn best_split(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        rows: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let mut candidates: Vec<usize> = (0..self.n_features).collect();
        if let Some(k) = params.max_features {
            if k < self.n_features {
                candidates.shuffle(rng);
                candidates.truncate(k);
                candidates.sort_unstable();
            }
        }

        let n = rows.len();
        let total: f64 = rows.iter().map(|&i| targets[i]).sum();
        let total_sq: f64 = rows.iter().map(|&i| targets[i] * targets[i]).sum();
        let mut best: Option<BestSplit> = None;
        let mut sorted = rows.to_vec();

        for feature in candidates {
            sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for split in 1..n {
                let moved = targets[sorted[split - 1]];
                left_sum += moved;
                left_sq += moved * moved;

                let lower = features[sorted[split - 1]][feature];
                let upper = features[sorted[split]][feature];
                if upper <= lower {
                    continue;
                }

                let left_n = split as f64;
                let right_n = (n - split) as f64;
                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n).max(0.0)
                    + (right_sq - right_sum * right_sum / right_n).max(0.0);

                if best.map_or(true, |b| sse < b.sse) {
                    best = Some(BestSplit {
                        feature,
                        threshold: lower + (upper - lower) / 2.0,
                        left_len: split,
                        sse,
                    });
                }
            }
        }

        best
    }

    /// Walk the tree for one feature vector
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Raw squared-error reduction per feature
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            max_features: None,
        }
    }

    #[test]
    fn learns_a_step_function() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0]).collect();
        let targets: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 9.0 }).collect();
        let rows: Vec<usize> = (0..10).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let tree = RegressionTree::fit(&features, &targets, &rows, &params(4), &mut rng).unwrap();

        assert_eq!(tree.predict(&[2.0, 0.0]), 1.0);
        assert_eq!(tree.predict(&[7.0, 0.0]), 9.0);
        assert_eq!(tree.depth(), 1);
        // Only the informative column earns importance
        assert!(tree.importances()[0] > 0.0);
        assert_eq!(tree.importances()[1], 0.0);
    }

    #[test]
    fn respects_depth_and_split_limits() {
        let features: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();
        let rows: Vec<usize> = (0..16).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let stump = RegressionTree::fit(&features, &targets, &rows, &params(1), &mut rng).unwrap();
        assert_eq!(stump.depth(), 1);
        assert_eq!(stump.node_count(), 3);

        let no_split = TreeParams {
            min_samples_split: 32,
            ..params(8)
        };
        let leaf = RegressionTree::fit(&features, &targets, &rows, &no_split, &mut rng).unwrap();
        assert_eq!(leaf.node_count(), 1);
    }

    #[test]
    fn constant_target_is_a_single_leaf() {
        let features: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let targets = vec![3.0; 5];
        let rows: Vec<usize> = (0..5).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let tree = RegressionTree::fit(&features, &targets, &rows, &params(8), &mut rng).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[100.0]), 3.0);
    }

    #[test]
    fn rejects_empty_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(RegressionTree::fit(&[vec![1.0]], &[1.0], &[], &params(2), &mut rng).is_err());
    }
}
