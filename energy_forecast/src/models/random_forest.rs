//! Bagged ensemble of regression trees

use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::models::decision_tree::{RegressionTree, TreeParams};
use crate::models::{Regressor, TrainedRegressor};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Random forest regressor
#[derive(Debug, Clone)]
pub struct RandomForest {
    /// Name of the model
    name: String,
    n_estimators: usize,
    params: TreeParams,
    seed: u64,
}

/// Trained random forest
#[derive(Debug, Clone)]
pub struct TrainedRandomForest {
    /// Name of the model
    name: String,
    trees: Vec<RegressionTree>,
    n_features: usize,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Create a new random forest
    pub fn new(
        n_estimators: usize,
        max_depth: usize,
        min_samples_split: usize,
        max_features: Option<usize>,
        seed: u64,
    ) -> Result<Self> {
        if n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forest needs at least one tree".to_string(),
            ));
        }
        if max_depth == 0 || min_samples_split < 2 {
            return Err(ForecastError::InvalidParameter(
                "max_depth must be positive and min_samples_split at least 2".to_string(),
            ));
        }
        if max_features == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "max_features must be positive when set".to_string(),
            ));
        }

        Ok(Self {
            name: format!(
                "Random Forest (trees={}, max_depth={})",
                n_estimators, max_depth
            ),
            n_estimators,
            params: TreeParams {
                max_depth,
                min_samples_split,
                max_features,
            },
            seed,
        })
    }

    pub fn from_config(config: &ForecastConfig) -> Result<Self> {
        Self::new(
            config.n_estimators,
            config.max_depth,
            config.min_samples_split,
            config.max_features,
            config.random_seed,
        )
    }
}

impl Regressor for RandomForest {
    type Trained = TrainedRandomForest;

    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(ForecastError::ModelError(format!(
                "Forest needs matching non-empty inputs, got {} rows and {} targets",
                features.len(),
                targets.len()
            )));
        }
        let n_features = features[0].len();
        if features.iter().any(|row| row.len() != n_features) {
            return Err(ForecastError::ModelError(
                "Feature rows must share one width".to_string(),
            ));
        }

        let n = features.len();
        // Tree i draws from its own seed, so results never depend on scheduling
        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(features, targets, &sample, &self.params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let importances = average_importances(&trees, n_features);
        debug!("Fitted {} trees on {} rows", trees.len(), n);

        Ok(TrainedRandomForest {
            name: self.name.clone(),
            trees,
            n_features,
            importances,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Per-tree importances normalised to one, averaged, renormalised
fn average_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut averaged = vec![0.0; n_features];
    for tree in trees {
        let total: f64 = tree.importances().iter().sum();
        if total > 0.0 {
            for (slot, value) in averaged.iter_mut().zip(tree.importances()) {
                *slot += value / total;
            }
        }
    }

    let total: f64 = averaged.iter().sum();
    if total > 0.0 {
        for value in &mut averaged {
            *value /= total;
        }
    }
    averaged
}

impl TrainedRandomForest {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl TrainedRegressor for TrainedRandomForest {
    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(ForecastError::ModelError(format!(
                "Expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let sum: f64 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.importances.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, ((i * 7) % 3) as f64])
            .collect();
        let targets = features.iter().map(|row| 10.0 + 2.0 * row[0]).collect();
        (features, targets)
    }

    #[test]
    fn fits_and_predicts_within_range() {
        let (features, targets) = linear_data();
        let forest = RandomForest::new(20, 6, 2, None, 42).unwrap();
        let trained = forest.fit(&features, &targets).unwrap();

        assert_eq!(trained.n_trees(), 20);
        let prediction = trained.predict_one(&[20.0, 1.0]).unwrap();
        assert!((prediction - 50.0).abs() < 6.0);

        let importances = trained.feature_importances();
        assert_abs_diff_eq!(importances.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn same_seed_same_forest() {
        let (features, targets) = linear_data();
        let forest = RandomForest::new(10, 4, 3, Some(1), 9).unwrap();
        let a = forest.fit(&features, &targets).unwrap();
        let b = forest.fit(&features, &targets).unwrap();

        let rows: Vec<Vec<f64>> = vec![vec![3.0, 0.0], vec![33.0, 2.0]];
        assert_eq!(a.predict(&rows).unwrap(), b.predict(&rows).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn validates_inputs() {
        assert!(RandomForest::new(0, 4, 2, None, 1).is_err());
        assert!(RandomForest::new(5, 4, 1, None, 1).is_err());

        let forest = RandomForest::new(2, 4, 2, None, 1).unwrap();
        assert!(forest.fit(&[], &[]).is_err());
        let trained = forest.fit(&[vec![1.0], vec![2.0]], &[1.0, 2.0]).unwrap();
        assert!(trained.predict_one(&[1.0, 2.0]).is_err());
    }
}
