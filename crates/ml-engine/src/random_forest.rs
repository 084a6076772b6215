//! Bagged ensemble of regression trees.
//!
//! Each tree is grown on a bootstrap sample drawn from its own RNG seeded with
//! `seed + tree_index`, so a fit is reproducible regardless of how rayon
//! schedules the trees. Predictions average the trees.

use analysis_core::AnalysisError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::regression_tree::{RegressionTree, TreeParams};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl ForestConfig {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &ForestConfig) -> Result<Self, AnalysisError> {
        if x.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "cannot fit forest on zero rows".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(AnalysisError::InvalidData(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if config.n_estimators == 0 {
            return Err(AnalysisError::InvalidData(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        let params = config.tree_params();
        let n = x.len();
        let trees = (0..config.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit_sample(x, y, sample, &params)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        total / self.trees.len() as f64
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonlinear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64 / 4.0, ((i * 7) % 11) as f64])
            .collect();
        let y: Vec<f64> = x
            .iter()
            .map(|r| r[0] * r[0] + if r[1] > 5.0 { 10.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = nonlinear_data();
        let config = ForestConfig {
            n_estimators: 16,
            ..ForestConfig::default()
        };
        let a = RandomForest::fit(&x, &y, &config).unwrap();
        let b = RandomForest::fit(&x, &y, &config).unwrap();

        assert_eq!(a.n_trees(), 16);
        for row in &x {
            assert_eq!(a.predict_row(row), b.predict_row(row));
        }
    }

    #[test]
    fn test_predictions_stay_within_target_range() {
        let (x, y) = nonlinear_data();
        let forest = RandomForest::fit(&x, &y, &ForestConfig::default()).unwrap();
        let lo = y.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        for p in forest.predict(&[vec![-100.0, 0.0], vec![100.0, 100.0], vec![3.0, 6.0]]) {
            assert!(p.is_finite());
            assert!(p >= lo && p <= hi);
        }
    }

    #[test]
    fn test_fits_training_data_closely() {
        let (x, y) = nonlinear_data();
        let forest = RandomForest::fit(&x, &y, &ForestConfig::default()).unwrap();
        let preds = forest.predict(&x);
        let mse = crate::metrics::mean_squared_error(&y, &preds);
        let var = analysis_core::stats::population_std_dev(&y).powi(2);
        assert!(mse < var * 0.2);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let config = ForestConfig::default();
        assert!(RandomForest::fit(&[], &[], &config).is_err());
        assert!(RandomForest::fit(&[vec![1.0]], &[1.0, 2.0], &config).is_err());
        let none = ForestConfig {
            n_estimators: 0,
            ..ForestConfig::default()
        };
        assert!(RandomForest::fit(&[vec![1.0]], &[1.0], &none).is_err());
    }
}
