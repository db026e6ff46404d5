//! Random forest regressor: bootstrap-aggregated CART trees.
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::regressor::{Explanation, Regressor};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::stats::mean_std;

const SPREAD_MULTIPLIER: f64 = 1.96;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_estimators: usize,
    max_depth: usize,
    min_samples_split: usize,
    seed: u64,
    fitted: Option<RandomForestFit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RandomForestFit {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize, max_depth: usize, min_samples_split: usize, seed: u64) -> Self {
        RandomForestRegressor {
            n_estimators,
            max_depth,
            min_samples_split,
            seed,
            fitted: None,
        }
    }

    fn fitted(&self, operation: &'static str) -> Result<&RandomForestFit, ModelError> {
        self.fitted
            .as_ref()
            .ok_or(ModelError::ModelNotFitted { operation })
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        let n = x.nrows();
        if n == 0 {
            return Err(ModelError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }

        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
        };
        let seed = self.seed;

        // Each tree derives its RNG from (seed, tree index), so the forest
        // is deterministic no matter how rayon schedules the work.
        let trees: Vec<RegressionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &bootstrap, &params)
            })
            .collect();

        self.fitted = Some(RandomForestFit {
            trees,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let fit = self.fitted("predict")?;
        let n_trees = fit.trees.len() as f64;
        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                fit.trees
                    .iter()
                    .map(|tree| tree.predict_row(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    /// Bounds are the ensemble mean ±[`SPREAD_MULTIPLIER`] standard
    /// deviations of the individual tree predictions. This assumes the tree
    /// predictions are approximately normal around the mean; it is an
    /// approximation kept for continuity of the bound width, not a
    /// calibrated confidence interval.
    fn predict_interval(
        &self,
        x: ArrayView2<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>, Array1<f64>), ModelError> {
        let fit = self.fitted("predict")?;
        let rows: Vec<(f64, f64, f64)> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let per_tree: Vec<f64> =
                    fit.trees.iter().map(|tree| tree.predict_row(row)).collect();
                let (mean, std) = mean_std(&per_tree);
                (
                    mean,
                    mean - SPREAD_MULTIPLIER * std,
                    mean + SPREAD_MULTIPLIER * std,
                )
            })
            .collect();

        let point = rows.iter().map(|r| r.0).collect();
        let lower = rows.iter().map(|r| r.1).collect();
        let upper = rows.iter().map(|r| r.2).collect();
        Ok((point, lower, upper))
    }

    fn explain(&self, row: ArrayView1<f64>) -> Result<Explanation, ModelError> {
        let fit = self.fitted("explain")?;
        let n_trees = fit.trees.len() as f64;
        let mut contributions = vec![0.0; fit.n_features];
        let mut root_sum = 0.0;
        for tree in &fit.trees {
            root_sum += tree.decompose(row, &mut contributions);
        }
        for c in contributions.iter_mut() {
            *c /= n_trees;
        }
        Ok(Explanation {
            baseline: root_sum / n_trees,
            contributions,
        })
    }

    fn feature_importance(&self) -> Result<Vec<f64>, ModelError> {
        let fit = self.fitted("feature_importance")?;
        let mut gains = vec![0.0; fit.n_features];
        for tree in &fit.trees {
            tree.accumulate_gain(&mut gains);
        }
        let total: f64 = gains.iter().sum();
        if total > 0.0 {
            for g in gains.iter_mut() {
                *g /= total;
            }
        }
        Ok(gains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn noisy_step(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                i as f64 / n as f64
            } else {
                ((i * 7) % 13) as f64
            }
        });
        let y = Array1::from_shape_fn(n, |i| if i < n / 2 { 2.0 } else { 8.0 });
        (x, y)
    }

    #[test]
    fn fit_is_deterministic_for_a_fixed_seed() {
        let (x, y) = noisy_step(60);
        let mut a = RandomForestRegressor::new(20, 5, 2, 42);
        let mut b = RandomForestRegressor::new(20, 5, 2, 42);
        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();
        assert_eq!(
            a.predict(x.view()).unwrap().to_vec(),
            b.predict(x.view()).unwrap().to_vec()
        );
    }

    #[test]
    fn attribution_sums_to_prediction() {
        let (x, y) = noisy_step(60);
        let mut model = RandomForestRegressor::new(25, 5, 2, 42);
        model.fit(x.view(), y.view()).unwrap();
        let pred = model.predict(x.view()).unwrap();
        for i in [0usize, 29, 59] {
            let explanation = model.explain(x.row(i)).unwrap();
            let reconstructed =
                explanation.baseline + explanation.contributions.iter().sum::<f64>();
            assert!((reconstructed - pred[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn interval_is_centered_on_the_mean() {
        let (x, y) = noisy_step(60);
        let mut model = RandomForestRegressor::new(25, 5, 2, 42);
        model.fit(x.view(), y.view()).unwrap();
        let (point, lower, upper) = model.predict_interval(x.view()).unwrap();
        for i in 0..point.len() {
            assert!(lower[i] <= point[i] && point[i] <= upper[i]);
            let half_low = point[i] - lower[i];
            let half_high = upper[i] - point[i];
            assert!((half_low - half_high).abs() < 1e-9);
        }
    }

    #[test]
    fn importance_is_idempotent() {
        let (x, y) = noisy_step(60);
        let mut model = RandomForestRegressor::new(25, 5, 2, 42);
        model.fit(x.view(), y.view()).unwrap();
        assert_eq!(
            model.feature_importance().unwrap(),
            model.feature_importance().unwrap()
        );
    }

    #[test]
    fn unfitted_explain_fails() {
        let model = RandomForestRegressor::new(10, 5, 2, 42);
        let row = Array1::zeros(2);
        assert!(matches!(
            model.explain(row.view()),
            Err(ModelError::ModelNotFitted { .. })
        ));
    }
}
