//! Gradient-boosted regression trees with least-squares loss.
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::regressor::{Explanation, Regressor};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::stats::mean_std;

/// Multiplier applied to the cross-tree spread when forming the heuristic
/// uncertainty band.
const SPREAD_MULTIPLIER: f64 = 1.96;

/// Gradient Boosting regressor: trees fitted sequentially to residuals,
/// each round optionally on a random subsample of the training rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    n_estimators: usize,
    max_depth: usize,
    learning_rate: f64,
    subsample: f64,
    seed: u64,
    fitted: Option<GradientBoostingFit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GradientBoostingFit {
    /// Mean of the training targets; every prediction starts here.
    baseline: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoostingRegressor {
    pub fn new(
        n_estimators: usize,
        max_depth: usize,
        learning_rate: f64,
        subsample: f64,
        seed: u64,
    ) -> Self {
        GradientBoostingRegressor {
            n_estimators,
            max_depth,
            learning_rate,
            subsample,
            seed,
            fitted: None,
        }
    }

    fn fitted(&self, operation: &'static str) -> Result<&GradientBoostingFit, ModelError> {
        self.fitted
            .as_ref()
            .ok_or(ModelError::ModelNotFitted { operation })
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        let n = x.nrows();
        if n == 0 {
            return Err(ModelError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }

        let baseline = y.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![baseline; n];
        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: 2,
        };
        let sample_size = ((self.subsample * n as f64).round() as usize).clamp(1, n);

        for _ in 0..self.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(predictions.iter())
                .map(|(t, p)| t - p)
                .collect();

            let indices: Vec<usize> = if sample_size < n {
                rand::seq::index::sample(&mut rng, n, sample_size).into_vec()
            } else {
                (0..n).collect()
            };

            let tree = RegressionTree::fit(x, residuals.view(), &indices, &params);
            for (i, pred) in predictions.iter_mut().enumerate() {
                *pred += self.learning_rate * tree.predict_row(x.row(i));
            }
            trees.push(tree);
        }

        self.fitted = Some(GradientBoostingFit {
            baseline,
            trees,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let fit = self.fitted("predict")?;
        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                fit.baseline
                    + fit
                        .trees
                        .iter()
                        .map(|tree| self.learning_rate * tree.predict_row(row))
                        .sum::<f64>()
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    /// The ensemble has no analytic interval; the band is
    /// ±[`SPREAD_MULTIPLIER`] times the standard deviation of the raw
    /// per-tree predictions, before learning-rate scaling — a spread
    /// heuristic, not a calibrated interval. The width is independent of the
    /// learning rate.
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
                let point =
                    fit.baseline + self.learning_rate * per_tree.iter().sum::<f64>();
                let (_, spread) = mean_std(&per_tree);
                (
                    point,
                    point - SPREAD_MULTIPLIER * spread,
                    point + SPREAD_MULTIPLIER * spread,
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
        let mut contributions = vec![0.0; fit.n_features];
        let mut root_sum = 0.0;
        for tree in &fit.trees {
            root_sum += tree.decompose(row, &mut contributions);
        }
        for c in contributions.iter_mut() {
            *c *= self.learning_rate;
        }
        // Baseline absorbs the target mean plus every tree's root mean, so
        // baseline + contributions reproduces the point estimate exactly.
        let baseline = fit.baseline + self.learning_rate * root_sum;
        Ok(Explanation {
            baseline,
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
