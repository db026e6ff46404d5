//! Additive-smooth regressor.
//!
//! Each feature gets its own cubic smooth term; the prediction is the
//! intercept plus the sum of the per-feature terms. The fit is penalized
//! least squares on the stacked basis (a small ridge keeps the normal
//! equations positive definite even when rows are scarce), which keeps the
//! whole statistical toolkit analytic: Student-t prediction intervals at the
//! configured confidence level, and a Wald chi-square significance score per
//! feature.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

use crate::error::ModelError;
use crate::math::{invert_spd, solve_spd};
use crate::models::regressor::{Explanation, Regressor};

/// Basis functions per feature: x, x², x³.
const BASIS_PER_FEATURE: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamRegressor {
    confidence: f64,
    ridge: f64,
    fitted: Option<GamFit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GamFit {
    n_features: usize,
    /// Intercept followed by [`BASIS_PER_FEATURE`] coefficients per feature.
    coefficients: Array1<f64>,
    /// Inverse of the penalized normal matrix, kept for interval and
    /// significance computation.
    normal_inv: Array2<f64>,
    /// Residual variance estimate.
    sigma2: f64,
    /// Residual degrees of freedom (floored at 1).
    dof: f64,
    /// Training mean of each feature's smooth term; used to center
    /// attributions around the mean prediction.
    term_means: Vec<f64>,
}

impl GamRegressor {
    pub fn new(confidence: f64, ridge: f64) -> Self {
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence must lie in (0, 1)"
        );
        assert!(ridge > 0.0, "ridge penalty must be positive");
        GamRegressor {
            confidence,
            ridge,
            fitted: None,
        }
    }

    fn fitted(&self, operation: &'static str) -> Result<&GamFit, ModelError> {
        self.fitted
            .as_ref()
            .ok_or(ModelError::ModelNotFitted { operation })
    }

    /// Value of feature j's smooth term at (scaled) feature value v.
    fn term_value(fit: &GamFit, feature: usize, v: f64) -> f64 {
        let base = 1 + feature * BASIS_PER_FEATURE;
        fit.coefficients[base] * v
            + fit.coefficients[base + 1] * v * v
            + fit.coefficients[base + 2] * v * v * v
    }

    fn predict_row(fit: &GamFit, row: ArrayView1<f64>) -> f64 {
        let mut sum = fit.coefficients[0];
        for (j, &v) in row.iter().enumerate() {
            sum += Self::term_value(fit, j, v);
        }
        sum
    }
}

/// Stacked basis row: [1, x₀, x₀², x₀³, x₁, ...].
fn basis_row(row: ArrayView1<f64>) -> Array1<f64> {
    let mut z = Array1::zeros(1 + row.len() * BASIS_PER_FEATURE);
    z[0] = 1.0;
    for (j, &v) in row.iter().enumerate() {
        let base = 1 + j * BASIS_PER_FEATURE;
        z[base] = v;
        z[base + 1] = v * v;
        z[base + 2] = v * v * v;
    }
    z
}

impl Regressor for GamRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        let n = x.nrows();
        if n == 0 {
            return Err(ModelError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }
        let n_features = x.ncols();
        let p = 1 + n_features * BASIS_PER_FEATURE;

        // Normal equations Z'Z β = Z'y with a ridge penalty on everything
        // but the intercept.
        let mut ztz = Array2::<f64>::zeros((p, p));
        let mut zty = Array1::<f64>::zeros(p);
        for i in 0..n {
            let z = basis_row(x.row(i));
            for a in 0..p {
                zty[a] += z[a] * y[i];
                for b in a..p {
                    ztz[(a, b)] += z[a] * z[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                ztz[(a, b)] = ztz[(b, a)];
            }
        }
        for a in 1..p {
            ztz[(a, a)] += self.ridge;
        }

        let coefficients = solve_spd(&ztz, &zty).ok_or_else(|| {
            ModelError::UpstreamData("additive model normal equations are singular".to_string())
        })?;
        let normal_inv = invert_spd(&ztz).ok_or_else(|| {
            ModelError::UpstreamData("additive model normal equations are singular".to_string())
        })?;

        let mut ss_res = 0.0;
        for i in 0..n {
            let z = basis_row(x.row(i));
            let pred = z.dot(&coefficients);
            ss_res += (y[i] - pred).powi(2);
        }
        let dof = ((n as f64) - (p as f64)).max(1.0);
        let sigma2 = ss_res / dof;

        let mut fit = GamFit {
            n_features,
            coefficients,
            normal_inv,
            sigma2,
            dof,
            term_means: vec![0.0; n_features],
        };
        for j in 0..n_features {
            let mean = (0..n)
                .map(|i| Self::term_value(&fit, j, x[(i, j)]))
                .sum::<f64>()
                / n as f64;
            fit.term_means[j] = mean;
        }

        self.fitted = Some(fit);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let fit = self.fitted("predict")?;
        Ok((0..x.nrows())
            .map(|i| Self::predict_row(fit, x.row(i)))
            .collect())
    }

    /// Analytic prediction interval at the configured confidence level. This
    /// is the expensive path (one quadratic form per row); callers that only
    /// need the point estimate should call `predict`.
    fn predict_interval(
        &self,
        x: ArrayView2<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>, Array1<f64>), ModelError> {
        let fit = self.fitted("predict")?;
        // dof >= 1 by construction, so the distribution is always valid.
        let t_dist = StudentsT::new(0.0, 1.0, fit.dof).expect("valid Student-t dof");
        let t = t_dist.inverse_cdf(0.5 + self.confidence / 2.0);

        let n = x.nrows();
        let mut point = Array1::zeros(n);
        let mut lower = Array1::zeros(n);
        let mut upper = Array1::zeros(n);
        for i in 0..n {
            let z = basis_row(x.row(i));
            let pred = z.dot(&fit.coefficients);
            let leverage = z.dot(&fit.normal_inv.dot(&z));
            let se = (fit.sigma2 * (1.0 + leverage)).max(0.0).sqrt();
            point[i] = pred;
            lower[i] = pred - t * se;
            upper[i] = pred + t * se;
        }
        Ok((point, lower, upper))
    }

    /// Partial-dependence style attribution: each feature's smooth term
    /// evaluated at the input, centered by its training mean. The baseline is
    /// the intercept plus the mean terms, so baseline + contributions equals
    /// the point estimate.
    fn explain(&self, row: ArrayView1<f64>) -> Result<Explanation, ModelError> {
        let fit = self.fitted("explain")?;
        let contributions: Vec<f64> = row
            .iter()
            .enumerate()
            .map(|(j, &v)| Self::term_value(fit, j, v) - fit.term_means[j])
            .collect();
        let baseline = fit.coefficients[0] + fit.term_means.iter().sum::<f64>();
        Ok(Explanation {
            baseline,
            contributions,
        })
    }

    /// Per-feature Wald chi-square p-value over the feature's coefficient
    /// block. Smaller means more significant; a degenerate block scores 1.
    fn feature_importance(&self) -> Result<Vec<f64>, ModelError> {
        let fit = self.fitted("feature_importance")?;
        let chi = ChiSquared::new(BASIS_PER_FEATURE as f64).expect("valid chi-square dof");

        let mut p_values = Vec::with_capacity(fit.n_features);
        for j in 0..fit.n_features {
            let base = 1 + j * BASIS_PER_FEATURE;
            let beta = Array1::from_iter(
                (0..BASIS_PER_FEATURE).map(|k| fit.coefficients[base + k]),
            );
            let mut cov = Array2::zeros((BASIS_PER_FEATURE, BASIS_PER_FEATURE));
            for a in 0..BASIS_PER_FEATURE {
                for b in 0..BASIS_PER_FEATURE {
                    cov[(a, b)] = fit.sigma2 * fit.normal_inv[(base + a, base + b)];
                }
            }
            let p = match solve_spd(&cov, &beta) {
                Some(solution) => {
                    let stat = beta.dot(&solution);
                    1.0 - chi.cdf(stat)
                }
                None => 1.0,
            };
            p_values.push(p);
        }
        Ok(p_values)
    }
}
