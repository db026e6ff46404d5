//! Feature standardization.
//!
//! Provides a simple per-column mean/std `Scaler`. The scaler is always fit
//! on training rows only — never on validation or test rows — so no
//! information from held-out data leaks into the transform. The fitted
//! parameters travel with the model artifact.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Simple standard scaler (per-column mean/std).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    /// Minimum stddev to avoid division by zero when transforming.
    const MIN_STD: f64 = 1e-9;

    /// Fit a scaler from a matrix where rows are samples and columns are
    /// features.
    pub fn fit(x: ArrayView2<f64>) -> Scaler {
        let (nrows, ncols) = x.dim();
        assert!(nrows > 0 && ncols > 0, "Scaler::fit requires a non-empty matrix");

        let mut mean = vec![0.0f64; ncols];
        for row in x.rows() {
            for (c, v) in row.iter().enumerate() {
                mean[c] += v;
            }
        }
        let nrows_f = nrows as f64;
        for v in mean.iter_mut() {
            *v /= nrows_f;
        }

        let mut std = vec![0.0f64; ncols];
        for row in x.rows() {
            for (c, v) in row.iter().enumerate() {
                let d = v - mean[c];
                std[c] += d * d;
            }
        }
        for v in std.iter_mut() {
            *v = (*v / nrows_f).sqrt().max(Scaler::MIN_STD);
        }

        Scaler { mean, std }
    }

    /// Transform all rows, returning a new matrix.
    pub fn transform(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let (nrows, ncols) = x.dim();
        assert_eq!(ncols, self.mean.len(), "Scaler::transform: column mismatch");
        let mut out = Array2::zeros((nrows, ncols));
        for r in 0..nrows {
            for c in 0..ncols {
                out[(r, c)] = (x[(r, c)] - self.mean[c]) / self.std[c];
            }
        }
        out
    }

    /// Transform a single row.
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        assert_eq!(row.len(), self.mean.len(), "Scaler::transform_row: length mismatch");
        row.iter()
            .enumerate()
            .map(|(c, v)| (v - self.mean[c]) / self.std[c])
            .collect()
    }
}
