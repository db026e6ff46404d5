//! Small dense linear-algebra helpers for the additive-smooth variant.
//!
//! The GAM fit only needs a symmetric positive-definite solve of its
//! (ridge-penalized) normal equations, so a plain Cholesky factorization is
//! carried here instead of a LAPACK binding.
use ndarray::{Array1, Array2};

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
/// Returns `None` if the matrix is not positive definite.
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "cholesky requires a square matrix");

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[(i, j)];
            for k in 0..j {
                sum -= l[(i, k)] * l[(j, k)];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[(i, j)] = sum.sqrt();
            } else {
                l[(i, j)] = sum / l[(j, j)];
            }
        }
    }
    Some(l)
}

/// Solve `A x = b` for symmetric positive-definite `A` via Cholesky.
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let l = cholesky(a)?;
    Some(solve_with_factor(&l, b))
}

/// Solve `A x = b` given the lower Cholesky factor `l` of `A`.
fn solve_with_factor(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    assert_eq!(n, b.len(), "solve dimension mismatch");

    // Forward substitution: L y = b.
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[(i, k)] * y[k];
        }
        y[i] = sum / l[(i, i)];
    }

    // Back substitution: L^T x = y.
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for k in i + 1..n {
            sum -= l[(k, i)] * x[k];
        }
        x[i] = sum / l[(i, i)];
    }
    x
}

/// Inverse of a symmetric positive-definite matrix, column by column.
pub fn invert_spd(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let l = cholesky(a)?;
    let mut inv = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut e = Array1::<f64>::zeros(n);
        e[j] = 1.0;
        let col = solve_with_factor(&l, &e);
        for i in 0..n {
            inv[(i, j)] = col[i];
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn solves_a_small_spd_system() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![1.0, 2.0];
        let x = solve_spd(&a, &b).unwrap();
        // Residual check.
        let r0 = 4.0 * x[0] + 1.0 * x[1] - 1.0;
        let r1 = 1.0 * x[0] + 3.0 * x[1] - 2.0;
        assert!(r0.abs() < 1e-10 && r1.abs() < 1e-10);
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let a = array![[2.5, 0.5, 0.1], [0.5, 3.0, 0.2], [0.1, 0.2, 1.5]];
        let inv = invert_spd(&a).unwrap();
        let prod = a.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[(i, j)] - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn rejects_non_positive_definite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(cholesky(&a).is_none());
    }
}
