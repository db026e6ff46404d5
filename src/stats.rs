//! Regression metrics and small aggregation helpers used by the training
//! orchestrator's cross-validation reporting.
use ndarray::ArrayView1;

/// Mean absolute error between observed and predicted values.
pub fn mean_absolute_error(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
    assert_eq!(
        y_true.len(),
        y_pred.len(),
        "mean_absolute_error requires equal-length arrays"
    );
    assert!(!y_true.is_empty(), "mean_absolute_error on empty arrays");
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// Coefficient of determination (R²).
///
/// 1 − SS_res / SS_tot; a constant observed series has zero total variance,
/// in which case R² is 0 by convention here.
pub fn r2_score(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
    assert_eq!(
        y_true.len(),
        y_pred.len(),
        "r2_score requires equal-length arrays"
    );
    assert!(!y_true.is_empty(), "r2_score on empty arrays");
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Mean and (population) standard deviation of a sample.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mae_of_constant_offset() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![2.0, 3.0, 4.0];
        assert!((mean_absolute_error(y.view(), p.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn r2_is_one_for_perfect_predictions() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        assert!((r2_score(y.view(), y.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn r2_is_zero_for_mean_prediction() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![2.0, 2.0, 2.0];
        assert!(r2_score(y.view(), p.view()).abs() < 1e-12);
    }

    #[test]
    fn mean_std_basics() {
        let (m, s) = mean_std(&[2.0, 4.0]);
        assert!((m - 3.0).abs() < 1e-12);
        assert!((s - 1.0).abs() < 1e-12);
    }
}
