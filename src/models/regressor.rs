use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::ModelError;

/// Per-feature decomposition of a single prediction.
///
/// For the tree families the decomposition is exactly additive:
/// `baseline + contributions.sum()` equals the point estimate. The
/// additive-smooth variant satisfies the same identity by construction
/// (centered smooth terms around the training-mean prediction).
#[derive(Debug, Clone)]
pub struct Explanation {
    pub baseline: f64,
    /// One entry per feature, aligned with the feature order used at fit.
    pub contributions: Vec<f64>,
}

/// The capability set every model family implements. One implementation per
/// family; the family is selected once at construction and never changed.
///
/// All inputs are already scaled by the wrapper; implementations never see
/// raw feature values.
pub trait Regressor {
    /// Fit the model on scaled features and targets.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError>;

    /// Point estimates, one per input row.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError>;

    /// Point estimates with lower/upper bounds. The meaning of the bounds is
    /// family-specific: an analytic prediction interval for the
    /// additive-smooth model, a cross-tree spread heuristic for the
    /// ensembles.
    fn predict_interval(
        &self,
        x: ArrayView2<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>, Array1<f64>), ModelError>;

    /// Per-feature attribution for a single scaled input row.
    fn explain(&self, row: ArrayView1<f64>) -> Result<Explanation, ModelError>;

    /// Non-negative interpretability score per feature, in feature order.
    /// Semantics differ per family (significance for the additive-smooth
    /// model, normalized gain for the ensembles); shape and determinism do
    /// not.
    fn feature_importance(&self) -> Result<Vec<f64>, ModelError>;
}
