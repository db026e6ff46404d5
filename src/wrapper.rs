//! The polymorphic model facade.
//!
//! `TemperatureModel` owns the feature scaler, the stored feature-name
//! order and one model variant, and presents the uniform
//! fit/predict/explain/importance/save contract regardless of family. Once
//! fitted (or loaded) it is plain immutable data and can be shared freely
//! across threads.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::{Horizon, ModelConfig};
use crate::error::ModelError;
use crate::features;
use crate::models::factory::{build_variant, VariantModel};
use crate::models::regressor::Explanation;
use crate::preprocessing::Scaler;

/// Point estimates with optional uncertainty bounds.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub point: Array1<f64>,
    /// `(lower, upper)`, present only when uncertainty was requested.
    pub bounds: Option<(Array1<f64>, Array1<f64>)>,
}

/// Persisted form of a fitted model. Immutable once written.
#[derive(Debug, Serialize, Deserialize)]
struct Artifact {
    family: String,
    horizon: u32,
    feature_names: Vec<String>,
    scaler: Scaler,
    config: ModelConfig,
    variant: VariantModel,
}

#[derive(Debug)]
pub struct TemperatureModel {
    config: ModelConfig,
    scaler: Option<Scaler>,
    feature_names: Vec<String>,
    variant: VariantModel,
}

impl TemperatureModel {
    pub fn new(config: ModelConfig) -> Self {
        let variant = build_variant(&config.family);
        TemperatureModel {
            config,
            scaler: None,
            feature_names: Vec::new(),
            variant,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn horizon(&self) -> Horizon {
        self.config.horizon
    }

    pub fn family_tag(&self) -> &'static str {
        self.config.family.tag()
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_some()
    }

    /// Feature order used at fit time; empty before `fit`/`load`.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn scaler(&self, operation: &'static str) -> Result<&Scaler, ModelError> {
        self.scaler
            .as_ref()
            .ok_or(ModelError::ModelNotFitted { operation })
    }

    /// Fit the scaler and the underlying variant. `x` must carry the feature
    /// builder's columns in schema order; callers must pass training rows
    /// only so no held-out data leaks into the scaler statistics.
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        assert_eq!(
            x.ncols(),
            features::FEATURE_NAMES.len(),
            "feature matrix does not match the builder schema"
        );
        if x.nrows() == 0 {
            return Err(ModelError::InsufficientHistory {
                required: 1,
                available: 0,
            });
        }
        let scaler = Scaler::fit(x);
        let scaled = scaler.transform(x);
        self.variant.regressor_mut().fit(scaled.view(), y)?;
        self.scaler = Some(scaler);
        self.feature_names = features::feature_names();
        Ok(())
    }

    /// Point estimates, with bounds when `with_uncertainty` is set. The
    /// bounds are skippable because interval computation is the expensive
    /// path for the additive-smooth family.
    pub fn predict(
        &self,
        x: ArrayView2<f64>,
        with_uncertainty: bool,
    ) -> Result<Prediction, ModelError> {
        let scaler = self.scaler("predict")?;
        let scaled = scaler.transform(x);
        if with_uncertainty {
            let (point, lower, upper) = self.variant.regressor().predict_interval(scaled.view())?;
            Ok(Prediction {
                point,
                bounds: Some((lower, upper)),
            })
        } else {
            let point = self.variant.regressor().predict(scaled.view())?;
            Ok(Prediction {
                point,
                bounds: None,
            })
        }
    }

    /// Per-feature attribution for a single raw feature row, aligned with
    /// [`Self::feature_names`].
    pub fn explain(&self, row: ArrayView1<f64>) -> Result<Explanation, ModelError> {
        let scaler = self.scaler("explain")?;
        let scaled = scaler.transform_row(row);
        self.variant.regressor().explain(scaled.view())
    }

    /// Feature name to non-negative interpretability score, deterministic
    /// for a fitted model.
    pub fn feature_importance(&self) -> Result<BTreeMap<String, f64>, ModelError> {
        self.scaler("feature_importance")?;
        let scores = self.variant.regressor().feature_importance()?;
        Ok(self
            .feature_names
            .iter()
            .cloned()
            .zip(scores.into_iter())
            .collect())
    }

    /// Persist the fitted model as a JSON artifact.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let scaler = self.scaler("save")?;
        let artifact = Artifact {
            family: self.family_tag().to_string(),
            horizon: self.horizon().days(),
            feature_names: self.feature_names.clone(),
            scaler: scaler.clone(),
            config: self.config.clone(),
            variant: self.variant.clone(),
        };
        let file = File::create(path).map_err(|e| ModelError::Artifact {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::to_writer(BufWriter::new(file), &artifact).map_err(|e| {
            ModelError::Artifact {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Reconstruct a model from an artifact. Rejects artifacts whose stored
    /// feature list disagrees with the current builder schema — silently
    /// dropping or reordering features at inference time is never safe.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|e| ModelError::Artifact {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let artifact: Artifact =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| ModelError::Artifact {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let expected = features::feature_names();
        if artifact.feature_names != expected {
            return Err(ModelError::SchemaMismatch {
                expected,
                found: artifact.feature_names,
            });
        }

        Ok(TemperatureModel {
            config: artifact.config,
            scaler: Some(artifact.scaler),
            feature_names: artifact.feature_names,
            variant: artifact.variant,
        })
    }
}
