//! Inference-side model registry.
//!
//! An explicitly constructed registry of fitted models keyed by horizon,
//! meant to be built once at service startup (via [`ModelRegistry::load_dir`]
//! or manual [`ModelRegistry::insert`] calls) and then shared read-only
//! across requests; models are plain immutable data behind `Arc`, so
//! concurrent use needs no coordination. Dropping the registry releases the
//! loaded artifacts; there is no other teardown.
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ndarray::s;
use serde::Serialize;

use crate::config::Horizon;
use crate::data_handling::ObservationSeries;
use crate::error::ModelError;
use crate::features::{self, MIN_LOOKBACK};
use crate::wrapper::TemperatureModel;

/// One forecast, produced fresh per request.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub horizon: u32,
    pub predicted_temp: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub feature_importance: std::collections::BTreeMap<String, f64>,
    /// Per-feature attribution in stored feature order, when requested.
    pub attribution: Option<Vec<(String, f64)>>,
}

#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<Horizon, Arc<TemperatureModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry {
            models: HashMap::new(),
        }
    }

    /// Register a fitted model under its own horizon, replacing any
    /// previous entry for that horizon.
    pub fn insert(&mut self, model: TemperatureModel) {
        self.models.insert(model.horizon(), Arc::new(model));
    }

    /// Load one artifact per supported horizon for the given family tag
    /// (`gam`, `gbm` or `rf`) from `dir`, using the training orchestrator's
    /// file naming.
    pub fn load_dir(dir: &Path, family_tag: &str) -> Result<Self, ModelError> {
        let mut registry = ModelRegistry::new();
        for horizon in Horizon::all() {
            let file_name = format!("reservoir_{}_h{}.json", family_tag, horizon);
            let model = TemperatureModel::load(&dir.join(file_name))?;
            registry.insert(model);
        }
        Ok(registry)
    }

    /// Horizons with a loaded model, ascending (health-check surface).
    pub fn loaded_horizons(&self) -> Vec<u32> {
        let mut days: Vec<u32> = self.models.keys().map(|h| h.days()).collect();
        days.sort_unstable();
        days
    }

    /// Shared handle to the model for a horizon.
    pub fn get(&self, horizon: Horizon) -> Result<Arc<TemperatureModel>, ModelError> {
        self.models
            .get(&horizon)
            .cloned()
            .ok_or(ModelError::ModelNotFitted {
                operation: "registry lookup",
            })
    }

    /// Forecast from the most recent valid feature row of `recent`.
    ///
    /// The requested horizon is validated before any model is consulted.
    /// `recent` must carry enough history to populate the lag and rolling
    /// features (at least 8 observations ending at the day the forecast is
    /// issued for).
    pub fn predict(
        &self,
        recent: &ObservationSeries,
        horizon_days: u32,
        with_attribution: bool,
    ) -> Result<PredictionResult, ModelError> {
        let horizon = Horizon::new(horizon_days)?;
        let model = self.get(horizon)?;

        let table = features::build(recent)?;
        let row_idx = table
            .last_valid_row()
            .ok_or(ModelError::InsufficientHistory {
                required: MIN_LOOKBACK + 1,
                available: recent.len(),
            })?;

        let row = table.x.slice(s![row_idx..row_idx + 1, ..]);
        let prediction = model.predict(row, true)?;
        let (lower, upper) = prediction
            .bounds
            .as_ref()
            .expect("bounds requested from predict");

        let attribution = if with_attribution {
            let explanation = model.explain(table.x.row(row_idx))?;
            Some(
                model
                    .feature_names()
                    .iter()
                    .cloned()
                    .zip(explanation.contributions.into_iter())
                    .collect(),
            )
        } else {
            None
        };

        Ok(PredictionResult {
            horizon: horizon.days(),
            predicted_temp: prediction.point[0],
            lower_bound: lower[0],
            upper_bound: upper[0],
            feature_importance: model.feature_importance()?,
            attribution,
        })
    }
}
