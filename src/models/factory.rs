use serde::{Deserialize, Serialize};

use crate::config::ModelFamily;
use crate::models::gam::GamRegressor;
use crate::models::gradient_boosting::GradientBoostingRegressor;
use crate::models::random_forest::RandomForestRegressor;
use crate::models::regressor::Regressor;

/// Tagged union over the model families. Keeping the variants in an enum
/// (rather than behind `Box<dyn Regressor>`) lets a fitted variant serialize
/// directly into the model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VariantModel {
    Gam(GamRegressor),
    GradientBoosting(GradientBoostingRegressor),
    RandomForest(RandomForestRegressor),
}

impl VariantModel {
    pub fn regressor(&self) -> &dyn Regressor {
        match self {
            VariantModel::Gam(m) => m,
            VariantModel::GradientBoosting(m) => m,
            VariantModel::RandomForest(m) => m,
        }
    }

    pub fn regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            VariantModel::Gam(m) => m,
            VariantModel::GradientBoosting(m) => m,
            VariantModel::RandomForest(m) => m,
        }
    }
}

/// Build an unfitted variant from a `ModelFamily`.
/// Currently this is a thin factory implemented as a single function.
pub fn build_variant(family: &ModelFamily) -> VariantModel {
    match family {
        ModelFamily::Gam { confidence, ridge } => {
            VariantModel::Gam(GamRegressor::new(*confidence, *ridge))
        }
        ModelFamily::GradientBoosting {
            n_estimators,
            max_depth,
            learning_rate,
            subsample,
            seed,
        } => VariantModel::GradientBoosting(GradientBoostingRegressor::new(
            *n_estimators,
            *max_depth,
            *learning_rate,
            *subsample,
            *seed,
        )),
        ModelFamily::RandomForest {
            n_estimators,
            max_depth,
            min_samples_split,
            seed,
        } => VariantModel::RandomForest(RandomForestRegressor::new(
            *n_estimators,
            *max_depth,
            *min_samples_split,
            *seed,
        )),
    }
}
