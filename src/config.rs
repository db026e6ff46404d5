use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Forecast horizon in days. Only 1, 3 and 7 day horizons are supported;
/// anything else is rejected before a model is ever consulted.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u32", into = "u32")]
pub struct Horizon(u32);

impl Horizon {
    pub const SUPPORTED: [u32; 3] = [1, 3, 7];

    pub fn new(days: u32) -> Result<Self, ModelError> {
        if Self::SUPPORTED.contains(&days) {
            Ok(Horizon(days))
        } else {
            Err(ModelError::InvalidHorizon(days))
        }
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    /// All supported horizons, ascending.
    pub fn all() -> impl Iterator<Item = Horizon> {
        Self::SUPPORTED.iter().map(|&d| Horizon(d))
    }
}

impl TryFrom<u32> for Horizon {
    type Error = ModelError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Horizon::new(days)
    }
}

impl From<Horizon> for u32 {
    fn from(horizon: Horizon) -> u32 {
        horizon.0
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Central configuration for models in the crate.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelConfig {
    pub horizon: Horizon,

    #[serde(flatten)]
    pub family: ModelFamily,
}

/// Supported model families and their hyper-parameters.
///
/// The family is selected once at construction and never changed; each
/// family supplies its own uncertainty and attribution mechanism behind the
/// shared regressor contract.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelFamily {
    /// Additive-smooth model: per-feature smooth terms with analytic
    /// prediction intervals at `confidence` (e.g. 0.95).
    Gam { confidence: f64, ridge: f64 },
    GradientBoosting {
        n_estimators: usize,
        max_depth: usize,
        learning_rate: f64,
        subsample: f64,
        seed: u64,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: usize,
        min_samples_split: usize,
        seed: u64,
    },
}

impl ModelFamily {
    /// Short tag used in artifact filenames and the persisted family field.
    pub fn tag(&self) -> &'static str {
        match self {
            ModelFamily::Gam { .. } => "gam",
            ModelFamily::GradientBoosting { .. } => "gbm",
            ModelFamily::RandomForest { .. } => "rf",
        }
    }
}

impl Default for ModelFamily {
    fn default() -> Self {
        ModelFamily::GradientBoosting {
            n_estimators: 100,
            max_depth: 4,
            learning_rate: 0.1,
            subsample: 0.8,
            seed: 42,
        }
    }
}

impl FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gam" => Ok(ModelFamily::Gam {
                confidence: 0.95,
                ridge: 1e-3,
            }),
            "gbm" => Ok(ModelFamily::default()),
            "rf" => Ok(ModelFamily::RandomForest {
                n_estimators: 100,
                max_depth: 10,
                min_samples_split: 10,
                seed: 42,
            }),
            _ => Err(format!(
                "Unknown model family: {}. Expected one of gam, gbm, rf",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(horizon: Horizon, family: ModelFamily) -> Self {
        Self { horizon, family }
    }
}
