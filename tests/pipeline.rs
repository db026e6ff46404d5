//! End-to-end: train, persist, reload through the registry, forecast.
mod common;

use std::str::FromStr;

use reservoir_thermal::config::{Horizon, ModelConfig, ModelFamily};
use reservoir_thermal::registry::ModelRegistry;
use reservoir_thermal::training::{train_and_save, DEFAULT_FOLDS};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn train_persist_and_serve_all_horizons() {
    init_logging();
    let dir = common::scratch_dir("pipeline");
    let series = common::synthetic_series(200);
    let family = ModelFamily::from_str("gbm").unwrap();

    for horizon in Horizon::all() {
        let config = ModelConfig::new(horizon, family.clone());
        let outcome = train_and_save(&config, &series, &dir).unwrap();

        assert_eq!(outcome.report.folds.len(), DEFAULT_FOLDS);
        assert!(outcome.report.mae_mean.is_finite());
        assert!(outcome.artifact_path.exists());
        assert!(outcome.importance_path.exists());

        // The exported importance parses and covers the schema.
        let text = std::fs::read_to_string(&outcome.importance_path).unwrap();
        let importance: std::collections::BTreeMap<String, f64> =
            serde_json::from_str(&text).unwrap();
        assert_eq!(
            importance.len(),
            reservoir_thermal::features::FEATURE_NAMES.len()
        );
    }

    let registry = ModelRegistry::load_dir(&dir, "gbm").unwrap();
    assert_eq!(registry.loaded_horizons(), vec![1, 3, 7]);

    let recent = common::synthetic_series(30);
    for days in [1u32, 3, 7] {
        let result = registry.predict(&recent, days, true).unwrap();
        assert_eq!(result.horizon, days);
        assert!(result.lower_bound <= result.predicted_temp);
        assert!(result.predicted_temp <= result.upper_bound);

        // The forecast should sit in a physically plausible band for the
        // synthetic reservoir.
        assert!(result.predicted_temp > 0.0 && result.predicted_temp < 40.0);

        let attribution = result.attribution.unwrap();
        assert_eq!(
            attribution.len(),
            reservoir_thermal::features::FEATURE_NAMES.len()
        );
    }
}

#[test]
fn gam_pipeline_produces_calibrated_style_bounds() {
    init_logging();
    let dir = common::scratch_dir("pipeline-gam");
    let series = common::synthetic_series(200);
    let config = ModelConfig::new(
        Horizon::new(1).unwrap(),
        ModelFamily::from_str("gam").unwrap(),
    );
    let outcome = train_and_save(&config, &series, &dir).unwrap();

    let registry = ModelRegistry::load_dir(&dir, "gam");
    // Only horizon 1 was trained; loading all three must fail.
    assert!(registry.is_err());

    let mut manual = ModelRegistry::new();
    manual.insert(outcome.model);
    let result = manual.predict(&common::synthetic_series(30), 1, false).unwrap();
    assert!(result.lower_bound < result.predicted_temp);
    assert!(result.predicted_temp < result.upper_bound);
    assert!(result.attribution.is_none());
}
