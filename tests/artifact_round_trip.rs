//! Persistence contract: save/load round-trips and schema validation.
mod common;

use std::str::FromStr;

use reservoir_thermal::config::{Horizon, ModelConfig, ModelFamily};
use reservoir_thermal::error::ModelError;
use reservoir_thermal::training::build_training_set;
use reservoir_thermal::wrapper::TemperatureModel;

fn train_family(family: ModelFamily) -> (TemperatureModel, reservoir_thermal::training::TrainingSet) {
    let series = common::synthetic_series(100);
    let horizon = Horizon::new(1).unwrap();
    let set = build_training_set(&series, horizon).unwrap();
    let mut model = TemperatureModel::new(ModelConfig::new(horizon, family));
    model.fit(set.x.view(), set.y.view()).unwrap();
    (model, set)
}

#[test]
fn round_trip_preserves_predictions_for_every_family() {
    let dir = common::scratch_dir("round-trip");
    for tag in ["gam", "gbm", "rf"] {
        let family = ModelFamily::from_str(tag).unwrap();
        let (model, set) = train_family(family);

        let path = dir.join(format!("{}.json", tag));
        model.save(&path).unwrap();
        let reloaded = TemperatureModel::load(&path).unwrap();

        assert_eq!(reloaded.family_tag(), tag);
        assert_eq!(reloaded.horizon().days(), 1);

        let before = model.predict(set.x.view(), true).unwrap();
        let after = reloaded.predict(set.x.view(), true).unwrap();
        let (before_lower, before_upper) = before.bounds.unwrap();
        let (after_lower, after_upper) = after.bounds.unwrap();
        for i in 0..before.point.len() {
            assert!(
                (before.point[i] - after.point[i]).abs() < 1e-9,
                "{}: point diverged after reload",
                tag
            );
            assert!((before_lower[i] - after_lower[i]).abs() < 1e-9);
            assert!((before_upper[i] - after_upper[i]).abs() < 1e-9);
        }

        assert_eq!(
            model.feature_importance().unwrap(),
            reloaded.feature_importance().unwrap()
        );
    }
}

#[test]
fn artifact_missing_a_feature_is_rejected() {
    let dir = common::scratch_dir("schema");
    let (model, _) = train_family(ModelFamily::from_str("rf").unwrap());
    let path = dir.join("rf.json");
    model.save(&path).unwrap();

    // Tamper with the stored schema: drop stratification_index.
    let text = std::fs::read_to_string(&path).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let names = value["feature_names"].as_array_mut().unwrap();
    names.retain(|n| n != "stratification_index");
    let tampered = dir.join("rf_tampered.json");
    std::fs::write(&tampered, serde_json::to_string(&value).unwrap()).unwrap();

    match TemperatureModel::load(&tampered) {
        Err(ModelError::SchemaMismatch { expected, found }) => {
            assert!(expected.iter().any(|n| n == "stratification_index"));
            assert!(!found.iter().any(|n| n == "stratification_index"));
        }
        other => panic!(
            "expected SchemaMismatch, got {:?}",
            other.err().map(|e| e.to_string())
        ),
    }
}

#[test]
fn loading_a_missing_file_reports_the_path() {
    let dir = common::scratch_dir("missing");
    let path = dir.join("does_not_exist.json");
    match TemperatureModel::load(&path) {
        Err(ModelError::Artifact { path: p, .. }) => {
            assert!(p.contains("does_not_exist.json"));
        }
        other => panic!(
            "expected Artifact error, got {:?}",
            other.err().map(|e| e.to_string())
        ),
    }
}
