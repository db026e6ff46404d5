//! Training orchestrator: chronological cross-validation and final refit.
//!
//! Splits are expanding-window and strictly chronological — every fold
//! tests on rows later in time than everything it trained on. Random k-fold
//! splitting on a time series would leak future information into training
//! and report optimistic metrics, so it is deliberately not offered here.
//! Cross-validation only produces the reported metrics; the persisted
//! artifact always comes from a refit on the entire valid history.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ndarray::{s, Array1, Array2};

use crate::config::{Horizon, ModelConfig};
use crate::data_handling::ObservationSeries;
use crate::error::ModelError;
use crate::features::{self, MIN_LOOKBACK};
use crate::stats::{mean_absolute_error, mean_std, r2_score};
use crate::wrapper::TemperatureModel;

/// Default number of cross-validation folds.
pub const DEFAULT_FOLDS: usize = 5;

/// Feature matrix and aligned target, restricted to rows where both are
/// defined. `dates` names the feature row's timestamp (the target lives
/// `horizon` days later).
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub dates: Vec<NaiveDate>,
}

/// Build the supervised set for one horizon: the target at time t is the
/// observed outflow temperature at t + horizon. Rows with an undefined
/// feature vector or an undefined target are dropped together, preserving
/// alignment.
pub fn build_training_set(
    series: &ObservationSeries,
    horizon: Horizon,
) -> Result<TrainingSet, ModelError> {
    let table = features::build(series)?;
    let records = series.records();
    let n = records.len();
    let h = horizon.days() as usize;

    let mut kept_rows = Vec::new();
    let mut targets = Vec::new();
    let mut dates = Vec::new();
    for i in 0..n {
        if !table.valid[i] {
            continue;
        }
        let Some(future) = records.get(i + h) else {
            // Target falls beyond the end of available history.
            continue;
        };
        if !future.t_out.is_finite() {
            continue;
        }
        kept_rows.push(i);
        targets.push(future.t_out);
        dates.push(table.dates[i]);
    }

    if kept_rows.is_empty() {
        return Err(ModelError::InsufficientHistory {
            required: MIN_LOOKBACK + 1 + h,
            available: n,
        });
    }

    let x = table.x.select(ndarray::Axis(0), &kept_rows);
    Ok(TrainingSet {
        x,
        y: Array1::from_vec(targets),
        dates,
    })
}

/// One expanding-window fold: the model trains on `train` and is evaluated
/// on the strictly later `test` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Expanding-window chronological splits over `n` rows. The rows are cut
/// into `k + 1` blocks; fold i trains on blocks 0..=i and tests on block
/// i + 1, so every test set lies strictly after its training set.
pub fn chronological_folds(n: usize, k: usize) -> Vec<Fold> {
    assert!(k > 0, "need at least one fold");
    assert!(n > k, "need more rows than folds");
    let test_size = n / (k + 1);
    let first_train = n - k * test_size;

    (0..k)
        .map(|i| {
            let train_end = first_train + i * test_size;
            Fold {
                train: 0..train_end,
                test: train_end..train_end + test_size,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FoldMetrics {
    pub fold: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub mae: f64,
    pub r2: f64,
}

/// Per-fold metrics plus their mean ± std aggregation.
#[derive(Debug, Clone)]
pub struct CvReport {
    pub folds: Vec<FoldMetrics>,
    pub mae_mean: f64,
    pub mae_std: f64,
    pub r2_mean: f64,
    pub r2_std: f64,
}

/// Chronological cross-validation. A fresh model (and a fresh scaler, fit on
/// that fold's training rows only) is used per fold.
pub fn cross_validate(
    config: &ModelConfig,
    set: &TrainingSet,
    k: usize,
) -> Result<CvReport, ModelError> {
    let n = set.x.nrows();
    if n <= k {
        return Err(ModelError::InsufficientHistory {
            required: k + 1,
            available: n,
        });
    }

    let mut fold_metrics = Vec::with_capacity(k);
    for (i, fold) in chronological_folds(n, k).into_iter().enumerate() {
        let x_train = set.x.slice(s![fold.train.clone(), ..]);
        let y_train = set.y.slice(s![fold.train.clone()]);
        let x_test = set.x.slice(s![fold.test.clone(), ..]);
        let y_test = set.y.slice(s![fold.test.clone()]);

        log::info!(
            "fold {}: training on {} rows, testing on {} rows",
            i,
            x_train.nrows(),
            x_test.nrows()
        );

        let mut model = TemperatureModel::new(config.clone());
        model.fit(x_train, y_train)?;
        let prediction = model.predict(x_test, false)?;

        let mae = mean_absolute_error(y_test, prediction.point.view());
        let r2 = r2_score(y_test, prediction.point.view());
        log::info!("fold {}: MAE {:.3} R2 {:.3}", i, mae, r2);

        fold_metrics.push(FoldMetrics {
            fold: i,
            train_rows: x_train.nrows(),
            test_rows: x_test.nrows(),
            mae,
            r2,
        });
    }

    let maes: Vec<f64> = fold_metrics.iter().map(|m| m.mae).collect();
    let r2s: Vec<f64> = fold_metrics.iter().map(|m| m.r2).collect();
    let (mae_mean, mae_std) = mean_std(&maes);
    let (r2_mean, r2_std) = mean_std(&r2s);

    log::info!(
        "cross-validation: MAE {:.3} ± {:.3}, R2 {:.3} ± {:.3}",
        mae_mean,
        mae_std,
        r2_mean,
        r2_std
    );

    Ok(CvReport {
        folds: fold_metrics,
        mae_mean,
        mae_std,
        r2_mean,
        r2_std,
    })
}

#[derive(Debug)]
pub struct TrainingOutcome {
    pub model: TemperatureModel,
    pub report: CvReport,
    pub artifact_path: PathBuf,
    pub importance_path: PathBuf,
}

/// Artifact filename for one (family, horizon) pair.
pub fn artifact_file_name(config: &ModelConfig) -> String {
    format!(
        "reservoir_{}_h{}.json",
        config.family.tag(),
        config.horizon
    )
}

/// Full offline training pass: cross-validation report, refit on the entire
/// valid history, then persist the artifact and a feature-importance export
/// under `dir`.
pub fn train_and_save(
    config: &ModelConfig,
    series: &ObservationSeries,
    dir: &Path,
) -> Result<TrainingOutcome, ModelError> {
    log::info!(
        "training {} model for {}-day horizon",
        config.family.tag(),
        config.horizon
    );

    let set = build_training_set(series, config.horizon)?;
    log::info!("training on {} samples", set.x.nrows());

    let report = cross_validate(config, &set, DEFAULT_FOLDS)?;

    // Final refit on everything; the CV models are discarded.
    let mut model = TemperatureModel::new(config.clone());
    model.fit(set.x.view(), set.y.view())?;

    let artifact_path = dir.join(artifact_file_name(config));
    model.save(&artifact_path)?;
    log::info!("model saved to {}", artifact_path.display());

    let importance: BTreeMap<String, f64> = model.feature_importance()?;
    let importance_path = dir.join(format!(
        "feature_importance_{}_h{}.json",
        config.family.tag(),
        config.horizon
    ));
    let file = File::create(&importance_path).map_err(|e| ModelError::Artifact {
        path: importance_path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), &importance).map_err(|e| {
        ModelError::Artifact {
            path: importance_path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(TrainingOutcome {
        model,
        report,
        artifact_path,
        importance_path,
    })
}
