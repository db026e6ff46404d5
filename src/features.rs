//! Feature builder: turns an observation series into a fixed-schema matrix.
//!
//! The feature schema (names and order) is a crate invariant: scaling,
//! training, persistence and inference all use [`FEATURE_NAMES`] in this
//! exact order, and artifacts persisting a different list are rejected on
//! load. Rows whose lags or rolling windows reach before the start of the
//! available history are invalid and carried as such — never imputed.
use chrono::{Datelike, NaiveDate};
use ndarray::Array2;

use crate::data_handling::ObservationSeries;
use crate::error::ModelError;

/// Longest lookback used by any feature (the 7-step lag / 7-day window).
pub const MIN_LOOKBACK: usize = 7;

/// Fixed feature schema. Order matters.
pub const FEATURE_NAMES: [&str; 17] = [
    "sin_doy",
    "cos_doy",
    "t_out_lag1",
    "t_out_lag7",
    "t_in_lag1",
    "discharge_lag1",
    "inflow_lag1",
    "storage",
    "release_rate",
    "air_temp",
    "solar_rad",
    "wind_speed",
    "humidity",
    "t_out_ma7",
    "discharge_ma7",
    "temp_discharge_ratio",
    "stratification_index",
];

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Feature matrix aligned row-for-row with the input series.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// One row per input observation, columns ordered as [`FEATURE_NAMES`].
    pub x: Array2<f64>,
    /// Row i is valid iff every feature at i is finite.
    pub valid: Vec<bool>,
    pub dates: Vec<NaiveDate>,
}

impl FeatureTable {
    pub fn n_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Index of the most recent valid row, if any.
    pub fn last_valid_row(&self) -> Option<usize> {
        self.valid.iter().rposition(|&v| v)
    }
}

/// Build the feature table for an observation series.
///
/// Same row count as the input; row i is valid iff no lag or rolling window
/// at i extends before the start of the history and no underlying value is
/// missing. With the 7-step lag, the first [`MIN_LOOKBACK`] rows of any
/// segment are necessarily invalid.
///
/// # Errors
///
/// `InsufficientHistory` if the series is too short to yield any valid row.
pub fn build(series: &ObservationSeries) -> Result<FeatureTable, ModelError> {
    let n = series.len();
    if n < MIN_LOOKBACK + 1 {
        return Err(ModelError::InsufficientHistory {
            required: MIN_LOOKBACK + 1,
            available: n,
        });
    }

    let records = series.records();
    let n_features = FEATURE_NAMES.len();
    let mut data = Vec::with_capacity(n * n_features);
    let mut valid = Vec::with_capacity(n);

    for i in 0..n {
        let rec = &records[i];

        // Harmonic day-of-year encoding: continuous across the year boundary.
        let doy = rec.date.ordinal() as f64;
        let angle = 2.0 * std::f64::consts::PI * doy / 365.25;
        let sin_doy = angle.sin();
        let cos_doy = angle.cos();

        // Lags read the raw series, not derived features.
        let t_out_lag1 = lag(records, i, 1, |r| r.t_out);
        let t_out_lag7 = lag(records, i, 7, |r| r.t_out);
        let t_in_lag1 = lag(records, i, 1, |r| r.t_in);
        let discharge_lag1 = lag(records, i, 1, |r| r.discharge);
        let inflow_lag1 = lag(records, i, 1, |r| r.inflow);

        let t_out_ma7 = trailing_mean(records, i, |r| r.t_out);
        let discharge_ma7 = trailing_mean(records, i, |r| r.discharge);

        // The +1 in the denominator is a fixed smoothing constant guarding
        // against zero discharge; it is not a tunable.
        let temp_discharge_ratio = t_out_lag1 / (discharge_lag1 + 1.0);
        let stratification_index = rec.air_temp - t_out_lag1;

        let row = [
            sin_doy,
            cos_doy,
            t_out_lag1,
            t_out_lag7,
            t_in_lag1,
            discharge_lag1,
            inflow_lag1,
            rec.storage,
            rec.release_rate,
            rec.air_temp,
            rec.solar_rad,
            rec.wind_speed,
            rec.humidity,
            t_out_ma7,
            discharge_ma7,
            temp_discharge_ratio,
            stratification_index,
        ];

        valid.push(row.iter().all(|v| v.is_finite()));
        data.extend_from_slice(&row);
    }

    let x = Array2::from_shape_vec((n, n_features), data)
        .expect("feature row length matches FEATURE_NAMES");

    Ok(FeatureTable {
        x,
        valid,
        dates: series.dates(),
    })
}

fn lag<F>(records: &[crate::data_handling::Observation], i: usize, steps: usize, get: F) -> f64
where
    F: Fn(&crate::data_handling::Observation) -> f64,
{
    if i >= steps {
        get(&records[i - steps])
    } else {
        f64::NAN
    }
}

/// Trailing mean over a window of [`MIN_LOOKBACK`] observations ending at i
/// (inclusive). NaN until the full window is available or if any member is
/// missing.
fn trailing_mean<F>(records: &[crate::data_handling::Observation], i: usize, get: F) -> f64
where
    F: Fn(&crate::data_handling::Observation) -> f64,
{
    if i + 1 < MIN_LOOKBACK {
        return f64::NAN;
    }
    let window = &records[i + 1 - MIN_LOOKBACK..=i];
    let sum: f64 = window.iter().map(&get).sum();
    sum / MIN_LOOKBACK as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::synthetic_series;

    #[test]
    fn ten_days_yield_exactly_three_valid_rows() {
        // Implementation-fixed invariant: 10 complete days, 7-step lookback.
        let table = build(&synthetic_series(10)).unwrap();
        assert_eq!(table.n_valid(), 3);
        assert_eq!(table.last_valid_row(), Some(9));
        for i in 0..MIN_LOOKBACK {
            assert!(!table.valid[i]);
        }
    }

    #[test]
    fn insufficient_history_is_an_error() {
        match build(&synthetic_series(7)) {
            Err(ModelError::InsufficientHistory {
                required,
                available,
            }) => {
                assert_eq!(required, MIN_LOOKBACK + 1);
                assert_eq!(available, 7);
            }
            _ => panic!("expected InsufficientHistory"),
        }
    }

    #[test]
    fn harmonics_lie_on_the_unit_circle() {
        let table = build(&synthetic_series(20)).unwrap();
        for i in 0..table.x.nrows() {
            let s = table.x[(i, 0)];
            let c = table.x[(i, 1)];
            assert!((s * s + c * c - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn lags_read_the_raw_series() {
        let series = synthetic_series(12);
        let table = build(&series).unwrap();
        let records = series.records();
        let lag1_idx = FEATURE_NAMES.iter().position(|&n| n == "t_out_lag1").unwrap();
        let lag7_idx = FEATURE_NAMES.iter().position(|&n| n == "t_out_lag7").unwrap();
        assert_eq!(table.x[(8, lag1_idx)], records[7].t_out);
        assert_eq!(table.x[(8, lag7_idx)], records[1].t_out);
    }

    #[test]
    fn interaction_terms_match_their_definitions() {
        let series = synthetic_series(12);
        let table = build(&series).unwrap();
        let records = series.records();
        let ratio_idx = FEATURE_NAMES
            .iter()
            .position(|&n| n == "temp_discharge_ratio")
            .unwrap();
        let strat_idx = FEATURE_NAMES
            .iter()
            .position(|&n| n == "stratification_index")
            .unwrap();
        let i = 9;
        let expected_ratio = records[i - 1].t_out / (records[i - 1].discharge + 1.0);
        let expected_strat = records[i].air_temp - records[i - 1].t_out;
        assert!((table.x[(i, ratio_idx)] - expected_ratio).abs() < 1e-12);
        assert!((table.x[(i, strat_idx)] - expected_strat).abs() < 1e-12);
    }

    #[test]
    fn missing_values_invalidate_dependent_rows() {
        // Poke a hole well past the warm-up region.
        let mut records = synthetic_series(15).records().to_vec();
        records[10].t_out = f64::NAN;
        let series = ObservationSeries::new(records).unwrap();
        let table = build(&series).unwrap();
        // Row 10 uses t_out_ma7 over 4..=10, row 11 lags t_out at 10, and the
        // rolling window covers rows 10..=14.
        assert!(!table.valid[10]);
        assert!(!table.valid[11]);
        assert!(!table.valid[14]);
    }
}
