//! Shared helpers for the integration tests.
use std::path::PathBuf;

use chrono::NaiveDate;
use reservoir_thermal::data_handling::{Observation, ObservationSeries};

/// A smooth, fully-observed daily series for exercising the full pipeline.
pub fn synthetic_series(n: usize) -> ObservationSeries {
    let start = NaiveDate::from_ymd_opt(2022, 4, 1).unwrap();
    let records = (0..n)
        .map(|i| {
            let t = i as f64;
            Observation {
                date: start + chrono::Duration::days(i as i64),
                t_out: 11.0 + 0.04 * t + (t * 0.17).sin() * 1.5,
                t_in: 9.5 + 0.03 * t,
                discharge: 55.0 + (t * 0.6).sin() * 6.0,
                inflow: 47.0 + (t * 0.4).cos() * 5.0,
                storage: 1200.0 - 0.4 * t,
                release_rate: 50.0 + (t * 0.2).cos(),
                air_temp: 13.0 + 0.08 * t + (t * 0.25).sin() * 2.5,
                solar_rad: 210.0 + 15.0 * (t * 0.3).sin(),
                wind_speed: 2.5 + (t * 0.8).sin().abs(),
                humidity: 58.0 + 6.0 * (t * 0.35).cos(),
            }
        })
        .collect();
    ObservationSeries::new(records).unwrap()
}

/// Fresh per-test scratch directory under the system temp dir.
pub fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "reservoir-thermal-{}-{}",
        label,
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
