//! Synthetic observation data shared by unit tests.
use chrono::NaiveDate;

use crate::data_handling::{Observation, ObservationSeries};

/// A smooth, fully-observed daily series starting 2023-03-01. The outflow
/// temperature trends upward with a seasonal wiggle so that lagged and
/// meteorological features carry real signal.
pub(crate) fn synthetic_series(n: usize) -> ObservationSeries {
    let start = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
    let records = (0..n)
        .map(|i| {
            let t = i as f64;
            Observation {
                date: start + chrono::Duration::days(i as i64),
                t_out: 10.0 + 0.05 * t + (t * 0.2).sin(),
                t_in: 9.0 + 0.04 * t,
                discharge: 50.0 + (t * 0.7).sin() * 5.0,
                inflow: 45.0 + (t * 0.5).cos() * 4.0,
                storage: 1000.0 - 0.5 * t,
                release_rate: 48.0 + (t * 0.1).cos(),
                air_temp: 12.0 + 0.1 * t + (t * 0.3).sin() * 2.0,
                solar_rad: 200.0 + 10.0 * (t * 0.3).sin(),
                wind_speed: 3.0 + (t * 0.9).sin().abs(),
                humidity: 60.0 + 5.0 * (t * 0.4).cos(),
            }
        })
        .collect();
    ObservationSeries::new(records).unwrap()
}
