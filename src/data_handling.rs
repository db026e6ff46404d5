//! Data structures and helpers for daily reservoir observation series.
//!
//! This module defines the `Observation` record and the `ObservationSeries`
//! container used by the feature builder and the training orchestrator.
//! Observations arrive from an external data-fetch collaborator; once inside
//! a series they are immutable. Missing values are encoded as NaN and may be
//! forward-filled for at most [`FFILL_LIMIT`] consecutive rows; longer gaps
//! stay missing and surface as invalid feature rows downstream.
use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Maximum number of consecutive missing values a forward fill may bridge.
pub const FFILL_LIMIT: usize = 2;

/// One observation per calendar day. All quantities are daily values;
/// NaN encodes a missing measurement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// Outflow water temperature (°C) — the prediction target.
    pub t_out: f64,
    /// Inflow water temperature (°C).
    pub t_in: f64,
    pub discharge: f64,
    pub inflow: f64,
    pub storage: f64,
    pub release_rate: f64,
    pub air_temp: f64,
    pub solar_rad: f64,
    pub wind_speed: f64,
    pub humidity: f64,
}

/// Number of value columns in an observation (everything except the date).
pub const N_OBS_COLUMNS: usize = 10;

impl Observation {
    /// Observation values in a fixed column order.
    pub(crate) fn values(&self) -> [f64; N_OBS_COLUMNS] {
        [
            self.t_out,
            self.t_in,
            self.discharge,
            self.inflow,
            self.storage,
            self.release_rate,
            self.air_temp,
            self.solar_rad,
            self.wind_speed,
            self.humidity,
        ]
    }

    pub(crate) fn set_value(&mut self, column: usize, value: f64) {
        match column {
            0 => self.t_out = value,
            1 => self.t_in = value,
            2 => self.discharge = value,
            3 => self.inflow = value,
            4 => self.storage = value,
            5 => self.release_rate = value,
            6 => self.air_temp = value,
            7 => self.solar_rad = value,
            8 => self.wind_speed = value,
            9 => self.humidity = value,
            _ => unreachable!("observation column out of range"),
        }
    }
}

/// A time-ordered sequence of daily observations with unique dates.
#[derive(Debug, Clone)]
pub struct ObservationSeries {
    records: Vec<Observation>,
}

impl ObservationSeries {
    /// Build a series from records, enforcing strictly increasing dates.
    ///
    /// # Errors
    ///
    /// `UpstreamData` if two records share a date or arrive out of order.
    pub fn new(records: Vec<Observation>) -> Result<Self, ModelError> {
        for pair in records.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ModelError::UpstreamData(format!(
                    "observations out of order or duplicated at {} (previous {})",
                    pair[1].date, pair[0].date
                )));
            }
        }
        Ok(ObservationSeries { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Observation] {
        &self.records
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    /// Forward-fill missing values per column, bridging at most
    /// [`FFILL_LIMIT`] consecutive gaps. Longer runs of missing values are
    /// left as NaN; silently interpolating across them would fabricate data.
    pub fn forward_fill(&mut self) {
        for col in 0..N_OBS_COLUMNS {
            let mut last_value = f64::NAN;
            let mut run = 0usize;
            for rec in self.records.iter_mut() {
                let v = rec.values()[col];
                if v.is_finite() {
                    last_value = v;
                    run = 0;
                } else if last_value.is_finite() && run < FFILL_LIMIT {
                    rec.set_value(col, last_value);
                    run += 1;
                } else {
                    run += 1;
                }
            }
        }
    }

    /// Load a series from CSV with a header row naming the columns
    /// `date,t_out,t_in,discharge,inflow,storage,release_rate,air_temp,
    /// solar_rad,wind_speed,humidity`. Empty cells become NaN; any other
    /// unparseable cell or a malformed date fails the whole load.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ModelError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| ModelError::UpstreamData(format!("bad CSV header: {}", e)))?
            .clone();

        let column_index = |name: &str| -> Result<usize, ModelError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ModelError::UpstreamData(format!("missing CSV column '{}'", name)))
        };

        let date_idx = column_index("date")?;
        let value_indices: Vec<usize> = [
            "t_out",
            "t_in",
            "discharge",
            "inflow",
            "storage",
            "release_rate",
            "air_temp",
            "solar_rad",
            "wind_speed",
            "humidity",
        ]
        .iter()
        .map(|name| column_index(name))
        .collect::<Result<_, _>>()?;

        let mut records = Vec::new();
        for (row_no, result) in csv_reader.records().enumerate() {
            let record = result
                .map_err(|e| ModelError::UpstreamData(format!("bad CSV row {}: {}", row_no, e)))?;

            let date_field = record.get(date_idx).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d").map_err(|e| {
                ModelError::UpstreamData(format!(
                    "bad date '{}' at row {}: {}",
                    date_field, row_no, e
                ))
            })?;

            let mut values = [f64::NAN; N_OBS_COLUMNS];
            for (slot, &idx) in values.iter_mut().zip(value_indices.iter()) {
                let field = record.get(idx).unwrap_or_default().trim();
                if !field.is_empty() {
                    *slot = field.parse::<f64>().map_err(|e| {
                        ModelError::UpstreamData(format!(
                            "bad numeric value '{}' at row {}: {}",
                            field, row_no, e
                        ))
                    })?;
                }
            }

            let mut obs = Observation {
                date,
                t_out: f64::NAN,
                t_in: f64::NAN,
                discharge: f64::NAN,
                inflow: f64::NAN,
                storage: f64::NAN,
                release_rate: f64::NAN,
                air_temp: f64::NAN,
                solar_rad: f64::NAN,
                wind_speed: f64::NAN,
                humidity: f64::NAN,
            };
            for (col, &v) in values.iter().enumerate() {
                obs.set_value(col, v);
            }
            records.push(obs);
        }

        ObservationSeries::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(date: NaiveDate, t_out: f64) -> Observation {
        Observation {
            date,
            t_out,
            t_in: 10.0,
            discharge: 50.0,
            inflow: 45.0,
            storage: 1000.0,
            release_rate: 48.0,
            air_temp: 15.0,
            solar_rad: 200.0,
            wind_speed: 3.0,
            humidity: 60.0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, d).unwrap()
    }

    #[test]
    fn rejects_duplicate_dates() {
        let records = vec![obs(day(1), 12.0), obs(day(1), 12.5)];
        match ObservationSeries::new(records) {
            Err(ModelError::UpstreamData(_)) => {}
            other => panic!("expected UpstreamData, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn rejects_out_of_order_dates() {
        let records = vec![obs(day(2), 12.0), obs(day(1), 12.5)];
        assert!(ObservationSeries::new(records).is_err());
    }

    #[test]
    fn forward_fill_bridges_short_gaps() {
        let mut records: Vec<_> = (1..=6).map(|d| obs(day(d), 12.0)).collect();
        records[1].t_out = f64::NAN;
        records[2].t_out = f64::NAN;
        let mut series = ObservationSeries::new(records).unwrap();
        series.forward_fill();
        assert_eq!(series.records()[1].t_out, 12.0);
        assert_eq!(series.records()[2].t_out, 12.0);
    }

    #[test]
    fn forward_fill_leaves_long_gaps_missing() {
        let mut records: Vec<_> = (1..=6).map(|d| obs(day(d), 12.0)).collect();
        for i in 1..=3 {
            records[i].t_out = f64::NAN;
        }
        let mut series = ObservationSeries::new(records).unwrap();
        series.forward_fill();
        // Two rows bridged, the third row of the gap stays missing.
        assert!(series.records()[1].t_out.is_finite());
        assert!(series.records()[2].t_out.is_finite());
        assert!(series.records()[3].t_out.is_nan());
        assert!(series.records()[4].t_out.is_finite());
    }

    #[test]
    fn csv_round_trip_with_missing_cells() {
        let csv_text = "\
date,t_out,t_in,discharge,inflow,storage,release_rate,air_temp,solar_rad,wind_speed,humidity
2023-06-01,12.0,10.0,50.0,45.0,1000.0,48.0,15.0,200.0,3.0,60.0
2023-06-02,,10.1,51.0,44.0,1001.0,49.0,15.5,210.0,3.1,61.0
";
        let series = ObservationSeries::from_csv_reader(csv_text.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.records()[0].t_out, 12.0);
        assert!(series.records()[1].t_out.is_nan());
    }

    #[test]
    fn csv_rejects_bad_values() {
        let csv_text = "\
date,t_out,t_in,discharge,inflow,storage,release_rate,air_temp,solar_rad,wind_speed,humidity
2023-06-01,warm,10.0,50.0,45.0,1000.0,48.0,15.0,200.0,3.0,60.0
";
        assert!(ObservationSeries::from_csv_reader(csv_text.as_bytes()).is_err());
    }
}
