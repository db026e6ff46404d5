//! reservoir-thermal: interpretable models for reservoir outflow temperature.
//!
//! This crate provides the modeling core for multi-horizon (1/3/7 day)
//! forecasts of reservoir outflow water temperature: a fixed-schema feature
//! builder over daily hydrological and meteorological observations, a
//! polymorphic model wrapper over three regression families (additive-smooth
//! GAM, gradient-boosted trees, random forest) with uncertainty bounds and
//! per-feature attribution, a leakage-free chronological training
//! orchestrator, and a JSON artifact format for fitted models.
//!
//! The design favors small, testable modules; fitted models are plain
//! immutable data and can be shared freely across threads once loaded.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod features;
pub mod math;
pub mod models;
pub mod preprocessing;
pub mod registry;
pub mod stats;
pub mod training;
pub mod wrapper;

#[cfg(test)]
pub(crate) mod test_utils;
