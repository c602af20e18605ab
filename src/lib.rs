//! Cointegrated pairs trading with a Kalman-filtered spread.
//!
//! Recalibration tests the pair for cointegration (Engle-Granger), fits a
//! local-level Kalman filter to the spread's equilibrium and picks an entry
//! band from the smoothed tail of the normalized spread. Daily evaluation
//! advances the filter by one observation and runs the position state
//! machine.

pub mod backtest;
pub mod cli;
pub mod cointegration;
pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod exchange;
pub mod logging;
pub mod math;
pub mod strategy;
pub mod types;

pub use config::PairConfig;
pub use error::{DataError, PairError};
