//! Mathematical utilities for the pair model.
//!
//! Least squares, MacKinnon response surfaces for cointegration p-values and
//! a local-level Kalman filter for the spread's equilibrium.

pub mod kalman;
pub mod mackinnon;
pub mod ols;

pub use kalman::{FilterCalibration, FilterParameters, KalmanState, LocalLevelFilter};
pub use mackinnon::mackinnon_p_value;
pub use ols::{least_squares, OlsFit};
