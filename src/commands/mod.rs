//! CLI command handlers.
//!
//! This module contains the implementation for each CLI subcommand,
//! delegating to the pair model and the replay scheduler.

mod backtest;
mod calibrate;

pub use backtest::run_backtest;
pub use calibrate::run_calibrate;
