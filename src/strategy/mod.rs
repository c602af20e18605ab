//! Pair trading strategy: model fitting, thresholds, signals and the
//! orchestrator that ties them to market data and execution.

pub mod orchestrator;
pub mod pair_model;
pub mod signal;
pub mod threshold;

pub use orchestrator::{DailyOutcome, PairOrchestrator, RecalibrationOutcome};
pub use pair_model::{Calibration, CointegratingVector, PairModel, TradingWeights};
pub use signal::{ExitRule, SignalStateMachine, Transition};
pub use threshold::ThresholdOptimizer;
