//! Error types for the pairs engine.
//!
//! A pair that fails the cointegration test is not an error; it is reported
//! as `Calibration::Rejected`.

use thiserror::Error;

/// Problems with the price history handed to the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// Fewer observations than the estimator needs
    #[error("Insufficient data: expected at least {expected} data points, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Series that should share timestamps have different lengths
    #[error("Misaligned data: {0}")]
    Misaligned(String),

    /// A configured asset is absent from the snapshot
    #[error("Missing asset in price snapshot: {0}")]
    MissingAsset(String),

    /// Non-positive or non-finite price
    #[error("Invalid price for {asset} at index {index}: {price}")]
    InvalidPrice {
        asset: String,
        index: usize,
        price: f64,
    },

    /// The market data collaborator failed
    #[error("Market data unavailable: {0}")]
    Unavailable(String),

    /// Loading a file or generating synthetic data failed
    #[error("Failed to load price data: {0}")]
    Load(String),
}

/// Top-level error for calibration, evaluation and configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PairError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Ill-conditioned regression, degenerate spread history or a failed
    /// factorisation.
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The execution collaborator rejected a target or liquidation
    #[error("Execution error: {0}")]
    Execution(String),
}

impl PairError {
    pub fn degenerate(msg: impl Into<String>) -> Self {
        PairError::NumericalDegeneracy(msg.into())
    }

    pub fn is_data_error(&self) -> bool {
        matches!(self, PairError::Data(_))
    }
}
