//! Residual-based cointegration testing.

pub mod engle_granger;

pub use engle_granger::{CointegrationResult, CointegrationVerdict, EngleGranger};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic terms included in the cointegrating regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Trend {
    /// No deterministic terms
    #[serde(rename = "n")]
    None,
    /// Constant only
    #[serde(rename = "c")]
    Constant,
    /// Constant and linear time trend
    #[default]
    #[serde(rename = "ct")]
    ConstantTrend,
}

impl Trend {
    /// Number of deterministic columns added to the regression
    pub fn deterministic_terms(&self) -> usize {
        match self {
            Trend::None => 0,
            Trend::Constant => 1,
            Trend::ConstantTrend => 2,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::None => write!(f, "n"),
            Trend::Constant => write!(f, "c"),
            Trend::ConstantTrend => write!(f, "ct"),
        }
    }
}

impl std::str::FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "n" | "none" => Ok(Trend::None),
            "c" | "constant" => Ok(Trend::Constant),
            "ct" | "constant-trend" => Ok(Trend::ConstantTrend),
            _ => Err(format!("Unknown trend '{}'. Use n, c or ct", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_roundtrips_through_str() {
        for trend in [Trend::None, Trend::Constant, Trend::ConstantTrend] {
            assert_eq!(trend.to_string().parse::<Trend>().unwrap(), trend);
        }
        assert!("quadratic".parse::<Trend>().is_err());
    }
}
