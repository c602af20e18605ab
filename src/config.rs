//! Configuration for a single cointegrated pair.

use crate::cointegration::Trend;
use crate::error::PairError;
use crate::strategy::signal::ExitRule;
use serde::{Deserialize, Serialize};

/// Default pair traded by the reference strategy (technology vs utilities).
pub const DEFAULT_ASSETS: [&str; 2] = ["XLK", "XLU"];

/// Recognised options for one pair model.
///
/// Every field has a serde default, so a config file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    /// Asset identifiers; the first is the dependent leg of the regression
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// Bars of history fetched for each recalibration
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    /// Minimum aligned bars required before estimating
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,

    /// Leading bars of the spread used for EM calibration of the filter
    #[serde(default = "default_calibration_window")]
    pub calibration_window: usize,

    /// EM iterations for the filter's noise parameters
    #[serde(default = "default_em_iterations")]
    pub em_iterations: usize,

    /// Pairs with a cointegration p-value above this are rejected
    #[serde(default = "default_max_p_value")]
    pub max_p_value: f64,

    /// Deterministic terms in the cointegrating regression
    #[serde(default)]
    pub trend: Trend,

    /// Lagged differences in the residual unit-root regression
    #[serde(default)]
    pub adf_lags: usize,

    /// Resolution of the threshold grid
    #[serde(default = "default_grid_points")]
    pub grid_points: usize,

    /// Roughness penalty of the survival-function smoother
    #[serde(default = "default_smoothing_lambda")]
    pub smoothing_lambda: f64,

    #[serde(default)]
    pub exit_rule: ExitRule,
}

fn default_assets() -> Vec<String> {
    DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect()
}
fn default_lookback() -> usize {
    504 // two trading years of daily bars
}
fn default_min_observations() -> usize {
    252
}
fn default_calibration_window() -> usize {
    20
}
fn default_em_iterations() -> usize {
    5
}
fn default_max_p_value() -> f64 {
    0.4
}
fn default_grid_points() -> usize {
    50
}
fn default_smoothing_lambda() -> f64 {
    1.0
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            lookback: default_lookback(),
            min_observations: default_min_observations(),
            calibration_window: default_calibration_window(),
            em_iterations: default_em_iterations(),
            max_p_value: default_max_p_value(),
            trend: Trend::default(),
            adf_lags: 0,
            grid_points: default_grid_points(),
            smoothing_lambda: default_smoothing_lambda(),
            exit_rule: ExitRule::default(),
        }
    }
}

impl PairConfig {
    /// Create a config for the given pair with default estimation settings
    pub fn for_pair(asset_a: impl Into<String>, asset_b: impl Into<String>) -> Self {
        Self {
            assets: vec![asset_a.into(), asset_b.into()],
            ..Default::default()
        }
    }

    /// Human readable pair label, e.g. `XLK/XLU`
    pub fn pair_label(&self) -> String {
        self.assets.join("/")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), PairError> {
        let invalid = |msg: String| Err(PairError::Configuration(msg));

        if self.assets.len() != 2 {
            return invalid(format!(
                "exactly two assets are required, got {}",
                self.assets.len()
            ));
        }
        if self.assets.iter().any(|a| a.trim().is_empty()) {
            return invalid("asset identifiers cannot be empty".to_string());
        }
        if self.assets[0] == self.assets[1] {
            return invalid(format!(
                "assets must be distinct, got {} twice",
                self.assets[0]
            ));
        }
        if self.calibration_window < 2 {
            return invalid(format!(
                "calibration_window must be at least 2, got {}",
                self.calibration_window
            ));
        }
        if self.min_observations <= self.calibration_window {
            return invalid(format!(
                "min_observations ({}) must exceed calibration_window ({})",
                self.min_observations, self.calibration_window
            ));
        }
        if self.lookback < self.min_observations {
            return invalid(format!(
                "lookback ({}) must be at least min_observations ({})",
                self.lookback, self.min_observations
            ));
        }
        if self.em_iterations == 0 {
            return invalid("em_iterations must be at least 1".to_string());
        }
        if !(self.max_p_value > 0.0 && self.max_p_value <= 1.0) {
            return invalid(format!(
                "max_p_value must be in (0, 1], got {}",
                self.max_p_value
            ));
        }
        if self.grid_points < 2 {
            return invalid(format!(
                "grid_points must be at least 2, got {}",
                self.grid_points
            ));
        }
        if !self.smoothing_lambda.is_finite() || self.smoothing_lambda < 0.0 {
            return invalid(format!(
                "smoothing_lambda must be finite and non-negative, got {}",
                self.smoothing_lambda
            ));
        }
        // Dickey-Fuller regression needs rows to spare after the lags
        if self.adf_lags + 3 >= self.min_observations {
            return invalid(format!(
                "adf_lags ({}) too large for min_observations ({})",
                self.adf_lags, self.min_observations
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PairConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lookback, 504);
        assert_eq!(config.calibration_window, 20);
        assert_eq!(config.grid_points, 50);
        assert_eq!(config.trend, Trend::ConstantTrend);
        assert_eq!(config.exit_rule, ExitRule::Band);
    }

    #[test]
    fn test_three_assets_invalid() {
        let config = PairConfig {
            assets: vec!["A".into(), "B".into(), "C".into()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PairError::Configuration(_))
        ));
    }

    #[test]
    fn test_duplicate_assets_invalid() {
        let config = PairConfig::for_pair("XLK", "XLK");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_p_value() {
        let config = PairConfig {
            max_p_value: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_lambda_invalid() {
        let config = PairConfig {
            smoothing_lambda: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "assets": ["GLD", "GDX"], "trend": "c", "exit_rule": "zero-cross" }"#;
        let config: PairConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.assets, vec!["GLD".to_string(), "GDX".to_string()]);
        assert_eq!(config.trend, Trend::Constant);
        assert_eq!(config.exit_rule, ExitRule::ZeroCross);
        assert_eq!(config.lookback, 504);
        assert!((config.max_p_value - 0.4).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pair_label() {
        assert_eq!(PairConfig::default().pair_label(), "XLK/XLU");
    }
}
