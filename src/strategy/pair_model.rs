//! Calibrated model for one cointegrated pair.
//!
//! A `PairModel` bundles everything recalibration produces: the cointegrating
//! vector, trading weights, the fitted spread filter and its running state,
//! and the entry threshold. It is built in one piece by [`PairModel::fit`]
//! and replaced wholesale on the next recalibration.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::cointegration::{CointegrationResult, EngleGranger};
use crate::config::PairConfig;
use crate::error::{DataError, PairError};
use crate::math::{KalmanState, LocalLevelFilter};
use crate::strategy::threshold::ThresholdOptimizer;
use crate::types::{PositionState, TargetWeight};

/// Weights that turn two log prices into the spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CointegratingVector([f64; 2]);

impl CointegratingVector {
    pub fn new(components: [f64; 2]) -> Result<Self, PairError> {
        if components.iter().any(|v| !v.is_finite()) {
            return Err(PairError::degenerate("cointegrating vector is not finite"));
        }
        if components.iter().all(|v| *v == 0.0) {
            return Err(PairError::degenerate("cointegrating vector is all zero"));
        }
        Ok(Self(components))
    }

    pub fn components(&self) -> [f64; 2] {
        self.0
    }

    /// `v · log_prices`
    #[inline]
    pub fn spread(&self, log_prices: [f64; 2]) -> f64 {
        self.0[0] * log_prices[0] + self.0[1] * log_prices[1]
    }

    /// Vector scaled so that absolute weights sum to one
    pub fn trading_weights(&self) -> TradingWeights {
        let gross: f64 = self.0.iter().map(|v| v.abs()).sum();
        TradingWeights([self.0[0] / gross, self.0[1] / gross])
    }
}

/// Gross-normalised position weights for the spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradingWeights([f64; 2]);

impl TradingWeights {
    pub fn components(&self) -> [f64; 2] {
        self.0
    }

    pub fn gross(&self) -> f64 {
        self.0.iter().map(|w| w.abs()).sum()
    }

    /// Target weights for a position; empty when Flat
    pub fn targets(&self, assets: &[String; 2], position: PositionState) -> Vec<TargetWeight> {
        if position.is_flat() {
            return Vec::new();
        }
        let sign = position.direction();
        assets
            .iter()
            .zip(self.0.iter())
            .map(|(asset, w)| TargetWeight::new(asset.clone(), sign * w))
            .collect()
    }
}

/// Fitted pair ready for daily evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairModel {
    assets: [String; 2],
    vector: CointegratingVector,
    weights: TradingWeights,
    filter: LocalLevelFilter,
    state: KalmanState,
    threshold: f64,
    p_value: f64,
    statistic: f64,
    /// Normalized spread values the threshold was chosen from
    history_len: usize,
}

/// Outcome of fitting a pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Calibration {
    Accepted(PairModel),
    Rejected { p_value: f64, statistic: f64 },
}

impl PairModel {
    /// Run the full calibration pipeline on aligned price history.
    ///
    /// log prices → Engle-Granger → spread → filter EM on the leading window →
    /// forward replay → normalized spread → threshold.
    pub fn fit(history: &HashMap<String, Vec<f64>>, config: &PairConfig) -> Result<Calibration, PairError> {
        config.validate()?;
        let assets = [config.assets[0].clone(), config.assets[1].clone()];
        let [log_a, log_b] = log_price_pair(history, &assets, config.min_observations)?;

        let coint: CointegrationResult = EngleGranger::from_config(config).estimate(&log_a, &log_b)?;
        if !coint.is_cointegrated(config.max_p_value) {
            info!(
                pair = %config.pair_label(),
                p_value = coint.p_value,
                statistic = coint.statistic,
                max_p_value = config.max_p_value,
                "Cointegration rejected"
            );
            return Ok(Calibration::Rejected {
                p_value: coint.p_value,
                statistic: coint.statistic,
            });
        }

        let vector = CointegratingVector::new(coint.vector)?;
        let spread: Vec<f64> = log_a
            .iter()
            .zip(log_b.iter())
            .map(|(a, b)| vector.spread([*a, *b]))
            .collect();

        let window = config.calibration_window;
        if spread.len() <= window {
            return Err(DataError::InsufficientData {
                expected: window + 1,
                actual: spread.len(),
            }
            .into());
        }
        let fitted = LocalLevelFilter::calibrate(&spread[..window], config.em_iterations)?;

        let (means, state) = fitted.filter.replay_forward(&spread[window..], fitted.state);
        let normalized: Vec<f64> = spread[window..]
            .iter()
            .zip(means.iter())
            .map(|(s, m)| s - m)
            .collect();

        let threshold = ThresholdOptimizer::from_config(config).optimize(&normalized)?;
        let weights = vector.trading_weights();

        info!(
            pair = %config.pair_label(),
            beta = coint.beta,
            p_value = coint.p_value,
            threshold,
            q = fitted.filter.parameters().transition_variance,
            r = fitted.filter.parameters().observation_variance,
            "Pair calibrated"
        );

        Ok(Calibration::Accepted(Self {
            assets,
            vector,
            weights,
            filter: fitted.filter,
            state,
            threshold,
            p_value: coint.p_value,
            statistic: coint.statistic,
            history_len: normalized.len(),
        }))
    }

    /// Feed one pair of prices, advancing the filter by one step.
    ///
    /// Returns the normalized spread `spread - mean`.
    pub fn observe(&mut self, prices: [f64; 2]) -> Result<f64, PairError> {
        for (i, price) in prices.iter().enumerate() {
            if !(price.is_finite() && *price > 0.0) {
                return Err(DataError::InvalidPrice {
                    asset: self.assets[i].clone(),
                    index: 0,
                    price: *price,
                }
                .into());
            }
        }
        let spread = self.vector.spread([prices[0].ln(), prices[1].ln()]);
        self.state = self.filter.update(self.state, spread);
        let normalized = spread - self.state.mean;
        debug!(spread, mean = self.state.mean, normalized, "Spread observed");
        Ok(normalized)
    }

    /// Targets for `position`
    pub fn targets(&self, position: PositionState) -> Vec<TargetWeight> {
        self.weights.targets(&self.assets, position)
    }

    pub fn assets(&self) -> &[String; 2] {
        &self.assets
    }

    pub fn vector(&self) -> CointegratingVector {
        self.vector
    }

    pub fn weights(&self) -> TradingWeights {
        self.weights
    }

    pub fn filter(&self) -> &LocalLevelFilter {
        &self.filter
    }

    pub fn state(&self) -> KalmanState {
        self.state
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn p_value(&self) -> f64 {
        self.p_value
    }

    pub fn statistic(&self) -> f64 {
        self.statistic
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }
}

/// Validate a price snapshot and return the two log-price series.
pub fn log_price_pair(
    history: &HashMap<String, Vec<f64>>,
    assets: &[String; 2],
    min_observations: usize,
) -> Result<[Vec<f64>; 2], DataError> {
    let mut series: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
    for (slot, asset) in series.iter_mut().zip(assets.iter()) {
        let prices = history
            .get(asset)
            .ok_or_else(|| DataError::MissingAsset(asset.clone()))?;
        if let Some((index, price)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(DataError::InvalidPrice {
                asset: asset.clone(),
                index,
                price: *price,
            });
        }
        *slot = prices.iter().map(|p| p.ln()).collect();
    }

    if series[0].len() != series[1].len() {
        return Err(DataError::Misaligned(format!(
            "{} has {} bars, {} has {}",
            assets[0],
            series[0].len(),
            assets[1],
            series[1].len()
        )));
    }
    if series[0].len() < min_observations {
        return Err(DataError::InsufficientData {
            expected: min_observations,
            actual: series[0].len(),
        });
    }
    Ok(series)
}
