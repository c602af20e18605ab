//! Local-level Kalman filter for the equilibrium level of a spread.
//!
//! Tracks the slowly moving mean of a cointegrating spread so that signals
//! are generated from deviations around a time-varying equilibrium rather
//! than a fixed historical average.
//!
//! # Mathematical Model
//!
//! **State equation** (random walk):
//! ```text
//! μ[t] = μ[t-1] + w,  where w ~ N(0, Q)
//! ```
//!
//! **Observation equation**:
//! ```text
//! s[t] = μ[t] + v,  where v ~ N(0, R)
//! ```
//!
//! Where:
//! - `s[t]` is the observed spread
//! - `μ[t]` is the equilibrium level we're estimating
//! - `Q` is the transition variance (how fast the equilibrium drifts)
//! - `R` is the observation variance (noise around the equilibrium)
//!
//! `R` is fixed to the sample variance of the calibration window; `Q` and the
//! prior covariance are fitted by expectation-maximisation.
//!
//! # Usage
//!
//! ```rust
//! use kalmanpairs::math::LocalLevelFilter;
//!
//! let window = [0.10, 0.12, 0.09, 0.11, 0.13, 0.10, 0.08, 0.12];
//! let fitted = LocalLevelFilter::calibrate(&window, 5).unwrap();
//!
//! let next = fitted.filter.update(fitted.state, 0.11);
//! assert!(next.covariance >= 0.0);
//! ```
//!
//! # References
//!
//! - Shumway, R.H. & Stoffer, D.S. (1982). "An approach to time series
//!   smoothing and forecasting using the EM algorithm"

use crate::error::PairError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Starting transition variance and prior covariance for EM
const EM_INITIAL_VARIANCE: f64 = 1.0;

/// Belief about the spread's equilibrium level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    /// Filtered equilibrium level
    pub mean: f64,
    /// Variance of the level estimate (never negative)
    pub covariance: f64,
}

/// Noise parameters of the local-level model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParameters {
    /// Q: variance of the random-walk step of the level
    pub transition_variance: f64,
    /// R: variance of the observation around the level
    pub observation_variance: f64,
    /// Prior mean of the level before the first observation
    pub initial_mean: f64,
    /// Prior variance of the level before the first observation
    pub initial_covariance: f64,
}

/// Filter fitted on a calibration window together with its terminal state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCalibration {
    pub filter: LocalLevelFilter,
    pub state: KalmanState,
}

/// Scalar local-level Kalman filter with fixed parameters.
///
/// # Performance
///
/// - O(1) per update, no history stored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalLevelFilter {
    params: FilterParameters,
}

impl LocalLevelFilter {
    /// Create a filter from explicit parameters.
    ///
    /// # Errors
    /// `NumericalDegeneracy` unless `R > 0`, `Q >= 0`, the prior covariance is
    /// non-negative and every value is finite.
    pub fn new(params: FilterParameters) -> Result<Self, PairError> {
        let FilterParameters {
            transition_variance,
            observation_variance,
            initial_mean,
            initial_covariance,
        } = params;
        if !(observation_variance.is_finite() && observation_variance > 0.0) {
            return Err(PairError::degenerate(format!(
                "observation variance must be positive, got {}",
                observation_variance
            )));
        }
        if !(transition_variance.is_finite() && transition_variance >= 0.0) {
            return Err(PairError::degenerate(format!(
                "transition variance must be non-negative, got {}",
                transition_variance
            )));
        }
        if !(initial_covariance.is_finite() && initial_covariance >= 0.0) || !initial_mean.is_finite()
        {
            return Err(PairError::degenerate("invalid prior for the level"));
        }
        Ok(Self { params })
    }

    #[inline]
    pub fn parameters(&self) -> &FilterParameters {
        &self.params
    }

    /// Prior state before any observation
    pub fn prior(&self) -> KalmanState {
        KalmanState {
            mean: self.params.initial_mean,
            covariance: self.params.initial_covariance,
        }
    }

    /// One predict + correct step.
    ///
    /// Pure: the same state and observation always give the same result.
    pub fn update(&self, state: KalmanState, observation: f64) -> KalmanState {
        // Predict: level unchanged, uncertainty grows by Q
        let predicted_covariance = state.covariance + self.params.transition_variance;
        self.correct(state.mean, predicted_covariance, observation)
    }

    fn correct(&self, predicted_mean: f64, predicted_covariance: f64, observation: f64) -> KalmanState {
        // R > 0 is guaranteed by the constructor, so the denominator is positive
        let gain = predicted_covariance / (predicted_covariance + self.params.observation_variance);
        KalmanState {
            mean: predicted_mean + gain * (observation - predicted_mean),
            covariance: (1.0 - gain) * predicted_covariance,
        }
    }

    /// Forward pass from the prior.
    ///
    /// The first observation corrects the prior directly; later ones go through
    /// a full predict + correct step.
    pub fn filter(&self, observations: &[f64]) -> Vec<KalmanState> {
        let mut states: Vec<KalmanState> = Vec::with_capacity(observations.len());
        for &obs in observations {
            let next = match states.last() {
                None => self.correct(
                    self.params.initial_mean,
                    self.params.initial_covariance,
                    obs,
                ),
                Some(prev) => self.update(*prev, obs),
            };
            states.push(next);
        }
        states
    }

    /// Apply `update` to each observation in turn starting from `state`.
    ///
    /// Returns the filtered mean after every observation and the final state.
    pub fn replay_forward(&self, observations: &[f64], state: KalmanState) -> (Vec<f64>, KalmanState) {
        let mut current = state;
        let means = observations
            .iter()
            .map(|&obs| {
                current = self.update(current, obs);
                current.mean
            })
            .collect();
        (means, current)
    }

    /// Fit the filter on a calibration window.
    ///
    /// 1. Prior mean and observation variance from the window's sample moments
    /// 2. `em_iterations` EM passes for `Q` and the prior covariance
    /// 3. Forward filter over the window for the terminal state
    ///
    /// # Errors
    /// `NumericalDegeneracy` for windows shorter than two points, non-finite
    /// values or zero sample variance.
    pub fn calibrate(window: &[f64], em_iterations: usize) -> Result<FilterCalibration, PairError> {
        if window.len() < 2 {
            return Err(PairError::degenerate(format!(
                "calibration window needs at least 2 points, got {}",
                window.len()
            )));
        }
        if window.iter().any(|v| !v.is_finite()) {
            return Err(PairError::degenerate("non-finite value in calibration window"));
        }

        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        if variance <= 0.0 {
            return Err(PairError::degenerate(
                "calibration window is constant; observation variance is zero",
            ));
        }

        let mut params = FilterParameters {
            transition_variance: EM_INITIAL_VARIANCE,
            observation_variance: variance,
            initial_mean: mean,
            initial_covariance: EM_INITIAL_VARIANCE,
        };
        for iteration in 0..em_iterations {
            params = em_step(params, window)?;
            debug!(
                iteration,
                q = params.transition_variance,
                p0 = params.initial_covariance,
                "EM step"
            );
        }

        let filter = Self::new(params)?;
        let state = filter
            .filter(window)
            .last()
            .copied()
            .ok_or_else(|| PairError::degenerate("empty calibration window"))?;

        Ok(FilterCalibration { filter, state })
    }
}

/// One expectation-maximisation pass for `Q` and the prior covariance.
///
/// E-step: forward filter, Rauch-Tung-Striebel smoother and lag-one smoothed
/// cross covariances. M-step: closed-form updates with `R` and the prior mean
/// held fixed.
fn em_step(params: FilterParameters, observations: &[f64]) -> Result<FilterParameters, PairError> {
    let filter = LocalLevelFilter::new(params)?;
    let n = observations.len();
    let q = params.transition_variance;

    // Forward pass, keeping the one-step predictions for the smoother
    let mut predicted: Vec<(f64, f64)> = Vec::with_capacity(n);
    let mut filtered: Vec<KalmanState> = Vec::with_capacity(n);
    for (t, &obs) in observations.iter().enumerate() {
        let (pm, pc) = if t == 0 {
            (params.initial_mean, params.initial_covariance)
        } else {
            let prev = filtered[t - 1];
            (prev.mean, prev.covariance + q)
        };
        predicted.push((pm, pc));
        filtered.push(filter.correct(pm, pc, obs));
    }

    // Backward pass
    let mut smoothed = filtered.clone();
    let mut gains = vec![0.0; n - 1];
    for t in (0..n - 1).rev() {
        let (pm_next, pc_next) = predicted[t + 1];
        let gain = if pc_next > 0.0 {
            filtered[t].covariance / pc_next
        } else {
            0.0
        };
        let next = smoothed[t + 1];
        gains[t] = gain;
        smoothed[t] = KalmanState {
            mean: filtered[t].mean + gain * (next.mean - pm_next),
            covariance: filtered[t].covariance + gain * gain * (next.covariance - pc_next),
        };
    }

    // M-step
    let transition_variance = (0..n - 1)
        .map(|t| {
            let cross = smoothed[t + 1].covariance * gains[t];
            let step = smoothed[t + 1].mean - smoothed[t].mean;
            step * step + smoothed[t].covariance + smoothed[t + 1].covariance - 2.0 * cross
        })
        .sum::<f64>()
        / (n - 1) as f64;

    let offset = smoothed[0].mean - params.initial_mean;
    let initial_covariance = smoothed[0].covariance + offset * offset;

    Ok(FilterParameters {
        transition_variance: transition_variance.max(0.0),
        initial_covariance: initial_covariance.max(0.0),
        ..params
    })
}
