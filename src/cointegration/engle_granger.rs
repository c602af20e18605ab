//! Engle-Granger two-step cointegration test.
//!
//! 1. Regress the first series on the second plus the configured
//!    deterministic terms.
//! 2. Run a Dickey-Fuller regression (no deterministic terms) on the
//!    residuals and map its t-statistic to a MacKinnon p-value.
//!
//! A small p-value is evidence that the residual spread is stationary, i.e.
//! that the two series are cointegrated.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Trend;
use crate::config::PairConfig;
use crate::error::{DataError, PairError};
use crate::math::{least_squares, mackinnon_p_value};

/// Residual sum of squares below this fraction of the total sum of squares
/// is treated as an exact linear relationship.
const PERFECT_FIT_TOLERANCE: f64 = 1e-14;

/// Outcome of an Engle-Granger test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationResult {
    /// Slope of the first series on the second
    pub beta: f64,
    /// Cointegrating vector normalised on the first series: `(1, -beta)`
    pub vector: [f64; 2],
    /// Dickey-Fuller t-statistic of the residuals
    pub statistic: f64,
    /// MacKinnon p-value of `statistic`
    pub p_value: f64,
    /// Observations in the cointegrating regression
    pub nobs: usize,
    pub trend: Trend,
    /// Fitted constant, zero when the trend has none
    pub intercept: f64,
    /// Fitted time-trend slope, zero when the trend has none
    pub trend_slope: f64,
}

/// Accept/reject decision at a given p-value level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CointegrationVerdict {
    Accepted,
    Rejected,
}

impl CointegrationResult {
    pub fn verdict(&self, max_p_value: f64) -> CointegrationVerdict {
        if self.p_value <= max_p_value {
            CointegrationVerdict::Accepted
        } else {
            CointegrationVerdict::Rejected
        }
    }

    /// `true` when the pair clears the acceptance level
    pub fn is_cointegrated(&self, max_p_value: f64) -> bool {
        self.verdict(max_p_value) == CointegrationVerdict::Accepted
    }
}

/// Engle-Granger estimator.
#[derive(Debug, Clone, Copy)]
pub struct EngleGranger {
    trend: Trend,
    lags: usize,
    min_observations: usize,
}

impl Default for EngleGranger {
    fn default() -> Self {
        Self::new(Trend::ConstantTrend, 0, 252)
    }
}

impl EngleGranger {
    pub fn new(trend: Trend, lags: usize, min_observations: usize) -> Self {
        Self {
            trend,
            lags,
            // The residual regression needs at least a couple of rows after lags
            min_observations: min_observations.max(lags + 4),
        }
    }

    pub fn from_config(config: &PairConfig) -> Self {
        Self::new(config.trend, config.adf_lags, config.min_observations)
    }

    /// Test whether `y` and `x` are cointegrated.
    ///
    /// # Errors
    /// - `Data(Misaligned)` when lengths differ
    /// - `Data(InsufficientData)` below the minimum observation count
    /// - `NumericalDegeneracy` for non-finite input, a constant regressor or
    ///   an exact linear relationship
    pub fn estimate(&self, y: &[f64], x: &[f64]) -> Result<CointegrationResult, PairError> {
        if y.len() != x.len() {
            return Err(DataError::Misaligned(format!(
                "series lengths differ: {} vs {}",
                y.len(),
                x.len()
            ))
            .into());
        }
        let n = y.len();
        if n < self.min_observations {
            return Err(DataError::InsufficientData {
                expected: self.min_observations,
                actual: n,
            }
            .into());
        }
        if y.iter().chain(x.iter()).any(|v| !v.is_finite()) {
            return Err(PairError::degenerate("non-finite value in price series"));
        }

        // Step 1: cointegrating regression
        let columns = 1 + self.trend.deterministic_terms();
        let design = DMatrix::from_fn(n, columns, |i, j| match j {
            0 => x[i],
            1 => 1.0,
            _ => (i + 1) as f64,
        });
        let target = DVector::from_column_slice(y);
        let fit = least_squares(&design, &target)?;

        let y_mean = y.iter().sum::<f64>() / n as f64;
        let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
        if tss <= 0.0 || fit.ssr() <= PERFECT_FIT_TOLERANCE * tss {
            return Err(PairError::degenerate(
                "series are an exact linear combination; spread has no variance",
            ));
        }

        let beta = fit.coefficients[0];
        let intercept = if columns > 1 { fit.coefficients[1] } else { 0.0 };
        let trend_slope = if columns > 2 { fit.coefficients[2] } else { 0.0 };

        // Step 2: unit-root test on residuals
        let statistic = dickey_fuller_statistic(fit.residuals.as_slice(), self.lags)?;
        let p_value = mackinnon_p_value(statistic, self.trend);

        debug!(
            beta,
            statistic,
            p_value,
            nobs = n,
            trend = %self.trend,
            "Engle-Granger estimate"
        );

        Ok(CointegrationResult {
            beta,
            vector: [1.0, -beta],
            statistic,
            p_value,
            nobs: n,
            trend: self.trend,
            intercept,
            trend_slope,
        })
    }
}

/// t-statistic of `γ` in `Δe_t = γ·e_{t-1} + Σ φ_j·Δe_{t-j}` (no constant).
pub fn dickey_fuller_statistic(residuals: &[f64], lags: usize) -> Result<f64, PairError> {
    let diffs: Vec<f64> = residuals.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.len() <= lags + 1 {
        return Err(DataError::InsufficientData {
            expected: lags + 3,
            actual: residuals.len(),
        }
        .into());
    }

    // Row r uses Δe at index r + lags, so every lag is available
    let rows = diffs.len() - lags;
    let design = DMatrix::from_fn(rows, 1 + lags, |r, j| {
        let t = r + lags;
        if j == 0 {
            residuals[t]
        } else {
            diffs[t - j]
        }
    });
    let target = DVector::from_fn(rows, |r, _| diffs[r + lags]);

    let fit = least_squares(&design, &target)?;
    fit.t_statistic(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use statrs::distribution::Normal;

    fn random_walk(rng: &mut StdRng, len: usize, start: f64, sigma: f64) -> Vec<f64> {
        let normal = Normal::new(0.0, sigma).unwrap();
        let mut level = start;
        (0..len)
            .map(|_| {
                level += rng.sample(normal);
                level
            })
            .collect()
    }

    /// Y = 0.5·X + stationary noise
    fn cointegrated_pair(seed: u64, len: usize) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = random_walk(&mut rng, len, 4.0, 0.02);
        let noise = Normal::new(0.0, 0.01).unwrap();
        let y = x.iter().map(|v| 0.5 * v + 1.0 + rng.sample(noise)).collect();
        (y, x)
    }

    #[test]
    fn test_recovers_beta_of_cointegrated_pair() {
        let (y, x) = cointegrated_pair(7, 504);
        let result = EngleGranger::default().estimate(&y, &x).unwrap();

        assert!((result.beta - 0.5).abs() < 0.05, "beta = {}", result.beta);
        assert_eq!(result.vector, [1.0, -result.beta]);
        assert!(result.p_value < 0.4, "p = {}", result.p_value);
        assert!(result.is_cointegrated(0.4));
        assert_eq!(result.verdict(0.4), CointegrationVerdict::Accepted);
        assert!(result.statistic < -3.0);
        assert_eq!(result.nobs, 504);
    }

    #[test]
    fn test_independent_walks_often_rejected() {
        let eg = EngleGranger::default();
        let mut rejected = 0;
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(1000 + seed);
            let y = random_walk(&mut rng, 504, 4.0, 0.02);
            let x = random_walk(&mut rng, 504, 4.0, 0.02);
            let result = eg.estimate(&y, &x).unwrap();
            assert!((0.0..=1.0).contains(&result.p_value));
            if !result.is_cointegrated(0.4) {
                rejected += 1;
            }
        }
        assert!(rejected >= 10, "only {} of 40 rejected", rejected);
    }

    #[test]
    fn test_is_deterministic() {
        let (y, x) = cointegrated_pair(11, 300);
        let eg = EngleGranger::new(Trend::Constant, 1, 252);
        assert_eq!(eg.estimate(&y, &x).unwrap(), eg.estimate(&y, &x).unwrap());
    }

    #[test]
    fn test_misaligned_lengths() {
        let (y, x) = cointegrated_pair(3, 300);
        let result = EngleGranger::default().estimate(&y, &x[..299]);
        assert!(matches!(
            result,
            Err(PairError::Data(DataError::Misaligned(_)))
        ));
    }

    #[test]
    fn test_insufficient_history() {
        let (y, x) = cointegrated_pair(3, 100);
        let result = EngleGranger::default().estimate(&y, &x);
        assert!(matches!(
            result,
            Err(PairError::Data(DataError::InsufficientData {
                expected: 252,
                actual: 100
            }))
        ));
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let (y, _) = cointegrated_pair(5, 300);
        let x = vec![4.0; 300];
        let result = EngleGranger::default().estimate(&y, &x);
        assert!(matches!(result, Err(PairError::NumericalDegeneracy(_))));
    }

    #[test]
    fn test_exact_linear_relation_is_degenerate() {
        let mut rng = StdRng::seed_from_u64(9);
        let x = random_walk(&mut rng, 300, 4.0, 0.02);
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 0.3).collect();
        let result = EngleGranger::new(Trend::Constant, 0, 252).estimate(&y, &x);
        assert!(matches!(result, Err(PairError::NumericalDegeneracy(_))));
    }

    #[test]
    fn test_dickey_fuller_on_white_noise_is_strongly_negative() {
        let mut rng = StdRng::seed_from_u64(21);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let e: Vec<f64> = (0..400).map(|_| rng.sample(normal)).collect();
        let stat = dickey_fuller_statistic(&e, 0).unwrap();
        assert!(stat < -10.0, "stat = {}", stat);
    }
}
