//! Entry threshold selection from the normalized spread history.
//!
//! The empirical right-tail survival function of the spread is sampled on a
//! grid and smoothed with a first-difference roughness penalty:
//!
//! ```text
//! f* = argmin ‖f - f̄‖² + λ‖D f‖²   ⇒   (I + λ DᵀD) f* = f̄
//! ```
//!
//! The threshold maximises `s·f*(s)`, the expected profit per trade if every
//! excursion beyond `s` reverts to zero.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::config::PairConfig;
use crate::error::PairError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdOptimizer {
    grid_points: usize,
    smoothing_lambda: f64,
}

impl Default for ThresholdOptimizer {
    fn default() -> Self {
        Self {
            grid_points: 50,
            smoothing_lambda: 1.0,
        }
    }
}

impl ThresholdOptimizer {
    pub fn new(grid_points: usize, smoothing_lambda: f64) -> Self {
        Self {
            grid_points,
            smoothing_lambda,
        }
    }

    pub fn from_config(config: &PairConfig) -> Self {
        Self::new(config.grid_points, config.smoothing_lambda)
    }

    /// Choose the threshold for a normalized spread history.
    ///
    /// # Errors
    /// `NumericalDegeneracy` when the history is empty, contains non-finite
    /// values or never rises above zero, or when the smoothing system cannot
    /// be factorised.
    pub fn optimize(&self, history: &[f64]) -> Result<f64, PairError> {
        if history.is_empty() {
            return Err(PairError::degenerate("normalized spread history is empty"));
        }
        if history.iter().any(|v| !v.is_finite()) {
            return Err(PairError::degenerate(
                "non-finite value in normalized spread history",
            ));
        }
        if self.grid_points < 2 {
            return Err(PairError::Configuration(format!(
                "grid_points must be at least 2, got {}",
                self.grid_points
            )));
        }
        if !self.smoothing_lambda.is_finite() || self.smoothing_lambda < 0.0 {
            return Err(PairError::Configuration(format!(
                "smoothing_lambda must be finite and non-negative, got {}",
                self.smoothing_lambda
            )));
        }

        let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max <= 0.0 {
            return Err(PairError::degenerate(format!(
                "normalized spread never exceeds zero (max {}); no threshold",
                max
            )));
        }

        let grid = linspace(0.0, max, self.grid_points);
        let f_bar = survival(history, &grid);
        let f_star = smooth(&f_bar, self.smoothing_lambda)?;

        // First maximum of s·f*(s)
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, (s, f)) in grid.iter().zip(f_star.iter()).enumerate() {
            let value = s * f;
            if value > best_value {
                best_value = value;
                best = i;
            }
        }

        let threshold = grid[best];
        debug!(
            threshold,
            max,
            grid_index = best,
            samples = history.len(),
            "Threshold optimised"
        );

        if threshold <= 0.0 {
            return Err(PairError::degenerate(
                "smoothed survival function peaks at zero; no threshold",
            ));
        }
        Ok(threshold)
    }
}

/// `n` evenly spaced points from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Fraction of `history` strictly above each grid point
pub fn survival(history: &[f64], grid: &[f64]) -> Vec<f64> {
    let len = history.len() as f64;
    grid.iter()
        .map(|&s| history.iter().filter(|&&h| h > s).count() as f64 / len)
        .collect()
}

/// Solve `(I + λ DᵀD) f = f̄` with `D` the first-difference operator.
pub fn smooth(f_bar: &[f64], lambda: f64) -> Result<Vec<f64>, PairError> {
    let n = f_bar.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    // DᵀD is tridiagonal: diagonal (1, 2, ..., 2, 1), off-diagonals -1
    let system = DMatrix::from_fn(n, n, |i, j| {
        let dtd = if i == j {
            if n == 1 {
                0.0
            } else if i == 0 || i == n - 1 {
                1.0
            } else {
                2.0
            }
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        };
        let identity = if i == j { 1.0 } else { 0.0 };
        identity + lambda * dtd
    });

    let cholesky = system
        .cholesky()
        .ok_or_else(|| PairError::degenerate("smoothing system is not positive definite"))?;
    let solution = cholesky.solve(&DVector::from_column_slice(f_bar));
    Ok(solution.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic symmetric oscillation around zero
    fn oscillation(len: usize) -> Vec<f64> {
        (0..len).map(|i| (i as f64 * 0.37).sin() * 0.05).collect()
    }

    #[test]
    fn test_threshold_within_bounds() {
        let history = oscillation(484);
        let max = history.iter().copied().fold(f64::MIN, f64::max);
        let threshold = ThresholdOptimizer::default().optimize(&history).unwrap();
        assert!(threshold > 0.0);
        assert!(threshold <= max);
    }

    #[test]
    fn test_threshold_is_a_grid_point() {
        let history = oscillation(300);
        let max = history.iter().copied().fold(f64::MIN, f64::max);
        let grid = linspace(0.0, max, 50);
        let threshold = ThresholdOptimizer::default().optimize(&history).unwrap();
        assert!(grid.iter().any(|g| *g == threshold));
    }

    #[test]
    fn test_empty_history_fails() {
        assert!(matches!(
            ThresholdOptimizer::default().optimize(&[]),
            Err(PairError::NumericalDegeneracy(_))
        ));
    }

    #[test]
    fn test_non_positive_history_fails() {
        let history = vec![-0.3, -0.1, 0.0, -0.2];
        assert!(ThresholdOptimizer::default().optimize(&history).is_err());
    }

    #[test]
    fn test_constant_zero_history_fails() {
        let history = vec![0.0; 484];
        assert!(matches!(
            ThresholdOptimizer::default().optimize(&history),
            Err(PairError::NumericalDegeneracy(_))
        ));
    }

    #[test]
    fn test_nan_history_fails() {
        let history = vec![0.1, f64::NAN, 0.2];
        assert!(ThresholdOptimizer::default().optimize(&history).is_err());
    }

    #[test]
    fn test_zero_lambda_returns_raw_survival() {
        let f_bar = vec![1.0, 0.6, 0.3, 0.1, 0.0];
        let f_star = smooth(&f_bar, 0.0).unwrap();
        for (a, b) in f_bar.iter().zip(f_star.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_smoothing_preserves_mass_and_sign() {
        // Row sums of DᵀD are zero, so the total is unchanged
        let f_bar = vec![1.0, 0.9, 0.2, 0.15, 0.0, 0.0];
        let f_star = smooth(&f_bar, 3.0).unwrap();
        let before: f64 = f_bar.iter().sum();
        let after: f64 = f_star.iter().sum();
        assert!((before - after).abs() < 1e-10);
        assert!(f_star.iter().all(|v| *v >= -1e-12));
    }

    #[test]
    fn test_survival_is_strictly_greater() {
        let history = vec![0.0, 0.1, 0.2, 0.3];
        let f = survival(&history, &[0.0, 0.1, 0.3]);
        assert_eq!(f, vec![0.75, 0.5, 0.0]);
    }

    #[test]
    fn test_linspace_endpoints() {
        let grid = linspace(0.0, 2.0, 5);
        assert_eq!(grid, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
    }

    #[test]
    fn test_single_spike_history() {
        let mut history = vec![-0.1; 99];
        history.push(0.5);
        let threshold = ThresholdOptimizer::default().optimize(&history).unwrap();
        assert!(threshold > 0.0 && threshold <= 0.5);
    }
}
