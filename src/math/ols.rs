//! Ordinary least squares on a dense design matrix.
//!
//! Solved through a thin QR decomposition rather than the normal equations so
//! that a near-collinear design is detected from the diagonal of `R` instead
//! of being silently amplified by `XᵀX`.

use nalgebra::{DMatrix, DVector};

use crate::error::PairError;

/// Relative size of a diagonal entry of `R` below which the design is
/// considered rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

/// Result of an OLS regression.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Estimated coefficients, one per design column
    pub coefficients: DVector<f64>,
    /// `y - Xβ`
    pub residuals: DVector<f64>,
    /// Residual variance `SSR / (n - k)`
    pub sigma2: f64,
    /// Standard errors of the coefficients
    pub std_errors: DVector<f64>,
}

impl OlsFit {
    /// t-ratio of coefficient `i`
    pub fn t_statistic(&self, i: usize) -> Result<f64, PairError> {
        let se = self.std_errors[i];
        if !se.is_finite() || se <= 0.0 {
            return Err(PairError::degenerate(format!(
                "standard error of coefficient {} is {}",
                i, se
            )));
        }
        Ok(self.coefficients[i] / se)
    }

    /// Sum of squared residuals
    pub fn ssr(&self) -> f64 {
        self.residuals.norm_squared()
    }
}

/// Regress `target` on the columns of `design`.
///
/// # Errors
/// `NumericalDegeneracy` when there are not more rows than columns, when any
/// input is non-finite, or when the design is rank deficient.
pub fn least_squares(design: &DMatrix<f64>, target: &DVector<f64>) -> Result<OlsFit, PairError> {
    let (n, k) = design.shape();
    if k == 0 || n <= k {
        return Err(PairError::degenerate(format!(
            "least squares needs more observations ({}) than regressors ({})",
            n, k
        )));
    }
    if target.len() != n {
        return Err(PairError::degenerate(format!(
            "target length {} does not match design rows {}",
            target.len(),
            n
        )));
    }
    if design.iter().chain(target.iter()).any(|v| !v.is_finite()) {
        return Err(PairError::degenerate("non-finite value in regression input"));
    }

    let qr = design.clone().qr();
    let r = qr.r();

    let diag_max = r.diagonal().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if diag_max == 0.0
        || r
            .diagonal()
            .iter()
            .any(|v| v.abs() <= RANK_TOLERANCE * diag_max)
    {
        return Err(PairError::degenerate(
            "design matrix is rank deficient (collinear or constant regressors)",
        ));
    }

    let qty = qr.q().transpose() * target;
    let coefficients = r
        .solve_upper_triangular(&qty)
        .ok_or_else(|| PairError::degenerate("triangular solve failed"))?;

    let residuals = target - design * &coefficients;
    let sigma2 = residuals.norm_squared() / (n - k) as f64;

    // (XᵀX)⁻¹ = R⁻¹ R⁻ᵀ
    let r_inv = r
        .try_inverse()
        .ok_or_else(|| PairError::degenerate("R factor is not invertible"))?;
    let unscaled = &r_inv * r_inv.transpose();
    let std_errors = unscaled.diagonal().map(|v| (v * sigma2).sqrt());

    Ok(OlsFit {
        coefficients,
        residuals,
        sigma2,
        std_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design_with_constant(x: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { x[i] } else { 1.0 })
    }

    #[test]
    fn test_recovers_exact_line() {
        let x: Vec<f64> = (0..50).map(|i| i as f64 * 0.3).collect();
        let y = DVector::from_iterator(x.len(), x.iter().map(|v| 2.5 * v - 1.0));
        // Tiny deterministic wiggle so the residual variance is non-zero
        let y = y + DVector::from_fn(x.len(), |i, _| if i % 2 == 0 { 1e-6 } else { -1e-6 });

        let fit = least_squares(&design_with_constant(&x), &y).unwrap();
        assert!((fit.coefficients[0] - 2.5).abs() < 1e-6);
        assert!((fit.coefficients[1] + 1.0).abs() < 1e-5);
        assert!(fit.sigma2 < 1e-10);
    }

    #[test]
    fn test_constant_regressor_is_rank_deficient() {
        let x = vec![3.0; 40];
        let y = DVector::from_fn(40, |i, _| i as f64);
        let result = least_squares(&design_with_constant(&x), &y);
        assert!(matches!(result, Err(PairError::NumericalDegeneracy(_))));
    }

    #[test]
    fn test_too_few_rows() {
        let design = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 1.0]);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        assert!(least_squares(&design, &y).is_err());
    }

    #[test]
    fn test_nan_input_rejected() {
        let x = vec![1.0, 2.0, f64::NAN, 4.0, 5.0];
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(least_squares(&design_with_constant(&x), &y).is_err());
    }

    #[test]
    fn test_t_statistic_matches_ratio() {
        let x: Vec<f64> = (0..30).map(|i| (i as f64).sin()).collect();
        let y = DVector::from_fn(30, |i, _| 0.7 * x[i] + ((i * 7) % 5) as f64 * 0.01);
        let fit = least_squares(&design_with_constant(&x), &y).unwrap();
        let t = fit.t_statistic(0).unwrap();
        assert!((t - fit.coefficients[0] / fit.std_errors[0]).abs() < 1e-12);
        assert!(t > 10.0);
    }
}
