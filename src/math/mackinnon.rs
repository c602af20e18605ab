//! Approximate p-values for residual-based cointegration tests.
//!
//! MacKinnon (1994) response surfaces for the Dickey-Fuller t-statistic
//! computed on Engle-Granger residuals with two I(1) variables. Each surface
//! has two pieces that meet at `τ*`:
//!
//! ```text
//! τ ≤ τ*   p = Φ(c0 + c1·τ + c2·1e-2·τ²)
//! τ > τ*   p = Φ(d0 + d1·1e-1·τ + d2·1e-1·τ² + d3·1e-2·τ³)
//! ```
//!
//! Below `τ_min` the p-value is 0, above `τ_max` it is 1.
//!
//! # References
//!
//! - MacKinnon, J.G. (1994). "Approximate Asymptotic Distribution Functions for
//!   Unit-Root and Cointegration Tests"

use crate::cointegration::Trend;
use statrs::function::erf::erfc;

const SMALL_P_SCALING: [f64; 3] = [1.0, 1.0, 1e-2];
const LARGE_P_SCALING: [f64; 4] = [1.0, 1e-1, 1e-1, 1e-2];

/// Response-surface coefficients for one set of deterministic terms.
struct Surface {
    tau_min: f64,
    tau_star: f64,
    tau_max: f64,
    small_p: [f64; 3],
    large_p: [f64; 4],
}

const SURFACE_N: Surface = Surface {
    tau_min: -19.62,
    tau_star: -1.53,
    tau_max: 1.51,
    small_p: [1.9129, 1.3857, 3.5322],
    large_p: [1.5578, 8.558, -2.083, -3.3549],
};

const SURFACE_C: Surface = Surface {
    tau_min: -18.86,
    tau_star: -2.62,
    tau_max: 0.92,
    small_p: [2.92, 1.5012, 3.9796],
    large_p: [2.1945, 6.4695, -2.9198, -4.2377],
};

// Large-p piece fitted to 40,000 simulated statistics (T = 1000), pinned to
// the small-p piece at τ*.
const SURFACE_CT: Surface = Surface {
    tau_min: -21.15,
    tau_star: -3.19,
    tau_max: 0.63,
    small_p: [3.6646, 1.5419, 3.6448],
    large_p: [2.9683, 7.6341, -2.3627, -3.0441],
};

fn surface(trend: Trend) -> &'static Surface {
    match trend {
        Trend::None => &SURFACE_N,
        Trend::Constant => &SURFACE_C,
        Trend::ConstantTrend => &SURFACE_CT,
    }
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// `Σ cᵢ·scaleᵢ·τⁱ`
fn polyval(coefficients: &[f64], scaling: &[f64], tau: f64) -> f64 {
    coefficients
        .iter()
        .zip(scaling)
        .rev()
        .fold(0.0, |acc, (c, s)| acc * tau + c * s)
}

/// Approximate p-value of an Engle-Granger statistic for a two-variable system.
///
/// NaN statistics map to a p-value of 1 (no evidence of cointegration).
pub fn mackinnon_p_value(statistic: f64, trend: Trend) -> f64 {
    if statistic.is_nan() {
        return 1.0;
    }
    let s = surface(trend);
    if statistic > s.tau_max {
        return 1.0;
    }
    if statistic < s.tau_min {
        return 0.0;
    }
    let z = if statistic <= s.tau_star {
        polyval(&s.small_p, &SMALL_P_SCALING, statistic)
    } else {
        polyval(&s.large_p, &LARGE_P_SCALING, statistic)
    };
    normal_cdf(z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((normal_cdf(1.959964) - 0.975).abs() < 1e-5);
        assert!((normal_cdf(-1.644854) - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_critical_values_map_to_nominal_levels() {
        // Engle-Granger critical values for two variables with constant + trend
        let p5 = mackinnon_p_value(-3.78, Trend::ConstantTrend);
        let p10 = mackinnon_p_value(-3.50, Trend::ConstantTrend);
        assert!((p5 - 0.05).abs() < 0.01, "p at 5% cv = {}", p5);
        assert!((p10 - 0.10).abs() < 0.015, "p at 10% cv = {}", p10);
    }

    #[test]
    fn test_large_p_region_constant_trend() {
        // Empirical CDF of 40,000 simulated statistics (T = 1000)
        let reference = [
            (-3.0, 0.2671),
            (-2.75, 0.3871),
            (-2.5, 0.5221),
            (-2.0, 0.7692),
            (-1.5, 0.9193),
            (-1.0, 0.9773),
            (0.0, 0.9987),
        ];
        for (tau, expected) in reference {
            let p = mackinnon_p_value(tau, Trend::ConstantTrend);
            assert!((p - expected).abs() < 0.01, "p({}) = {}, expected {}", tau, p, expected);
        }
    }

    #[test]
    fn test_acceptance_cut_at_default_level() {
        // p = 0.4 falls between these statistics
        assert!(mackinnon_p_value(-2.76, Trend::ConstantTrend) < 0.4);
        assert!(mackinnon_p_value(-2.70, Trend::ConstantTrend) > 0.4);
    }

    #[test]
    fn test_pieces_meet_at_tau_star() {
        for trend in [Trend::None, Trend::Constant, Trend::ConstantTrend] {
            let s = surface(trend);
            let below = mackinnon_p_value(s.tau_star, trend);
            let above = mackinnon_p_value(s.tau_star + 1e-9, trend);
            assert!((below - above).abs() < 5e-3, "{:?}: {} vs {}", trend, below, above);
        }
    }

    #[test]
    fn test_polyval_scaling() {
        // 1 + 2·0.1·τ + 3·0.1·τ² + 4·0.01·τ³ at τ = 2
        let v = polyval(&[1.0, 2.0, 3.0, 4.0], &LARGE_P_SCALING, 2.0);
        assert!((v - (1.0 + 0.4 + 1.2 + 0.32)).abs() < 1e-12);
    }

    #[test]
    fn test_monotone_in_statistic() {
        for trend in [Trend::None, Trend::Constant, Trend::ConstantTrend] {
            let mut last = 0.0;
            let mut tau = -25.0;
            while tau < 3.0 {
                let p = mackinnon_p_value(tau, trend);
                // The two pieces of the constant-only surface meet with a gap below 1e-3
                assert!(p >= last - 1e-3, "{:?} not monotone at {}", trend, tau);
                assert!((0.0..=1.0).contains(&p));
                last = p;
                tau += 0.05;
            }
        }
    }

    #[test]
    fn test_tails() {
        assert_eq!(mackinnon_p_value(-30.0, Trend::ConstantTrend), 0.0);
        assert_eq!(mackinnon_p_value(2.0, Trend::ConstantTrend), 1.0);
        assert_eq!(mackinnon_p_value(f64::NAN, Trend::Constant), 1.0);
    }
}
