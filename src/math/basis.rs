//! Stable basis functions for the Nelson-Siegel curve.
//!
//! The curve is `y(t) = β0 + β1·g1(t, τ) + β2·g2(t, τ)` with:
//!
//! - `g1(t, τ) = (1 - exp(-x)) / x`, `x = t/τ`  (level/slope)
//! - `g2(t, τ) = g1(t, τ) - exp(-x)`            (curvature)
//!
//! Numerical notes:
//! - `x` is floored at a small positive epsilon so `t → 0` never divides by
//!   zero; the analytic limits are `g1 → 1` and `g2 → 0`.
//! - For small `x`, `1 - exp(-x)` cancels catastrophically; we use an
//!   `expm1`-based form with a series fallback.

/// Floor applied to `t/τ` before evaluating the basis.
const X_EPS: f64 = 1e-8;

/// Threshold below which the small-x series approximation is used.
const SMALL_X: f64 = 1e-6;

/// Level/slope basis `g1(t, τ)`.
pub fn level_slope(t: f64, tau: f64) -> f64 {
    let x = (t / tau).max(X_EPS);

    if x < SMALL_X {
        // Series: (1 - e^{-x}) / x ≈ 1 - x/2 + x^2/6
        return 1.0 - x / 2.0 + (x * x) / 6.0;
    }

    -(-x).exp_m1() / x
}

/// Curvature basis `g2(t, τ)`.
pub fn curvature(t: f64, tau: f64) -> f64 {
    let x = (t / tau).max(X_EPS);

    if x < SMALL_X {
        // g1(x) ≈ 1 - x/2 + x^2/6 and exp(-x) ≈ 1 - x + x^2/2, so
        // g2 ≈ x/2 - x^2/3
        return x / 2.0 - (x * x) / 3.0;
    }

    level_slope(t, tau) - (-x).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_near_zero_tenor() {
        let g1 = level_slope(0.0, 1.5);
        let g2 = curvature(0.0, 1.5);
        assert!((g1 - 1.0).abs() < 1e-6, "g1 near 0 should be ~1, got {g1}");
        assert!(g2.abs() < 1e-6, "g2 near 0 should be ~0, got {g2}");
    }

    #[test]
    fn finite_over_positive_grid() {
        for &tau in &[0.05, 1.5, 10.0] {
            for &t in &[1.0 / 12.0, 0.5, 2.0, 10.0, 30.0] {
                assert!(level_slope(t, tau).is_finite());
                assert!(curvature(t, tau).is_finite());
            }
        }
    }

    #[test]
    fn series_branch_matches_direct_formula() {
        // Just above the series threshold both branches should agree closely.
        let t = 2e-6;
        let tau = 1.0;
        let x: f64 = t / tau;
        let direct = (1.0 - (-x).exp()) / x;
        assert!((level_slope(t, tau) - direct).abs() < 1e-9);
    }
}
