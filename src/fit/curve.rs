//! Nelson-Siegel curve fitting.
//!
//! Three operations, layered:
//!
//! - evaluate a parameterized curve on an arbitrary maturity grid (pure,
//!   valid for interpolation and extrapolation)
//! - fit one day's observed `(maturity, yield)` pairs with a bounded
//!   simplex search over `(β0, β1, β2, τ)`
//! - fit every date of a wide matrix independently, skipping dates that
//!   cannot be fitted

use rayon::prelude::*;
use tracing::warn;

use crate::domain::{CurveMatrix, NelsonSiegelParams, ParamsTable};
use crate::error::AppError;
use crate::math::{curvature, level_slope, mean, minimize_bounded, SimplexOptions};

/// Minimum observation count for a stable 4-parameter fit.
const MIN_POINTS: usize = 4;

/// Box bounds: β0, β1, β2 in [-10%, 20%] decimal, τ in [0.05, 10] years.
const LOWER: [f64; 4] = [-0.10, -0.10, -0.10, 0.05];
const UPPER: [f64; 4] = [0.20, 0.20, 0.20, 10.0];

/// Evaluate the Nelson-Siegel curve at each maturity (decimal yields).
pub fn nelson_siegel_yield(
    maturities: &[f64],
    beta0: f64,
    beta1: f64,
    beta2: f64,
    tau: f64,
) -> Vec<f64> {
    maturities
        .iter()
        .map(|&t| beta0 + beta1 * level_slope(t, tau) + beta2 * curvature(t, tau))
        .collect()
}

/// Evaluate a fitted parameter row on an arbitrary maturity grid.
pub fn fitted_curve(params: &NelsonSiegelParams, maturities: &[f64]) -> Vec<f64> {
    nelson_siegel_yield(maturities, params.beta0, params.beta1, params.beta2, params.tau)
}

/// Fit Nelson-Siegel parameters to one day's observed curve.
///
/// Non-finite pairs are dropped before fitting; at least four must remain.
/// Non-convergence is reported via `success = false`, not as an error.
pub fn fit_day(maturities: &[f64], yields: &[f64]) -> Result<NelsonSiegelParams, AppError> {
    if maturities.len() != yields.len() {
        return Err(AppError::input(format!(
            "day fit has {} maturities but {} yields",
            maturities.len(),
            yields.len()
        )));
    }

    let mut t = Vec::with_capacity(maturities.len());
    let mut y = Vec::with_capacity(yields.len());
    for (&ti, &yi) in maturities.iter().zip(yields.iter()) {
        if ti.is_finite() && yi.is_finite() {
            t.push(ti);
            y.push(yi);
        }
    }

    if t.len() < MIN_POINTS {
        return Err(AppError::insufficient(format!(
            "at least {MIN_POINTS} observed maturities are required for a stable fit, got {}",
            t.len()
        )));
    }

    let initial = [mean(&y), -0.01, 0.01, 1.5];
    let objective = |p: &[f64]| -> f64 {
        let mut sse = 0.0;
        for (&ti, &yi) in t.iter().zip(y.iter()) {
            let fitted = p[0] + p[1] * level_slope(ti, p[3]) + p[2] * curvature(ti, p[3]);
            let r = yi - fitted;
            sse += r * r;
        }
        sse
    };

    let fit = minimize_bounded(objective, &initial, &LOWER, &UPPER, &SimplexOptions::default())?;

    Ok(NelsonSiegelParams {
        beta0: fit.x[0],
        beta1: fit.x[1],
        beta2: fit.x[2],
        tau: fit.x[3],
        sse: fit.objective,
        success: fit.converged,
    })
}

/// Fit every date row of a wide matrix independently.
///
/// Rows are fitted in parallel; a date that cannot be fitted is logged and
/// skipped without affecting its siblings, and the output preserves input
/// date order. Fails only when no date at all could be fitted.
pub fn fit_over_dates(wide: &CurveMatrix) -> Result<ParamsTable, AppError> {
    let fits: Vec<Option<NelsonSiegelParams>> = wide
        .cells
        .par_iter()
        .enumerate()
        .map(|(row, cells)| {
            let mut t = Vec::new();
            let mut y = Vec::new();
            for (&m, cell) in wide.maturities.iter().zip(cells.iter()) {
                if let Some(v) = cell {
                    t.push(m);
                    y.push(*v);
                }
            }
            match fit_day(&t, &y) {
                Ok(params) => Some(params),
                Err(err) => {
                    warn!(date = %wide.dates[row], %err, "skipping Nelson-Siegel fit");
                    None
                }
            }
        })
        .collect();

    let mut dates = Vec::new();
    let mut params = Vec::new();
    for (row, fit) in fits.into_iter().enumerate() {
        if let Some(p) = fit {
            dates.push(wide.dates[row]);
            params.push(p);
        }
    }

    if params.is_empty() {
        return Err(AppError::insufficient("no Nelson-Siegel fits succeeded"));
    }

    Ok(ParamsTable { dates, params })
}
