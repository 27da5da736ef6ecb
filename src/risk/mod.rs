//! Scenario-based portfolio risk.
//!
//! The portfolio is a ladder of zero-coupon exposures priced by continuous
//! discounting; each scenario curve is priced against the baseline to form a
//! P&L distribution, from which VaR and Expected Shortfall are read at a
//! given confidence level.

use serde::{Deserialize, Serialize};

use crate::domain::{Curve, Portfolio};
use crate::error::AppError;
use crate::math::quantile;
use crate::scenarios::ScenarioSet;

/// Tail-risk summary at one confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub confidence: f64,
    pub var: f64,
    pub es: f64,
}

/// Zero-coupon bond price per unit notional, continuous compounding.
pub fn zcb_price(yield_decimal: f64, maturity_years: f64) -> f64 {
    (-yield_decimal * maturity_years).exp()
}

/// Portfolio value on a curve.
///
/// Each exposure discounts at the yield of the curve maturity nearest to its
/// own (ties keep the shorter maturity), but over its own maturity horizon.
pub fn portfolio_value(curve: &Curve, portfolio: &Portfolio) -> Result<f64, AppError> {
    let mut value = 0.0;
    for &(maturity, notional) in &portfolio.exposures {
        let y = curve.nearest_yield(maturity).ok_or_else(|| {
            AppError::insufficient("cannot price a portfolio on an empty curve")
        })?;
        value += notional * zcb_price(y, maturity);
    }
    Ok(value)
}

/// P&L of each scenario versus the baseline, preserving scenario order.
pub fn scenario_pnl(
    baseline: &Curve,
    scenarios: &ScenarioSet,
    portfolio: &Portfolio,
) -> Result<Vec<f64>, AppError> {
    let baseline_value = portfolio_value(baseline, portfolio)?;
    let mut pnl = Vec::with_capacity(scenarios.n_scenarios());
    for idx in 0..scenarios.n_scenarios() {
        let curve = scenarios
            .scenario_curve(idx)
            .ok_or_else(|| AppError::insufficient("scenario set has no curves"))?;
        pnl.push(portfolio_value(&curve, portfolio)? - baseline_value);
    }
    Ok(pnl)
}

/// Value-at-Risk and Expected Shortfall from a P&L distribution.
///
/// VaR is the negated `(1 - confidence)`-quantile (linear interpolation
/// between order statistics); ES is the negated mean of the P&L values at or
/// below that quantile, falling back to VaR when the tail set is empty.
pub fn var_es(pnl: &[f64], confidence: f64) -> Result<RiskSummary, AppError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(AppError::input(format!(
            "confidence must lie strictly between 0 and 1, got {confidence}"
        )));
    }
    let alpha = 1.0 - confidence;
    let q = quantile(pnl, alpha)
        .ok_or_else(|| AppError::insufficient("cannot compute risk from an empty P&L series"))?;

    let var = -q;
    let tail: Vec<f64> = pnl.iter().copied().filter(|&v| v <= q).collect();
    let es = if tail.is_empty() {
        var
    } else {
        -(tail.iter().sum::<f64>() / tail.len() as f64)
    };

    Ok(RiskSummary {
        confidence,
        var,
        es,
    })
}
