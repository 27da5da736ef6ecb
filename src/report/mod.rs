//! Terminal-formatted summaries.
//!
//! Formatting lives in one place so the math modules stay clean and output
//! changes are localized.

use crate::domain::{NelsonSiegelParams, ParamsTable, YieldObservation};
use crate::factors::FactorDecomposition;
use crate::fit::fitted_curve;
use crate::math::mean;
use crate::risk::RiskSummary;
use crate::scenarios::ScenarioSet;

/// Observed-versus-fitted table for one day's curve.
pub fn format_curve_fit(observations: &[YieldObservation], params: &NelsonSiegelParams) -> String {
    let maturities: Vec<f64> = observations.iter().map(|o| o.maturity_years).collect();
    let fitted = fitted_curve(params, &maturities);

    let mut out = String::new();
    if let Some(obs) = observations.first() {
        out.push_str(&format!("=== yc - curve fit for {} ===\n", obs.date));
    }
    out.push_str(&format!(
        "beta0={:.6} beta1={:.6} beta2={:.6} tau={:.4} sse={:.3e} success={}\n\n",
        params.beta0, params.beta1, params.beta2, params.tau, params.sse, params.success
    ));
    out.push_str("tenor_years  observed%  fitted%\n");
    for (obs, fit) in observations.iter().zip(fitted.iter()) {
        out.push_str(&format!(
            "{:>11.4}  {:>8.3}  {:>7.3}\n",
            obs.maturity_years,
            obs.yield_decimal * 100.0,
            fit * 100.0
        ));
    }
    out
}

/// Summary of a batch curve fit.
pub fn format_fit_summary(table: &ParamsTable, dates_in_input: usize) -> String {
    let mut out = String::new();

    out.push_str("=== yc - Nelson-Siegel batch fit ===\n");
    out.push_str(&format!(
        "Dates: fitted={} | skipped={}\n",
        table.len(),
        dates_in_input.saturating_sub(table.len())
    ));
    out.push_str(&format!(
        "Converged: {:.1}%\n",
        table.converged_share() * 100.0
    ));

    if let (Some(date), Some(p)) = (table.dates.last(), table.params.last()) {
        out.push_str(&format!("\nLatest fit ({date}):\n"));
        out.push_str(&format!(
            "- beta0={:.6} beta1={:.6} beta2={:.6} tau={:.4}\n",
            p.beta0, p.beta1, p.beta2, p.tau
        ));
        out.push_str(&format!("- sse={:.3e} success={}\n", p.sse, p.success));
    }

    out
}

/// Summary of the factor decomposition.
pub fn format_factor_summary(decomposition: &FactorDecomposition) -> String {
    let mut out = String::new();

    out.push_str("=== yc - PCA factors of daily curve changes ===\n");
    out.push_str(&format!(
        "Change rows: {} | maturities: {}\n\n",
        decomposition.changes.n_rows(),
        decomposition.changes.maturities.len()
    ));

    out.push_str("Explained variance:\n");
    let mut cumulative = 0.0;
    for (name, ratio) in decomposition
        .loadings
        .components
        .iter()
        .zip(decomposition.explained_variance_ratio.iter())
    {
        cumulative += ratio;
        out.push_str(&format!(
            "- {name}: {:>6.2}% (cumulative {:>6.2}%)\n",
            ratio * 100.0,
            cumulative * 100.0
        ));
    }

    out
}

/// Summary of a generated scenario set.
pub fn format_scenario_summary(set: &ScenarioSet) -> String {
    let y10: Vec<f64> = set.summary.iter().map(|s| s.y10_change_bp).collect();
    let s2s10: Vec<f64> = set.summary.iter().map(|s| s.s2s10_change_bp).collect();

    let spread = |v: &[f64]| {
        let lo = v.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lo, hi)
    };
    let (y10_lo, y10_hi) = spread(&y10);
    let (s_lo, s_hi) = spread(&s2s10);

    let mut out = String::new();
    out.push_str(&format!(
        "=== yc - {} scenarios ({}) ===\n",
        set.n_scenarios(),
        set.method
    ));
    out.push_str(&format!(
        "10y change bp: mean={:+.2} range=[{y10_lo:+.2}, {y10_hi:+.2}]\n",
        mean(&y10)
    ));
    out.push_str(&format!(
        "2s10s change bp: mean={:+.2} range=[{s_lo:+.2}, {s_hi:+.2}]\n",
        mean(&s2s10)
    ));
    out
}

/// Two-line risk metric table.
pub fn format_risk_summary(risk: &RiskSummary) -> String {
    let pct = (risk.confidence * 100.0).round() as i64;
    let mut out = String::new();
    out.push_str("metric      value\n");
    out.push_str(&format!("VaR_{pct}  {:>14.2}\n", risk.var));
    out.push_str(&format!("ES_{pct}   {:>14.2}\n", risk.es));
    out
}
