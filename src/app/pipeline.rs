//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! fetch -> tidy observations -> wide matrix -> fit / factors -> scenarios -> risk.
//!
//! Each stage has a variant that takes pre-built inputs, so everything after
//! the network fetch is testable offline.

use chrono::NaiveDate;

use crate::data::TreasuryClient;
use crate::domain::{Curve, CurveMatrix, Portfolio, TenorConfig, YieldObservation};
use crate::error::AppError;
use crate::factors::{fit_factors, FactorDecomposition};
use crate::io::ingest::{history_to_observations, observations_to_matrix};
use crate::risk::{scenario_pnl, var_es, RiskSummary};
use crate::scenarios::{generate_scenarios, SamplingMethod, ScenarioSet};

/// History-fetch options resolved from CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct HistoryOptions {
    pub days: usize,
    pub end: NaiveDate,
}

/// Fetched history in both tidy and wide form.
#[derive(Debug, Clone)]
pub struct HistoryData {
    pub observations: Vec<YieldObservation>,
    pub wide: CurveMatrix,
}

/// Fetch a yield history and pivot it into the wide matrix.
pub fn load_history(
    client: &TreasuryClient,
    options: &HistoryOptions,
    config: &TenorConfig,
) -> Result<HistoryData, AppError> {
    let rows = client.fetch_history(options.days, options.end)?;
    let observations = history_to_observations(&rows, config)?;
    let wide = observations_to_matrix(&observations)?;
    Ok(HistoryData { observations, wide })
}

/// All computed outputs of a scenario-generation run.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub factors: FactorDecomposition,
    pub baseline_date: NaiveDate,
    pub baseline: Curve,
    pub scenarios: ScenarioSet,
}

/// Factor decomposition plus scenario generation around the latest curve.
pub fn run_scenarios(
    wide: &CurveMatrix,
    n_components: usize,
    method: SamplingMethod,
    n_scenarios: usize,
    seed: u64,
) -> Result<ScenarioRun, AppError> {
    let factors = fit_factors(wide, n_components)?;
    let (baseline_date, baseline) = wide
        .latest_curve()
        .ok_or_else(|| AppError::insufficient("history has no usable latest curve"))?;
    let scenarios = generate_scenarios(
        &baseline,
        &factors.loadings,
        &factors.scores,
        method,
        n_scenarios,
        seed,
    )?;
    Ok(ScenarioRun {
        factors,
        baseline_date,
        baseline,
        scenarios,
    })
}

/// Scenario run plus portfolio pricing and tail-risk metrics.
#[derive(Debug, Clone)]
pub struct RiskRun {
    pub scenario_run: ScenarioRun,
    pub pnl: Vec<f64>,
    pub risk: RiskSummary,
}

pub fn run_risk(
    wide: &CurveMatrix,
    n_components: usize,
    method: SamplingMethod,
    n_scenarios: usize,
    seed: u64,
    portfolio: &Portfolio,
    confidence: f64,
) -> Result<RiskRun, AppError> {
    let scenario_run = run_scenarios(wide, n_components, method, n_scenarios, seed)?;
    let pnl = scenario_pnl(&scenario_run.baseline, &scenario_run.scenarios, portfolio)?;
    let risk = var_es(&pnl, confidence)?;
    Ok(RiskRun {
        scenario_run,
        pnl,
        risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{fit_over_dates, nelson_siegel_yield};

    /// Synthetic wide history: a slowly drifting Nelson-Siegel curve.
    fn synthetic_history(n_days: usize) -> CurveMatrix {
        let maturities = vec![0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 20.0, 30.0];
        let mut dates = Vec::new();
        let mut cells = Vec::new();
        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        for i in 0..n_days {
            let wiggle = (i as f64 * 0.7).sin() * 0.0008;
            let slope = -0.012 + (i as f64 * 1.3).cos() * 0.0005;
            let row: Vec<Option<f64>> =
                nelson_siegel_yield(&maturities, 0.034 + wiggle, slope, 0.009, 1.7)
                    .into_iter()
                    .map(Some)
                    .collect();
            dates.push(start + chrono::Days::new(i as u64));
            cells.push(row);
        }
        CurveMatrix::new(dates, maturities, cells).unwrap()
    }

    #[test]
    fn end_to_end_risk_run_is_reproducible() {
        let wide = synthetic_history(40);
        let portfolio = Portfolio::demo_ladder();

        let a = run_risk(
            &wide,
            3,
            SamplingMethod::Historical,
            200,
            42,
            &portfolio,
            0.95,
        )
        .unwrap();
        let b = run_risk(
            &wide,
            3,
            SamplingMethod::Historical,
            200,
            42,
            &portfolio,
            0.95,
        )
        .unwrap();

        assert_eq!(a.pnl, b.pnl);
        assert_eq!(a.risk, b.risk);
        assert_eq!(a.scenario_run.scenarios, b.scenario_run.scenarios);
        assert!(a.risk.es >= a.risk.var - 1e-9);
    }

    #[test]
    fn parametric_run_produces_requested_scenario_count() {
        let wide = synthetic_history(30);
        let run = run_scenarios(&wide, 2, SamplingMethod::Parametric, 64, 7).unwrap();
        assert_eq!(run.scenarios.n_scenarios(), 64);
        assert_eq!(run.baseline.len(), wide.n_maturities());
        assert_eq!(run.factors.loadings.n_components(), 2);
    }

    #[test]
    fn batch_fit_runs_on_the_same_history() {
        let wide = synthetic_history(10);
        let table = fit_over_dates(&wide).unwrap();
        assert_eq!(table.len(), 10);
        assert!(table.params.iter().all(|p| p.tau > 0.0));
    }
}
