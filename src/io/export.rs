//! CSV export of the analytics tables.
//!
//! Plain `writeln!`-based writers: the outputs are small and meant to be
//! easy to consume from spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{FactorLoadings, FactorScores, ParamsTable};
use crate::error::AppError;
use crate::risk::RiskSummary;
use crate::scenarios::ScenarioSet;

fn create(path: &Path) -> Result<File, AppError> {
    File::create(path)
        .map_err(|e| AppError::io(format!("failed to create '{}': {e}", path.display())))
}

fn write_line(file: &mut File, path: &Path, line: &str) -> Result<(), AppError> {
    writeln!(file, "{line}")
        .map_err(|e| AppError::io(format!("failed to write '{}': {e}", path.display())))
}

fn join_numeric(values: impl IntoIterator<Item = f64>) -> String {
    values
        .into_iter()
        .map(|v| format!("{v:.10}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Per-date Nelson-Siegel parameter table.
pub fn write_params_csv(path: &Path, table: &ParamsTable) -> Result<(), AppError> {
    let mut file = create(path)?;
    write_line(&mut file, path, "date,beta0,beta1,beta2,tau,sse,success")?;
    for (date, p) in table.dates.iter().zip(table.params.iter()) {
        write_line(
            &mut file,
            path,
            &format!(
                "{date},{:.10},{:.10},{:.10},{:.10},{:.12e},{}",
                p.beta0, p.beta1, p.beta2, p.tau, p.sse, p.success
            ),
        )?;
    }
    Ok(())
}

/// Factor loadings: one row per component, one column per maturity.
pub fn write_loadings_csv(path: &Path, loadings: &FactorLoadings) -> Result<(), AppError> {
    let mut file = create(path)?;
    let header = std::iter::once("component".to_string())
        .chain(loadings.maturities.iter().map(|m| m.to_string()))
        .collect::<Vec<_>>()
        .join(",");
    write_line(&mut file, path, &header)?;
    for (name, weights) in loadings.components.iter().zip(loadings.weights.iter()) {
        write_line(
            &mut file,
            path,
            &format!("{name},{}", join_numeric(weights.iter().copied())),
        )?;
    }
    Ok(())
}

/// Factor scores: one row per surviving change date.
pub fn write_scores_csv(path: &Path, scores: &FactorScores) -> Result<(), AppError> {
    let mut file = create(path)?;
    let header = std::iter::once("date".to_string())
        .chain(scores.components.iter().cloned())
        .collect::<Vec<_>>()
        .join(",");
    write_line(&mut file, path, &header)?;
    for (date, row) in scores.dates.iter().zip(scores.values.iter()) {
        write_line(
            &mut file,
            path,
            &format!("{date},{}", join_numeric(row.iter().copied())),
        )?;
    }
    Ok(())
}

/// Explained-variance fraction per component.
pub fn write_explained_csv(
    path: &Path,
    components: &[String],
    ratios: &[f64],
) -> Result<(), AppError> {
    let mut file = create(path)?;
    write_line(&mut file, path, "component,explained_variance_ratio")?;
    for (name, ratio) in components.iter().zip(ratios.iter()) {
        write_line(&mut file, path, &format!("{name},{ratio:.10}"))?;
    }
    Ok(())
}

/// Scenario curves: one row per scenario, one column per maturity.
pub fn write_scenario_curves_csv(path: &Path, set: &ScenarioSet) -> Result<(), AppError> {
    let mut file = create(path)?;
    let header = std::iter::once("scenario_id".to_string())
        .chain(set.maturities.iter().map(|m| m.to_string()))
        .collect::<Vec<_>>()
        .join(",");
    write_line(&mut file, path, &header)?;
    for (id, curve) in set.curves.iter().enumerate() {
        write_line(
            &mut file,
            path,
            &format!("{id},{}", join_numeric(curve.iter().copied())),
        )?;
    }
    Ok(())
}

/// Sampled factor shocks: one row per scenario, one column per component.
pub fn write_shocks_csv(path: &Path, set: &ScenarioSet) -> Result<(), AppError> {
    let mut file = create(path)?;
    let header = std::iter::once("scenario_id".to_string())
        .chain(set.components.iter().cloned())
        .collect::<Vec<_>>()
        .join(",");
    write_line(&mut file, path, &header)?;
    for (id, shock) in set.shocks.iter().enumerate() {
        write_line(
            &mut file,
            path,
            &format!("{id},{}", join_numeric(shock.iter().copied())),
        )?;
    }
    Ok(())
}

/// Per-scenario summary metrics.
pub fn write_summary_csv(path: &Path, set: &ScenarioSet) -> Result<(), AppError> {
    let mut file = create(path)?;
    write_line(
        &mut file,
        path,
        "scenario_id,method,y10_change_bp,s2s10_change_bp",
    )?;
    for (id, s) in set.summary.iter().enumerate() {
        write_line(
            &mut file,
            path,
            &format!(
                "{id},{},{:.6},{:.6}",
                set.method, s.y10_change_bp, s.s2s10_change_bp
            ),
        )?;
    }
    Ok(())
}

/// Two-row risk-metric table.
pub fn write_risk_csv(path: &Path, risk: &RiskSummary) -> Result<(), AppError> {
    let mut file = create(path)?;
    let pct = (risk.confidence * 100.0).round() as i64;
    write_line(&mut file, path, "metric,value")?;
    write_line(&mut file, path, &format!("VaR_{pct},{:.6}", risk.var))?;
    write_line(&mut file, path, &format!("ES_{pct},{:.6}", risk.es))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NelsonSiegelParams;
    use chrono::NaiveDate;

    #[test]
    fn params_csv_round_trips_through_text() {
        let table = ParamsTable {
            dates: vec![NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()],
            params: vec![NelsonSiegelParams {
                beta0: 0.035,
                beta1: -0.015,
                beta2: 0.008,
                tau: 1.8,
                sse: 2.5e-9,
                success: true,
            }],
        };

        let path = std::env::temp_dir().join("yc_params_test.csv");
        write_params_csv(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,beta0,beta1,beta2,tau,sse,success"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("2025-01-02,"));
        assert!(row.ends_with(",true"));
    }

    #[test]
    fn risk_csv_has_two_metric_rows() {
        let risk = RiskSummary {
            confidence: 0.95,
            var: 1234.5,
            es: 1500.25,
        };
        let path = std::env::temp_dir().join("yc_risk_test.csv");
        write_risk_csv(&path, &risk).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(text.contains("VaR_95,1234.500000"));
        assert!(text.contains("ES_95,1500.250000"));
    }
}
