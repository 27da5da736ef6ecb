//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that
//! parses CLI arguments, runs the requested slice of the pipeline, prints a
//! report, and writes optional CSV exports.

use chrono::{Local, NaiveDate};
use clap::Parser;

use crate::cli::{Cli, Command, CurveArgs, FactorArgs, FitArgs, RiskArgs, ScenarioArgs};
use crate::data::TreasuryClient;
use crate::domain::{Portfolio, TenorConfig};
use crate::error::AppError;
use crate::io::export;
use crate::scenarios::SamplingMethod;

pub mod pipeline;

use pipeline::{load_history, HistoryData, HistoryOptions};

/// Entry point for the `yc` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Curve(args) => handle_curve(args),
        Command::Fit(args) => handle_fit(args),
        Command::Factors(args) => handle_factors(args),
        Command::Scenarios(args) => handle_scenarios(args),
        Command::Risk(args) => handle_risk(args),
    }
}

fn history_options(days: usize, end: Option<NaiveDate>) -> HistoryOptions {
    HistoryOptions {
        days,
        end: end.unwrap_or_else(|| Local::now().date_naive()),
    }
}

fn fetch(days: usize, end: Option<NaiveDate>) -> Result<HistoryData, AppError> {
    let client = TreasuryClient::new();
    let config = TenorConfig::standard();
    load_history(&client, &history_options(days, end), &config)
}

fn handle_curve(args: CurveArgs) -> Result<(), AppError> {
    let client = TreasuryClient::new();
    let config = TenorConfig::standard();
    let asof = args.asof.unwrap_or_else(|| Local::now().date_naive());

    let row = client.fetch_latest_row(asof, args.lookback)?;
    let observations = crate::io::ingest::row_to_observations(&row, &config)?;

    let maturities: Vec<f64> = observations.iter().map(|o| o.maturity_years).collect();
    let yields: Vec<f64> = observations.iter().map(|o| o.yield_decimal).collect();
    let params = crate::fit::fit_day(&maturities, &yields)?;

    println!("{}", crate::report::format_curve_fit(&observations, &params));

    if let Some(path) = &args.export {
        let table = crate::domain::ParamsTable {
            dates: vec![row.date],
            params: vec![params],
        };
        export::write_params_csv(path, &table)?;
    }
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let history = fetch(args.history.days, args.history.end)?;
    let table = crate::fit::fit_over_dates(&history.wide)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&table, history.wide.n_dates())
    );

    if let Some(path) = &args.export {
        export::write_params_csv(path, &table)?;
    }
    Ok(())
}

fn handle_factors(args: FactorArgs) -> Result<(), AppError> {
    let history = fetch(args.history.days, args.history.end)?;
    let decomposition = crate::factors::fit_factors(&history.wide, args.components)?;

    println!("{}", crate::report::format_factor_summary(&decomposition));

    if let Some(path) = &args.export_loadings {
        export::write_loadings_csv(path, &decomposition.loadings)?;
    }
    if let Some(path) = &args.export_scores {
        export::write_scores_csv(path, &decomposition.scores)?;
    }
    if let Some(path) = &args.export_explained {
        export::write_explained_csv(
            path,
            &decomposition.loadings.components,
            &decomposition.explained_variance_ratio,
        )?;
    }
    Ok(())
}

fn handle_scenarios(args: ScenarioArgs) -> Result<(), AppError> {
    let method: SamplingMethod = args.method.parse()?;
    let history = fetch(args.history.days, args.history.end)?;
    let run = pipeline::run_scenarios(
        &history.wide,
        args.components,
        method,
        args.n_scenarios,
        args.seed,
    )?;

    println!("{}", crate::report::format_factor_summary(&run.factors));
    println!("Baseline curve date: {}\n", run.baseline_date);
    println!("{}", crate::report::format_scenario_summary(&run.scenarios));

    write_scenario_exports(&args, &run.scenarios)?;
    Ok(())
}

fn handle_risk(args: RiskArgs) -> Result<(), AppError> {
    let method: SamplingMethod = args.scenario.method.parse()?;
    let history = fetch(args.scenario.history.days, args.scenario.history.end)?;
    let portfolio = Portfolio::demo_ladder();
    let run = pipeline::run_risk(
        &history.wide,
        args.scenario.components,
        method,
        args.scenario.n_scenarios,
        args.scenario.seed,
        &portfolio,
        args.confidence,
    )?;

    println!(
        "{}",
        crate::report::format_scenario_summary(&run.scenario_run.scenarios)
    );
    println!("{}", crate::report::format_risk_summary(&run.risk));

    write_scenario_exports(&args.scenario, &run.scenario_run.scenarios)?;
    if let Some(path) = &args.export {
        export::write_risk_csv(path, &run.risk)?;
    }
    Ok(())
}

fn write_scenario_exports(
    args: &ScenarioArgs,
    scenarios: &crate::scenarios::ScenarioSet,
) -> Result<(), AppError> {
    if let Some(path) = &args.export_curves {
        export::write_scenario_curves_csv(path, scenarios)?;
    }
    if let Some(path) = &args.export_shocks {
        export::write_shocks_csv(path, scenarios)?;
    }
    if let Some(path) = &args.export_summary {
        export::write_summary_csv(path, scenarios)?;
    }
    Ok(())
}
