//! Command-line parsing for the yield-curve scenario toolkit.
//!
//! Argument parsing and command dispatch stay separate from the modeling
//! code; every subcommand shares the same history-fetch options.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "yc", version, about = "Treasury yield-curve scenarios & portfolio risk")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the latest published curve and fit it for one day.
    Curve(CurveArgs),
    /// Fit per-date Nelson-Siegel parameters over the fetched history.
    Fit(FitArgs),
    /// Decompose daily curve changes into principal-component factors.
    Factors(FactorArgs),
    /// Generate factor-shock scenario curves around the latest observed curve.
    Scenarios(ScenarioArgs),
    /// Price a zero-coupon ladder across scenarios and report VaR/ES.
    Risk(RiskArgs),
}

/// History-fetch options shared by every subcommand.
#[derive(Debug, Parser, Clone)]
pub struct HistoryArgs {
    /// Business days of history to fetch.
    #[arg(long, default_value_t = 252)]
    pub days: usize,

    /// Final observation date, YYYY-MM-DD (defaults to today).
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Parser, Clone)]
pub struct CurveArgs {
    /// As-of date, YYYY-MM-DD (defaults to today).
    #[arg(long)]
    pub asof: Option<NaiveDate>,

    /// Maximum calendar days to walk back looking for a published row.
    #[arg(long, default_value_t = 14)]
    pub lookback: u32,

    /// Export the fitted parameters to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub history: HistoryArgs,

    /// Export the parameter table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct FactorArgs {
    #[command(flatten)]
    pub history: HistoryArgs,

    /// Maximum number of principal components to extract.
    #[arg(short = 'k', long, default_value_t = 3)]
    pub components: usize,

    /// Export loadings to CSV.
    #[arg(long)]
    pub export_loadings: Option<PathBuf>,

    /// Export scores to CSV.
    #[arg(long)]
    pub export_scores: Option<PathBuf>,

    /// Export explained-variance ratios to CSV.
    #[arg(long)]
    pub export_explained: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct ScenarioArgs {
    #[command(flatten)]
    pub history: HistoryArgs,

    /// Maximum number of principal components to extract.
    #[arg(short = 'k', long, default_value_t = 3)]
    pub components: usize,

    /// Sampling method: 'historical' or 'parametric'.
    #[arg(short = 'm', long, default_value = "historical")]
    pub method: String,

    /// Number of scenarios to generate.
    #[arg(short = 'n', long = "scenarios", default_value_t = 1000)]
    pub n_scenarios: usize,

    /// Random seed for the batched factor-shock draw.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Export scenario curves to CSV.
    #[arg(long)]
    pub export_curves: Option<PathBuf>,

    /// Export sampled factor shocks to CSV.
    #[arg(long)]
    pub export_shocks: Option<PathBuf>,

    /// Export per-scenario summary metrics to CSV.
    #[arg(long)]
    pub export_summary: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct RiskArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Confidence level for VaR/ES.
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,

    /// Export the risk-metric table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}
