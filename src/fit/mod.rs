//! Per-date Nelson-Siegel curve fitting.

mod curve;

pub use curve::{fit_day, fit_over_dates, fitted_curve, nelson_siegel_yield};
