//! Domain model shared across the data, fitting, factor, scenario, and risk
//! layers.

mod types;

pub use types::{
    Curve, CurveMatrix, FactorLoadings, FactorScores, NelsonSiegelParams, ParamsTable, Portfolio,
    TenorConfig, YieldObservation, YIELD_DECIMAL_MAX, YIELD_DECIMAL_MIN,
};
