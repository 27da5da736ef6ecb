//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the fitting / factor / scenario engines
//! - exported to CSV
//! - constructed directly in tests without any I/O

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Decimal-yield sanity bounds applied during long-format validation.
pub const YIELD_DECIMAL_MIN: f64 = -0.05;
pub const YIELD_DECIMAL_MAX: f64 = 0.25;

/// Immutable mapping from a published tenor label (e.g. `"3 Mo"`) to its
/// year fraction.
///
/// Passed explicitly into parsing/validation rather than living in global
/// state, so alternate grids can be supplied in tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenorConfig {
    entries: Vec<(String, f64)>,
}

impl TenorConfig {
    /// Build a config from `(label, years)` pairs.
    ///
    /// Year values must be finite, positive, and strictly increasing.
    pub fn new(entries: Vec<(String, f64)>) -> Result<Self, AppError> {
        if entries.is_empty() {
            return Err(AppError::input("tenor config must not be empty"));
        }
        for pair in entries.windows(2) {
            if pair[1].1 <= pair[0].1 {
                return Err(AppError::input(format!(
                    "tenor years not strictly increasing: '{}' ({}) then '{}' ({})",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                )));
            }
        }
        if entries.iter().any(|(_, y)| !y.is_finite() || *y <= 0.0) {
            return Err(AppError::input("tenor years must be finite and positive"));
        }
        Ok(Self { entries })
    }

    /// Standard US Treasury tenor grid, 1 month to 30 years.
    pub fn standard() -> Self {
        let entries = vec![
            ("1 Mo".to_string(), 1.0 / 12.0),
            ("2 Mo".to_string(), 2.0 / 12.0),
            ("3 Mo".to_string(), 3.0 / 12.0),
            ("4 Mo".to_string(), 4.0 / 12.0),
            ("6 Mo".to_string(), 6.0 / 12.0),
            ("1 Yr".to_string(), 1.0),
            ("2 Yr".to_string(), 2.0),
            ("3 Yr".to_string(), 3.0),
            ("5 Yr".to_string(), 5.0),
            ("7 Yr".to_string(), 7.0),
            ("10 Yr".to_string(), 10.0),
            ("20 Yr".to_string(), 20.0),
            ("30 Yr".to_string(), 30.0),
        ];
        Self { entries }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn pairs(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn years_for(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, y)| *y)
    }
}

/// One tidy long-format observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldObservation {
    pub date: NaiveDate,
    pub maturity_years: f64,
    /// Yield as published (percent units).
    pub yield_pct: f64,
    /// Yield in decimal units (`yield_pct / 100`).
    pub yield_decimal: f64,
}

/// A single dense curve: maturities with matching decimal yields.
///
/// Used both for the baseline (latest observed) curve and for rows of a
/// scenario set. Gaps are dropped before a `Curve` is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub maturities: Vec<f64>,
    pub yields: Vec<f64>,
}

impl Curve {
    pub fn new(maturities: Vec<f64>, yields: Vec<f64>) -> Result<Self, AppError> {
        if maturities.len() != yields.len() {
            return Err(AppError::input(format!(
                "curve has {} maturities but {} yields",
                maturities.len(),
                yields.len()
            )));
        }
        Ok(Self { maturities, yields })
    }

    pub fn len(&self) -> usize {
        self.maturities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maturities.is_empty()
    }

    /// Yield at the maturity nearest to `target` (ties keep the shorter one).
    pub fn nearest_yield(&self, target: f64) -> Option<f64> {
        crate::math::nearest_index(&self.maturities, target).map(|i| self.yields[i])
    }
}

/// Wide date x maturity matrix of decimal yields, with gaps.
///
/// Invariants enforced at construction:
/// - dates ascending and unique
/// - maturity columns strictly increasing
/// - every row has one cell per maturity column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveMatrix {
    pub dates: Vec<NaiveDate>,
    pub maturities: Vec<f64>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl CurveMatrix {
    pub fn new(
        dates: Vec<NaiveDate>,
        maturities: Vec<f64>,
        cells: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, AppError> {
        for pair in maturities.windows(2) {
            if pair[1] <= pair[0] {
                return Err(AppError::input(
                    "wide matrix maturity columns are not strictly increasing",
                ));
            }
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(AppError::input("wide matrix dates are not ascending/unique"));
            }
        }
        if cells.len() != dates.len() {
            return Err(AppError::input(format!(
                "wide matrix has {} rows but {} dates",
                cells.len(),
                dates.len()
            )));
        }
        if let Some(row) = cells.iter().find(|row| row.len() != maturities.len()) {
            return Err(AppError::input(format!(
                "wide matrix row has {} cells but {} maturity columns",
                row.len(),
                maturities.len()
            )));
        }
        Ok(Self {
            dates,
            maturities,
            cells,
        })
    }

    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn n_maturities(&self) -> usize {
        self.maturities.len()
    }

    /// Dense curve for one row, with missing cells dropped.
    pub fn row_curve(&self, row: usize) -> Option<Curve> {
        let cells = self.cells.get(row)?;
        let mut maturities = Vec::new();
        let mut yields = Vec::new();
        for (m, cell) in self.maturities.iter().zip(cells.iter()) {
            if let Some(y) = cell {
                maturities.push(*m);
                yields.push(*y);
            }
        }
        Some(Curve { maturities, yields })
    }

    /// The most recent curve row (the scenario baseline), gaps dropped.
    pub fn latest_curve(&self) -> Option<(NaiveDate, Curve)> {
        let last = self.dates.len().checked_sub(1)?;
        let curve = self.row_curve(last)?;
        if curve.is_empty() {
            return None;
        }
        Some((self.dates[last], curve))
    }
}

/// Fitted Nelson-Siegel parameters for one date.
///
/// `success = false` marks a non-converged fit; the parameter values are
/// still the best found, and whether to discard such rows is caller policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NelsonSiegelParams {
    pub beta0: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub tau: f64,
    pub sse: f64,
    pub success: bool,
}

/// Per-date parameter table produced by the batch fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsTable {
    pub dates: Vec<NaiveDate>,
    pub params: Vec<NelsonSiegelParams>,
}

impl ParamsTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Fraction of rows whose optimizer converged.
    pub fn converged_share(&self) -> f64 {
        if self.params.is_empty() {
            return 0.0;
        }
        let ok = self.params.iter().filter(|p| p.success).count();
        ok as f64 / self.params.len() as f64
    }
}

/// Factor loadings: one weight row per component, ordered by descending
/// explained variance, one column per maturity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorLoadings {
    pub components: Vec<String>,
    pub maturities: Vec<f64>,
    pub weights: Vec<Vec<f64>>,
}

impl FactorLoadings {
    pub fn n_components(&self) -> usize {
        self.components.len()
    }
}

/// Factor scores: one row per surviving change date, one column per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub dates: Vec<NaiveDate>,
    pub components: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl FactorScores {
    pub fn n_rows(&self) -> usize {
        self.values.len()
    }

    /// Column index of a named component, if present.
    pub fn component_index(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c == name)
    }
}

/// A notional ladder of zero-coupon exposures, keyed by maturity in years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub exposures: Vec<(f64, f64)>,
}

impl Portfolio {
    pub fn new(exposures: Vec<(f64, f64)>) -> Result<Self, AppError> {
        if exposures.is_empty() {
            return Err(AppError::input("portfolio has no exposures"));
        }
        if exposures
            .iter()
            .any(|(m, n)| !m.is_finite() || *m <= 0.0 || !n.is_finite())
        {
            return Err(AppError::input(
                "portfolio exposures need positive finite maturities and finite notionals",
            ));
        }
        Ok(Self { exposures })
    }

    /// The demo ladder used by the risk subcommand: 1mm notional at 2y, 5y, 10y.
    pub fn demo_ladder() -> Self {
        Self {
            exposures: vec![(2.0, 1_000_000.0), (5.0, 1_000_000.0), (10.0, 1_000_000.0)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn standard_tenors_are_strictly_increasing() {
        let config = TenorConfig::standard();
        let years: Vec<f64> = config.pairs().iter().map(|(_, y)| *y).collect();
        assert_eq!(years.len(), 13);
        assert!(years.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn tenor_config_rejects_unordered_years() {
        let result = TenorConfig::new(vec![("2 Yr".into(), 2.0), ("1 Yr".into(), 1.0)]);
        assert!(matches!(result, Err(AppError::InputValidation(_))));
    }

    #[test]
    fn matrix_rejects_non_monotonic_columns() {
        let result = CurveMatrix::new(
            vec![d("2025-01-02")],
            vec![10.0, 2.0],
            vec![vec![Some(0.04), Some(0.03)]],
        );
        assert!(matches!(result, Err(AppError::InputValidation(_))));
    }

    #[test]
    fn matrix_rejects_duplicate_dates() {
        let result = CurveMatrix::new(
            vec![d("2025-01-02"), d("2025-01-02")],
            vec![2.0],
            vec![vec![Some(0.03)], vec![Some(0.03)]],
        );
        assert!(matches!(result, Err(AppError::InputValidation(_))));
    }

    #[test]
    fn latest_curve_drops_gaps() {
        let matrix = CurveMatrix::new(
            vec![d("2025-01-02"), d("2025-01-03")],
            vec![2.0, 5.0, 10.0],
            vec![
                vec![Some(0.03), Some(0.035), Some(0.04)],
                vec![Some(0.031), None, Some(0.041)],
            ],
        )
        .unwrap();

        let (date, curve) = matrix.latest_curve().unwrap();
        assert_eq!(date, d("2025-01-03"));
        assert_eq!(curve.maturities, vec![2.0, 10.0]);
        assert_eq!(curve.yields, vec![0.031, 0.041]);
    }

    #[test]
    fn nearest_yield_prefers_shorter_on_tie() {
        let curve = Curve::new(vec![2.0, 10.0], vec![0.03, 0.04]).unwrap();
        // 6.0 is equally far from 2y and 10y; the shorter maturity wins.
        assert_eq!(curve.nearest_yield(6.0), Some(0.03));
        assert_eq!(curve.nearest_yield(9.0), Some(0.04));
    }
}
