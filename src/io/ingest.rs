//! Normalization of raw Treasury rows into tidy observations and the wide
//! date x maturity matrix.
//!
//! Design goals, in order:
//!
//! - **Row-level isolation**: one bad published row is skipped with a
//!   warning, never fatal, unless every row fails
//! - **Strict invariants on the way out**: bounds-checked yields, ascending
//!   unique dates, strictly increasing maturity columns
//! - **No hidden configuration**: the tenor-label table is passed in

use chrono::NaiveDate;
use tracing::warn;

use crate::data::RawCurveRow;
use crate::domain::{
    CurveMatrix, TenorConfig, YieldObservation, YIELD_DECIMAL_MAX, YIELD_DECIMAL_MIN,
};
use crate::error::AppError;

/// Convert one wide published row into tidy long-format observations.
///
/// Labels absent from the row (or dropped as non-numeric upstream) are
/// skipped; the output is sorted by maturity. A row with zero usable cells
/// is invalid.
pub fn row_to_observations(
    row: &RawCurveRow,
    config: &TenorConfig,
) -> Result<Vec<YieldObservation>, AppError> {
    let mut out = Vec::new();
    for (label, maturity_years) in config.pairs() {
        let Some(yield_pct) = row.value_for(label) else {
            continue;
        };
        out.push(YieldObservation {
            date: row.date,
            maturity_years: *maturity_years,
            yield_pct,
            yield_decimal: yield_pct / 100.0,
        });
    }

    if out.is_empty() {
        return Err(AppError::input(format!(
            "no valid maturity values for date {}",
            row.date
        )));
    }
    validate_observations(&out)?;
    Ok(out)
}

/// Bounds check on decimal yields.
pub fn validate_observations(observations: &[YieldObservation]) -> Result<(), AppError> {
    for obs in observations {
        if !(YIELD_DECIMAL_MIN..=YIELD_DECIMAL_MAX).contains(&obs.yield_decimal) {
            return Err(AppError::input(format!(
                "yield {} for {}y on {} is outside expected bounds [{}, {}]",
                obs.yield_decimal, obs.maturity_years, obs.date, YIELD_DECIMAL_MIN, YIELD_DECIMAL_MAX
            )));
        }
    }
    Ok(())
}

/// Convert a history of raw rows, isolating per-row failures.
///
/// Output is sorted by `(date, maturity)`. Fails only if no row at all
/// converts.
pub fn history_to_observations(
    rows: &[RawCurveRow],
    config: &TenorConfig,
) -> Result<Vec<YieldObservation>, AppError> {
    let mut out: Vec<YieldObservation> = Vec::new();
    let mut converted = 0usize;
    for row in rows {
        match row_to_observations(row, config) {
            Ok(observations) => {
                converted += 1;
                out.extend(observations);
            }
            Err(err) => warn!(date = %row.date, %err, "skipping curve row"),
        }
    }
    if converted == 0 {
        return Err(AppError::insufficient(
            "no curve rows could be converted to long format",
        ));
    }

    out.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.maturity_years.total_cmp(&b.maturity_years))
    });
    Ok(out)
}

/// Pivot tidy observations into the wide date x maturity matrix.
///
/// Duplicate `(date, maturity)` cells keep the first value seen.
pub fn observations_to_matrix(
    observations: &[YieldObservation],
) -> Result<CurveMatrix, AppError> {
    if observations.is_empty() {
        return Err(AppError::insufficient("no observations to pivot"));
    }

    let mut dates: Vec<NaiveDate> = observations.iter().map(|o| o.date).collect();
    dates.sort();
    dates.dedup();

    let mut maturities: Vec<f64> = observations.iter().map(|o| o.maturity_years).collect();
    maturities.sort_by(|a, b| a.total_cmp(b));
    maturities.dedup();

    let date_index = |d: NaiveDate| dates.binary_search(&d).expect("date present by construction");
    let maturity_index = |m: f64| {
        maturities
            .binary_search_by(|probe| probe.total_cmp(&m))
            .expect("maturity present by construction")
    };

    let mut cells = vec![vec![None; maturities.len()]; dates.len()];
    for obs in observations {
        let cell = &mut cells[date_index(obs.date)][maturity_index(obs.maturity_years)];
        if cell.is_none() {
            *cell = Some(obs.yield_decimal);
        }
    }

    CurveMatrix::new(dates, maturities, cells)
}
