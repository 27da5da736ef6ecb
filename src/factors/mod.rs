//! Principal-component decomposition of day-over-day yield changes.
//!
//! The pipeline is two steps:
//!
//! 1. turn the wide yield matrix into a cleaned change matrix (diff rows,
//!    drop all-missing rows, interpolate remaining gaps per column in both
//!    directions, drop rows that still have gaps)
//! 2. decompose the cleaned changes into orthogonal factors via the
//!    eigendecomposition of their sample covariance
//!
//! Components are ordered by descending explained variance and each loading
//! vector is given a deterministic sign (largest-magnitude weight positive),
//! so repeated runs on the same input are bit-identical.

use chrono::NaiveDate;
use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::domain::{CurveMatrix, FactorLoadings, FactorScores};
use crate::error::AppError;
use crate::math::column_means;

/// Dense matrix of cleaned day-over-day yield changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeMatrix {
    pub dates: Vec<NaiveDate>,
    pub maturities: Vec<f64>,
    pub rows: Vec<Vec<f64>>,
}

impl ChangeMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Full factor-model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDecomposition {
    pub loadings: FactorLoadings,
    pub scores: FactorScores,
    /// Fraction of total change variance per component: non-negative,
    /// non-increasing, summing to at most one.
    pub explained_variance_ratio: Vec<f64>,
    pub changes: ChangeMatrix,
}

/// Compute cleaned day-over-day changes from a wide matrix.
///
/// Rows of the result correspond to the second date of each difference.
/// A maturity column with no observed change at all leaves its rows
/// incomplete, and those rows are dropped.
pub fn compute_daily_changes(wide: &CurveMatrix) -> ChangeMatrix {
    let n_cols = wide.n_maturities();

    // Row-over-row differences; None wherever either side is missing.
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut deltas: Vec<Vec<Option<f64>>> = Vec::new();
    for i in 1..wide.n_dates() {
        let row: Vec<Option<f64>> = (0..n_cols)
            .map(|j| match (wide.cells[i - 1][j], wide.cells[i][j]) {
                (Some(prev), Some(curr)) => Some(curr - prev),
                _ => None,
            })
            .collect();
        if row.iter().any(Option::is_some) {
            dates.push(wide.dates[i]);
            deltas.push(row);
        }
    }

    // Fill interior gaps per column by linear interpolation in row position,
    // extending the first/last observed change over the edges.
    for j in 0..n_cols {
        interpolate_column(&mut deltas, j);
    }

    // Keep only fully observed rows.
    let mut out_dates = Vec::new();
    let mut out_rows = Vec::new();
    for (date, row) in dates.into_iter().zip(deltas.into_iter()) {
        if row.iter().all(Option::is_some) {
            out_dates.push(date);
            out_rows.push(row.into_iter().map(|v| v.unwrap_or_default()).collect());
        }
    }

    ChangeMatrix {
        dates: out_dates,
        maturities: wide.maturities.clone(),
        rows: out_rows,
    }
}

fn interpolate_column(rows: &mut [Vec<Option<f64>>], col: usize) {
    let filled: Vec<(usize, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| row[col].map(|v| (i, v)))
        .collect();
    if filled.is_empty() {
        return;
    }

    for i in 0..rows.len() {
        if rows[i][col].is_some() {
            continue;
        }
        let after = filled.iter().find(|(p, _)| *p > i);
        let before = filled.iter().rev().find(|(p, _)| *p < i);
        rows[i][col] = match (before, after) {
            (Some(&(p0, v0)), Some(&(p1, v1))) => {
                let frac = (i - p0) as f64 / (p1 - p0) as f64;
                Some(v0 + frac * (v1 - v0))
            }
            (Some(&(_, v0)), None) => Some(v0),
            (None, Some(&(_, v1))) => Some(v1),
            (None, None) => None,
        };
    }
}

/// Fit the factor decomposition on a wide matrix's daily changes.
///
/// `n_components` is an upper bound; the effective count is
/// `min(n_components, surviving rows, maturity columns)`.
pub fn fit_factors(wide: &CurveMatrix, n_components: usize) -> Result<FactorDecomposition, AppError> {
    if n_components == 0 {
        return Err(AppError::input("factor count must be at least 1"));
    }

    let changes = compute_daily_changes(wide);
    let n = changes.rows.len();
    let m = changes.maturities.len();
    if n < 2 {
        return Err(AppError::insufficient(
            "not enough data to compute daily yield changes",
        ));
    }

    let k = n_components.min(n).min(m);

    let flat: Vec<f64> = changes.rows.iter().flatten().copied().collect();
    let matrix = DMatrix::from_row_slice(n, m, &flat);

    let means = column_means(&matrix);
    let mut centered = matrix;
    for j in 0..m {
        for i in 0..n {
            centered[(i, j)] -= means[j];
        }
    }

    let mut covariance = centered.transpose() * &centered;
    covariance /= (n - 1) as f64;

    let eigen = SymmetricEigen::new(covariance);

    // Order eigenpairs by descending variance; clamp the tiny negative
    // eigenvalues that symmetric factorization can produce.
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    let variances: Vec<f64> = order
        .iter()
        .map(|&i| eigen.eigenvalues[i].max(0.0))
        .collect();
    let total_variance: f64 = variances.iter().sum();

    let mut weights: Vec<Vec<f64>> = Vec::with_capacity(k);
    let mut score_columns: Vec<Vec<f64>> = Vec::with_capacity(k);
    for &idx in order.iter().take(k) {
        let mut vector: Vec<f64> = (0..m).map(|r| eigen.eigenvectors[(r, idx)]).collect();

        // Deterministic orientation: largest-magnitude weight positive.
        let dominant = vector
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        if vector[dominant] < 0.0 {
            for w in &mut vector {
                *w = -*w;
            }
        }

        let column: Vec<f64> = (0..n)
            .map(|r| (0..m).map(|c| centered[(r, c)] * vector[c]).sum())
            .collect();
        weights.push(vector);
        score_columns.push(column);
    }

    let components: Vec<String> = (1..=k).map(|i| format!("PC{i}")).collect();
    let explained_variance_ratio: Vec<f64> = variances
        .iter()
        .take(k)
        .map(|&v| if total_variance > 0.0 { v / total_variance } else { 0.0 })
        .collect();

    let score_rows: Vec<Vec<f64>> = (0..n)
        .map(|r| score_columns.iter().map(|col| col[r]).collect())
        .collect();

    Ok(FactorDecomposition {
        loadings: FactorLoadings {
            components: components.clone(),
            maturities: changes.maturities.clone(),
            weights,
        },
        scores: FactorScores {
            dates: changes.dates.clone(),
            components,
            values: score_rows,
        },
        explained_variance_ratio,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn wide_from_rows(rows: Vec<Vec<Option<f64>>>, maturities: Vec<f64>) -> CurveMatrix {
        let dates: Vec<NaiveDate> = (0..rows.len() as u32)
            .map(|i| d("2025-03-03") + chrono::Days::new(u64::from(i)))
            .collect();
        CurveMatrix::new(dates, maturities, rows).unwrap()
    }

    #[test]
    fn daily_changes_diff_and_gap_fill() {
        let wide = wide_from_rows(
            vec![
                vec![Some(0.030), Some(0.040)],
                vec![Some(0.031), Some(0.041)],
                vec![Some(0.033), None],
                vec![Some(0.034), Some(0.044)],
            ],
            vec![2.0, 10.0],
        );

        let changes = compute_daily_changes(&wide);
        assert_eq!(changes.n_rows(), 3);
        assert!((changes.rows[0][0] - 0.001).abs() < 1e-12);
        // The 10y change is missing on both gap-adjacent diffs and gets
        // interpolated between 0.001 and the edge extension.
        assert!(changes.rows.iter().all(|r| r.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn all_missing_column_drops_every_row() {
        let wide = wide_from_rows(
            vec![
                vec![Some(0.030), None],
                vec![Some(0.031), None],
                vec![Some(0.032), None],
            ],
            vec![2.0, 10.0],
        );
        let changes = compute_daily_changes(&wide);
        assert_eq!(changes.n_rows(), 0);
        assert!(matches!(
            fit_factors(&wide, 3),
            Err(AppError::InsufficientData(_))
        ));
    }

    #[test]
    fn parallel_shift_history_yields_one_dominant_level_factor() {
        // Yields move in lockstep: the first component should explain all
        // variance with a flat, positive loading vector.
        let mut level = 0.030;
        let mut rows = vec![vec![Some(level), Some(level + 0.005), Some(level + 0.01)]];
        for shift in [0.001, -0.0005, 0.002, 0.0005, -0.001, 0.0015, 0.0008] {
            level += shift;
            rows.push(vec![Some(level), Some(level + 0.005), Some(level + 0.01)]);
        }
        let wide = wide_from_rows(rows, vec![2.0, 5.0, 10.0]);

        let result = fit_factors(&wide, 3).unwrap();
        let ratio = &result.explained_variance_ratio;

        assert!(ratio[0] > 0.999);
        assert!(ratio.iter().all(|r| *r >= 0.0));
        assert!(ratio.windows(2).all(|w| w[0] >= w[1] - 1e-12));
        assert!(ratio.iter().sum::<f64>() <= 1.0 + 1e-9);

        let pc1 = &result.loadings.weights[0];
        assert!(pc1.iter().all(|w| *w > 0.0), "level loadings {pc1:?}");
        let norm: f64 = pc1.iter().map(|w| w * w).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn component_count_is_capped_by_rows_and_columns() {
        let wide = wide_from_rows(
            vec![
                vec![Some(0.030), Some(0.040)],
                vec![Some(0.032), Some(0.041)],
                vec![Some(0.031), Some(0.043)],
            ],
            vec![2.0, 10.0],
        );
        let result = fit_factors(&wide, 5).unwrap();
        assert_eq!(result.loadings.n_components(), 2);
        assert_eq!(result.scores.components.len(), 2);
        assert_eq!(result.scores.n_rows(), 2);
    }

    #[test]
    fn decomposition_is_deterministic() {
        let wide = wide_from_rows(
            vec![
                vec![Some(0.030), Some(0.035), Some(0.040)],
                vec![Some(0.031), Some(0.0355), Some(0.0405)],
                vec![Some(0.0295), Some(0.0345), Some(0.0395)],
                vec![Some(0.0305), Some(0.036), Some(0.041)],
            ],
            vec![2.0, 5.0, 10.0],
        );
        let a = fit_factors(&wide, 2).unwrap();
        let b = fit_factors(&wide, 2).unwrap();
        assert_eq!(a, b);
    }
}
