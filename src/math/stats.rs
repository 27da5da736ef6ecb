//! Small statistical helpers shared by the factor, scenario, and risk layers.

use nalgebra::DMatrix;

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Per-column means of an `n x k` matrix.
pub fn column_means(matrix: &DMatrix<f64>) -> Vec<f64> {
    let n = matrix.nrows();
    let mut out = vec![0.0; matrix.ncols()];
    if n == 0 {
        return out;
    }
    for j in 0..matrix.ncols() {
        let mut sum = 0.0;
        for i in 0..n {
            sum += matrix[(i, j)];
        }
        out[j] = sum / n as f64;
    }
    out
}

/// Sample covariance (`n - 1` denominator) of the columns of an `n x k`
/// matrix. Callers must supply at least two rows.
pub fn sample_covariance(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let n = matrix.nrows();
    let k = matrix.ncols();
    debug_assert!(n >= 2, "sample covariance needs at least two rows");

    let means = column_means(matrix);
    let mut centered = matrix.clone();
    for j in 0..k {
        for i in 0..n {
            centered[(i, j)] -= means[j];
        }
    }
    let mut cov = centered.transpose() * &centered;
    cov /= (n - 1) as f64;
    cov
}

/// Quantile with linear interpolation between order statistics.
///
/// `q` is clamped into `[0, 1]`. Returns `None` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = q.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Index of the value nearest to `target`, by linear scan.
///
/// Ties keep the earlier entry; on an ascending maturity grid that means the
/// shorter maturity wins. For large grids a binary search over the sorted
/// array would be a drop-in replacement with the same semantics.
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().enumerate() {
        let dist = (v - target).abs();
        match best {
            Some((_, d)) if dist >= d => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}
