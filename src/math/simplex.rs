//! Bounded Nelder-Mead simplex minimizer.
//!
//! The curve fit needs a derivative-free minimizer over a box: the objective
//! (sum of squared curve residuals) is cheap, four-dimensional, and smooth,
//! but nonlinear in `τ`. A direct simplex search with every candidate clamped
//! into the box keeps the parameters inside their bounds at all times and is
//! deterministic given the same inputs.
//!
//! Non-convergence is reported through `SimplexFit::converged`, never as an
//! error; callers decide what to do with a fit that ran out of iterations.

use crate::error::AppError;

// Standard Nelder-Mead coefficients.
const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct SimplexOptions {
    pub max_iterations: usize,
    /// Initial vertex offset as a fraction of each bound's width.
    pub initial_step: f64,
    /// Convergence threshold on the objective spread across the simplex.
    pub value_tolerance: f64,
    /// Convergence threshold on the simplex diameter.
    pub point_tolerance: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            max_iterations: 600,
            initial_step: 0.08,
            value_tolerance: 1e-12,
            point_tolerance: 1e-8,
        }
    }
}

/// Best point found by the search.
#[derive(Debug, Clone)]
pub struct SimplexFit {
    pub x: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn clamp_into(x: &mut [f64], lower: &[f64], upper: &[f64]) {
    for (i, v) in x.iter_mut().enumerate() {
        *v = v.clamp(lower[i], upper[i]);
    }
}

/// Minimize `objective` over the box `lower <= x <= upper`.
pub fn minimize_bounded<F>(
    mut objective: F,
    initial: &[f64],
    lower: &[f64],
    upper: &[f64],
    options: &SimplexOptions,
) -> Result<SimplexFit, AppError>
where
    F: FnMut(&[f64]) -> f64,
{
    let dim = initial.len();
    if dim == 0 {
        return Err(AppError::input("simplex search needs at least one dimension"));
    }
    if lower.len() != dim || upper.len() != dim {
        return Err(AppError::input(format!(
            "simplex bounds have lengths {}/{} but the initial point has {dim}",
            lower.len(),
            upper.len()
        )));
    }
    for i in 0..dim {
        if !(lower[i].is_finite() && upper[i].is_finite() && lower[i] <= upper[i]) {
            return Err(AppError::input(format!(
                "invalid bound at index {i}: [{}, {}]",
                lower[i], upper[i]
            )));
        }
    }

    // Initial simplex: the clamped start point plus one perturbed vertex per
    // dimension, stepping a fraction of the bound width (downward when the
    // start sits at the upper bound).
    let mut x0 = initial.to_vec();
    clamp_into(&mut x0, lower, upper);

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    let mut values: Vec<f64> = Vec::with_capacity(dim + 1);
    simplex.push(x0.clone());
    values.push(objective(&x0));

    for d in 0..dim {
        let step = ((upper[d] - lower[d]) * options.initial_step).max(1e-10);
        let mut x = x0.clone();
        x[d] = (x[d] + step).min(upper[d]);
        if (x[d] - x0[d]).abs() < 1e-14 {
            x[d] = (x0[d] - step).max(lower[d]);
        }
        values.push(objective(&x));
        simplex.push(x);
    }

    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        // Order vertices best-first.
        let mut order: Vec<usize> = (0..simplex.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let spread = (values[dim] - values[0]).abs();
        let centroid: Vec<f64> = (0..dim)
            .map(|d| simplex.iter().take(dim).map(|x| x[d]).sum::<f64>() / dim as f64)
            .collect();
        let diameter = simplex
            .iter()
            .map(|x| {
                x.iter()
                    .zip(centroid.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt()
            })
            .fold(0.0_f64, f64::max);

        if spread <= options.value_tolerance && diameter <= options.point_tolerance {
            converged = true;
            break;
        }

        // Reflect the worst vertex through the centroid.
        let mut xr: Vec<f64> = (0..dim)
            .map(|d| centroid[d] + REFLECTION * (centroid[d] - simplex[dim][d]))
            .collect();
        clamp_into(&mut xr, lower, upper);
        let fr = objective(&xr);

        if fr < values[0] {
            let mut xe: Vec<f64> = (0..dim)
                .map(|d| centroid[d] + EXPANSION * (xr[d] - centroid[d]))
                .collect();
            clamp_into(&mut xe, lower, upper);
            let fe = objective(&xe);
            if fe < fr {
                simplex[dim] = xe;
                values[dim] = fe;
            } else {
                simplex[dim] = xr;
                values[dim] = fr;
            }
            continue;
        }

        if fr < values[dim - 1] {
            simplex[dim] = xr;
            values[dim] = fr;
            continue;
        }

        // Contract toward the worst vertex; shrink the whole simplex if even
        // that fails to improve.
        let mut xc: Vec<f64> = (0..dim)
            .map(|d| centroid[d] + CONTRACTION * (simplex[dim][d] - centroid[d]))
            .collect();
        clamp_into(&mut xc, lower, upper);
        let fc = objective(&xc);
        if fc < values[dim] {
            simplex[dim] = xc;
            values[dim] = fc;
            continue;
        }

        for i in 1..=dim {
            for d in 0..dim {
                simplex[i][d] = simplex[0][d] + SHRINK * (simplex[i][d] - simplex[0][d]);
            }
            clamp_into(&mut simplex[i], lower, upper);
            values[i] = objective(&simplex[i]);
        }
    }

    let mut best = 0usize;
    for i in 1..values.len() {
        if values[i] < values[best] {
            best = i;
        }
    }

    Ok(SimplexFit {
        x: simplex[best].clone(),
        objective: values[best],
        iterations,
        converged,
    })
}
