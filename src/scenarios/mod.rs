//! Scenario synthesis from factor shocks.
//!
//! A scenario set is fully determined by (baseline curve, loadings, score
//! history, method, count, seed): the RNG is a `StdRng` seeded from the u64
//! seed, and all randomness is consumed in one batched draw before any
//! projection work, so the output is bit-identical across runs and safe to
//! parallelize downstream.
//!
//! Two sampling strategies:
//!
//! - `historical`: resample realized factor-move rows with replacement,
//!   preserving their empirical joint distribution
//! - `parametric`: fit a multivariate normal (mean + sample covariance) to
//!   the score history and draw from it

use nalgebra::{DMatrix, SymmetricEigen};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::domain::{Curve, FactorLoadings, FactorScores};
use crate::error::AppError;
use crate::math::{column_means, nearest_index, sample_covariance};

/// Tenors used for the per-scenario summary metrics. When a tenor is absent
/// from the baseline grid the nearest maturity substitutes (ties keep the
/// shorter one).
const SUMMARY_LONG_TENOR: f64 = 10.0;
const SUMMARY_SHORT_TENOR: f64 = 2.0;

const BP_PER_DECIMAL: f64 = 10_000.0;

/// Factor-shock sampling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMethod {
    Historical,
    Parametric,
}

impl std::fmt::Display for SamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplingMethod::Historical => write!(f, "historical"),
            SamplingMethod::Parametric => write!(f, "parametric"),
        }
    }
}

impl std::str::FromStr for SamplingMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "historical" => Ok(SamplingMethod::Historical),
            "parametric" => Ok(SamplingMethod::Parametric),
            other => Err(AppError::method(format!(
                "method must be 'historical' or 'parametric', got '{other}'"
            ))),
        }
    }
}

/// Per-scenario summary metrics, in basis points versus baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    /// Change of the (nearest-to-)10y yield.
    pub y10_change_bp: f64,
    /// Change of the 2s10s slope spread.
    pub s2s10_change_bp: f64,
}

/// Immutable output of one scenario generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub method: SamplingMethod,
    pub maturities: Vec<f64>,
    /// One synthesized curve per scenario, aligned to `maturities`.
    pub curves: Vec<Vec<f64>>,
    pub components: Vec<String>,
    /// One sampled factor-shock vector per scenario, aligned to `components`.
    pub shocks: Vec<Vec<f64>>,
    pub summary: Vec<ScenarioSummary>,
}

impl ScenarioSet {
    pub fn n_scenarios(&self) -> usize {
        self.curves.len()
    }

    /// Curve of one scenario as a standalone value.
    pub fn scenario_curve(&self, idx: usize) -> Option<Curve> {
        self.curves.get(idx).map(|yields| Curve {
            maturities: self.maturities.clone(),
            yields: yields.clone(),
        })
    }
}

/// Synthesize `n_scenarios` perturbed curves around `baseline`.
pub fn generate_scenarios(
    baseline: &Curve,
    loadings: &FactorLoadings,
    scores: &FactorScores,
    method: SamplingMethod,
    n_scenarios: usize,
    seed: u64,
) -> Result<ScenarioSet, AppError> {
    if baseline.is_empty() {
        return Err(AppError::input("baseline curve is empty"));
    }
    if n_scenarios == 0 {
        return Err(AppError::input("scenario count must be at least 1"));
    }

    // The baseline grid must be covered by the loadings' maturity columns.
    let loading_cols: Vec<usize> = baseline
        .maturities
        .iter()
        .map(|m| {
            loadings
                .maturities
                .iter()
                .position(|lm| lm == m)
                .ok_or_else(|| {
                    AppError::input(format!("loadings have no column for maturity {m}y"))
                })
        })
        .collect::<Result<_, _>>()?;

    // Align the score history to the loadings' component order.
    let score_cols: Vec<usize> = loadings
        .components
        .iter()
        .map(|name| {
            scores
                .component_index(name)
                .ok_or_else(|| AppError::input(format!("score history is missing {name}")))
        })
        .collect::<Result<_, _>>()?;
    let history: Vec<Vec<f64>> = scores
        .values
        .iter()
        .map(|row| score_cols.iter().map(|&c| row[c]).collect())
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let shocks = match method {
        SamplingMethod::Historical => draw_historical(&history, n_scenarios, &mut rng)?,
        SamplingMethod::Parametric => draw_parametric(&history, n_scenarios, &mut rng)?,
    };

    // Project each shock vector through the loadings onto the baseline grid.
    let k = loadings.n_components();
    let m = baseline.len();
    let mut curves = Vec::with_capacity(n_scenarios);
    for shock in &shocks {
        let mut curve = Vec::with_capacity(m);
        for (j, &col) in loading_cols.iter().enumerate() {
            let delta: f64 = (0..k).map(|c| shock[c] * loadings.weights[c][col]).sum();
            curve.push(baseline.yields[j] + delta);
        }
        curves.push(curve);
    }

    let summary = summarize(baseline, &curves);

    Ok(ScenarioSet {
        method,
        maturities: baseline.maturities.clone(),
        curves,
        components: loadings.components.clone(),
        shocks,
        summary,
    })
}

/// Uniform resampling with replacement from realized factor moves.
///
/// The whole index vector is drawn up front, as one batched pass.
fn draw_historical(
    history: &[Vec<f64>],
    n_scenarios: usize,
    rng: &mut StdRng,
) -> Result<Vec<Vec<f64>>, AppError> {
    if history.is_empty() {
        return Err(AppError::insufficient(
            "no historical factor scores to sample from",
        ));
    }
    let indices: Vec<usize> = (0..n_scenarios)
        .map(|_| rng.gen_range(0..history.len()))
        .collect();
    Ok(indices.into_iter().map(|i| history[i].clone()).collect())
}

/// Multivariate-normal draw with the history's mean and sample covariance.
///
/// The standard-normal buffer is filled row-major in one batched pass; the
/// covariance factor prefers Cholesky and falls back to an eigenvalue factor
/// (negative eigenvalues clamped to zero) for semi-definite inputs.
fn draw_parametric(
    history: &[Vec<f64>],
    n_scenarios: usize,
    rng: &mut StdRng,
) -> Result<Vec<Vec<f64>>, AppError> {
    if history.len() < 2 {
        return Err(AppError::insufficient(
            "parametric sampling needs at least two historical score rows",
        ));
    }
    let n = history.len();
    let k = history[0].len();
    let flat: Vec<f64> = history.iter().flatten().copied().collect();
    let matrix = DMatrix::from_row_slice(n, k, &flat);

    let mu = column_means(&matrix);
    let cov = sample_covariance(&matrix);
    let factor = covariance_factor(cov);

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::input(format!("noise distribution error: {e}")))?;
    let z: Vec<f64> = (0..n_scenarios * k).map(|_| normal.sample(rng)).collect();

    let mut out = Vec::with_capacity(n_scenarios);
    for i in 0..n_scenarios {
        let zi = &z[i * k..(i + 1) * k];
        let shock: Vec<f64> = (0..k)
            .map(|j| mu[j] + (0..k).map(|l| factor[(j, l)] * zi[l]).sum::<f64>())
            .collect();
        out.push(shock);
    }
    Ok(out)
}

fn covariance_factor(cov: DMatrix<f64>) -> DMatrix<f64> {
    let k = cov.nrows();
    match cov.clone().cholesky() {
        Some(chol) => chol.l(),
        None => {
            let eigen = SymmetricEigen::new(cov);
            let mut factor = eigen.eigenvectors;
            for j in 0..k {
                let scale = eigen.eigenvalues[j].max(0.0).sqrt();
                for i in 0..k {
                    factor[(i, j)] *= scale;
                }
            }
            factor
        }
    }
}

fn summarize(baseline: &Curve, curves: &[Vec<f64>]) -> Vec<ScenarioSummary> {
    // Indices are resolved once against the baseline grid; nearest_index on
    // the ascending maturities keeps the shorter tenor on ties.
    let i10 = nearest_index(&baseline.maturities, SUMMARY_LONG_TENOR).unwrap_or(0);
    let i2 = nearest_index(&baseline.maturities, SUMMARY_SHORT_TENOR).unwrap_or(0);
    let base10 = baseline.yields[i10];
    let base2 = baseline.yields[i2];

    curves
        .iter()
        .map(|curve| ScenarioSummary {
            y10_change_bp: (curve[i10] - base10) * BP_PER_DECIMAL,
            s2s10_change_bp: ((curve[i10] - curve[i2]) - (base10 - base2)) * BP_PER_DECIMAL,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn two_factor_inputs() -> (Curve, FactorLoadings, FactorScores) {
        let baseline = Curve::new(vec![2.0, 5.0, 10.0], vec![0.030, 0.035, 0.040]).unwrap();
        let loadings = FactorLoadings {
            components: vec!["PC1".into(), "PC2".into()],
            maturities: vec![2.0, 5.0, 10.0],
            weights: vec![vec![0.6, 0.6, 0.5], vec![-0.7, 0.0, 0.7]],
        };
        let dates: Vec<NaiveDate> = (1..=6)
            .map(|day| NaiveDate::from_ymd_opt(2025, 4, day).unwrap())
            .collect();
        let scores = FactorScores {
            dates,
            components: vec!["PC1".into(), "PC2".into()],
            values: vec![
                vec![0.0010, 0.0002],
                vec![-0.0008, -0.0001],
                vec![0.0015, 0.0004],
                vec![-0.0012, 0.0003],
                vec![0.0005, -0.0005],
                vec![-0.0002, 0.0001],
            ],
        };
        (baseline, loadings, scores)
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let (baseline, loadings, scores) = two_factor_inputs();
        for method in [SamplingMethod::Historical, SamplingMethod::Parametric] {
            let a = generate_scenarios(&baseline, &loadings, &scores, method, 64, 42).unwrap();
            let b = generate_scenarios(&baseline, &loadings, &scores, method, 64, 42).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn historical_shocks_are_rows_of_the_history() {
        let (baseline, loadings, scores) = two_factor_inputs();
        let set = generate_scenarios(
            &baseline,
            &loadings,
            &scores,
            SamplingMethod::Historical,
            100,
            7,
        )
        .unwrap();

        for shock in &set.shocks {
            assert!(
                scores.values.iter().any(|row| row == shock),
                "shock {shock:?} is not a historical row"
            );
        }
    }

    #[test]
    fn parametric_set_has_requested_shape() {
        let (baseline, loadings, scores) = two_factor_inputs();
        let set = generate_scenarios(
            &baseline,
            &loadings,
            &scores,
            SamplingMethod::Parametric,
            25,
            1,
        )
        .unwrap();

        assert_eq!(set.n_scenarios(), 25);
        assert!(set.curves.iter().all(|c| c.len() == baseline.len()));
        assert!(set.shocks.iter().all(|s| s.len() == 2));
        assert_eq!(set.summary.len(), 25);
        assert!(set
            .curves
            .iter()
            .all(|c| c.iter().all(|y| y.is_finite())));
    }

    #[test]
    fn method_parsing_rejects_unknown_selectors() {
        assert_eq!(
            "historical".parse::<SamplingMethod>().unwrap(),
            SamplingMethod::Historical
        );
        assert_eq!(
            "Parametric".parse::<SamplingMethod>().unwrap(),
            SamplingMethod::Parametric
        );
        assert!(matches!(
            "bootstrap".parse::<SamplingMethod>(),
            Err(AppError::InvalidMethod(_))
        ));
    }

    #[test]
    fn pure_short_factor_produces_only_the_two_known_curves() {
        // One loading row [1, 0]: shocks move the 2y point only, so resampling
        // the two historical moves can only ever produce two distinct curves.
        let baseline = Curve::new(vec![2.0, 10.0], vec![0.03, 0.04]).unwrap();
        let loadings = FactorLoadings {
            components: vec!["PC1".into()],
            maturities: vec![2.0, 10.0],
            weights: vec![vec![1.0, 0.0]],
        };
        let scores = FactorScores {
            dates: vec![
                NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            ],
            components: vec!["PC1".into()],
            values: vec![vec![0.01], vec![-0.01]],
        };

        for seed in 0..20u64 {
            let set = generate_scenarios(
                &baseline,
                &loadings,
                &scores,
                SamplingMethod::Historical,
                16,
                seed,
            )
            .unwrap();
            for curve in &set.curves {
                let up = (curve[0] - 0.04).abs() < 1e-15 && (curve[1] - 0.04).abs() < 1e-15;
                let down = (curve[0] - 0.02).abs() < 1e-15 && (curve[1] - 0.04).abs() < 1e-15;
                assert!(up || down, "unexpected scenario curve {curve:?}");
            }
        }
    }

    #[test]
    fn summary_metrics_track_the_2s10s_move() {
        let (baseline, loadings, scores) = two_factor_inputs();
        let set = generate_scenarios(
            &baseline,
            &loadings,
            &scores,
            SamplingMethod::Historical,
            32,
            11,
        )
        .unwrap();

        for (curve, summary) in set.curves.iter().zip(set.summary.iter()) {
            let y10 = (curve[2] - 0.040) * 10_000.0;
            let s2s10 = ((curve[2] - curve[0]) - (0.040 - 0.030)) * 10_000.0;
            assert!((summary.y10_change_bp - y10).abs() < 1e-9);
            assert!((summary.s2s10_change_bp - s2s10).abs() < 1e-9);
        }
    }

    #[test]
    fn missing_score_component_is_rejected() {
        let (baseline, loadings, mut scores) = two_factor_inputs();
        scores.components = vec!["PC1".into(), "PC9".into()];
        let result = generate_scenarios(
            &baseline,
            &loadings,
            &scores,
            SamplingMethod::Historical,
            4,
            0,
        );
        assert!(matches!(result, Err(AppError::InputValidation(_))));
    }
}
