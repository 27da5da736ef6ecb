//! Numerical building blocks: the Nelson-Siegel basis, a bounded simplex
//! minimizer, and small statistics helpers.

mod basis;
mod simplex;
mod stats;

pub use basis::{curvature, level_slope};
pub use simplex::{minimize_bounded, SimplexFit, SimplexOptions};
pub use stats::{column_means, mean, nearest_index, quantile, sample_covariance};
