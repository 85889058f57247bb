//! Mathematical utilities: chi-square sums, weighted least squares and
//! descriptive statistics.

pub mod chi2;
pub mod ols;
pub mod stats;

pub use chi2::*;
pub use ols::*;
pub use stats::*;
