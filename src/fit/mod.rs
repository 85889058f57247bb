//! Chi-square fitting.
//!
//! Responsibilities:
//!
//! - build the χ² objective for a (histogram, coefficient) pair
//! - minimise it within bounds and attach errors and goodness of fit
//! - scan the χ² curve around the minimum for plots

pub mod fitter;
pub mod profile;

pub use fitter::*;
pub use profile::*;
