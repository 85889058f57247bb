//! Synthetic data for validating the fit.

pub mod toys;

pub use toys::*;
