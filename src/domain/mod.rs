//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fitted coefficients (`Coefficient`) and fit option enums
//! - fit outputs (`CoefficientFit`, `ToyFit`) and result-table rows
//! - plain config structs consumed by the pipelines

pub mod types;

pub use types::*;
