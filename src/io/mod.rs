//! Input/output helpers.
//!
//! - toy list reading + toy ID extraction (`toy_list`)
//! - result table write/read (`results`)
//! - plain-text histograms (`hist_csv`)
//! - JSON/CSV exports (`export`)

pub mod export;
pub mod hist_csv;
pub mod results;
pub mod toy_list;

pub use export::*;
pub use hist_csv::*;
pub use results::*;
pub use toy_list::*;
