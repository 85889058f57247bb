//! `liv-fit` library crate.
//!
//! The binary (`liv`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting, reading and plotting layers can be used from other tools
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod histogram;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod root;
