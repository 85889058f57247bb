//! Exports: full fit records to JSON and summary statistics to CSV.
//!
//! The result table only keeps four numbers per coefficient; the JSON export
//! carries everything else (convergence, bound flags, the linearised estimate,
//! ndf) for later inspection.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Bounds, ChiSquareStat, DataErrorKind, Evaluation, FitConfig, ToyFit};
use crate::error::AppError;
use crate::report::CoefficientStats;

#[derive(Debug, Serialize)]
struct FitExport<'a> {
    tool: String,
    generated_at: DateTime<Utc>,
    hist_name: &'a str,
    data_error: DataErrorKind,
    evaluation: Evaluation,
    chi2_stat: ChiSquareStat,
    bounds: Bounds,
    toys: &'a [ToyFit],
}

/// Write all per-toy fit records as pretty JSON.
pub fn write_fit_json(path: &Path, toys: &[ToyFit], config: &FitConfig) -> Result<(), AppError> {
    let export = FitExport {
        tool: format!("liv {}", env!("CARGO_PKG_VERSION")),
        generated_at: Utc::now(),
        hist_name: &config.hist_name,
        data_error: config.data_error,
        evaluation: config.evaluation,
        chi2_stat: config.chi2_stat,
        bounds: config.bounds,
        toys,
    };

    let file = File::create(path)
        .map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create JSON export '{}': {e}", path.display()),
            )
        })?;
    serde_json::to_writer_pretty(BufWriter::new(file), &export)
        .map_err(|e| {
            AppError::new(
                2,
                format!("Failed to write JSON export '{}': {e}", path.display()),
            )
        })?;
    Ok(())
}

/// Write per-coefficient statistics, one row per coefficient.
pub fn write_stats_csv(path: &Path, stats: &[CoefficientStats]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create stats CSV '{}': {e}", path.display()),
            )
        })?;
    for s in stats {
        writer
            .serialize(s)
            .map_err(|e| AppError::new(2, format!("Failed to write stats CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush stats CSV: {e}")))?;
    Ok(())
}
