//! Shared pipeline logic behind the subcommands.
//!
//! Keeping this in one place separates the core workflows from printing:
//! toy list -> histograms -> fits -> result file -> optional plots/exports
//! result file -> statistics -> plots/exports
//!
//! `app` only formats what these functions return.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::{Coefficient, FitConfig, SampleConfig, SummaryConfig, ToyFit};
use crate::error::AppError;
use crate::fit::{Chi2Objective, FitOptions, fit_histogram, scan_profile};
use crate::histogram::load_histogram;
use crate::io::{
    ResultTable, ResultWriter, ToyEntry, load_toys, read_results, same_sample_id, write_fit_json,
    write_stats_csv,
};
use crate::plot::{
    plot_distribution, plot_fit_overlay, plot_p0, plot_profile, plot_pulls, plot_residuals,
    plot_summary_all, plot_summary_sample,
};
use crate::report::{
    CoefficientStats, Truth, coefficient_series, compute_stats, format_sample_values,
};

/// Toys per worker thread fitted between two flushes of the result file.
const TOYS_PER_THREAD_PER_CHUNK: usize = 4;

/// All computed outputs of a single `liv fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    /// Per-toy fits, in list order.
    pub toys: Vec<ToyFit>,
    pub plots: Vec<PathBuf>,
}

/// Outputs of `liv summary`.
#[derive(Debug, Clone)]
pub struct SummaryRun {
    pub stats: Vec<CoefficientStats>,
    pub plots: Vec<PathBuf>,
}

/// Outputs of `liv sample`.
#[derive(Debug, Clone)]
pub struct SampleRun {
    /// `--print` blocks, one per sample.
    pub printouts: Vec<String>,
    pub plots: Vec<PathBuf>,
}

fn fit_options(config: &FitConfig) -> FitOptions {
    FitOptions {
        data_error: config.data_error,
        evaluation: config.evaluation,
        tolerance: config.tolerance,
        max_iters: config.max_iters,
    }
}

fn create_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))
}

fn fit_toy(entry: &ToyEntry, config: &FitConfig, opts: &FitOptions) -> Result<ToyFit, AppError> {
    let hist = load_histogram(&entry.path, &config.hist_name)?;
    let fits = fit_histogram(&hist, &config.coefficients, &config.bounds, opts)?;
    info!(toy = %entry.id, bins = hist.n_bins(), "fitted toy");
    Ok(ToyFit {
        toy_id: entry.id.clone(),
        path: entry.path.clone(),
        n_bins: hist.n_bins(),
        fits,
    })
}

/// Fit every toy of the list and write the result file.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    // 1) Resolve every toy ID before any fitting starts.
    let entries = load_toys(&config.input_list, &config.id_regex)?;
    let plot_index = match &config.plot_toy {
        Some(id) => Some(
            entries
                .iter()
                .position(|e| same_sample_id(&e.id, id))
                .ok_or_else(|| {
                    AppError::new(
                        2,
                        format!("Toy '{id}' selected for plotting is not in the list."),
                    )
                })?,
        ),
        None => None,
    };
    info!(
        toys = entries.len(),
        coefficients = config.coefficients.len(),
        "starting fits"
    );

    // 2) Fit in parallel, one chunk at a time. `collect` keeps list order and
    //    each chunk reaches the result file before the next one starts.
    let opts = fit_options(config);
    let mut writer = ResultWriter::create(&config.output, config.chi2_stat)?;
    let mut fit_all = || -> Result<Vec<ToyFit>, AppError> {
        let chunk = rayon::current_num_threads().max(1) * TOYS_PER_THREAD_PER_CHUNK;
        let mut toys = Vec::with_capacity(entries.len());
        for batch in entries.chunks(chunk) {
            let fitted = batch
                .par_iter()
                .map(|e| fit_toy(e, config, &opts))
                .collect::<Result<Vec<_>, _>>()?;
            for toy in &fitted {
                writer.write_toy(toy)?;
            }
            writer.flush()?;
            toys.extend(fitted);
        }
        Ok(toys)
    };
    let toys = match config.threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to start {n} worker threads: {e}")))?
            .install(fit_all)?,
        None => fit_all()?,
    };
    let rows = writer.rows();
    writer.finish()?;
    info!(rows, output = %config.output.display(), "wrote results");

    // 3) Plots for the selected toy.
    let mut plots = Vec::new();
    if let Some(i) = plot_index {
        plots = plot_toy(&entries[i], &toys[i], config, &opts)?;
    }

    // 4) Optional export.
    if let Some(path) = &config.export_json {
        write_fit_json(path, &toys, config)?;
    }

    Ok(FitRun { toys, plots })
}

fn plot_toy(
    entry: &ToyEntry,
    toy: &ToyFit,
    config: &FitConfig,
    opts: &FitOptions,
) -> Result<Vec<PathBuf>, AppError> {
    create_dir(&config.plot_dir)?;
    let hist = load_histogram(&entry.path, &config.hist_name)?;

    let mut plots = Vec::new();
    for fit in &toy.fits {
        plots.push(plot_fit_overlay(
            &config.plot_dir,
            &toy.toy_id,
            &hist,
            fit,
            config.overlay_y_range,
        )?);

        if !(fit.error.is_finite() && fit.error > 0.0) {
            warn!(
                coefficient = %fit.coefficient,
                error = fit.error,
                "no chi-square scan without a finite error"
            );
            continue;
        }
        let objective = Chi2Objective::new(&hist, fit.coefficient, opts);
        let scan = scan_profile(&objective, fit.value, fit.error, config.scan_points)?;
        plots.push(plot_profile(&config.plot_dir, &toy.toy_id, fit, &scan)?);
    }
    Ok(plots)
}

/// Truth files usually carry every coefficient; a truth file written from the
/// same subset as the results is read with the selected columns.
fn read_truth(path: &Path, coefficients: Option<&[Coefficient]>) -> Result<ResultTable, AppError> {
    read_results(path, None).or_else(|e| match coefficients {
        Some(c) => read_results(path, Some(c)),
        None => Err(e),
    })
}

/// Statistics and plots over all toys of a result file.
pub fn run_summary(config: &SummaryConfig) -> Result<SummaryRun, AppError> {
    let table = read_results(&config.input, config.coefficients.as_deref())?;
    let truth = match &config.truth {
        Some(path) => Truth::Table(read_truth(path, config.coefficients.as_deref())?),
        None => Truth::Zero,
    };
    info!(
        rows = table.rows.len(),
        coefficients = table.coefficients.len(),
        "loaded results"
    );
    create_dir(&config.out_dir)?;

    let stats = compute_stats(&table, &truth);
    let mut plots = Vec::new();
    for s in &stats {
        let coef = s.coefficient;
        let series = coefficient_series(&table, coef, &truth);
        let dir = &config.out_dir;
        plots.push(plot_distribution(
            dir,
            coef,
            &series.values,
            config.bins,
            config.value_range,
        )?);
        plots.push(plot_p0(dir, coef, &series.p0, config.bins)?);
        plots.push(plot_pulls(dir, coef, &series.pulls, config.bins)?);
        if matches!(truth, Truth::Table(_)) {
            plots.push(plot_residuals(
                dir,
                coef,
                &series.residuals,
                s.mean_abs_rel_error,
                config.bins,
                None,
            )?);
        }
    }
    plots.push(plot_summary_all(&config.out_dir, &stats, config.value_range)?);
    for id in &config.sample_ids {
        plots.push(plot_summary_sample(
            &config.out_dir,
            &table,
            id,
            config.value_range,
            false,
        )?);
    }

    if let Some(path) = &config.export_stats {
        write_stats_csv(path, &stats)?;
    }
    Ok(SummaryRun { stats, plots })
}

/// Per-sample plots and printouts.
pub fn run_sample(config: &SampleConfig) -> Result<SampleRun, AppError> {
    let table = read_results(&config.input, config.coefficients.as_deref())?;
    create_dir(&config.out_dir)?;

    let mut printouts = Vec::new();
    let mut plots = Vec::new();
    for id in &config.sample_ids {
        if config.print {
            printouts.push(format_sample_values(&table, id)?);
        }
        plots.push(plot_summary_sample(
            &config.out_dir,
            &table,
            id,
            config.value_range,
            true,
        )?);
    }
    Ok(SampleRun { printouts, plots })
}
