//! Plots over many toys: value, p-value, pull and residual histograms, and
//! the error-bar summaries per coefficient.

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::Coefficient;
use crate::error::AppError;
use crate::io::ResultTable;
use crate::math::{bin_counts, mean, std_dev};
use crate::plot::{DrawResult, PLOT_SIZE, auto_range, render_error};
use crate::report::{CoefficientStats, fmt_sci};

/// Coefficients moved to the upper panel of the per-sample plot.
pub const UPPER_PANEL_COEFFICIENTS: usize = 5;

/// Histogram of fitted values with mean and standard deviation annotated.
///
/// Writes `distribution_plots_{label}.svg`.
pub fn plot_distribution(
    dir: &Path,
    coef: Coefficient,
    values: &[f64],
    bins: usize,
    range: Option<(f64, f64)>,
) -> Result<PathBuf, AppError> {
    let path = dir.join(format!("distribution_plots_{}.svg", coef.label()));
    let range = range.unwrap_or_else(|| auto_range(values, 0.05));
    let notes = moment_notes(values);
    draw_histogram(
        &path,
        coef.label(),
        "fitted value",
        values,
        bins,
        range,
        &notes,
    )
        .map_err(|e| render_error(&path, e))?;
    Ok(path)
}

/// Histogram of χ² p-values on `[0, 1]`. Writes `Stats_chi2_p0_test_{label}.svg`.
pub fn plot_p0(
    dir: &Path,
    coef: Coefficient,
    p0: &[f64],
    bins: usize,
) -> Result<PathBuf, AppError> {
    let path = dir.join(format!("Stats_chi2_p0_test_{}.svg", coef.label()));
    let below = p0.iter().filter(|p| p.is_finite() && **p < 0.05).count();
    let finite = p0.iter().filter(|p| p.is_finite()).count();
    let notes = vec![
        format!("entries = {finite}"),
        format!("p0 below 0.05: {below}"),
    ];
    draw_histogram(
        &path,
        coef.label(),
        "χ² p-value",
        p0,
        bins,
        (0.0, 1.0),
        &notes,
    )
        .map_err(|e| render_error(&path, e))?;
    Ok(path)
}

/// Histogram of `(value − truth) / error`. Writes `pull_plots_{label}.svg`.
pub fn plot_pulls(
    dir: &Path,
    coef: Coefficient,
    pulls: &[f64],
    bins: usize,
) -> Result<PathBuf, AppError> {
    let path = dir.join(format!("pull_plots_{}.svg", coef.label()));
    let range = auto_range(pulls, 0.05);
    let notes = moment_notes(pulls);
    draw_histogram(&path, coef.label(), "pull", pulls, bins, range, &notes)
        .map_err(|e| render_error(&path, e))?;
    Ok(path)
}

/// Histogram of `value − truth`. Writes `residual_plots_{label}.svg`.
pub fn plot_residuals(
    dir: &Path,
    coef: Coefficient,
    residuals: &[f64],
    mean_abs_rel_error: Option<f64>,
    bins: usize,
    range: Option<(f64, f64)>,
) -> Result<PathBuf, AppError> {
    let path = dir.join(format!("residual_plots_{}.svg", coef.label()));
    let range = range.unwrap_or_else(|| auto_range(residuals, 0.05));
    let mut notes = moment_notes(residuals);
    if let Some(m) = mean_abs_rel_error {
        notes.push(format!("MARE = {}", fmt_sci(m, 3, false)));
    }
    draw_histogram(
        &path,
        coef.label(),
        "value - truth",
        residuals,
        bins,
        range,
        &notes,
    )
        .map_err(|e| render_error(&path, e))?;
    Ok(path)
}

fn moment_notes(values: &[f64]) -> Vec<String> {
    let n = values.iter().filter(|v| v.is_finite()).count();
    let show = |v: Option<f64>| v.map(|v| fmt_sci(v, 3, false)).unwrap_or_else(|| "-".to_string());
    vec![
        format!("entries = {n}"),
        format!("mean = {}", show(mean(values))),
        format!("std = {}", show(std_dev(values))),
    ]
}

fn draw_histogram(
    path: &Path,
    title: &str,
    x_desc: &str,
    values: &[f64],
    bins: usize,
    range: (f64, f64),
    notes: &[String],
) -> DrawResult {
    let (lo, hi) = range;
    let counts = bin_counts(values, lo, hi, bins);
    let y_max = counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.15;
    let width = (hi - lo) / bins.max(1) as f64;

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("toys")
        .x_labels(6)
        .x_label_formatter(&|v| fmt_sci(*v, 2, false))
        .y_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    chart.draw_series(counts.iter().enumerate().filter(|(_, c)| **c > 0).map(|(i, &c)| {
        let x0 = lo + i as f64 * width;
        Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], BLUE.mix(0.6).filled())
    }))?;

    let x = PLOT_SIZE.0 as i32 - 250;
    for (i, note) in notes.iter().enumerate() {
        root.draw(&Text::new(
            note.as_str(),
            (x, 60 + 20 * i as i32),
            ("sans-serif", 16).into_font(),
        ))?;
    }

    root.present()?;
    Ok(())
}

/// One row of an error-bar summary.
#[derive(Debug, Clone, Copy)]
struct ErrorBarRow {
    label: &'static str,
    center: f64,
    sigma: f64,
}

impl ErrorBarRow {
    fn is_drawable(&self) -> bool {
        self.center.is_finite() && self.sigma.is_finite()
    }
}

/// Mean of each coefficient with its spread as 1σ and 2σ bars, and a dashed
/// zero line. Writes `SigFit_summary_AllSamples.svg`.
pub fn plot_summary_all(
    dir: &Path,
    stats: &[CoefficientStats],
    range: Option<(f64, f64)>,
) -> Result<PathBuf, AppError> {
    let path = dir.join("SigFit_summary_AllSamples.svg");
    let rows: Vec<ErrorBarRow> = stats
        .iter()
        .map(|s| ErrorBarRow {
            label: s.coefficient.label(),
            center: s.mean.unwrap_or(f64::NAN),
            sigma: s.std.unwrap_or(0.0),
        })
        .collect();
    let range = range.unwrap_or_else(|| bar_range(&rows));

    let draw = || -> DrawResult {
        let root = SVGBackend::new(&path, (900, 700)).into_drawing_area();
        root.fill(&WHITE)?;
        draw_error_bars(&root, "All samples: mean, 1σ and 2σ spread", &rows, range)?;
        root.present()?;
        Ok(())
    };
    draw().map_err(|e| render_error(&path, e))?;
    Ok(path)
}

/// Fitted values of one sample with 1σ and 2σ error bars.
///
/// With `split`, the last five coefficients of the table go to an upper
/// panel with its own axis range. Writes `SigFit_summary_sample{id}.svg`.
pub fn plot_summary_sample(
    dir: &Path,
    table: &ResultTable,
    sample_id: &str,
    range: Option<(f64, f64)>,
    split: bool,
) -> Result<PathBuf, AppError> {
    let row = table
        .find_sample(sample_id)
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("Sample '{sample_id}' not found in result table."),
            )
        })?;
    let path = dir.join(format!("SigFit_summary_sample{}.svg", row.sample_id));

    let rows: Vec<ErrorBarRow> = table
        .coefficients
        .iter()
        .zip(&row.values)
        .map(|(c, v)| ErrorBarRow {
            label: c.label(),
            center: v.value,
            sigma: v.error,
        })
        .collect();

    let title = format!("Sample {}", row.sample_id);
    let draw = || -> DrawResult {
        if split && rows.len() > UPPER_PANEL_COEFFICIENTS {
            let root = SVGBackend::new(&path, (900, 900)).into_drawing_area();
            root.fill(&WHITE)?;
            let (lower_rows, upper_rows) = rows.split_at(rows.len() - UPPER_PANEL_COEFFICIENTS);
            let (upper, lower) = root.split_vertically(340);
            let upper_range = range.unwrap_or_else(|| bar_range(upper_rows));
            let lower_range = range.unwrap_or_else(|| bar_range(lower_rows));
            draw_error_bars(&upper, &title, upper_rows, upper_range)?;
            draw_error_bars(&lower, "", lower_rows, lower_range)?;
            root.present()?;
        } else {
            let root = SVGBackend::new(&path, (900, 700)).into_drawing_area();
            root.fill(&WHITE)?;
            let range = range.unwrap_or_else(|| bar_range(&rows));
            draw_error_bars(&root, &title, &rows, range)?;
            root.present()?;
        }
        Ok(())
    };
    draw().map_err(|e| render_error(&path, e))?;
    Ok(path)
}

fn bar_range(rows: &[ErrorBarRow]) -> (f64, f64) {
    let mut xs = vec![0.0];
    for r in rows.iter().filter(|r| r.is_drawable()) {
        xs.push(r.center - 2.0 * r.sigma.abs());
        xs.push(r.center + 2.0 * r.sigma.abs());
    }
    auto_range(&xs, 0.08)
}

fn draw_error_bars(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    title: &str,
    rows: &[ErrorBarRow],
    range: (f64, f64),
) -> DrawResult {
    let n = rows.len() as i32;
    let mut builder = ChartBuilder::on(area);
    builder.margin(12).x_label_area_size(40).y_label_area_size(120);
    if !title.is_empty() {
        builder.caption(title, ("sans-serif", 22).into_font());
    }
    let mut chart = builder.build_cartesian_2d(range.0..range.1, (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("fitted value")
        .x_labels(6)
        .x_label_formatter(&|v| fmt_sci(*v, 1, false))
        .y_labels(rows.len())
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => rows
                .get(*i as usize)
                .map(|r| r.label.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    let zero = RGBColor(120, 120, 120).stroke_width(1);
    chart.draw_series((0..n).map(|i| {
        PathElement::new(
            vec![(0.0, SegmentValue::Exact(i)), (0.0, SegmentValue::CenterOf(i))],
            zero,
        )
    }))?;

    let two_sigma = GREEN.mix(0.45).stroke_width(8);
    let one_sigma = BLUE.mix(0.8).stroke_width(8);
    for (i, r) in rows.iter().enumerate().filter(|(_, r)| r.is_drawable()) {
        let y = || SegmentValue::CenterOf(i as i32);
        let s = r.sigma.abs();
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(r.center - 2.0 * s, y()), (r.center + 2.0 * s, y())],
            two_sigma,
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(r.center - s, y()), (r.center + s, y())],
            one_sigma,
        )))?;
        chart.draw_series(std::iter::once(Circle::new((r.center, y()), 4, BLACK.filled())))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CoefficientValues, ResultRow};

    fn table() -> ResultTable {
        let rows = (0..4)
            .map(|i| ResultRow {
                sample_id: i.to_string(),
                values: Coefficient::ALL
                    .iter()
                    .map(|_| CoefficientValues {
                        value: 1e-5 * (i as f64 - 1.5),
                        error: 2e-5,
                        chi2: 10.0,
                        p0: 0.25 * i as f64,
                    })
                    .collect(),
            })
            .collect();
        ResultTable {
            coefficients: Coefficient::ALL.to_vec(),
            rows,
        }
    }

    #[test]
    fn histogram_plots_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let values = [1e-5, -2e-5, 3e-6, f64::NAN];
        let coef = Coefficient::CuXY;

        let p = plot_distribution(dir.path(), coef, &values, 100, None).unwrap();
        assert_eq!(p.file_name().unwrap(), "distribution_plots_c[u,X,Y].svg");
        let svg = std::fs::read_to_string(&p).unwrap();
        assert!(svg.contains("entries = 3"));

        let p = plot_p0(dir.path(), coef, &[0.01, 0.5, 0.9], 100).unwrap();
        assert!(std::fs::read_to_string(&p).unwrap().contains("p0 below 0.05: 1"));

        let p = plot_pulls(dir.path(), coef, &[0.1, -0.4, 1.2], 50).unwrap();
        assert_eq!(p.file_name().unwrap(), "pull_plots_c[u,X,Y].svg");

        let p = plot_residuals(dir.path(), coef, &[1e-6, -1e-6], Some(0.12), 50, None).unwrap();
        assert!(std::fs::read_to_string(&p).unwrap().contains("MARE = 1.200E-01"));
    }

    #[test]
    fn summary_plots_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let t = table();
        let stats = crate::report::compute_stats(&t, &crate::report::Truth::Zero);
        let p = plot_summary_all(dir.path(), &stats, None).unwrap();
        assert_eq!(p.file_name().unwrap(), "SigFit_summary_AllSamples.svg");

        let p = plot_summary_sample(dir.path(), &t, "02", None, true).unwrap();
        assert_eq!(p.file_name().unwrap(), "SigFit_summary_sample2.svg");
        let svg = std::fs::read_to_string(&p).unwrap();
        assert!(svg.contains("Sample 2"));
        assert!(svg.contains("line"));

        assert_eq!(
            plot_summary_sample(dir.path(), &t, "99", None, false).unwrap_err().exit_code(),
            2
        );
    }

    #[test]
    fn bar_range_covers_two_sigma_and_zero() {
        let rows = [ErrorBarRow {
            label: "x",
            center: 5.0,
            sigma: 1.0,
        }];
        let (lo, hi) = bar_range(&rows);
        assert!(lo < 0.0 && hi > 7.0);
    }
}
