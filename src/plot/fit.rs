//! Per-toy plots: data with the fitted template, and the chi-square scan.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::domain::CoefficientFit;
use crate::error::AppError;
use crate::fit::ProfileScan;
use crate::histogram::Histogram;
use crate::models::{Template, relative_shape};
use crate::plot::{DrawResult, PLOT_SIZE, auto_range, dashed_line, render_error};
use crate::report::fmt_sci;

const CURVE_POINTS: usize = 400;

/// Data point on the relative scale: `(x, y, y_error)`.
type DataPoint = (f64, f64, f64);

/// Overlay of the data and the fitted template for one coefficient.
///
/// Both are drawn relative to a flat distribution with the same total, so a
/// null toy scatters around 1. Writes `fit_results_{label}_{toy}.svg`.
pub fn plot_fit_overlay(
    dir: &Path,
    toy_id: &str,
    hist: &Histogram,
    fit: &CoefficientFit,
    y_range: Option<(f64, f64)>,
) -> Result<PathBuf, AppError> {
    let coef = fit.coefficient;
    let path = dir.join(format!("fit_results_{}_{toy_id}.svg", coef.label()));

    let template = Template::for_histogram(coef, hist);
    let total = hist.sum();
    let length = hist.range();
    let points: Vec<DataPoint> = hist
        .centers()
        .into_iter()
        .zip(hist.widths())
        .enumerate()
        .map(|(i, (x, w))| {
            let scale = length / (total * w);
            (x, hist.contents()[i] * scale, hist.variance(i).max(0.0).sqrt() * scale)
        })
        .collect();

    let (x0, x1) = (hist.x_min(), hist.x_max());
    let curve: Vec<(f64, f64)> = (0..=CURVE_POINTS)
        .map(|i| {
            let x = x0 + (x1 - x0) * i as f64 / CURVE_POINTS as f64;
            (x, relative_shape(&template, hist, x, fit.value))
        })
        .collect();

    let y_range = y_range.unwrap_or_else(|| {
        let mut ys: Vec<f64> = points.iter().flat_map(|&(_, y, e)| [y - e, y + e]).collect();
        ys.extend(curve.iter().map(|&(_, y)| y));
        auto_range(&ys, 0.1)
    });

    let title = format!("{} (toy {toy_id})", coef.label());
    let legend = format!(
        "fit: {} +/- {}",
        fmt_sci(fit.value, 3, false),
        fmt_sci(fit.error, 3, false)
    );
    draw_overlay(&path, &title, &legend, &points, &curve, (x0, x1), y_range)
        .map_err(|e| render_error(&path, e))?;
    Ok(path)
}

fn draw_overlay(
    path: &Path,
    title: &str,
    legend: &str,
    points: &[DataPoint],
    curve: &[(f64, f64)],
    x_range: (f64, f64),
    y_range: (f64, f64),
) -> DrawResult {
    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("sday")
        .y_desc("data / flat")
        .x_label_style(("sans-serif", 14))
        .y_label_style(("sans-serif", 14))
        .draw()?;

    for &(x, y, err) in points {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, y - err), (x, y + err)],
            BLACK.stroke_width(1),
        )))?;
    }
    chart.draw_series(points.iter().map(|&(x, y, _)| Circle::new((x, y), 3, BLACK.filled())))?;

    chart
        .draw_series(LineSeries::new(curve.iter().copied(), RED.stroke_width(2)))?
        .label(legend)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 14))
        .draw()?;

    root.present()?;
    Ok(())
}

/// `Δχ²` versus `mu` with the `Δχ² = 1` level and interval marked.
///
/// Writes `profile_chi2PDF_{label}_{toy}.svg`.
pub fn plot_profile(
    dir: &Path,
    toy_id: &str,
    fit: &CoefficientFit,
    scan: &ProfileScan,
) -> Result<PathBuf, AppError> {
    let path = dir.join(format!("profile_chi2PDF_{}_{toy_id}.svg", fit.coefficient.label()));
    let title = format!("{} (toy {toy_id})", fit.coefficient.label());
    draw_profile(&path, &title, scan).map_err(|e| render_error(&path, e))?;
    Ok(path)
}

fn draw_profile(path: &Path, title: &str, scan: &ProfileScan) -> DrawResult {
    let (x0, x1) = auto_range(&scan.mu, 0.0);
    let y_max = scan
        .delta_chi2
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(1.0_f64, f64::max)
        * 1.05;

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("mu")
        .y_desc("Δχ²")
        .x_label_formatter(&|v| fmt_sci(*v, 2, false))
        .draw()?;

    chart.draw_series(LineSeries::new(
        scan.mu
            .iter()
            .zip(&scan.delta_chi2)
            .filter(|(_, d)| d.is_finite())
            .map(|(&m, &d)| (m, d)),
        BLUE.stroke_width(2),
    ))?;

    let grey = RGBColor(120, 120, 120).stroke_width(1);
    chart.draw_series(dashed_line((x0, 1.0), (x1, 1.0), 40, grey))?;
    if let Some((lo, hi)) = scan.interval {
        for x in [lo, hi] {
            chart.draw_series(dashed_line((x, 0.0), (x, 1.0), 6, grey))?;
        }
    }

    root.present()?;
    Ok(())
}
