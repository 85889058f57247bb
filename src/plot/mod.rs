//! SVG rendering with Plotters.
//!
//! - per-toy fit overlays and chi-square scans (`fit`)
//! - histograms and error-bar summaries across toys (`summary`)
//!
//! Every plot goes through a `draw_*` function returning [`DrawResult`]; the
//! public wrappers turn drawing failures into exit code 4.

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::error::AppError;
use crate::math::finite_range;

pub mod fit;
pub mod summary;

pub use fit::*;
pub use summary::*;

pub(crate) type DrawResult = Result<(), Box<dyn Error>>;

pub(crate) const PLOT_SIZE: (u32, u32) = (900, 600);

pub(crate) fn render_error(path: &Path, err: Box<dyn Error>) -> AppError {
    AppError::new(4, format!("Failed to render '{}': {err}", path.display()))
}

/// Axis range covering the finite values, padded by `pad` of the span.
///
/// A single distinct value gets a window of 10% of its magnitude (or `±1`
/// around zero); no finite values at all give `[-1, 1]`.
pub(crate) fn auto_range(values: &[f64], pad: f64) -> (f64, f64) {
    match finite_range(values) {
        Some((lo, hi)) if hi > lo => {
            let p = (hi - lo) * pad;
            (lo - p, hi + p)
        }
        Some((v, _)) => {
            let w = if v == 0.0 { 1.0 } else { 0.1 * v.abs() };
            (v - w, v + w)
        }
        None => (-1.0, 1.0),
    }
}

/// Horizontal or vertical dashed segment in chart coordinates.
pub(crate) fn dashed_line(
    from: (f64, f64),
    to: (f64, f64),
    dashes: usize,
    style: ShapeStyle,
) -> Vec<PathElement<(f64, f64)>> {
    let n = dashes.max(1);
    (0..n)
        .map(|i| {
            let t0 = i as f64 / n as f64;
            let t1 = (i as f64 + 0.5) / n as f64;
            let lerp = |t: f64| (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
            PathElement::new(vec![lerp(t0), lerp(t1)], style)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_range_pads_span() {
        let (lo, hi) = auto_range(&[0.0, 1.0, f64::NAN], 0.05);
        assert!((lo + 0.05).abs() < 1e-12);
        assert!((hi - 1.05).abs() < 1e-12);
    }

    #[test]
    fn auto_range_handles_degenerate_input() {
        assert_eq!(auto_range(&[], 0.05), (-1.0, 1.0));
        assert_eq!(auto_range(&[0.0, 0.0], 0.05), (-1.0, 1.0));
        let (lo, hi) = auto_range(&[2.0], 0.05);
        assert!((lo - 1.8).abs() < 1e-12 && (hi - 2.2).abs() < 1e-12);
    }

    #[test]
    fn dashed_line_has_requested_segments() {
        let d = dashed_line((0.0, 0.0), (0.0, 1.0), 8, BLACK.stroke_width(1));
        assert_eq!(d.len(), 8);
    }
}
