//! Template evaluation for the sidereal-modulation models.
//!
//! Every coefficient maps to a one-parameter shape in the phase `x`:
//!
//! ```text
//! trig:  f(x; mu) = 1 + mu * (a cos(kx) + b sin(kx))
//! line:  f(x; mu) = (1 + mu) / L
//! ```
//!
//! The fitter relies on two primitive operations:
//! - closed-form integrals of `f` over arbitrary intervals
//! - expected bin contents for a histogram at a given `mu`
//!
//! Trig templates are normalised over the histogram range, so only their shape
//! enters the fit. The line template is a flat level and is not normalised:
//! normalising it would make it independent of `mu`.

use crate::domain::{Coefficient, Evaluation};
use crate::histogram::Histogram;

/// Harmonic, cos and sin amplitudes of a trigonometric template.
fn trig_terms(coef: Coefficient) -> Option<(f64, f64, f64)> {
    let terms = match coef {
        Coefficient::DuXZ => (1.0, 6.28069, -41.0569),
        Coefficient::DuYZ => (1.0, 41.0569, 6.28069),
        Coefficient::DuXmYXmY => (2.0, 77.6067, 24.3128),
        Coefficient::DuXY => (2.0, -48.6256, 155.213),
        Coefficient::CuXZ => (1.0, 8.084, -52.8451),
        Coefficient::CuYZ => (1.0, 52.8451, 8.084),
        Coefficient::CuXmYXmY => (2.0, 99.8891, 31.2935),
        Coefficient::CuXY => (2.0, -62.5869, 199.778),
        Coefficient::CdXZ => (1.0, 0.181551, -1.1868),
        Coefficient::CdYZ => (1.0, 1.1868, 0.181551),
        Coefficient::CdXmYXmY => (2.0, 2.24331, 0.702788),
        Coefficient::CdXY => (2.0, -1.40558, 4.48662),
        Coefficient::Line => return None,
    };
    Some(terms)
}

/// A coefficient's template, bound to a domain length for the line case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Template {
    Trig { k: f64, a: f64, b: f64 },
    Line { length: f64 },
}

impl Template {
    /// `length` is the domain length `L`; only the line template uses it.
    pub fn new(coef: Coefficient, length: f64) -> Self {
        match trig_terms(coef) {
            Some((k, a, b)) => Template::Trig { k, a, b },
            None => Template::Line { length },
        }
    }

    pub fn for_histogram(coef: Coefficient, hist: &Histogram) -> Self {
        Self::new(coef, hist.range())
    }

    pub fn evaluate(&self, x: f64, mu: f64) -> f64 {
        match *self {
            Template::Trig { .. } => 1.0 + mu * self.modulation(x),
            Template::Line { length } => (1.0 + mu) / length,
        }
    }

    /// `∂f/∂mu` at `x`.
    pub fn modulation(&self, x: f64) -> f64 {
        match *self {
            Template::Trig { k, a, b } => a * (k * x).cos() + b * (k * x).sin(),
            Template::Line { length } => 1.0 / length,
        }
    }

    /// `∫_{x0}^{x1} f(x; mu) dx`.
    pub fn integral(&self, x0: f64, x1: f64, mu: f64) -> f64 {
        match *self {
            Template::Trig { .. } => (x1 - x0) + mu * self.modulation_integral(x0, x1),
            Template::Line { length } => (1.0 + mu) * (x1 - x0) / length,
        }
    }

    fn modulation_integral(&self, x0: f64, x1: f64) -> f64 {
        match *self {
            Template::Trig { k, a, b } => {
                let sin = (k * x1).sin() - (k * x0).sin();
                let cos = (k * x1).cos() - (k * x0).cos();
                (a * sin - b * cos) / k
            }
            Template::Line { length } => (x1 - x0) / length,
        }
    }

    /// Per-bin `(∫ 1, ∫ modulation)` under the chosen evaluation.
    fn bin_terms(&self, hist: &Histogram, evaluation: Evaluation) -> Vec<(f64, f64)> {
        let edges = hist.edges();
        edges
            .windows(2)
            .map(|w| {
                let width = w[1] - w[0];
                let shape = match evaluation {
                    Evaluation::Center => self.modulation(0.5 * (w[0] + w[1])) * width,
                    Evaluation::Integrate => self.modulation_integral(w[0], w[1]),
                };
                (width, shape)
            })
            .collect()
    }
}

/// Expected bin contents at `mu`.
///
/// Trig: `nu_i = N * (w_i + mu * s_i) / I(mu)` with `s_i` the bin's modulation
/// term and `I(mu)` the template integral over the histogram range.
/// Line: `nu_i = N * w_i * (1 + mu) / L`.
///
/// A non-positive normalisation yields `NaN` expectations.
pub fn expected_counts(
    template: &Template,
    hist: &Histogram,
    mu: f64,
    evaluation: Evaluation,
) -> Vec<f64> {
    let total = hist.sum();
    let terms = template.bin_terms(hist, evaluation);
    match *template {
        Template::Trig { .. } => {
            let norm = template.integral(hist.x_min(), hist.x_max(), mu);
            if !(norm.is_finite() && norm > 0.0) {
                return vec![f64::NAN; terms.len()];
            }
            terms
                .iter()
                .map(|&(width, shape)| total * (width + mu * shape) / norm)
                .collect()
        }
        Template::Line { length } => terms
            .iter()
            .map(|&(width, _)| total * width * (1.0 + mu) / length)
            .collect(),
    }
}

/// Template at `x` relative to a flat distribution with the same total.
///
/// Trig: `f(x; mu) * L / I(mu)`. Line: `1 + mu`. Data drawn as
/// `content_i * L / (N * w_i)` sits on the same scale.
pub fn relative_shape(template: &Template, hist: &Histogram, x: f64, mu: f64) -> f64 {
    match *template {
        Template::Trig { .. } => {
            let norm = template.integral(hist.x_min(), hist.x_max(), mu);
            template.evaluate(x, mu) * hist.range() / norm
        }
        Template::Line { .. } => 1.0 + mu,
    }
}

/// `∂nu_i/∂mu` at `mu = 0` (used for the linearised estimate).
pub fn expected_slope(template: &Template, hist: &Histogram, evaluation: Evaluation) -> Vec<f64> {
    let total = hist.sum();
    let terms = template.bin_terms(hist, evaluation);
    match *template {
        Template::Trig { .. } => {
            let length = hist.range();
            let shape_total = template.modulation_integral(hist.x_min(), hist.x_max());
            let norm = length * length;
            terms
                .iter()
                .map(|&(width, shape)| total * (shape * length - width * shape_total) / norm)
                .collect()
        }
        Template::Line { length } => terms
            .iter()
            .map(|&(width, _)| total * width / length)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SDAY_MAX;

    fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64, n: usize) -> f64 {
        let h = (b - a) / n as f64;
        let mut s = f(a) + f(b);
        for i in 1..n {
            let x = a + i as f64 * h;
            s += if i % 2 == 1 { 4.0 * f(x) } else { 2.0 * f(x) };
        }
        s * h / 3.0
    }

    fn flat(n: usize) -> Histogram {
        Histogram::uniform("h", 0.0, SDAY_MAX, vec![100.0; n], None).unwrap()
    }

    #[test]
    fn trig_integral_matches_quadrature() {
        for coef in Coefficient::TRIG {
            let t = Template::new(coef, SDAY_MAX);
            let closed = t.integral(0.3, 2.9, 0.01);
            let numeric = simpson(|x| t.evaluate(x, 0.01), 0.3, 2.9, 2000);
            assert!((closed - numeric).abs() < 1e-8, "{coef}: {closed} vs {numeric}");
        }
    }

    #[test]
    fn trig_evaluate_matches_table() {
        let t = Template::new(Coefficient::DuXZ, SDAY_MAX);
        let x = 0.7_f64;
        let expected = 1.0 + 0.1 * (6.28069 * x.cos() - 41.0569 * x.sin());
        assert!((t.evaluate(x, 0.1) - expected).abs() < 1e-12);

        let t = Template::new(Coefficient::CdXY, SDAY_MAX);
        let expected = 1.0 + 0.2 * (-1.40558 * (2.0 * x).cos() + 4.48662 * (2.0 * x).sin());
        assert!((t.evaluate(x, 0.2) - expected).abs() < 1e-12);
    }

    #[test]
    fn integrated_trig_expectation_preserves_total() {
        let h = flat(24);
        let t = Template::for_histogram(Coefficient::CuXY, &h);
        let nu = expected_counts(&t, &h, 0.003, Evaluation::Integrate);
        let total: f64 = nu.iter().sum();
        assert!((total - h.sum()).abs() < 1e-9);
    }

    #[test]
    fn zero_mu_gives_flat_expectation() {
        let h = flat(12);
        for coef in Coefficient::ALL {
            let t = Template::for_histogram(coef, &h);
            for nu in expected_counts(&t, &h, 0.0, Evaluation::Center) {
                assert!((nu - 100.0).abs() < 1e-9, "{coef}: {nu}");
            }
        }
    }

    #[test]
    fn line_scales_with_one_plus_mu() {
        let h = flat(10);
        let t = Template::for_histogram(Coefficient::Line, &h);
        let nu = expected_counts(&t, &h, 0.5, Evaluation::Center);
        assert!(nu.iter().all(|&v| (v - 150.0).abs() < 1e-9));
        assert!((t.evaluate(1.0, 0.5) - 1.5 / SDAY_MAX).abs() < 1e-12);
    }

    #[test]
    fn relative_shape_reproduces_centre_expectation() {
        let h = flat(20);
        for coef in [Coefficient::CuXZ, Coefficient::Line] {
            let t = Template::for_histogram(coef, &h);
            let nu = expected_counts(&t, &h, 0.004, Evaluation::Center);
            let scale = h.sum() / h.range();
            for ((c, w), n) in h.centers().into_iter().zip(h.widths()).zip(nu) {
                let r = relative_shape(&t, &h, c, 0.004) * scale * w;
                assert!((r - n).abs() < 1e-9, "{coef}: {r} vs {n}");
            }
        }
    }

    #[test]
    fn slope_matches_finite_difference() {
        let h = flat(16);
        for coef in [Coefficient::DuYZ, Coefficient::CdXmYXmY, Coefficient::Line] {
            let t = Template::for_histogram(coef, &h);
            let eps = 1e-6;
            let up = expected_counts(&t, &h, eps, Evaluation::Integrate);
            let down = expected_counts(&t, &h, -eps, Evaluation::Integrate);
            let slope = expected_slope(&t, &h, Evaluation::Integrate);
            for i in 0..h.n_bins() {
                let fd = (up[i] - down[i]) / (2.0 * eps);
                let tol = 1e-4 * fd.abs().max(1.0);
                assert!((fd - slope[i]).abs() < tol, "{coef} bin {i}");
            }
        }
    }
}
