//! Low-level fitting routines for a single (toy, coefficient) pair.
//!
//! Given:
//! - a histogram `n_i` with per-bin variances `σ_i²`
//! - a template `f(x; mu)` turned into expected counts `nu_i(mu)`
//! - a symmetric bound `|mu| ≤ bound`
//!
//! we:
//! - minimise `χ²(mu) = Σ (n_i − nu_i(mu))² / σ_i²` with a bounded Brent search
//! - take the parabolic error `σ_mu = sqrt(2 / χ''(mu_hat))`
//! - cross-check with a weighted least-squares estimate linearised at `mu = 0`
//! - report `χ²`, `ndf = n_bins − 1` and the survival probability

use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::brent::BrentOpt;
use tracing::{debug, warn};

use crate::domain::{Bounds, Coefficient, CoefficientFit, DataErrorKind, Evaluation};
use crate::error::AppError;
use crate::histogram::Histogram;
use crate::math::{chi2_survival, chi_square, solve_weighted};
use crate::models::{Template, expected_counts, expected_slope};

/// Fitting options shared by every coefficient of a run.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub data_error: DataErrorKind,
    pub evaluation: Evaluation,
    /// Brent tolerance on `mu` (relative part; the absolute part is fixed).
    pub tolerance: f64,
    pub max_iters: u64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            data_error: DataErrorKind::Sumw2,
            evaluation: Evaluation::Center,
            tolerance: 1e-10,
            max_iters: 500,
        }
    }
}

/// Absolute Brent tolerance on `mu`.
const BRENT_ABS_TOL: f64 = 1e-12;

/// `χ²(mu)` for one histogram and template.
#[derive(Debug, Clone)]
pub struct Chi2Objective<'a> {
    hist: &'a Histogram,
    template: Template,
    data_error: DataErrorKind,
    evaluation: Evaluation,
    /// Data-driven variances; unused for `DataErrorKind::Expected`.
    variances: Vec<f64>,
}

impl<'a> Chi2Objective<'a> {
    pub fn new(hist: &'a Histogram, coef: Coefficient, opts: &FitOptions) -> Self {
        let variances = (0..hist.n_bins())
            .map(|i| match opts.data_error {
                DataErrorKind::Sumw2 => hist.variance(i),
                DataErrorKind::Poisson | DataErrorKind::Expected => hist.contents()[i],
            })
            .collect();
        Self {
            hist,
            template: Template::for_histogram(coef, hist),
            data_error: opts.data_error,
            evaluation: opts.evaluation,
            variances,
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn histogram(&self) -> &Histogram {
        self.hist
    }

    pub fn expected(&self, mu: f64) -> Vec<f64> {
        expected_counts(&self.template, self.hist, mu, self.evaluation)
    }

    /// Per-bin variances at `mu`. Non-positive entries mark skipped bins.
    pub fn variances(&self, expected: &[f64]) -> Vec<f64> {
        match self.data_error {
            DataErrorKind::Sumw2 | DataErrorKind::Poisson => self.variances.clone(),
            DataErrorKind::Expected => expected
                .iter()
                .map(|&nu| if nu > 0.0 { nu } else { f64::INFINITY })
                .collect(),
        }
    }

    /// Bins left out of the sum because their data variance is not positive.
    pub fn skipped_bins(&self) -> usize {
        match self.data_error {
            DataErrorKind::Expected => 0,
            _ => self.variances.iter().filter(|v| !(**v > 0.0)).count(),
        }
    }

    pub fn chi2(&self, mu: f64) -> f64 {
        let expected = self.expected(mu);
        let variances = self.variances(&expected);
        chi_square(self.hist.contents(), &expected, &variances)
    }
}

impl CostFunction for Chi2Objective<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, mu: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok(self.chi2(*mu))
    }
}

/// Outcome of the bounded one-dimensional minimisation.
#[derive(Debug, Clone, Copy)]
struct Minimum {
    mu: f64,
    chi2: f64,
    iterations: u64,
    converged: bool,
}

fn minimize(
    objective: &Chi2Objective<'_>,
    bound: f64,
    opts: &FitOptions,
) -> Result<Minimum, AppError> {
    let solver = BrentOpt::new(-bound, bound).set_tolerance(opts.tolerance, BRENT_ABS_TOL);
    let res = Executor::new(objective.clone(), solver)
        .configure(|state| state.max_iters(opts.max_iters))
        .run()
        .map_err(|e| AppError::new(4, format!("Minimisation failed: {e}")))?;

    let state = res.state();
    let mu = state.get_best_param().copied().unwrap_or(f64::NAN);
    let converged = matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    Ok(Minimum {
        mu,
        chi2: state.get_best_cost(),
        iterations: state.get_iter(),
        converged,
    })
}

/// Parabolic error `sqrt(2 / χ'')` from a central second difference.
///
/// The step starts at `1e-4` of the parameter range and is refined once to a
/// tenth of the first error estimate.
pub fn parabolic_error(objective: &Chi2Objective<'_>, mu: f64, bound: f64) -> f64 {
    let c0 = objective.chi2(mu);
    let sigma_for = |h: f64| {
        let d2 = (objective.chi2(mu + h) - 2.0 * c0 + objective.chi2(mu - h)) / (h * h);
        if d2.is_finite() && d2 > 0.0 {
            (2.0 / d2).sqrt()
        } else {
            f64::NAN
        }
    };

    let first = sigma_for(1e-4 * 2.0 * bound);
    if !first.is_finite() {
        return first;
    }
    let refined = sigma_for(0.1 * first);
    if refined.is_finite() { refined } else { first }
}

/// Weighted least-squares estimate of `mu` from the expectation linearised at `mu = 0`.
pub fn linearized_estimate(objective: &Chi2Objective<'_>) -> Option<f64> {
    let hist = objective.histogram();
    let base = objective.expected(0.0);
    let slope = expected_slope(objective.template(), hist, objective.evaluation);
    let variances = objective.variances(&base);

    let rows: Vec<Vec<f64>> = slope.iter().map(|&d| vec![d]).collect();
    let residual: Vec<f64> = hist
        .contents()
        .iter()
        .zip(&base)
        .map(|(n, nu)| n - nu)
        .collect();
    let weights: Vec<f64> = variances
        .iter()
        .map(|&v| if v > 0.0 { 1.0 / v } else { 0.0 })
        .collect();

    solve_weighted(&rows, &residual, &weights).map(|beta| beta[0])
}

/// Fit one coefficient on one histogram.
pub fn fit_coefficient(
    hist: &Histogram,
    coef: Coefficient,
    bound: f64,
    opts: &FitOptions,
) -> Result<CoefficientFit, AppError> {
    if hist.n_bins() < 2 {
        return Err(AppError::new(
            3,
            format!(
                "Histogram '{}' has {} bin(s); at least 2 are needed.",
                hist.name,
                hist.n_bins()
            ),
        ));
    }
    if !(bound.is_finite() && bound > 0.0) {
        return Err(AppError::new(2, format!("Invalid parameter bound {bound} for {coef}.")));
    }

    let objective = Chi2Objective::new(hist, coef, opts);
    let linearized = linearized_estimate(&objective);
    let mut min = minimize(&objective, bound, opts)?;

    if !min.converged || !min.mu.is_finite() || !min.chi2.is_finite() {
        warn!(
            coefficient = %coef,
            iterations = min.iterations,
            "minimiser did not converge; using linearised estimate"
        );
        if let Some(mu) = linearized.filter(|v| v.is_finite()) {
            let mu = mu.clamp(-bound, bound);
            min.mu = mu;
            min.chi2 = objective.chi2(mu);
        }
    }

    let at_bound = min.mu.abs() >= bound * (1.0 - 1e-6);
    if at_bound {
        warn!(
            coefficient = %coef,
            mu = min.mu,
            bound,
            "fit converged at parameter bound"
        );
    }

    let error = parabolic_error(&objective, min.mu, bound);
    let ndf = hist.n_bins() - 1;
    let p0 = chi2_survival(min.chi2, ndf);

    debug!(
        coefficient = %coef,
        mu = min.mu,
        error,
        chi2 = min.chi2,
        ndf,
        p0,
        iterations = min.iterations,
        "fit done"
    );

    Ok(CoefficientFit {
        coefficient: coef,
        value: min.mu,
        error,
        chi2: min.chi2,
        ndf,
        p0,
        converged: min.converged,
        iterations: min.iterations,
        at_bound,
        linearized,
    })
}

/// Fit every requested coefficient on one histogram, in the given order.
pub fn fit_histogram(
    hist: &Histogram,
    coefficients: &[Coefficient],
    bounds: &Bounds,
    opts: &FitOptions,
) -> Result<Vec<CoefficientFit>, AppError> {
    if let Some(first) = coefficients.first() {
        let skipped = Chi2Objective::new(hist, *first, opts).skipped_bins();
        if skipped > 0 {
            warn!(
                histogram = %hist.name,
                skipped,
                "bins with non-positive variance are left out of the chi-square"
            );
        }
    }

    coefficients
        .iter()
        .map(|&coef| fit_coefficient(hist, coef, bounds.for_coefficient(coef), opts))
        .collect()
}
