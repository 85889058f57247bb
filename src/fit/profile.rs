//! Chi-square scan around the best-fit value.
//!
//! With a single free parameter the profile is the χ² curve itself, shifted so
//! its minimum sits at zero. The `Δχ² = 1` crossings give the interval.

use serde::Serialize;

use crate::error::AppError;
use crate::fit::fitter::Chi2Objective;

/// Half-width of the scan in units of the fitted error.
pub const SCAN_SIGMAS: f64 = 3.0;
pub const DEFAULT_SCAN_POINTS: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileScan {
    pub mu: Vec<f64>,
    /// `χ²(mu) − χ²_min` at each scan point.
    pub delta_chi2: Vec<f64>,
    pub chi2_min: f64,
    /// `Δχ² = 1` crossings on either side of the minimum, when both exist.
    pub interval: Option<(f64, f64)>,
}

/// Scan `χ² − χ²_min` on `[mu_hat − 3σ, mu_hat + 3σ]`.
pub fn scan_profile(
    objective: &Chi2Objective<'_>,
    mu_hat: f64,
    sigma: f64,
    n_points: usize,
) -> Result<ProfileScan, AppError> {
    if !(mu_hat.is_finite() && sigma.is_finite() && sigma > 0.0) {
        return Err(AppError::new(
            4,
            format!("Cannot scan chi-square around {mu_hat} with error {sigma}."),
        ));
    }
    if n_points < 2 {
        return Err(AppError::new(2, "A chi-square scan needs at least 2 points."));
    }

    let lo = mu_hat - SCAN_SIGMAS * sigma;
    let step = 2.0 * SCAN_SIGMAS * sigma / (n_points - 1) as f64;
    let mu: Vec<f64> = (0..n_points).map(|i| lo + i as f64 * step).collect();
    let chi2: Vec<f64> = mu.iter().map(|&m| objective.chi2(m)).collect();

    let chi2_min = chi2
        .iter()
        .copied()
        .chain(std::iter::once(objective.chi2(mu_hat)))
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, f64::min);
    let delta_chi2: Vec<f64> = chi2.iter().map(|c| c - chi2_min).collect();
    let interval = unit_interval(&mu, &delta_chi2);

    Ok(ProfileScan {
        mu,
        delta_chi2,
        chi2_min,
        interval,
    })
}

/// Linear interpolation of the `Δχ² = 1` crossings around the lowest point.
fn unit_interval(mu: &[f64], delta: &[f64]) -> Option<(f64, f64)> {
    let imin = delta
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_finite())
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)?;

    let cross = |i: usize, j: usize| {
        let (d0, d1) = (delta[i], delta[j]);
        mu[i] + (1.0 - d0) * (mu[j] - mu[i]) / (d1 - d0)
    };

    let left = (1..=imin)
        .rev()
        .find(|&i| delta[i - 1] >= 1.0 && delta[i] < 1.0)
        .map(|i| cross(i - 1, i))?;
    let right = (imin..delta.len() - 1)
        .find(|&i| delta[i] < 1.0 && delta[i + 1] >= 1.0)
        .map(|i| cross(i, i + 1))?;
    Some((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coefficient, Evaluation, SDAY_MAX};
    use crate::fit::fitter::{FitOptions, fit_coefficient};
    use crate::histogram::Histogram;
    use crate::models::{Template, expected_counts};

    fn toy() -> Histogram {
        let flat = Histogram::uniform("h", 0.0, SDAY_MAX, vec![1.0; 40], None).unwrap();
        let t = Template::for_histogram(Coefficient::CdXmYXmY, &flat);
        let nu = expected_counts(&t, &flat, 1e-3, Evaluation::Center);
        Histogram::uniform("h", 0.0, SDAY_MAX, nu, Some(vec![1e-6; 40])).unwrap()
    }

    #[test]
    fn scan_brackets_the_fit_with_unit_interval() {
        let h = toy();
        let opts = FitOptions::default();
        let fit = fit_coefficient(&h, Coefficient::CdXmYXmY, 0.5, &opts).unwrap();
        let objective = Chi2Objective::new(&h, Coefficient::CdXmYXmY, &opts);
        let scan = scan_profile(&objective, fit.value, fit.error, DEFAULT_SCAN_POINTS).unwrap();

        assert_eq!(scan.mu.len(), 1000);
        assert!((scan.mu[0] - (fit.value - 3.0 * fit.error)).abs() < 1e-15);
        assert!(scan.delta_chi2.iter().all(|d| *d >= -1e-9));
        // Quadratic chi2: the edges of the scan sit at Δχ² = 9.
        assert!((scan.delta_chi2[0] - 9.0).abs() < 0.05);

        let (lo, hi) = scan.interval.unwrap();
        assert!((lo - (fit.value - fit.error)).abs() < 1e-2 * fit.error);
        assert!((hi - (fit.value + fit.error)).abs() < 1e-2 * fit.error);
    }

    #[test]
    fn rejects_invalid_error() {
        let h = toy();
        let objective = Chi2Objective::new(&h, Coefficient::CdXmYXmY, &FitOptions::default());
        let err = scan_profile(&objective, 0.0, f64::NAN, 100).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        let err = scan_profile(&objective, 0.0, 1e-3, 1).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn interval_needs_both_crossings() {
        let mu = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(unit_interval(&mu, &[0.0, 0.5, 2.0, 4.0]), None);
        let (lo, hi) = unit_interval(&mu, &[2.0, 0.0, 0.0, 3.0]).unwrap();
        assert!((lo - 0.5).abs() < 1e-12);
        assert!((hi - (2.0 + 1.0 / 3.0)).abs() < 1e-12);
    }
}
