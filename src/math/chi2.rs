//! Chi-square sums and goodness-of-fit probabilities.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// `Σ (n_i − nu_i)² / σ_i²` over bins with a positive variance.
///
/// Returns `+∞` when any used bin has a non-finite expectation.
pub fn chi_square(observed: &[f64], expected: &[f64], variances: &[f64]) -> f64 {
    let mut sum = 0.0;
    for ((&n, &nu), &var) in observed.iter().zip(expected).zip(variances) {
        if !(var > 0.0) {
            continue;
        }
        if !nu.is_finite() || var.is_infinite() {
            return f64::INFINITY;
        }
        let r = n - nu;
        sum += r * r / var;
    }
    sum
}

/// Upper-tail probability `P(X ≥ chi2)` for `ndf` degrees of freedom.
///
/// `NaN` when `ndf == 0` or `chi2` is `NaN`.
pub fn chi2_survival(chi2: f64, ndf: usize) -> f64 {
    if ndf == 0 || chi2.is_nan() {
        return f64::NAN;
    }
    if chi2 == f64::INFINITY {
        return 0.0;
    }
    match ChiSquared::new(ndf as f64) {
        Ok(dist) => dist.sf(chi2.max(0.0)),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_weighted_residuals() {
        let chi2 = chi_square(&[10.0, 12.0], &[11.0, 10.0], &[1.0, 4.0]);
        assert!((chi2 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn skips_zero_variance_bins() {
        let chi2 = chi_square(&[10.0, 0.0], &[11.0, 5.0], &[1.0, 0.0]);
        assert!((chi2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn infinite_variance_poisons_the_sum() {
        assert_eq!(chi_square(&[1.0], &[1.0], &[f64::INFINITY]), f64::INFINITY);
        assert_eq!(chi_square(&[1.0], &[f64::NAN], &[1.0]), f64::INFINITY);
    }

    #[test]
    fn survival_reference_values() {
        // P(chi2_1 >= 3.841459) = 0.05
        assert!((chi2_survival(3.841459, 1) - 0.05).abs() < 1e-6);
        // The median of chi2_2 is 2 ln 2.
        assert!((chi2_survival(2.0 * 2f64.ln(), 2) - 0.5).abs() < 1e-12);
        assert_eq!(chi2_survival(0.0, 5), 1.0);
        assert_eq!(chi2_survival(f64::INFINITY, 5), 0.0);
        assert!(chi2_survival(1.0, 0).is_nan());
    }
}
