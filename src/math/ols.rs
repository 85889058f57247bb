//! Weighted least squares solver.
//!
//! The fitter cross-checks every minimisation with a linearised estimate:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! where `y_i` is the residual of the data against the `mu = 0` expectation and
//! `x_i` the derivative of the expectation with respect to `mu`.
//!
//! Implementation choices:
//! - Rows are scaled by `sqrt(w_i)` and solved as ordinary least squares.
//! - SVD handles tall design matrices (many bins, one or few columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Weighted least squares: rows with non-positive or non-finite weight are dropped.
pub fn solve_weighted(rows: &[Vec<f64>], y: &[f64], w: &[f64]) -> Option<DVector<f64>> {
    let p = rows.first()?.len();
    let keep: Vec<usize> = (0..rows.len())
        .filter(|&i| w[i].is_finite() && w[i] > 0.0 && y[i].is_finite())
        .collect();
    if keep.len() < p || p == 0 {
        return None;
    }

    let mut xw = DMatrix::<f64>::zeros(keep.len(), p);
    let mut yw = DVector::<f64>::zeros(keep.len());
    for (r, &i) in keep.iter().enumerate() {
        let sw = w[i].sqrt();
        for j in 0..p {
            xw[(r, j)] = rows[i][j] * sw;
        }
        yw[r] = y[i] * sw;
    }
    solve_least_squares(&xw, &yw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn weighted_slope_through_origin() {
        // y = 0.5 x, with one wild point carrying zero weight.
        let rows = vec![vec![1.0], vec![2.0], vec![4.0], vec![3.0]];
        let y = [0.5, 1.0, 2.0, 100.0];
        let w = [1.0, 4.0, 0.25, 0.0];
        let beta = solve_weighted(&rows, &y, &w).unwrap();
        assert!((beta[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn too_few_rows_is_none() {
        assert!(solve_weighted(&[vec![1.0, 2.0]], &[1.0], &[1.0]).is_none());
        assert!(solve_weighted(&[], &[], &[]).is_none());
    }
}
