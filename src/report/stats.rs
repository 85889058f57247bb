//! Per-coefficient statistics across toys.

use serde::Serialize;

use crate::domain::Coefficient;
use crate::io::ResultTable;
use crate::math::{mean, mean_abs_rel_error, std_dev};

/// Reference values the fitted coefficients are compared against.
#[derive(Debug, Clone)]
pub enum Truth {
    /// Null test: every coefficient is expected at zero.
    Zero,
    /// Values from a result-format table. A single-row table applies to every
    /// sample; otherwise rows are matched by sample ID.
    Table(ResultTable),
}

impl Truth {
    pub fn value(&self, sample_id: &str, coef: Coefficient) -> Option<f64> {
        match self {
            Truth::Zero => Some(0.0),
            Truth::Table(table) => {
                let row = if table.rows.len() == 1 {
                    table.rows.first()
                } else {
                    table.find_sample(sample_id)
                }?;
                table.get(row, coef).map(|v| v.value)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoefficientStats {
    pub coefficient: Coefficient,
    /// Rows with a finite fitted value.
    pub n: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (`n − 1`).
    pub std: Option<f64>,
    /// `std / sqrt(n)`.
    pub mean_error: Option<f64>,
    pub pull_mean: Option<f64>,
    pub pull_std: Option<f64>,
    pub p0_mean: Option<f64>,
    /// Fraction of toys with `p0 < 0.05`.
    pub p0_below_005: Option<f64>,
    /// Only defined where the truth is non-zero.
    pub mean_abs_rel_error: Option<f64>,
}

/// Fitted values, pulls and residuals of one coefficient across the table.
#[derive(Debug, Clone, Default)]
pub struct CoefficientSeries {
    pub values: Vec<f64>,
    pub errors: Vec<f64>,
    pub p0: Vec<f64>,
    pub truths: Vec<f64>,
    /// `(value − truth) / error`, finite entries only.
    pub pulls: Vec<f64>,
    /// `value − truth`, finite entries only.
    pub residuals: Vec<f64>,
}

pub fn coefficient_series(
    table: &ResultTable,
    coef: Coefficient,
    truth: &Truth,
) -> CoefficientSeries {
    let Some(idx) = table.index_of(coef) else {
        return CoefficientSeries::default();
    };

    let mut s = CoefficientSeries::default();
    for row in &table.rows {
        let v = row.values[idx];
        s.values.push(v.value);
        s.errors.push(v.error);
        s.p0.push(v.p0);

        let t = truth.value(&row.sample_id, coef).unwrap_or(f64::NAN);
        s.truths.push(t);
        let residual = v.value - t;
        if residual.is_finite() {
            s.residuals.push(residual);
            if v.error.is_finite() && v.error > 0.0 {
                s.pulls.push(residual / v.error);
            }
        }
    }
    s
}

pub fn compute_stats(table: &ResultTable, truth: &Truth) -> Vec<CoefficientStats> {
    table
        .coefficients
        .iter()
        .map(|&coef| {
            let s = coefficient_series(table, coef, truth);
            let n = s.values.iter().filter(|v| v.is_finite()).count();
            let std = std_dev(&s.values);
            let finite_p0: Vec<f64> = s.p0.iter().copied().filter(|p| p.is_finite()).collect();
            let p0_below_005 = (!finite_p0.is_empty()).then(|| {
                finite_p0.iter().filter(|&&p| p < 0.05).count() as f64 / finite_p0.len() as f64
            });

            CoefficientStats {
                coefficient: coef,
                n,
                mean: mean(&s.values),
                std,
                mean_error: std.map(|sd| sd / (n as f64).sqrt()),
                pull_mean: mean(&s.pulls),
                pull_std: std_dev(&s.pulls),
                p0_mean: mean(&finite_p0),
                p0_below_005,
                mean_abs_rel_error: mean_abs_rel_error(&s.values, &s.truths),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CoefficientValues, ResultRow};

    fn row(id: &str, value: f64, error: f64, p0: f64) -> ResultRow {
        ResultRow {
            sample_id: id.to_string(),
            values: vec![CoefficientValues {
                value,
                error,
                chi2: 1.0,
                p0,
            }],
        }
    }

    fn table(rows: Vec<ResultRow>) -> ResultTable {
        ResultTable {
            coefficients: vec![Coefficient::CuXZ],
            rows,
        }
    }

    #[test]
    fn null_test_statistics() {
        let t = table(vec![
            row("0", 1.0, 1.0, 0.01),
            row("1", -1.0, 1.0, 0.5),
            row("2", 3.0, 2.0, 0.9),
        ]);
        let stats = compute_stats(&t, &Truth::Zero);
        let s = &stats[0];
        assert_eq!(s.n, 3);
        assert_eq!(s.mean, Some(1.0));
        assert!((s.std.unwrap() - 2.0).abs() < 1e-12);
        assert!((s.mean_error.unwrap() - 2.0 / 3f64.sqrt()).abs() < 1e-12);
        // pulls: 1, -1, 1.5
        assert!((s.pull_mean.unwrap() - 0.5).abs() < 1e-12);
        assert!((s.p0_below_005.unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.mean_abs_rel_error, None);
    }

    #[test]
    fn truth_table_single_row_applies_everywhere() {
        let truth = Truth::Table(table(vec![row("truth", 2.0, 0.0, 1.0)]));
        assert_eq!(truth.value("17", Coefficient::CuXZ), Some(2.0));
        assert_eq!(truth.value("17", Coefficient::Line), None);

        let t = table(vec![row("0", 2.2, 0.1, 0.5), row("1", 1.8, 0.1, 0.5)]);
        let s = &compute_stats(&t, &truth)[0];
        assert!((s.mean_abs_rel_error.unwrap() - 0.1).abs() < 1e-12);
        assert!(s.pull_mean.unwrap().abs() < 1e-12);
    }

    #[test]
    fn truth_table_matches_by_sample() {
        let truth = Truth::Table(table(vec![row("1", 5.0, 0.0, 1.0), row("2", 7.0, 0.0, 1.0)]));
        assert_eq!(truth.value("002", Coefficient::CuXZ), Some(7.0));
        assert_eq!(truth.value("3", Coefficient::CuXZ), None);
    }

    #[test]
    fn non_finite_rows_are_left_out() {
        let t = table(vec![row("0", f64::NAN, 1.0, f64::NAN), row("1", 2.0, 0.0, 0.2)]);
        let s = &compute_stats(&t, &Truth::Zero)[0];
        assert_eq!(s.n, 1);
        assert_eq!(s.std, None);
        assert_eq!(s.pull_mean, None);
        assert_eq!(s.p0_mean, Some(0.2));
    }
}
