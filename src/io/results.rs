//! The space-separated result table written by `liv fit`.
//!
//! One line per toy:
//!
//! ```text
//! <toy id> <v> <e> <c> <p> <v> <e> <c> <p> ... \n
//! ```
//!
//! with one `(value, error, chi2 statistic, p-value)` block per coefficient in
//! [`Coefficient::ALL`] order, every field followed by a single space. Numbers
//! are written with [`fmt_repr`] so every value reads back exactly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{ChiSquareStat, Coefficient, CoefficientValues, ResultRow, ToyFit};
use crate::error::AppError;
use crate::report::fmt_repr;

/// Streams toy rows to a result file.
pub struct ResultWriter<W: Write> {
    out: W,
    stat: ChiSquareStat,
    rows: usize,
}

impl ResultWriter<BufWriter<File>> {
    pub fn create(path: &Path, stat: ChiSquareStat) -> Result<Self, AppError> {
        let file = File::create(path).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create result file '{}': {e}", path.display()),
            )
        })?;
        Ok(Self::new(BufWriter::new(file), stat))
    }
}

impl<W: Write> ResultWriter<W> {
    pub fn new(out: W, stat: ChiSquareStat) -> Self {
        Self { out, stat, rows: 0 }
    }

    pub fn write_toy(&mut self, toy: &ToyFit) -> Result<(), AppError> {
        let mut line = String::with_capacity(16 + toy.fits.len() * 4 * 24);
        line.push_str(&toy.toy_id);
        line.push(' ');
        for fit in &toy.fits {
            for v in [fit.value, fit.error, fit.chi2_stat(self.stat), fit.p0] {
                line.push_str(&fmt_repr(v));
                line.push(' ');
            }
        }
        line.push('\n');

        self.out
            .write_all(line.as_bytes())
            .map_err(|e| AppError::new(2, format!("Failed to write result row: {e}")))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Push buffered rows through to the underlying writer.
    pub fn flush(&mut self) -> Result<(), AppError> {
        self.out
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to flush result file: {e}")))
    }

    pub fn finish(mut self) -> Result<W, AppError> {
        self.flush()?;
        Ok(self.out)
    }
}

/// A result file read back into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub coefficients: Vec<Coefficient>,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn index_of(&self, coef: Coefficient) -> Option<usize> {
        self.coefficients.iter().position(|&c| c == coef)
    }

    /// All rows' values for one coefficient, in row order.
    pub fn values(&self, coef: Coefficient) -> Vec<CoefficientValues> {
        match self.index_of(coef) {
            Some(i) => self.rows.iter().map(|r| r.values[i]).collect(),
            None => Vec::new(),
        }
    }

    pub fn find_sample(&self, id: &str) -> Option<&ResultRow> {
        self.rows
            .iter()
            .find(|r| crate::io::toy_list::same_sample_id(&r.sample_id, id))
    }

    pub fn get(&self, row: &ResultRow, coef: Coefficient) -> Option<CoefficientValues> {
        self.index_of(coef).map(|i| row.values[i])
    }
}

/// `sample ID`, then `{label}`, `{label}_err`, `{label}_chi2_ndf`, `{label}_chi2_p0`
/// per coefficient.
pub fn column_names(coefficients: &[Coefficient]) -> Vec<String> {
    let mut names = vec!["sample ID".to_string()];
    for c in coefficients {
        let l = c.label();
        names.extend([
            l.to_string(),
            format!("{l}_err"),
            format!("{l}_chi2_ndf"),
            format!("{l}_chi2_p0"),
        ]);
    }
    names
}

/// Coefficient set implied by a row's field count.
fn infer_coefficients(n_fields: usize) -> Option<Vec<Coefficient>> {
    if n_fields == 1 + 4 * Coefficient::ALL.len() {
        Some(Coefficient::ALL.to_vec())
    } else if n_fields == 1 + 4 * Coefficient::TRIG.len() {
        Some(Coefficient::TRIG.to_vec())
    } else {
        None
    }
}

/// Read a result file. Without `coefficients`, the set is inferred from the
/// column count (13 or 12 coefficients).
pub fn read_results(
    path: &Path,
    coefficients: Option<&[Coefficient]>,
) -> Result<ResultTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            AppError::new(
                2,
                format!("Failed to open result file '{}': {e}", path.display()),
            )
        })?;

    let mut coefs: Option<Vec<Coefficient>> = coefficients.map(<[Coefficient]>::to_vec);
    let mut rows = Vec::new();

    for (line_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            AppError::new(
                2,
                format!(
                    "Failed to read '{}' line {}: {e}",
                    path.display(),
                    line_no + 1
                ),
            )
        })?;
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }

        if coefs.is_none() {
            let inferred = infer_coefficients(fields.len()).ok_or_else(|| {
                AppError::new(
                    2,
                    format!(
                        "'{}' line {}: {} columns, expected {} or {}",
                        path.display(),
                        line_no + 1,
                        fields.len(),
                        1 + 4 * Coefficient::ALL.len(),
                        1 + 4 * Coefficient::TRIG.len()
                    ),
                )
            })?;
            coefs = Some(inferred);
        }
        let set = coefs.as_deref().unwrap_or_default();
        if fields.len() != 1 + 4 * set.len() {
            return Err(AppError::new(
                2,
                format!(
                    "'{}' line {}: {} columns, expected {}",
                    path.display(),
                    line_no + 1,
                    fields.len(),
                    1 + 4 * set.len()
                ),
            ));
        }

        let mut nums = Vec::with_capacity(fields.len() - 1);
        for (col, f) in fields.iter().enumerate().skip(1) {
            let v: f64 = f.parse().map_err(|_| {
                let names = column_names(set);
                AppError::new(
                    2,
                    format!(
                        "'{}' line {} column {} ({}): '{f}' is not a number",
                        path.display(),
                        line_no + 1,
                        col + 1,
                        names[col]
                    ),
                )
            })?;
            nums.push(v);
        }
        let values = nums
            .chunks_exact(4)
            .map(|c| CoefficientValues {
                value: c[0],
                error: c[1],
                chi2: c[2],
                p0: c[3],
            })
            .collect();

        rows.push(ResultRow {
            sample_id: fields[0].to_string(),
            values,
        });
    }

    if rows.is_empty() {
        return Err(AppError::new(3, format!("Result file '{}' has no rows.", path.display())));
    }

    Ok(ResultTable {
        coefficients: coefs.unwrap_or_else(|| Coefficient::ALL.to_vec()),
        rows,
    })
}
