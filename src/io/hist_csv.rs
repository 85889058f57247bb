//! Plain-text histogram files.
//!
//! One row per bin, with a header:
//!
//! ```text
//! low,high,content,error
//! 0,0.314159,1.0003,0.0021
//! ```
//!
//! `error` is the per-bin standard error (`sqrt(sumw2)`). It may be left empty
//! on every row, in which case the content doubles as the variance.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::histogram::Histogram;

/// Relative tolerance when checking that consecutive bins touch.
const EDGE_TOL: f64 = 1e-9;

#[derive(Debug, Serialize, Deserialize)]
struct BinRow {
    low: f64,
    high: f64,
    content: f64,
    error: Option<f64>,
}

pub fn read_hist_csv(path: &Path, name: &str) -> Result<Histogram, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(|e| {
            AppError::new(
                2,
                format!("Failed to open histogram '{}': {e}", path.display()),
            )
        })?;

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<BinRow>().enumerate() {
        let row = record.map_err(|e| {
            AppError::new(
                2,
                format!("Invalid histogram row {} in '{}': {e}", i + 1, path.display()),
            )
        })?;
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(AppError::new(
            3,
            format!("Histogram file '{}' has no bins.", path.display()),
        ));
    }

    let mut edges = Vec::with_capacity(rows.len() + 1);
    edges.push(rows[0].low);
    for (i, pair) in rows.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        let scale = prev.high.abs().max(next.low.abs()).max(1.0);
        if (prev.high - next.low).abs() > EDGE_TOL * scale {
            return Err(AppError::new(
                2,
                format!(
                    "Histogram '{}': bin {} ends at {} but bin {} starts at {}.",
                    path.display(),
                    i + 1,
                    prev.high,
                    i + 2,
                    next.low
                ),
            ));
        }
        edges.push(prev.high);
    }
    edges.push(rows[rows.len() - 1].high);

    let contents: Vec<f64> = rows.iter().map(|r| r.content).collect();
    let n_errors = rows.iter().filter(|r| r.error.is_some()).count();
    let sumw2 = match n_errors {
        0 => None,
        n if n == rows.len() => Some(rows.iter().map(|r| r.error.unwrap_or(0.0).powi(2)).collect()),
        _ => {
            return Err(AppError::new(
                2,
                format!(
                    "Histogram '{}': the error column must be filled on every row or on none.",
                    path.display()
                ),
            ));
        }
    };

    Histogram::new(name, edges, contents, sumw2)
}

pub fn write_hist_csv(path: &Path, hist: &Histogram) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create histogram CSV '{}': {e}", path.display()),
        )
    })?;

    let edges = hist.edges();
    for (i, &content) in hist.contents().iter().enumerate() {
        let row = BinRow {
            low: edges[i],
            high: edges[i + 1],
            content,
            error: hist.sumw2().map(|w2| w2[i].sqrt()),
        };
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write histogram CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush histogram CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reads_bins_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "h.csv",
            "low,high,content,error\n0,1,2.0,0.5\n1,2,3.0,0.25\n",
        );
        let h = read_hist_csv(&path, "h_generated").unwrap();
        assert_eq!(h.edges(), &[0.0, 1.0, 2.0]);
        assert_eq!(h.contents(), &[2.0, 3.0]);
        assert_eq!(h.sumw2(), Some(&[0.25, 0.0625][..]));
    }

    #[test]
    fn empty_error_column_means_no_sumw2() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "h.txt", "low,high,content,error\n0,1,2.0,\n1,2,3.0,\n");
        let h = read_hist_csv(&path, "h").unwrap();
        assert!(h.sumw2().is_none());
        assert_eq!(h.variance(0), 2.0);
    }

    #[test]
    fn gaps_between_bins_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "h.csv", "low,high,content,error\n0,1,2.0,\n1.5,2,3.0,\n");
        let err = read_hist_csv(&path, "h").unwrap_err();
        assert!(err.message().contains("starts at 1.5"));
    }

    #[test]
    fn header_only_file_has_no_bins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "h.csv", "low,high,content,error\n");
        assert_eq!(read_hist_csv(&path, "h").unwrap_err().exit_code(), 3);
    }

    #[test]
    fn write_then_read_keeps_histogram() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let h = Histogram::uniform(
            "h",
            0.0,
            3.0,
            vec![1.0, 2.0, 3.0],
            Some(vec![0.04, 0.09, 0.16]),
        )
        .unwrap();
        write_hist_csv(&path, &h).unwrap();
        let back = read_hist_csv(&path, "h").unwrap();
        assert_eq!(back.contents(), h.contents());
        for (a, b) in back.sumw2().unwrap().iter().zip(h.sumw2().unwrap()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
