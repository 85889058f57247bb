//! Binned input data.
//!
//! A [`Histogram`] holds the ratio observable versus sidereal phase for one
//! toy. It is loaded either from a ROOT file (`TH1D`/`TH1F`) or from a plain
//! CSV/text export, chosen by file extension.

use std::path::Path;

use tracing::debug;

use crate::error::AppError;
use crate::root::{RawHistogram, RootError, RootFile};

/// One-dimensional histogram with explicit bin edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub name: String,
    pub title: String,
    edges: Vec<f64>,
    contents: Vec<f64>,
    /// Per-bin sum of squared weights, if known.
    sumw2: Option<Vec<f64>>,
}

impl Histogram {
    /// Build a histogram, validating shape and values.
    pub fn new(
        name: impl Into<String>,
        edges: Vec<f64>,
        contents: Vec<f64>,
        sumw2: Option<Vec<f64>>,
    ) -> Result<Self, AppError> {
        let name = name.into();
        if contents.is_empty() {
            return Err(AppError::new(3, format!("Histogram '{name}' has no bins.")));
        }
        if edges.len() != contents.len() + 1 {
            return Err(AppError::new(
                2,
                format!(
                    "Histogram '{name}': {} edges for {} bins.",
                    edges.len(),
                    contents.len()
                ),
            ));
        }
        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::new(
                2,
                format!("Histogram '{name}': bin edges must be finite and strictly increasing."),
            ));
        }
        if let Some(i) = contents.iter().position(|c| !c.is_finite()) {
            return Err(AppError::new(
                2,
                format!("Histogram '{name}': bin {i} has non-finite content."),
            ));
        }
        if let Some(w2) = &sumw2 {
            if w2.len() != contents.len() {
                return Err(AppError::new(
                    2,
                    format!(
                        "Histogram '{name}': {} sumw2 entries for {} bins.",
                        w2.len(),
                        contents.len()
                    ),
                ));
            }
            if w2.iter().any(|v| !v.is_finite()) {
                return Err(AppError::new(
                    2,
                    format!("Histogram '{name}': non-finite sum of squared weights."),
                ));
            }
        }

        Ok(Self {
            name,
            title: String::new(),
            edges,
            contents,
            sumw2,
        })
    }

    /// Uniform binning on `[x_min, x_max]`.
    pub fn uniform(
        name: impl Into<String>,
        x_min: f64,
        x_max: f64,
        contents: Vec<f64>,
        sumw2: Option<Vec<f64>>,
    ) -> Result<Self, AppError> {
        let n = contents.len().max(1);
        let width = (x_max - x_min) / n as f64;
        let edges = (0..=n).map(|i| x_min + i as f64 * width).collect();
        Self::new(name, edges, contents, sumw2)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn n_bins(&self) -> usize {
        self.contents.len()
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    pub fn sumw2(&self) -> Option<&[f64]> {
        self.sumw2.as_deref()
    }

    pub fn x_min(&self) -> f64 {
        self.edges[0]
    }

    pub fn x_max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Length of the histogram domain.
    pub fn range(&self) -> f64 {
        self.x_max() - self.x_min()
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    pub fn widths(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Sum of bin contents (flows excluded).
    pub fn sum(&self) -> f64 {
        self.contents.iter().sum()
    }

    /// Stored sum of squared weights, else the content itself.
    pub fn variance(&self, i: usize) -> f64 {
        match &self.sumw2 {
            Some(w2) => w2[i],
            None => self.contents[i],
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), AppError> {
        crate::io::hist_csv::write_hist_csv(path, self)
    }
}

impl TryFrom<RawHistogram> for Histogram {
    type Error = AppError;

    fn try_from(raw: RawHistogram) -> Result<Self, Self::Error> {
        Ok(Histogram::new(raw.name, raw.edges, raw.contents, raw.sumw2)?.with_title(raw.title))
    }
}

/// Load histogram `name` from `path`.
///
/// `.root` files are read natively; `.csv` and `.txt` use the plain-text
/// layout of [`crate::io::hist_csv`], where `name` only labels the result.
pub fn load_histogram(path: &Path, name: &str) -> Result<Histogram, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "root" => {
            let read_err = |e: RootError| {
                AppError::new(
                    2,
                    format!(
                        "Failed to read histogram '{name}' from '{}': {e}",
                        path.display()
                    ),
                )
            };
            let file = RootFile::open(path).map_err(&read_err)?;
            let raw = match file.get_histogram(name) {
                Ok(raw) => raw,
                Err(e @ RootError::KeyNotFound(_)) => {
                    let keys: Vec<String> = file
                        .list_keys()
                        .iter()
                        .map(|k| format!("{};{} ({})", k.name, k.cycle, k.class_name))
                        .collect();
                    return Err(AppError::new(
                        2,
                        format!(
                            "{}; top-level keys: {}",
                            read_err(e).message(),
                            if keys.is_empty() { "none".to_string() } else { keys.join(", ") }
                        ),
                    ));
                }
                Err(e) => return Err(read_err(e)),
            };
            if raw.underflow != 0.0 || raw.overflow != 0.0 {
                debug!(
                    histogram = %raw.name,
                    underflow = raw.underflow,
                    overflow = raw.overflow,
                    "flow bins left out of the fit"
                );
            }
            Histogram::try_from(raw)
        }
        "csv" | "txt" => crate::io::hist_csv::read_hist_csv(path, name),
        _ => Err(AppError::new(
            2,
            format!(
                "Unsupported histogram file '{}' (expected .root, .csv or .txt).",
                path.display()
            ),
        )),
    }
}
