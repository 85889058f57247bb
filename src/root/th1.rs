//! `TH1D` / `TH1F` streamers.
//!
//! Layout of the fields we consume:
//!
//! ```text
//! TH1D | TH1F           version + byte count
//!   TH1                 version + byte count
//!     TNamed            fName, fTitle
//!     TAttLine/Fill/Marker  skipped by byte count
//!     fNcells           i32
//!     fXaxis            TAxis (fNbins, fXmin, fXmax, fXbins)
//!     fYaxis, fZaxis    skipped by byte count
//!     stats             fBarOffset, fBarWidth, 5 sums, fMaximum, fMinimum, fNormFactor
//!     fContour          TArrayD
//!     fSumw2            TArrayD
//!     ...               skipped up to the end of TH1
//!   TArrayD | TArrayF   fNcells bin contents, underflow first
//! ```

use super::error::{Result, RootError};
use super::rbuffer::Cursor;

/// Histogram as stored in the file, flows split off.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHistogram {
    pub name: String,
    pub title: String,
    /// `n_bins + 1` edges.
    pub edges: Vec<f64>,
    pub contents: Vec<f64>,
    /// Per-bin sum of squared weights, when the histogram stored them.
    pub sumw2: Option<Vec<f64>>,
    pub underflow: f64,
    pub overflow: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Precision {
    Double,
    Float,
}

impl Precision {
    pub(crate) fn for_class(class: &str) -> Option<Self> {
        match class {
            "TH1D" => Some(Precision::Double),
            "TH1F" => Some(Precision::Float),
            _ => None,
        }
    }
}

struct Axis {
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    /// Only filled for variable-width binning.
    edges: Vec<f64>,
}

impl Axis {
    fn edges(&self) -> Vec<f64> {
        if self.edges.len() == self.n_bins + 1 {
            return self.edges.clone();
        }
        let width = (self.x_max - self.x_min) / self.n_bins as f64;
        (0..=self.n_bins)
            .map(|i| self.x_min + i as f64 * width)
            .collect()
    }
}

pub(crate) fn read_th1(payload: &[u8], precision: Precision) -> Result<RawHistogram> {
    let mut c = Cursor::new(payload);
    let (_, _outer_end) = c.read_version()?;

    let (th1_version, th1_end) = c.read_version()?;
    let th1_end =
        th1_end.ok_or_else(|| RootError::Malformed("TH1 written without byte count".into()))?;

    let (name, title) = c.read_tnamed()?;
    c.skip_object("TAttLine")?;
    c.skip_object("TAttFill")?;
    c.skip_object("TAttMarker")?;

    let n_cells = c.read_i32()?;
    let axis = read_axis(&mut c)?;
    c.skip_object("fYaxis")?;
    c.skip_object("fZaxis")?;

    let _bar_offset = c.read_i16()?;
    let _bar_width = c.read_i16()?;
    // fEntries, fTsumw, fTsumw2, fTsumwx, fTsumwx2
    c.skip(5 * 8)?;
    if th1_version >= 2 {
        // fMaximum, fMinimum
        c.skip(2 * 8)?;
    }
    if th1_version >= 3 {
        let _norm_factor = c.read_f64()?;
    }
    let _contour = c.read_array_f64()?;
    let sumw2 = c.read_array_f64()?;
    c.seek(th1_end)?;

    let cells = match precision {
        Precision::Double => c.read_array_f64()?,
        Precision::Float => c.read_array_f32()?,
    };

    let n_bins = axis.n_bins;
    if n_cells < 0 || cells.len() != n_cells as usize || cells.len() != n_bins + 2 {
        return Err(RootError::Malformed(format!(
            "histogram '{name}': {} cells for {n_bins} bins (fNcells = {n_cells})",
            cells.len()
        )));
    }

    let sumw2 = match sumw2.len() {
        0 => None,
        n if n == cells.len() => Some(sumw2[1..=n_bins].to_vec()),
        n => {
            return Err(RootError::Malformed(format!(
                "histogram '{name}': fSumw2 has {n} entries, expected {}",
                cells.len()
            )));
        }
    };

    Ok(RawHistogram {
        name,
        title,
        edges: axis.edges(),
        contents: cells[1..=n_bins].to_vec(),
        sumw2,
        underflow: cells[0],
        overflow: cells[n_bins + 1],
    })
}

fn read_axis(c: &mut Cursor<'_>) -> Result<Axis> {
    let (_, end) = c.read_version()?;
    let end = end.ok_or_else(|| RootError::Malformed("TAxis written without byte count".into()))?;
    let _ = c.read_tnamed()?;
    c.skip_object("TAttAxis")?;

    let n_bins = c.read_i32()?;
    let n_bins = usize::try_from(n_bins)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| RootError::Malformed(format!("axis with {n_bins} bins")))?;
    let x_min = c.read_f64()?;
    let x_max = c.read_f64()?;
    let edges = c.read_array_f64()?;
    c.seek(end)?;

    Ok(Axis {
        n_bins,
        x_min,
        x_max,
        edges,
    })
}
