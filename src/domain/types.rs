//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON
//! - reloaded later for summaries and plots

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Upper edge of the sidereal phase axis used by the analysis histograms.
pub const SDAY_MAX: f64 = 6.28319;

/// One of the fitted LIV coefficients (plus the flat `line` template).
///
/// The declaration order is the column order of the result file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub enum Coefficient {
    DuXZ,
    DuYZ,
    DuXmYXmY,
    DuXY,
    CuXZ,
    CuYZ,
    CuXmYXmY,
    CuXY,
    CdXZ,
    CdYZ,
    CdXmYXmY,
    CdXY,
    Line,
}

impl Coefficient {
    /// All coefficients, in result-file order (`line` last).
    pub const ALL: [Coefficient; 13] = [
        Coefficient::DuXZ,
        Coefficient::DuYZ,
        Coefficient::DuXmYXmY,
        Coefficient::DuXY,
        Coefficient::CuXZ,
        Coefficient::CuYZ,
        Coefficient::CuXmYXmY,
        Coefficient::CuXY,
        Coefficient::CdXZ,
        Coefficient::CdYZ,
        Coefficient::CdXmYXmY,
        Coefficient::CdXY,
        Coefficient::Line,
    ];

    /// The twelve sidereal-modulation coefficients, without `line`.
    pub const TRIG: [Coefficient; 12] = [
        Coefficient::DuXZ,
        Coefficient::DuYZ,
        Coefficient::DuXmYXmY,
        Coefficient::DuXY,
        Coefficient::CuXZ,
        Coefficient::CuYZ,
        Coefficient::CuXmYXmY,
        Coefficient::CuXY,
        Coefficient::CdXZ,
        Coefficient::CdYZ,
        Coefficient::CdXmYXmY,
        Coefficient::CdXY,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Coefficient::DuXZ => "d[u,X,Z]",
            Coefficient::DuYZ => "d[u,Y,Z]",
            Coefficient::DuXmYXmY => "d[u,X-Y,X-Y]",
            Coefficient::DuXY => "d[u,X,Y]",
            Coefficient::CuXZ => "c[u,X,Z]",
            Coefficient::CuYZ => "c[u,Y,Z]",
            Coefficient::CuXmYXmY => "c[u,X-Y,X-Y]",
            Coefficient::CuXY => "c[u,X,Y]",
            Coefficient::CdXZ => "c[d,X,Z]",
            Coefficient::CdYZ => "c[d,Y,Z]",
            Coefficient::CdXmYXmY => "c[d,X-Y,X-Y]",
            Coefficient::CdXY => "c[d,X,Y]",
            Coefficient::Line => "line",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Coefficient::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn is_line(self) -> bool {
        self == Coefficient::Line
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Coefficient> for String {
    fn from(value: Coefficient) -> Self {
        value.label().to_string()
    }
}

impl TryFrom<String> for Coefficient {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Coefficient::from_label(&value).ok_or_else(|| format!("unknown coefficient '{value}'"))
    }
}

/// What goes into the third column of each coefficient block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChiSquareStat {
    /// Raw χ².
    Chi2,
    /// χ² divided by the degrees of freedom.
    Reduced,
}

/// Per-bin variance used in the χ² denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataErrorKind {
    /// Stored sum of squared weights, falling back to the bin content.
    Sumw2,
    /// Observed bin content (Poisson).
    Poisson,
    /// Expected bin content under the current parameter value.
    Expected,
}

/// How the template is turned into per-bin expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Evaluation {
    /// Template value at the bin centre times the bin width.
    Center,
    /// Exact integral of the template over the bin.
    Integrate,
}

/// Parameter bounds for the fit, symmetric around zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Half-width for the trigonometric templates.
    pub trig: f64,
    /// Half-width for the `line` template.
    pub line: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            trig: 0.5,
            line: 1.5,
        }
    }
}

impl Bounds {
    pub fn for_coefficient(&self, coef: Coefficient) -> f64 {
        if coef.is_line() { self.line } else { self.trig }
    }
}

/// Fit output for a single coefficient on a single toy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoefficientFit {
    pub coefficient: Coefficient,
    pub value: f64,
    pub error: f64,
    /// Raw χ² at the best-fit value.
    pub chi2: f64,
    pub ndf: usize,
    /// χ² survival probability for `ndf` degrees of freedom.
    pub p0: f64,
    pub converged: bool,
    pub iterations: u64,
    /// Best fit sits on (or within tolerance of) a parameter bound.
    pub at_bound: bool,
    /// Weighted least-squares estimate linearised around `mu = 0`.
    pub linearized: Option<f64>,
}

impl CoefficientFit {
    /// Value written to the third column of the result file.
    pub fn chi2_stat(&self, stat: ChiSquareStat) -> f64 {
        match stat {
            ChiSquareStat::Chi2 => self.chi2,
            ChiSquareStat::Reduced => {
                if self.ndf == 0 {
                    f64::NAN
                } else {
                    self.chi2 / self.ndf as f64
                }
            }
        }
    }
}

/// All fits for one toy, in coefficient order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToyFit {
    pub toy_id: String,
    pub path: PathBuf,
    pub n_bins: usize,
    pub fits: Vec<CoefficientFit>,
}

/// One row of a result file read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub sample_id: String,
    /// One entry per coefficient of the owning table, in table order.
    pub values: Vec<CoefficientValues>,
}

/// The four numbers stored per coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientValues {
    pub value: f64,
    pub error: f64,
    pub chi2: f64,
    pub p0: f64,
}

/// Configuration of a `liv fit` run.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input_list: PathBuf,
    pub output: PathBuf,
    pub id_regex: String,
    pub hist_name: String,
    pub coefficients: Vec<Coefficient>,
    pub bounds: Bounds,
    pub data_error: DataErrorKind,
    pub evaluation: Evaluation,
    pub chi2_stat: ChiSquareStat,

    /// Render overlay and scan plots for this toy ID.
    pub plot_toy: Option<String>,
    pub plot_dir: PathBuf,
    /// Fixed y-range for the overlay plot.
    pub overlay_y_range: Option<(f64, f64)>,
    pub scan_points: usize,

    pub export_json: Option<PathBuf>,
    /// `None` uses rayon's default pool.
    pub threads: Option<usize>,

    pub tolerance: f64,
    pub max_iters: u64,
}

/// Configuration of a `liv summary` run.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    /// Truth values for pull and residual plots (`None` means zero).
    pub truth: Option<PathBuf>,
    pub bins: usize,
    pub value_range: Option<(f64, f64)>,
    pub export_stats: Option<PathBuf>,
    /// Also draw the `SigFit_summary_sample{id}` plot for these samples.
    pub sample_ids: Vec<String>,
    /// Result-file columns; `None` infers the full or trig-only layout.
    pub coefficients: Option<Vec<Coefficient>>,
}

/// Configuration of a `liv sample` run.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub sample_ids: Vec<String>,
    pub print: bool,
    pub value_range: Option<(f64, f64)>,
    pub coefficients: Option<Vec<Coefficient>>,
}

/// Configuration of a `liv generate` run.
#[derive(Debug, Clone)]
pub struct ToyConfig {
    pub out_dir: PathBuf,
    pub count: usize,
    pub bins: usize,
    pub seed: u64,
    /// Mean bin content level (the null template is flat at this level).
    pub level: f64,
    /// Gaussian noise width per bin.
    pub sigma: f64,
    pub inject: Option<(Coefficient, f64)>,
    pub list_path: PathBuf,
}
