//! Command-line parsing for the LIV sidereal-modulation fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting and plotting code. Flags convert into the plain config structs in
//! [`crate::domain`] inside `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ChiSquareStat, Coefficient, DataErrorKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "liv",
    version,
    about = "Chi-square fits of sidereal LIV modulations on toy histograms"
)]
pub struct Cli {
    /// Log level for stderr output (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every coefficient template to each toy histogram in a list.
    Fit(FitArgs),
    /// Statistics and plots over all toys of a result file.
    Summary(SummaryArgs),
    /// Per-sample summary plots (and optional printout) from a result file.
    Sample(SampleArgs),
    /// Generate null or signal-injected toy histograms and their list file.
    Generate(GenerateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Text file with one histogram path (ROOT or CSV) per line.
    #[arg(value_name = "LIST")]
    pub input_list: PathBuf,

    /// Result file to write (one line per toy).
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Regex whose first capture group is the toy ID.
    #[arg(long, env = "LIV_ID_REGEX", default_value = r"(\d+)\.[A-Za-z]+$")]
    pub id_regex: String,

    /// Histogram name inside each file (`dir/name` for nested ROOT directories).
    #[arg(long = "h-name", env = "LIV_H_NAME", default_value = "h_generated")]
    pub hist_name: String,

    /// Fit only these coefficients (repeatable, e.g. `--coefficient 'c[u,X,Y]'`).
    #[arg(long = "coefficient", value_parser = parse_coefficient)]
    pub coefficients: Vec<Coefficient>,

    /// Leave out the `line` template.
    #[arg(long)]
    pub trig_only: bool,

    /// Bound on |mu| for the trigonometric templates.
    #[arg(long, default_value_t = 0.5)]
    pub mu_bound: f64,

    /// Bound on |mu| for the line template.
    #[arg(long, default_value_t = 1.5)]
    pub line_bound: f64,

    /// Per-bin variance in the chi-square denominator.
    #[arg(long, value_enum, default_value_t = DataErrorKind::Sumw2)]
    pub data_error: DataErrorKind,

    /// Integrate the template over each bin instead of using the bin centre.
    #[arg(long)]
    pub integrate_bins: bool,

    /// Third column of each result block: raw chi2 or chi2/ndf.
    #[arg(long, value_enum, default_value_t = ChiSquareStat::Chi2)]
    pub chi2_stat: ChiSquareStat,

    /// Draw overlay and chi-square scan plots for this toy ID.
    #[arg(long, value_name = "TOY_ID")]
    pub plot: Option<String>,

    /// Directory for plots.
    #[arg(long, env = "LIV_OUT_DIR", default_value = ".")]
    pub plot_dir: PathBuf,

    /// Fixed y-range of the overlay plot (e.g. `0.996 1.004`).
    #[arg(
        long,
        num_args = 2,
        value_names = ["LO", "HI"],
        allow_hyphen_values = true
    )]
    pub overlay_y_range: Option<Vec<f64>>,

    /// Points in the chi-square scan.
    #[arg(long, default_value_t = 1000)]
    pub scan_points: usize,

    /// Export full fit records (convergence, bounds, linearised estimate) to JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Worker threads (defaults to one per core).
    #[arg(long, env = "LIV_THREADS")]
    pub threads: Option<usize>,

    /// Relative Brent tolerance on mu.
    #[arg(long, default_value_t = 1e-10)]
    pub tolerance: f64,

    /// Iteration cap for the minimiser.
    #[arg(long, default_value_t = 500)]
    pub max_iters: u64,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    /// Result file written by `liv fit`.
    #[arg(value_name = "RESULTS")]
    pub input: PathBuf,

    /// Directory for plots.
    #[arg(long, env = "LIV_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Result-format file with the true values (zero when omitted).
    #[arg(long)]
    pub truth: Option<PathBuf>,

    /// Bins of the value, p-value, pull and residual histograms.
    #[arg(long, default_value_t = 100)]
    pub bins: usize,

    /// Fixed value-axis range for distributions and summaries.
    #[arg(
        long,
        num_args = 2,
        value_names = ["LO", "HI"],
        allow_hyphen_values = true
    )]
    pub value_range: Option<Vec<f64>>,

    /// Write per-coefficient statistics to CSV.
    #[arg(long)]
    pub export_stats: Option<PathBuf>,

    /// Coefficients of a result file written with `liv fit --coefficient`
    /// (repeatable; the full and trig-only layouts are inferred).
    #[arg(long = "coefficient", value_parser = parse_coefficient)]
    pub coefficients: Vec<Coefficient>,

    /// Also draw per-sample summaries for these IDs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub sample_ids: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Result file written by `liv fit`.
    #[arg(value_name = "RESULTS")]
    pub input: PathBuf,

    /// Sample IDs to draw (comma-separated).
    #[arg(long, value_delimiter = ',', required = true)]
    pub sample_ids: Vec<String>,

    /// Directory for plots.
    #[arg(long, env = "LIV_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Print the fitted values of each sample.
    #[arg(long)]
    pub print: bool,

    /// Fixed value-axis range.
    #[arg(
        long,
        num_args = 2,
        value_names = ["LO", "HI"],
        allow_hyphen_values = true
    )]
    pub value_range: Option<Vec<f64>>,

    /// Coefficients of a result file written with `liv fit --coefficient`
    /// (repeatable; the full and trig-only layouts are inferred).
    #[arg(long = "coefficient", value_parser = parse_coefficient)]
    pub coefficients: Vec<Coefficient>,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Directory for the toy CSV files.
    #[arg(long, env = "LIV_OUT_DIR", default_value = "toys")]
    pub out_dir: PathBuf,

    /// Number of toys.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub count: usize,

    /// Bins per toy on [0, 6.28319].
    #[arg(long, default_value_t = 24)]
    pub bins: usize,

    /// Base random seed (toy i uses seed + i).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Mean bin content.
    #[arg(long, default_value_t = 1.0)]
    pub level: f64,

    /// Gaussian noise per bin (also stored as the bin error).
    #[arg(long, default_value_t = 1e-3)]
    pub sigma: f64,

    /// Inject a signal, e.g. `--inject 'c[u,X,Y]=1e-5'`.
    #[arg(long, value_name = "LABEL=VALUE", value_parser = parse_injection)]
    pub inject: Option<(Coefficient, f64)>,

    /// List file to write (defaults to `<out-dir>/toy_list.txt`).
    #[arg(long)]
    pub list: Option<PathBuf>,
}

fn parse_coefficient(s: &str) -> Result<Coefficient, String> {
    Coefficient::from_label(s.trim()).ok_or_else(|| {
        let known: Vec<&str> = Coefficient::ALL.iter().map(|c| c.label()).collect();
        format!(
            "unknown coefficient '{s}' (expected one of: {})",
            known.join(" ")
        )
    })
}

fn parse_injection(s: &str) -> Result<(Coefficient, f64), String> {
    let (label, value) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected LABEL=VALUE, got '{s}'"))?;
    let coef = parse_coefficient(label)?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    Ok((coef, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fit_flags() {
        let cli = Cli::try_parse_from([
            "liv",
            "fit",
            "toys.txt",
            "-o",
            "out.txt",
            "--coefficient",
            "c[u,X,Y]",
            "--coefficient",
            "line",
            "--overlay-y-range",
            "0.996",
            "1.004",
            "--chi2-stat",
            "reduced",
            "--integrate-bins",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.coefficients, vec![Coefficient::CuXY, Coefficient::Line]);
        assert_eq!(args.overlay_y_range, Some(vec![0.996, 1.004]));
        assert_eq!(args.chi2_stat, ChiSquareStat::Reduced);
        assert!(args.integrate_bins);
        assert_eq!(args.mu_bound, 0.5);
    }

    #[test]
    fn parses_negative_ranges_in_any_notation() {
        for (lo, hi) in [("-0.5", "0.5"), ("-1e-5", "1e-5"), ("-1E-05", "-2e-6")] {
            let cli =
                Cli::try_parse_from(["liv", "summary", "r.txt", "--value-range", lo, hi]).unwrap();
            let Command::Summary(args) = cli.command else {
                panic!("expected summary");
            };
            let expected: Vec<f64> = vec![lo.parse().unwrap(), hi.parse().unwrap()];
            assert_eq!(args.value_range, Some(expected));
        }

        let cli = Cli::try_parse_from([
            "liv",
            "sample",
            "r.txt",
            "--sample-ids",
            "1",
            "--value-range",
            "-1e-5",
            "1e-5",
        ])
        .unwrap();
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(args.value_range, Some(vec![-1e-5, 1e-5]));

        let cli = Cli::try_parse_from([
            "liv",
            "fit",
            "toys.txt",
            "-o",
            "out.txt",
            "--overlay-y-range",
            "-1e-3",
            "1e-3",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.overlay_y_range, Some(vec![-1e-3, 1e-3]));
    }

    #[test]
    fn summary_and_sample_take_coefficients() {
        let cli = Cli::try_parse_from([
            "liv",
            "summary",
            "r.txt",
            "--coefficient",
            "line",
            "--coefficient",
            "c[u,X,Z]",
        ])
        .unwrap();
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.coefficients, vec![Coefficient::Line, Coefficient::CuXZ]);

        let cli = Cli::try_parse_from(["liv", "sample", "r.txt", "--sample-ids", "3,4"]).unwrap();
        let Command::Sample(args) = cli.command else {
            panic!("expected sample");
        };
        assert!(args.coefficients.is_empty());
        assert_eq!(args.sample_ids, vec!["3", "4"]);
    }

    #[test]
    fn injection_parses_label_with_commas() {
        assert_eq!(parse_injection("d[u,X-Y,X-Y]=2e-5"), Ok((Coefficient::DuXmYXmY, 2e-5)));
        assert!(parse_injection("d[u,X,Z]").is_err());
        assert!(parse_injection("bogus=1").is_err());
    }
}
