//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - turns flags into config structs
//! - runs the selected pipeline and prints its terminal output

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::{Cli, Command, FitArgs, GenerateArgs, SampleArgs, SummaryArgs};
use crate::domain::{
    Bounds, Coefficient, Evaluation, FitConfig, SampleConfig, SummaryConfig, ToyConfig,
};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `liv` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` first so clap's `env = ...` defaults can see it.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Summary(args) => handle_summary(args),
        Command::Sample(args) => handle_sample(args),
        Command::Generate(args) => handle_generate(args),
    }
}

fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::WARN);
    // A second initialisation (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;
    let summary = crate::report::format_fit_summary(&run.toys, &config.output);
    print!("{summary}");
    for path in &run.plots {
        println!("Plot: {}", path.display());
    }
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let config = summary_config_from_args(&args)?;
    let run = pipeline::run_summary(&config)?;
    print!("{}", crate::report::format_stats_table(&run.stats));
    println!(
        "Plots: {} written to {}",
        run.plots.len(),
        config.out_dir.display()
    );
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = sample_config_from_args(&args)?;
    let run = pipeline::run_sample(&config)?;
    for text in &run.printouts {
        print!("{text}");
    }
    for path in &run.plots {
        println!("Plot: {}", path.display());
    }
    Ok(())
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let config = toy_config_from_args(&args);
    let toys = crate::data::generate_toys(&config)?;
    println!(
        "Generated {} toys; list: {}",
        toys.paths.len(),
        toys.list_path.display()
    );
    Ok(())
}

/// `[LO, HI]` from a two-value flag.
fn range_from_flag(flag: &str, values: Option<&[f64]>) -> Result<Option<(f64, f64)>, AppError> {
    match values {
        None => Ok(None),
        Some(&[lo, hi]) if lo.is_finite() && hi.is_finite() && lo < hi => Ok(Some((lo, hi))),
        Some(v) => Err(AppError::new(
            2,
            format!("--{flag} needs two finite values LO < HI, got {v:?}."),
        )),
    }
}

/// Selected coefficients in canonical (result column) order; `None` when
/// nothing was selected.
fn canonical_selection(selected: &[Coefficient]) -> Option<Vec<Coefficient>> {
    if selected.is_empty() {
        return None;
    }
    Some(
        Coefficient::ALL
            .into_iter()
            .filter(|c| selected.contains(c))
            .collect(),
    )
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    let mut coefficients =
        canonical_selection(&args.coefficients).unwrap_or_else(|| Coefficient::ALL.to_vec());
    if args.trig_only {
        coefficients.retain(|c| !c.is_line());
    }
    if coefficients.is_empty() {
        return Err(AppError::new(2, "No coefficients left to fit."));
    }

    for (flag, bound) in [("mu-bound", args.mu_bound), ("line-bound", args.line_bound)] {
        if !(bound.is_finite() && bound > 0.0) {
            return Err(AppError::new(2, format!("--{flag} must be finite and > 0.")));
        }
    }
    if args.threads == Some(0) {
        return Err(AppError::new(2, "--threads must be > 0."));
    }

    Ok(FitConfig {
        input_list: args.input_list.clone(),
        output: args.output.clone(),
        id_regex: args.id_regex.clone(),
        hist_name: args.hist_name.clone(),
        coefficients,
        bounds: Bounds {
            trig: args.mu_bound,
            line: args.line_bound,
        },
        data_error: args.data_error,
        evaluation: if args.integrate_bins {
            Evaluation::Integrate
        } else {
            Evaluation::Center
        },
        chi2_stat: args.chi2_stat,
        plot_toy: args.plot.clone(),
        plot_dir: args.plot_dir.clone(),
        overlay_y_range: range_from_flag("overlay-y-range", args.overlay_y_range.as_deref())?,
        scan_points: args.scan_points,
        export_json: args.export_json.clone(),
        threads: args.threads,
        tolerance: args.tolerance,
        max_iters: args.max_iters,
    })
}

pub fn summary_config_from_args(args: &SummaryArgs) -> Result<SummaryConfig, AppError> {
    if args.bins == 0 {
        return Err(AppError::new(2, "--bins must be > 0."));
    }
    Ok(SummaryConfig {
        input: args.input.clone(),
        out_dir: args.out_dir.clone(),
        truth: args.truth.clone(),
        bins: args.bins,
        value_range: range_from_flag("value-range", args.value_range.as_deref())?,
        export_stats: args.export_stats.clone(),
        sample_ids: args.sample_ids.clone(),
        coefficients: canonical_selection(&args.coefficients),
    })
}

pub fn sample_config_from_args(args: &SampleArgs) -> Result<SampleConfig, AppError> {
    Ok(SampleConfig {
        input: args.input.clone(),
        out_dir: args.out_dir.clone(),
        sample_ids: args.sample_ids.clone(),
        print: args.print,
        value_range: range_from_flag("value-range", args.value_range.as_deref())?,
        coefficients: canonical_selection(&args.coefficients),
    })
}

pub fn toy_config_from_args(args: &GenerateArgs) -> ToyConfig {
    ToyConfig {
        out_dir: args.out_dir.clone(),
        count: args.count,
        bins: args.bins,
        seed: args.seed,
        level: args.level,
        sigma: args.sigma,
        inject: args.inject,
        list_path: args
            .list
            .clone()
            .unwrap_or_else(|| args.out_dir.join("toy_list.txt")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fit_args(extra: &[&str]) -> FitArgs {
        let mut argv = vec!["liv", "fit", "toys.txt", "-o", "out.txt"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Fit(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn defaults_fit_all_coefficients() {
        let cfg = fit_config_from_args(&fit_args(&[])).unwrap();
        assert_eq!(cfg.coefficients, Coefficient::ALL.to_vec());
        assert_eq!(cfg.bounds, Bounds::default());
        assert_eq!(cfg.evaluation, Evaluation::Center);
        assert_eq!(cfg.overlay_y_range, None);
    }

    #[test]
    fn selected_coefficients_keep_canonical_order() {
        let cfg = fit_config_from_args(&fit_args(&[
            "--coefficient",
            "line",
            "--coefficient",
            "d[u,Y,Z]",
            "--mu-bound",
            "0.2",
        ]))
        .unwrap();
        assert_eq!(cfg.coefficients, vec![Coefficient::DuYZ, Coefficient::Line]);
        assert_eq!(cfg.bounds.trig, 0.2);
    }

    #[test]
    fn trig_only_drops_line() {
        let cfg = fit_config_from_args(&fit_args(&["--trig-only"])).unwrap();
        assert_eq!(cfg.coefficients, Coefficient::TRIG.to_vec());
        let err = fit_config_from_args(&fit_args(&["--trig-only", "--coefficient", "line"]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rejects_inverted_range_and_bad_bound() {
        let err = fit_config_from_args(&fit_args(&["--overlay-y-range", "1.004", "0.996"]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(fit_config_from_args(&fit_args(&["--line-bound", "0"])).is_err());
    }

    #[test]
    fn summary_selection_follows_result_columns() {
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
            unreachable!()
        };
        let cfg = summary_config_from_args(&args).unwrap();
        assert_eq!(cfg.coefficients, Some(vec![Coefficient::CuXZ, Coefficient::Line]));

        let cli = Cli::try_parse_from(["liv", "sample", "r.txt", "--sample-ids", "1"]).unwrap();
        let Command::Sample(args) = cli.command else {
            unreachable!()
        };
        assert_eq!(sample_config_from_args(&args).unwrap().coefficients, None);
    }

    #[test]
    fn generate_list_defaults_into_out_dir() {
        let cli = Cli::try_parse_from(["liv", "generate", "--out-dir", "t"]).unwrap();
        let Command::Generate(args) = cli.command else {
            unreachable!()
        };
        let cfg = toy_config_from_args(&args);
        assert_eq!(cfg.list_path, PathBuf::from("t").join("toy_list.txt"));
    }
}
