//! Synthetic toy histograms for null tests and signal injection.
//!
//! Each toy is a flat (or injected) template on the sidereal-phase axis with
//! Gaussian noise per bin. Toy `i` draws from its own `StdRng` seeded with
//! `seed + i`, so a toy does not change when `count` changes.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::info;

use crate::domain::{SDAY_MAX, ToyConfig};
use crate::error::AppError;
use crate::histogram::Histogram;
use crate::models::{Template, relative_shape};

/// Histogram name written into generated toys.
pub const TOY_HIST_NAME: &str = "h_generated";

/// Generated toy files, in list order.
#[derive(Debug, Clone)]
pub struct GeneratedToys {
    pub paths: Vec<PathBuf>,
    pub list_path: PathBuf,
}

/// Noise-free bin contents: `level` times the template shape at the bin
/// centre (flat for the null hypothesis).
pub fn toy_shape(config: &ToyConfig) -> Result<Vec<f64>, AppError> {
    let flat = Histogram::uniform(
        TOY_HIST_NAME,
        0.0,
        SDAY_MAX,
        vec![config.level; config.bins],
        None,
    )?;
    let Some((coef, mu)) = config.inject else {
        return Ok(flat.contents().to_vec());
    };

    let template = Template::for_histogram(coef, &flat);
    let shape: Vec<f64> = flat
        .centers()
        .into_iter()
        .map(|x| config.level * relative_shape(&template, &flat, x, mu))
        .collect();
    if shape.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(
            2,
            format!("Injected {coef} = {mu} gives a non-finite toy shape."),
        ));
    }
    Ok(shape)
}

fn validate(config: &ToyConfig) -> Result<(), AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Toy count must be > 0."));
    }
    if config.bins < 2 {
        return Err(AppError::new(2, "Toys need at least 2 bins."));
    }
    if !(config.level.is_finite() && config.level > 0.0) {
        return Err(AppError::new(2, "Toy level must be finite and > 0."));
    }
    if !(config.sigma.is_finite() && config.sigma > 0.0) {
        return Err(AppError::new(2, "Toy noise sigma must be finite and > 0."));
    }
    Ok(())
}

/// Build toy `index` in memory.
pub fn generate_toy(
    config: &ToyConfig,
    shape: &[f64],
    index: usize,
) -> Result<Histogram, AppError> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(index as u64));
    let normal = Normal::new(0.0, config.sigma)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;

    let contents: Vec<f64> = shape.iter().map(|&s| s + normal.sample(&mut rng)).collect();
    let sumw2 = vec![config.sigma * config.sigma; contents.len()];
    Ok(
        Histogram::uniform(TOY_HIST_NAME, 0.0, SDAY_MAX, contents, Some(sumw2))?
            .with_title(format!("toy {index}")),
    )
}

/// Write `toy_{i}.csv` for every toy plus the list file consumed by `liv fit`.
pub fn generate_toys(config: &ToyConfig) -> Result<GeneratedToys, AppError> {
    validate(config)?;
    fs::create_dir_all(&config.out_dir).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create '{}': {e}", config.out_dir.display()),
        )
    })?;

    let shape = toy_shape(config)?;
    let mut paths = Vec::with_capacity(config.count);
    for i in 0..config.count {
        let hist = generate_toy(config, &shape, i)?;
        let path = config.out_dir.join(format!("toy_{i}.csv"));
        hist.write_csv(&path)?;
        paths.push(path);
    }

    let mut list = fs::File::create(&config.list_path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create '{}': {e}", config.list_path.display()),
        )
    })?;
    for p in &paths {
        writeln!(list, "{}", p.display())
            .map_err(|e| AppError::new(2, format!("Failed to write toy list: {e}")))?;
    }

    info!(
        count = config.count,
        bins = config.bins,
        list = %config.list_path.display(),
        "generated toys"
    );
    Ok(GeneratedToys {
        paths,
        list_path: config.list_path.clone(),
    })
}
