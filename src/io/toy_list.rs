//! Toy list files and toy ID extraction.
//!
//! A toy list is a text file with one histogram path per line. Each path must
//! yield a toy ID through the first capture group of a user regex; a single
//! failure aborts the whole run before any fitting starts.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::AppError;

/// A histogram file together with the ID parsed from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToyEntry {
    pub id: String,
    pub path: PathBuf,
}

/// Read the list, trimming whitespace and skipping blank lines.
pub fn read_toy_list(path: &Path) -> Result<Vec<PathBuf>, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| {
            AppError::new(
                2,
                format!("Failed to read toy list '{}': {e}", path.display()),
            )
        })?;
    let entries: Vec<PathBuf> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect();
    if entries.is_empty() {
        return Err(AppError::new(3, "root list is empty"));
    }
    Ok(entries)
}

pub fn compile_id_regex(pattern: &str) -> Result<Regex, AppError> {
    let re = Regex::new(pattern)
        .map_err(|e| AppError::new(2, format!("Invalid toy ID regex '{pattern}': {e}")))?;
    if re.captures_len() < 2 {
        return Err(AppError::new(
            2,
            format!("Toy ID regex '{pattern}' has no capture group"),
        ));
    }
    Ok(re)
}

/// First capture group of `re` in `path`.
pub fn extract_toy_id(re: &Regex, path: &str) -> Result<String, AppError> {
    re.captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AppError::new(2, format!("can not extract toy ID from '{path}'")))
}

/// Read the list and resolve every toy ID up front.
pub fn load_toys(list: &Path, id_regex: &str) -> Result<Vec<ToyEntry>, AppError> {
    let re = compile_id_regex(id_regex)?;
    read_toy_list(list)?
        .into_iter()
        .map(|path| {
            let id = extract_toy_id(&re, &path.to_string_lossy())?;
            Ok(ToyEntry { id, path })
        })
        .collect()
}

/// Sample IDs match when equal as strings or as integers (`"007"` == `"7"`).
pub fn same_sample_id(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}
