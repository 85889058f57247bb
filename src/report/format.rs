//! Formatted terminal output and number formatting.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (and covered by snapshot tests below)

use crate::domain::ToyFit;
use crate::error::AppError;
use crate::io::ResultTable;
use crate::report::CoefficientStats;

/// Shortest round-trip float text, laid out like Python's `repr(float)`.
///
/// Plain notation for `1e-4 <= |v| < 1e16` (always with a fractional part),
/// otherwise `d.ddde±XX` with at least two exponent digits.
pub fn fmt_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{v:e}");
    let (mantissa, exp) = split_exponent(&sci);
    if (-4..16).contains(&exp) {
        let plain = format!("{v}");
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        format!("{mantissa}e{}", fmt_exponent(exp))
    }
}

/// `{:.{precision}E}` with a signed two-digit exponent, as Python prints it.
///
/// `pad_sign` puts a space in front of non-negative values (Python's `' '` flag).
pub fn fmt_sci(v: f64, precision: usize, pad_sign: bool) -> String {
    let lead = if pad_sign && !v.is_sign_negative() { " " } else { "" };
    if v.is_nan() {
        return format!("{lead}NAN");
    }
    if v.is_infinite() {
        return if v > 0.0 { format!("{lead}INF") } else { "-INF".to_string() };
    }
    let sci = format!("{v:.precision$E}");
    let (mantissa, exp) = split_exponent(&sci);
    format!("{lead}{mantissa}E{}", fmt_exponent(exp))
}

fn split_exponent(sci: &str) -> (&str, i32) {
    match sci.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse().unwrap_or(0)),
        None => (sci, 0),
    }
}

fn fmt_exponent(exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{sign}{:02}", exp.unsigned_abs())
}

/// Short run summary printed after `liv fit`.
pub fn format_fit_summary(toys: &[ToyFit], output: &std::path::Path) -> String {
    let fits = toys.iter().flat_map(|t| &t.fits);
    let (mut total, mut not_converged, mut at_bound) = (0usize, 0usize, 0usize);
    for f in fits {
        total += 1;
        not_converged += usize::from(!f.converged);
        at_bound += usize::from(f.at_bound);
    }

    let mut out = String::new();
    out.push_str("=== liv - sidereal modulation chi-square fit ===\n");
    out.push_str(&format!("Toys: {} | fits: {total}\n", toys.len()));
    if not_converged > 0 {
        out.push_str(&format!("Not converged: {not_converged}\n"));
    }
    if at_bound > 0 {
        out.push_str(&format!("At parameter bound: {at_bound}\n"));
    }
    out.push_str(&format!("Results: {}\n", output.display()));
    out
}

/// The `--print` block of `liv sample`: coefficients in reverse order.
pub fn format_sample_values(table: &ResultTable, sample_id: &str) -> Result<String, AppError> {
    let row = table
        .find_sample(sample_id)
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("Sample '{sample_id}' not found in result table."),
            )
        })?;

    let mut out = String::new();
    out.push_str(&format!(
        "Sample {}:            value           err    \n",
        row.sample_id
    ));
    for &coef in table.coefficients.iter().rev() {
        let Some(v) = table.get(row, coef) else { continue };
        out.push_str(&format!(
            "{:<12}:  {} +/- {}\n",
            coef.label(),
            fmt_sci(v.value, 4, true),
            fmt_sci(v.error, 4, false)
        ));
    }
    // Two empty lines close each block.
    out.push_str("\n\n");
    Ok(out)
}

/// Per-coefficient statistics as a fixed-width table.
pub fn format_stats_table(stats: &[CoefficientStats]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<14} {:>6} {:>12} {:>12} {:>12} {:>10} {:>10} {:>8} {:>8}\n",
            "coefficient", "n", "mean", "std", "mean_err", "pull_mu", "pull_sd", "p0_mean",
            "p0<0.05"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<14} {:-<6} {:-<12} {:-<12} {:-<12} {:-<10} {:-<10} {:-<8} {:-<8}\n",
            "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for s in stats {
        out.push_str(
            format!(
                "{:<14} {:>6} {:>12} {:>12} {:>12} {:>10} {:>10} {:>8} {:>8}\n",
                s.coefficient.label(),
                s.n,
                opt(s.mean, |v| format!("{v:.3e}")),
                opt(s.std, |v| format!("{v:.3e}")),
                opt(s.mean_error, |v| format!("{v:.3e}")),
                opt(s.pull_mean, |v| format!("{v:.3}")),
                opt(s.pull_std, |v| format!("{v:.3}")),
                opt(s.p0_mean, |v| format!("{v:.3}")),
                opt(s.p0_below_005, |v| format!("{v:.3}")),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn opt(v: Option<f64>, f: impl Fn(f64) -> String) -> String {
    v.map(f).unwrap_or_else(|| "-".to_string())
}
