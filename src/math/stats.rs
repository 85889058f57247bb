//! Descriptive statistics over fitted values.

/// Arithmetic mean of the finite values.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (n, sum) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0usize, 0.0), |(n, s), &v| (n + 1, s + v));
    (n > 0).then(|| sum / n as f64)
}

/// Sample standard deviation (`n − 1` denominator) of the finite values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }
    let m = finite.iter().sum::<f64>() / finite.len() as f64;
    let ss: f64 = finite.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (finite.len() - 1) as f64).sqrt())
}

/// Mean of `|value − truth| / |truth|` over pairs with a non-zero truth.
pub fn mean_abs_rel_error(values: &[f64], truths: &[f64]) -> Option<f64> {
    let rel: Vec<f64> = values
        .iter()
        .zip(truths)
        .filter(|(v, t)| v.is_finite() && t.is_finite() && **t != 0.0)
        .map(|(v, t)| ((v - t) / t).abs())
        .collect();
    mean(&rel)
}

/// Min and max of the finite values.
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Fill `bins` equal-width bins on `[lo, hi]`; values outside are dropped and
/// `hi` itself lands in the last bin.
pub fn bin_counts(values: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<u32> {
    let mut counts = vec![0u32; bins];
    if bins == 0 || !(hi > lo) {
        return counts;
    }
    let width = (hi - lo) / bins as f64;
    for &v in values {
        if !v.is_finite() || v < lo || v > hi {
            continue;
        }
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}
