//! Order statistics shared by the scorer and the benchmark comparator.
//!
//! Percentile method: linear interpolation between closest ranks
//! (the "linear" / type-7 definition). For sorted values `v[0..n]` and
//! fraction `q`, position `h = (n - 1) * q`; the result is
//! `v[floor(h)] + (h - floor(h)) * (v[floor(h) + 1] - v[floor(h)])`.
//!
//! Percentile rank: `count(values <= x) / n`. Ties share a rank, and the
//! maximum value always maps to 1.0.

/// Quantile of `values` at fraction `q` in `[0, 1]`.
/// Empty input yields 0; a single value yields that value.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    match values.len() {
        0 => 0.0,
        1 => values[0],
        n => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let q = q.clamp(0.0, 1.0);
            let h = (n - 1) as f64 * q;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Percentile of `values` on the 0..=100 scale.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    quantile(values, pct / 100.0)
}

/// Like [`quantile`], but `None` for an empty population.
pub fn quantile_opt(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(quantile(values, q))
    }
}

/// Percentile rank of every element, higher value → higher rank.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    values
        .iter()
        .map(|v| {
            let at_or_below = sorted.partition_point(|s| s.total_cmp(v).is_le());
            at_or_below as f64 / n as f64
        })
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// `numerator / denominator`, or 0 when the denominator is not positive.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
