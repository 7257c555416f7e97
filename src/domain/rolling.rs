//! Trailing-window statistics.
//!
//! Every output at index `i` reads only `values[i + 1 - window..=i]`, so no
//! value ever depends on a later period. A window containing any undefined
//! value produces an undefined output; warmup indices (`i + 1 < window`)
//! are undefined as well.

/// A window whose standard deviation is at or below this fraction of its
/// mean's magnitude is treated as flat when z-scoring.
pub const STD_EPSILON: f64 = 1e-12;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Pearson correlation; undefined if either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let da = a - mx;
        let db = b - my;
        cov += da * db;
        vx += da * da;
        vy += db * db;
    }
    let denom = (vx * vy).sqrt();
    if denom <= 0.0 || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Complete window ending at `i`, or `None` if it is short or has gaps.
fn window_at(values: &[Option<f64>], i: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || i + 1 < window {
        return None;
    }
    values[i + 1 - window..=i].iter().copied().collect()
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| window_at(values, i, window).and_then(|w| mean(&w)))
        .collect()
}

pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| window_at(values, i, window).and_then(|w| sample_std(&w)))
        .collect()
}

/// `(x[i] - mean) / std` over the trailing window ending at `i`.
pub fn rolling_zscore(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            let w = window_at(values, i, window)?;
            let m = mean(&w)?;
            let s = sample_std(&w)?;
            if !s.is_finite() || s == 0.0 || s <= STD_EPSILON * m.abs() {
                return None;
            }
            Some((w[w.len() - 1] - m) / s)
        })
        .collect()
}
