//! Trend indicators over simulated paths
//!
//! Pure functions over bar slices. No state, no I/O.

use anyhow::{bail, Result};

use crate::types::{Bar, IndicatorSeries};

/// Exponential moving average of closes, aligned index-for-index with `path`.
///
/// Smoothing constant `k = 2 / (period + 1)`; the first element is seeded with
/// the first close exactly. An empty path yields an empty series.
pub fn ema(path: &[Bar], period: usize) -> Result<IndicatorSeries> {
    if period == 0 {
        bail!("EMA period must be at least 1, got {}", period);
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(path.len());
    let mut prev = 0.0;

    for (i, bar) in path.iter().enumerate() {
        prev = if i == 0 {
            bar.close
        } else {
            bar.close * k + prev * (1.0 - k)
        };
        series.push(prev);
    }

    Ok(series)
}
