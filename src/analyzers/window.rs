//! Trailing-window selection over the cumulative case series.

use anyhow::{Result, bail};

/// Selects the trailing `length` values of `series`, excluding the final
/// `offset` most-recent values. `offset = 0` selects the true tail.
///
/// Works over counts and over the date axis alike.
///
/// # Errors
///
/// Returns an error when the series is shorter than `length + offset`,
/// a configuration problem rather than a per-county one.
pub fn trailing_window<T>(series: &[T], length: usize, offset: usize) -> Result<&[T]> {
    let needed = length + offset;
    if series.len() < needed {
        bail!(
            "series has {} observations, window needs {} ({} + {} offset)",
            series.len(),
            needed,
            length,
            offset
        );
    }
    let end = series.len() - offset;
    Ok(&series[end - length..end])
}

/// A county qualifies for regression iff every value in its window is
/// strictly positive. Zeros, negatives, and NaN all disqualify.
pub fn qualifies(window: &[f64]) -> bool {
    window.iter().all(|&v| v > 0.0)
}
