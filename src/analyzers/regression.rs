//! Weighted log-linear growth fit.
//!
//! Fits `ln(count_t) ≈ a + b·t` for `t = 0..n-1` by weighted least squares
//! with sample weight `sqrt(count_t)`. The square-root weight down-weights
//! large counts less aggressively than weighting by the count itself, which
//! is the right heteroscedasticity correction for cumulative case data.

use anyhow::{Result, bail};

use crate::analyzers::types::RegressionResult;
use crate::analyzers::utility::weighted_mean;

/// Below this weighted total variance the R² denominator is treated as zero
/// and the fit quality reported as 0.0 (a constant series has no variance to
/// explain).
const VARIANCE_FLOOR: f64 = 1e-12;

/// Fits the growth model to one qualifying window of cumulative counts.
///
/// # Errors
///
/// Fails on fewer than two observations, and on any non-positive count:
/// the window filter guarantees positivity, so a violation here means the
/// filter was bypassed and `ln` would be undefined.
pub fn fit_growth_rate(counts: &[f64]) -> Result<RegressionResult> {
    if counts.len() < 2 {
        bail!(
            "growth fit needs at least two observations, got {}",
            counts.len()
        );
    }
    for (day, &count) in counts.iter().enumerate() {
        if !(count > 0.0) {
            bail!("non-positive case count {count} on day {day}; ln is undefined");
        }
    }

    let days: Vec<f64> = (0..counts.len()).map(|t| t as f64).collect();
    let weights: Vec<f64> = counts.iter().map(|c| c.sqrt()).collect();
    let log_counts: Vec<f64> = counts.iter().map(|c| c.ln()).collect();

    let t_bar = weighted_mean(&days, &weights);
    let y_bar = weighted_mean(&log_counts, &weights);

    let mut s_ty = 0.0;
    let mut s_tt = 0.0;
    for ((&t, &y), &w) in days.iter().zip(&log_counts).zip(&weights) {
        let dt = t - t_bar;
        s_ty += w * dt * (y - y_bar);
        s_tt += w * dt * dt;
    }
    let slope = s_ty / s_tt;
    let intercept = y_bar - slope * t_bar;

    // Weighted R² against the weighted mean, same weights as the fit.
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for ((&t, &y), &w) in days.iter().zip(&log_counts).zip(&weights) {
        let fitted = intercept + slope * t;
        ss_res += w * (y - fitted).powi(2);
        ss_tot += w * (y - y_bar).powi(2);
    }
    let r_squared = if ss_tot < VARIANCE_FLOOR {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(RegressionResult {
        growth_rate: slope,
        r_squared,
    })
}
