//! Chart rendering for the analysis results.
//!
//! Three artifacts: a histogram of fit quality, and scatter plots of county
//! attribute vs. growth rate where the marker size encodes fit quality.

use anyhow::{Result, bail};
use plotters::prelude::*;
use std::path::Path;

use crate::analyzers::types::CountyGrowth;

/// Fixed bin count for the R² histogram.
pub const R2_HISTOGRAM_BINS: usize = 20;

pub const R2_HISTOGRAM_FILE: &str = "r2_histogram.png";
pub const DENSITY_SCATTER_FILE: &str = "density_vs_growth.png";
pub const TEMPERATURE_SCATTER_FILE: &str = "temperature_vs_growth.png";

/// Marker radius for a scatter point: `(r² − 0.8) · 200`, clamped at zero so
/// low-confidence fits shrink away instead of going negative.
fn marker_size(r_squared: f64) -> i32 {
    ((r_squared - 0.8) * 200.0).max(0.0).round() as i32
}

/// Renders the histogram of per-county R² values.
pub fn render_r2_histogram(results: &[CountyGrowth], out_dir: &Path) -> Result<()> {
    if results.is_empty() {
        bail!("no results to plot");
    }
    let values: Vec<f64> = results.iter().map(|r| r.r_squared).collect();
    let (min, max, counts) = histogram_counts(&values, R2_HISTOGRAM_BINS);
    let bin_width = (max - min) / R2_HISTOGRAM_BINS as f64;
    let y_max = counts.iter().copied().max().unwrap_or(1).max(1) as u32;

    let path = out_dir.join(R2_HISTOGRAM_FILE);
    let root = BitMapBackend::new(&path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Goodness of fit across counties", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(min..max, 0u32..(y_max + 1))?;

    chart
        .configure_mesh()
        .x_desc("R²")
        .y_desc("counties")
        .draw()?;

    chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
        let x0 = min + i as f64 * bin_width;
        Rectangle::new([(x0, 0), (x0 + bin_width, count as u32)], BLUE.mix(0.6).filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Renders ln(population density) vs. growth rate.
pub fn render_density_scatter(results: &[CountyGrowth], out_dir: &Path) -> Result<()> {
    let points: Vec<(f64, f64, i32)> = results
        .iter()
        .map(|r| {
            (
                r.population_density.ln(),
                r.growth_rate,
                marker_size(r.r_squared),
            )
        })
        .collect();
    render_scatter(
        &points,
        "Case growth rate vs. population density",
        "ln(people per km²)",
        &out_dir.join(DENSITY_SCATTER_FILE),
    )
}

/// Renders mean temperature vs. growth rate. Temperature is plotted on its
/// own scale, not log-transformed.
pub fn render_temperature_scatter(results: &[CountyGrowth], out_dir: &Path) -> Result<()> {
    let points: Vec<(f64, f64, i32)> = results
        .iter()
        .map(|r| (r.temperature, r.growth_rate, marker_size(r.r_squared)))
        .collect();
    render_scatter(
        &points,
        "Case growth rate vs. mean temperature",
        "mean March temperature (°F)",
        &out_dir.join(TEMPERATURE_SCATTER_FILE),
    )
}

fn render_scatter(points: &[(f64, f64, i32)], caption: &str, x_desc: &str, path: &Path) -> Result<()> {
    if points.is_empty() {
        bail!("no results to plot");
    }
    let (x_min, x_max) = padded_range(points.iter().map(|p| p.0));
    let (y_min, y_max) = padded_range(points.iter().map(|p| p.1));

    let root = BitMapBackend::new(path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("growth rate (ln cases per day)")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y, size)| Circle::new((x, y), size, BLUE.mix(0.5).filled())),
    )?;

    root.present()?;
    Ok(())
}

fn histogram_counts(values: &[f64], bins: usize) -> (f64, f64, Vec<usize>) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    // A degenerate range still needs a visible bar.
    if max - min == 0.0 {
        min -= 0.05;
        max += 0.05;
    }
    let span = max - min;

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / span) * bins as f64) as usize;
        counts[idx.min(bins - 1)] += 1;
    }
    (min, max, counts)
}

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    let pad = ((max - min) * 0.05).max(0.01);
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_size_scales_above_threshold() {
        assert_eq!(marker_size(0.9), 20);
        assert_eq!(marker_size(1.0), 40);
    }

    #[test]
    fn test_marker_size_clamps_low_confidence_to_zero() {
        assert_eq!(marker_size(0.8), 0);
        assert_eq!(marker_size(0.5), 0);
        assert_eq!(marker_size(0.0), 0);
    }

    #[test]
    fn test_histogram_counts_cover_all_values() {
        let values = [0.0, 0.25, 0.5, 0.75, 1.0];
        let (min, max, counts) = histogram_counts(&values, 20);

        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
        assert_eq!(counts.len(), 20);
        assert_eq!(counts.iter().sum::<usize>(), values.len());
        // The maximum lands in the last bin, not past it.
        assert_eq!(counts[19], 1);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let (min, max, counts) = histogram_counts(&[0.5, 0.5, 0.5], 20);

        assert!(min < 0.5 && max > 0.5);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_padded_range_never_collapses() {
        let (lo, hi) = padded_range([2.0, 2.0].into_iter());
        assert!(lo < 2.0 && hi > 2.0);
    }
}
