//! The growth-rate analysis pipeline.
//!
//! This module windows each county's cumulative case series, filters out
//! counties with non-positive values in the window, fits a weighted
//! log-linear growth model to the rest, and assembles the per-county
//! result rows.

pub mod analyzer;
pub mod regression;
pub mod types;
pub mod utility;
pub mod window;
