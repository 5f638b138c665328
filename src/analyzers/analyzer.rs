//! Pipeline orchestration: load, merge, window, fit.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::analyzers::regression::fit_growth_rate;
use crate::analyzers::types::CountyGrowth;
use crate::analyzers::window::{qualifies, trailing_window};
use crate::codes::CodeMaps;
use crate::merge::{merge_datasets, reference_temperatures};
use crate::parser::{
    AREA_FILE, CASE_FILE, POPULATION_FILE, TEMPERATURE_FILE, parse_area_table, parse_case_table,
    parse_climate_table, parse_population_table,
};

/// Where the inputs live and how to window the case series.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Directory holding the four datasets and the three lookup tables.
    pub data_dir: PathBuf,
    /// Number of trailing days fitted per county.
    pub window_length: usize,
    /// Most-recent days excluded before the window starts.
    pub window_offset: usize,
}

/// Runs the full pipeline and returns one result row per qualifying county.
///
/// Counties with a non-positive value in the analysis window are filtered
/// out (a rule, not an error). A county whose fit fails despite qualifying
/// is logged and skipped; a malformed source file aborts the run.
#[tracing::instrument(skip(config), fields(data_dir = %config.data_dir.display()))]
pub fn run_analysis(config: &AnalysisConfig) -> Result<Vec<CountyGrowth>> {
    let codes = CodeMaps::load(&config.data_dir)?;

    let population = parse_population_table(open_dataset(&config.data_dir, POPULATION_FILE)?)?;
    let area = parse_area_table(open_dataset(&config.data_dir, AREA_FILE)?)?;
    let cases = parse_case_table(open_dataset(&config.data_dir, CASE_FILE)?)?;
    let climate = parse_climate_table(open_dataset(&config.data_dir, TEMPERATURE_FILE)?)?;

    info!(
        population_rows = population.len(),
        area_rows = area.len(),
        case_rows = cases.rows.len(),
        climate_rows = climate.len(),
        dates = cases.dates.len(),
        "Datasets loaded"
    );

    let temperatures = reference_temperatures(&climate, &codes);
    let unified = merge_datasets(&population, &area, cases, &temperatures, &codes)?;

    let window_dates = trailing_window(&unified.dates, config.window_length, config.window_offset)?;
    if let (Some(first), Some(last)) = (window_dates.first(), window_dates.last()) {
        info!(from = %first, to = %last, "Analysis window");
    }

    let mut results = Vec::new();
    let mut non_qualifying = 0usize;
    let mut failed = 0usize;

    for record in &unified.records {
        let window = trailing_window(&record.cases, config.window_length, config.window_offset)?;
        if !qualifies(window) {
            non_qualifying += 1;
            continue;
        }
        match fit_growth_rate(window) {
            Ok(fit) => results.push(CountyGrowth {
                county_state: record.county_state.clone(),
                fips: record.fips.clone(),
                population_density: record.population_density,
                temperature: record.temperature,
                growth_rate: fit.growth_rate,
                r_squared: fit.r_squared,
            }),
            Err(e) => {
                error!(county = %record.county_state, error = %e, "Growth fit failed");
                failed += 1;
            }
        }
    }

    info!(
        qualifying = results.len(),
        non_qualifying, failed, "Growth analysis complete"
    );

    Ok(results)
}

fn open_dataset(dir: &Path, name: &str) -> Result<File> {
    let path = dir.join(name);
    File::open(&path).with_context(|| format!("opening dataset {}", path.display()))
}
