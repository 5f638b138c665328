//! Output formatting and persistence for analysis results.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use tracing::{debug, info};

use crate::analyzers::types::CountyGrowth;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs the result rows using Rust's debug pretty-print format.
pub fn print_pretty(results: &[CountyGrowth]) {
    debug!("{:#?}", results);
}

/// Logs the result rows as pretty-printed JSON.
pub fn print_json(results: &[CountyGrowth]) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(results)?);
    Ok(())
}

/// Appends the result rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_results(path: &str, results: &[CountyGrowth]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = results.len(), "Appending CSV results");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for row in results {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_row() -> CountyGrowth {
        CountyGrowth {
            county_state: "Autauga County Alabama".to_string(),
            fips: "01001".to_string(),
            population_density: 215.7,
            temperature: 57.0,
            growth_rate: 0.69,
            r_squared: 0.99,
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&[sample_row()]);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&[sample_row()]).unwrap();
    }

    #[test]
    fn test_append_results_creates_file() {
        let path = temp_path("covid_county_rater_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_results(&path, &[sample_row()]).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Autauga County Alabama"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_results_writes_header_once() {
        let path = temp_path("covid_county_rater_test_header.csv");
        let _ = fs::remove_file(&path);

        append_results(&path, &[sample_row()]).unwrap();
        append_results(&path, &[sample_row()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // Header line should appear exactly once
        let header_count = content
            .lines()
            .filter(|l| l.contains("county_state"))
            .count();
        assert_eq!(header_count, 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_results_row_count() {
        let path = temp_path("covid_county_rater_test_rows.csv");
        let _ = fs::remove_file(&path);

        append_results(&path, &[sample_row(), sample_row()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
