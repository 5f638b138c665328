//! Geographic code tables and key canonicalization.
//!
//! The four source datasets disagree on how they identify a county: the area
//! table uses postal abbreviations, the climate-division file uses NOAA's own
//! two-digit state codes, and the case table carries FIPS codes. [`CodeMaps`]
//! holds the three lookup tables that reconcile them, loaded once at startup
//! and passed by reference into the merge.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// CSV file holding `State,Abbrev` rows (postal abbreviation per state).
pub const STATE_ABBREV_FILE: &str = "us_state_abbrev.csv";
/// CSV file holding `Code,State` rows (NOAA climate-division state codes).
pub const CLIMATE_CODES_FILE: &str = "climate_state_codes.csv";
/// CSV file holding `State,Code` rows (two-digit FIPS prefix per state).
pub const STATE_FIPS_FILE: &str = "state_fips_codes.csv";

/// The three geographic lookup tables. Read-only after construction.
pub struct CodeMaps {
    abbrev_to_state: HashMap<String, String>,
    climate_code_to_state: HashMap<String, String>,
    state_to_fips: HashMap<String, String>,
}

impl CodeMaps {
    /// Loads all three lookup tables from CSV files in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if any file is missing or lacks its expected columns.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            abbrev_to_state: load_map(&dir.join(STATE_ABBREV_FILE), "Abbrev", "State")?,
            climate_code_to_state: load_map(&dir.join(CLIMATE_CODES_FILE), "Code", "State")?,
            state_to_fips: load_map(&dir.join(STATE_FIPS_FILE), "State", "Code")?,
        })
    }

    /// Builds the maps directly. Used by tests and callers that already have
    /// the tables in memory.
    pub fn from_maps(
        abbrev_to_state: HashMap<String, String>,
        climate_code_to_state: HashMap<String, String>,
        state_to_fips: HashMap<String, String>,
    ) -> Self {
        Self {
            abbrev_to_state,
            climate_code_to_state,
            state_to_fips,
        }
    }

    /// Full state name for a postal abbreviation (e.g. "CA" → "California").
    /// `None` when the abbreviation is not in the table.
    pub fn state_for_abbrev(&self, abbrev: &str) -> Option<&str> {
        self.abbrev_to_state.get(abbrev).map(String::as_str)
    }

    /// Full state name for a two-digit climate-division state code.
    pub fn state_for_climate_code(&self, code: &str) -> Option<&str> {
        self.climate_code_to_state.get(code).map(String::as_str)
    }

    /// Two-digit FIPS prefix for a full state name.
    pub fn fips_prefix(&self, state: &str) -> Option<&str> {
        self.state_to_fips.get(state).map(String::as_str)
    }

    /// Five-digit county FIPS key: state prefix + three-digit county code.
    /// `None` when the state has no FIPS prefix in the table.
    pub fn county_fips(&self, state: &str, county_code: &str) -> Option<String> {
        self.fips_prefix(state)
            .map(|prefix| format!("{prefix}{county_code}"))
    }
}

/// Strips a trailing `", <state>"` suffix from a county name, so
/// `"Autauga County, AL"` becomes `"Autauga County"`.
pub fn strip_state_suffix(county: &str) -> &str {
    match county.split_once(',') {
        Some((name, _)) => name.trim(),
        None => county.trim(),
    }
}

/// Appends the literal `" County"` suffix to a bare administrative name, the
/// form the population and area tables already use.
pub fn with_county_suffix(name: &str) -> String {
    format!("{} County", name.trim())
}

/// Left-pads a FIPS fragment with zeros to the canonical five digits.
pub fn zero_fill_fips(raw: &str) -> String {
    format!("{:0>5}", raw.trim())
}

fn load_map(path: &Path, key_col: &str, value_col: &str) -> Result<HashMap<String, String>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("opening lookup table {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    let key_idx = headers
        .iter()
        .position(|h| h == key_col)
        .with_context(|| format!("{}: missing column '{}'", path.display(), key_col))?;
    let value_idx = headers
        .iter()
        .position(|h| h == value_col)
        .with_context(|| format!("{}: missing column '{}'", path.display(), value_col))?;

    let mut map = HashMap::new();
    for record in rdr.records() {
        let record = record?;
        let key = record.get(key_idx).unwrap_or("").trim();
        let value = record.get(value_idx).unwrap_or("").trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), value.to_string());
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_state_suffix() {
        assert_eq!(strip_state_suffix("Autauga County, AL"), "Autauga County");
        assert_eq!(strip_state_suffix("Autauga County"), "Autauga County");
        assert_eq!(strip_state_suffix(" Baldwin County , AL"), "Baldwin County");
    }

    #[test]
    fn test_with_county_suffix() {
        assert_eq!(with_county_suffix("Autauga"), "Autauga County");
        assert_eq!(with_county_suffix(" Maricopa "), "Maricopa County");
    }

    #[test]
    fn test_zero_fill_fips() {
        assert_eq!(zero_fill_fips("1001"), "01001");
        assert_eq!(zero_fill_fips("04013"), "04013");
    }

    #[test]
    fn test_county_fips_construction() {
        let codes = test_codes();
        assert_eq!(codes.county_fips("Arizona", "013"), Some("04013".into()));
        assert_eq!(codes.county_fips("Nowhere", "013"), None);
    }

    #[test]
    fn test_unmapped_identifiers_are_none() {
        let codes = test_codes();
        assert_eq!(codes.state_for_abbrev("ZZ"), None);
        assert_eq!(codes.state_for_climate_code("99"), None);
        assert_eq!(codes.fips_prefix("Atlantis"), None);
    }

    #[test]
    fn test_climate_code_differs_from_fips_prefix() {
        // NOAA's state numbering is not FIPS: Arizona is climate code 02 but
        // FIPS prefix 04.
        let codes = test_codes();
        assert_eq!(codes.state_for_climate_code("02"), Some("Arizona"));
        assert_eq!(codes.fips_prefix("Arizona"), Some("04"));
    }

    // Helper for tests
    fn test_codes() -> CodeMaps {
        let abbrev = [("AL", "Alabama"), ("AZ", "Arizona")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let climate = [("01", "Alabama"), ("02", "Arizona")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let fips = [("Alabama", "01"), ("Arizona", "04")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CodeMaps::from_maps(abbrev, climate, fips)
    }
}
