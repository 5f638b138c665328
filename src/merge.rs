//! Key reconciliation and the dataset merge.
//!
//! Joins are inner joins on canonical keys: (population ⋈ area) on
//! `(County, State)`, then ⋈ case data on `(County, State)`, then ⋈
//! temperature on FIPS. A county missing from any one source is excluded.
//! Rows whose identifiers don't resolve through the code tables drop out the
//! same way, counted and logged, never fatal.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::analyzers::utility::mean;
use crate::codes::{CodeMaps, strip_state_suffix, with_county_suffix};
use crate::parser::{AreaRow, CaseTable, ClimateRow, PopulationRow};

/// Square miles to square kilometers.
pub const SQ_MILES_TO_SQ_KM: f64 = 2.58999;

/// Years whose March temperatures form the reference mean.
pub const REFERENCE_YEARS: std::ops::RangeInclusive<u16> = 2015..=2019;
/// Zero-based reference month (March).
pub const REFERENCE_MONTH: usize = 2;

/// One county after all four datasets have been joined.
#[derive(Debug, Clone)]
pub struct UnifiedRecord {
    /// Display key, `"<County> <State>"`. Derived, never joined on.
    pub county_state: String,
    pub county: String,
    pub state: String,
    pub fips: String,
    pub population_2019: f64,
    pub area_sq_km: f64,
    /// People per square kilometer.
    pub population_density: f64,
    /// Mean March temperature over the reference years, °F.
    pub temperature: f64,
    /// Cumulative case counts, chronological, most recent last.
    pub cases: Vec<f64>,
}

/// The merged table: shared date axis plus one record per surviving county.
#[derive(Debug)]
pub struct UnifiedTable {
    pub dates: Vec<NaiveDate>,
    pub records: Vec<UnifiedRecord>,
}

/// Mean reference-period temperature per county FIPS key.
///
/// Filters the climate rows to [`REFERENCE_YEARS`], resolves each row's
/// climate-division state code to a FIPS key, and averages the March values
/// per county. Rows with unmapped codes are dropped.
pub fn reference_temperatures(rows: &[ClimateRow], codes: &CodeMaps) -> HashMap<String, f64> {
    let mut march_values: HashMap<String, Vec<f64>> = HashMap::new();
    let mut unmapped = 0usize;

    for row in rows {
        if !REFERENCE_YEARS.contains(&row.year) {
            continue;
        }
        let Some(state) = codes.state_for_climate_code(&row.state_code) else {
            debug!(code = %row.state_code, "Unmapped climate state code");
            unmapped += 1;
            continue;
        };
        let Some(fips) = codes.county_fips(state, &row.county_code) else {
            debug!(state, "State has no FIPS prefix");
            unmapped += 1;
            continue;
        };
        march_values
            .entry(fips)
            .or_default()
            .push(row.month(REFERENCE_MONTH));
    }

    if unmapped > 0 {
        info!(unmapped, "Climate rows dropped for unmapped codes");
    }

    march_values
        .into_iter()
        .map(|(fips, values)| (fips, mean(&values)))
        .collect()
}

#[derive(Debug, Default)]
struct DropCounts {
    unmapped_abbrev: usize,
    duplicate_key: usize,
    no_area: usize,
    no_population_area: usize,
    no_fips: usize,
    no_temperature: usize,
    nonfinite: usize,
}

struct PopArea {
    population_2019: f64,
    area_sq_km: f64,
    population_density: f64,
}

/// Joins the four datasets into one [`UnifiedTable`].
///
/// # Errors
///
/// Returns an error only when the case table is empty of date columns;
/// everything else that fails to join is dropped and counted.
pub fn merge_datasets(
    population: &[PopulationRow],
    area: &[AreaRow],
    cases: CaseTable,
    temperatures: &HashMap<String, f64>,
    codes: &CodeMaps,
) -> Result<UnifiedTable> {
    if cases.dates.is_empty() {
        bail!("case table has no date columns to analyze");
    }

    let mut drops = DropCounts::default();

    // Area index on the canonical (County, State) key. Abbreviations resolve
    // through the code table; duplicates keep the first row.
    let mut area_index: HashMap<(String, String), f64> = HashMap::new();
    for row in area {
        let Some(state) = codes.state_for_abbrev(&row.state_abbrev) else {
            debug!(abbrev = %row.state_abbrev, county = %row.county, "Unmapped state abbreviation");
            drops.unmapped_abbrev += 1;
            continue;
        };
        let key = (
            strip_state_suffix(&row.county).to_string(),
            state.to_string(),
        );
        if area_index.contains_key(&key) {
            debug!(county = %key.0, state = %key.1, "Duplicate area key");
            drops.duplicate_key += 1;
            continue;
        }
        area_index.insert(key, row.square_miles);
    }

    // population ⋈ area
    let mut pop_area: HashMap<(String, String), PopArea> = HashMap::new();
    for row in population {
        let key = (row.county.clone(), row.state.clone());
        let Some(&square_miles) = area_index.get(&key) else {
            drops.no_area += 1;
            continue;
        };
        let area_sq_km = square_miles * SQ_MILES_TO_SQ_KM;
        if pop_area.contains_key(&key) {
            drops.duplicate_key += 1;
            continue;
        }
        pop_area.insert(
            key,
            PopArea {
                population_2019: row.population_2019,
                area_sq_km,
                population_density: row.population_2019 / area_sq_km,
            },
        );
    }

    // ⋈ cases on (County, State), then ⋈ temperature on FIPS
    let mut records = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for row in cases.rows {
        let county = with_county_suffix(&row.admin_name);
        let key = (county.clone(), row.state.clone());

        let Some(pa) = pop_area.get(&key) else {
            drops.no_population_area += 1;
            continue;
        };
        let Some(fips) = row.fips else {
            drops.no_fips += 1;
            continue;
        };
        let Some(&temperature) = temperatures.get(&fips) else {
            drops.no_temperature += 1;
            continue;
        };
        if !pa.population_density.is_finite() {
            drops.nonfinite += 1;
            continue;
        }
        if !seen.insert(key.clone()) {
            drops.duplicate_key += 1;
            continue;
        }

        records.push(UnifiedRecord {
            county_state: format!("{} {}", county, row.state),
            county,
            state: row.state,
            fips,
            population_2019: pa.population_2019,
            area_sq_km: pa.area_sq_km,
            population_density: pa.population_density,
            temperature,
            cases: row.counts,
        });
    }

    info!(
        merged = records.len(),
        unmapped_abbrev = drops.unmapped_abbrev,
        duplicate_key = drops.duplicate_key,
        no_area = drops.no_area,
        no_population_area = drops.no_population_area,
        no_fips = drops.no_fips,
        no_temperature = drops.no_temperature,
        nonfinite = drops.nonfinite,
        "Merge complete"
    );

    Ok(UnifiedTable {
        dates: cases.dates,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CaseRow;

    #[test]
    fn test_area_conversion_constant() {
        assert!((100.0 * SQ_MILES_TO_SQ_KM - 258.999).abs() < 1e-9);
    }

    #[test]
    fn test_merge_joins_all_four_sources() {
        let table = merge_datasets(
            &population_rows(),
            &area_rows(),
            case_table(),
            &temperatures(),
            &codes(),
        )
        .unwrap();

        assert_eq!(table.records.len(), 1);
        let rec = &table.records[0];
        assert_eq!(rec.county_state, "Autauga County Alabama");
        assert_eq!(rec.fips, "01001");
        assert_eq!(rec.area_sq_km, 100.0 * SQ_MILES_TO_SQ_KM);
        assert_eq!(rec.population_density, 55869.0 / (100.0 * SQ_MILES_TO_SQ_KM));
        assert_eq!(rec.temperature, 57.0);
        assert_eq!(rec.cases, vec![10.0, 20.0, 40.0]);
    }

    #[test]
    fn test_density_positive_for_positive_inputs() {
        let table = merge_datasets(
            &population_rows(),
            &area_rows(),
            case_table(),
            &temperatures(),
            &codes(),
        )
        .unwrap();

        for rec in &table.records {
            assert!(rec.area_sq_km > 0.0);
            assert!(rec.population_density > 0.0);
        }
    }

    #[test]
    fn test_unmapped_abbreviation_drops_row() {
        let mut area = area_rows();
        area[0].state_abbrev = "ZZ".to_string();

        let table = merge_datasets(
            &population_rows(),
            &area,
            case_table(),
            &temperatures(),
            &codes(),
        )
        .unwrap();

        assert!(table.records.is_empty());
    }

    #[test]
    fn test_county_missing_from_one_source_is_excluded() {
        // Case row for a county the population table has never heard of.
        let mut cases = case_table();
        cases.rows.push(CaseRow {
            fips: Some("01003".to_string()),
            admin_name: "Baldwin".to_string(),
            state: "Alabama".to_string(),
            counts: vec![1.0, 2.0, 3.0],
        });

        let table = merge_datasets(
            &population_rows(),
            &area_rows(),
            cases,
            &temperatures(),
            &codes(),
        )
        .unwrap();

        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].county, "Autauga County");
    }

    #[test]
    fn test_missing_temperature_is_excluded() {
        let table = merge_datasets(
            &population_rows(),
            &area_rows(),
            case_table(),
            &HashMap::new(),
            &codes(),
        )
        .unwrap();

        assert!(table.records.is_empty());
    }

    #[test]
    fn test_canonical_county_names_have_no_comma() {
        for row in area_rows() {
            assert!(!strip_state_suffix(&row.county).contains(','));
        }
    }

    #[test]
    fn test_reference_temperatures_average_march() {
        let rows: Vec<ClimateRow> = (2015..=2019)
            .map(|year| ClimateRow {
                state_code: "01".to_string(),
                county_code: "001".to_string(),
                climate_code: "02".to_string(),
                year,
                monthly: [
                    40.0,
                    42.0,
                    50.0 + (year - 2015) as f64, // March 50..54
                    60.0,
                    70.0,
                    80.0,
                    85.0,
                    84.0,
                    78.0,
                    65.0,
                    52.0,
                    44.0,
                ],
            })
            .collect();

        let temps = reference_temperatures(&rows, &codes());
        assert_eq!(temps.get("01001"), Some(&52.0));
    }

    #[test]
    fn test_reference_temperatures_ignore_out_of_range_years() {
        let rows = vec![ClimateRow {
            state_code: "01".to_string(),
            county_code: "001".to_string(),
            climate_code: "02".to_string(),
            year: 2009,
            monthly: [0.0; 12],
        }];

        assert!(reference_temperatures(&rows, &codes()).is_empty());
    }

    // Helpers building a one-county fixture that survives every join.

    fn codes() -> CodeMaps {
        let pairs = |v: &[(&str, &str)]| {
            v.iter()
                .map(|(k, s)| (k.to_string(), s.to_string()))
                .collect()
        };
        CodeMaps::from_maps(
            pairs(&[("AL", "Alabama")]),
            pairs(&[("01", "Alabama")]),
            pairs(&[("Alabama", "01")]),
        )
    }

    fn population_rows() -> Vec<PopulationRow> {
        vec![PopulationRow {
            county: "Autauga County".to_string(),
            state: "Alabama".to_string(),
            population_2019: 55869.0,
        }]
    }

    fn area_rows() -> Vec<AreaRow> {
        vec![AreaRow {
            county: "Autauga County, AL".to_string(),
            state_abbrev: "AL".to_string(),
            square_miles: 100.0,
        }]
    }

    fn case_table() -> CaseTable {
        CaseTable {
            dates: vec![
                NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2020, 3, 3).unwrap(),
            ],
            rows: vec![CaseRow {
                fips: Some("01001".to_string()),
                admin_name: "Autauga".to_string(),
                state: "Alabama".to_string(),
                counts: vec![10.0, 20.0, 40.0],
            }],
        }
    }

    fn temperatures() -> HashMap<String, f64> {
        HashMap::from([("01001".to_string(), 57.0)])
    }
}
