//! Parsers for the four source datasets.
//!
//! Each dataset comes from a different publisher with its own layout; the
//! parsers here turn them into typed rows and nothing more. Geographic key
//! reconciliation happens later, in the merge.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::io::Read;

use crate::codes::zero_fill_fips;

/// Cumulative case counts per county, one column per date (most recent last).
pub const CASE_FILE: &str = "covid19_confirmed_us.csv";
/// County population estimates with one column per year.
pub const POPULATION_FILE: &str = "county_population_us.csv";
/// County land area in square miles, keyed by postal state abbreviation.
pub const AREA_FILE: &str = "county_area_us.csv";
/// NOAA climate-division monthly mean temperatures, packed-record format.
pub const TEMPERATURE_FILE: &str = "climdiv_tmpccy.txt";

/// The parsed case-count table: a shared chronological date axis plus one
/// row of cumulative counts per county.
#[derive(Debug)]
pub struct CaseTable {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<CaseRow>,
}

#[derive(Debug)]
pub struct CaseRow {
    /// Five-digit FIPS key, zero-padded. `None` when the source cell is blank
    /// (territories and unassigned buckets).
    pub fips: Option<String>,
    /// Bare administrative name, without the " County" suffix.
    pub admin_name: String,
    pub state: String,
    pub counts: Vec<f64>,
}

#[derive(Debug)]
pub struct PopulationRow {
    pub county: String,
    pub state: String,
    pub population_2019: f64,
}

#[derive(Debug)]
pub struct AreaRow {
    pub county: String,
    pub state_abbrev: String,
    pub square_miles: f64,
}

/// One year of monthly mean temperatures for one climate-division county.
#[derive(Debug)]
pub struct ClimateRow {
    pub state_code: String,
    pub county_code: String,
    pub climate_code: String,
    pub year: u16,
    /// January through December.
    pub monthly: [f64; 12],
}

impl ClimateRow {
    /// Mean temperature for `month` (0 = January).
    pub fn month(&self, month: usize) -> f64 {
        self.monthly[month]
    }
}

/// Parses the case-count table.
///
/// Date columns are detected from the header (`m/d/yy`); every other column
/// except `FIPS`, `Admin2`, and `Province_State` is ignored. Header order is
/// preserved, so the series stays chronological with the most recent date
/// last.
///
/// # Errors
///
/// Returns an error if a required column is missing or a row is ragged;
/// there is no partial-success mode for a broken source file.
pub fn parse_case_table(reader: impl Read) -> Result<CaseTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().context("reading case table header")?.clone();

    let fips_idx = required_column(&headers, "FIPS", "case table")?;
    let admin_idx = required_column(&headers, "Admin2", "case table")?;
    let state_idx = required_column(&headers, "Province_State", "case table")?;

    let mut date_columns = Vec::new();
    let mut dates = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Ok(date) = NaiveDate::parse_from_str(header, "%m/%d/%y") {
            date_columns.push(idx);
            dates.push(date);
        }
    }
    if dates.is_empty() {
        bail!("case table has no date columns");
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.context("reading case table row")?;

        let fips_raw = record.get(fips_idx).unwrap_or("").trim();
        let fips = if fips_raw.is_empty() {
            None
        } else {
            Some(zero_fill_fips(fips_raw))
        };

        // Unparsable counts become NaN and fail window qualification later.
        let counts = date_columns
            .iter()
            .map(|&idx| parse_numeric(record.get(idx).unwrap_or("")))
            .collect();

        rows.push(CaseRow {
            fips,
            admin_name: record.get(admin_idx).unwrap_or("").trim().to_string(),
            state: record.get(state_idx).unwrap_or("").trim().to_string(),
            counts,
        });
    }

    Ok(CaseTable { dates, rows })
}

/// Parses the population table, keeping only the 2019 estimate.
pub fn parse_population_table(reader: impl Read) -> Result<Vec<PopulationRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .context("reading population table header")?
        .clone();

    let county_idx = required_column(&headers, "County", "population table")?;
    let state_idx = required_column(&headers, "State", "population table")?;
    let pop_idx = required_column(&headers, "2019", "population table")?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.context("reading population table row")?;
        rows.push(PopulationRow {
            county: record.get(county_idx).unwrap_or("").trim().to_string(),
            state: record.get(state_idx).unwrap_or("").trim().to_string(),
            population_2019: parse_numeric(record.get(pop_idx).unwrap_or("")),
        });
    }

    Ok(rows)
}

/// Parses the area table. County names may still carry a `", ST"` suffix
/// here; the merge strips it.
pub fn parse_area_table(reader: impl Read) -> Result<Vec<AreaRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().context("reading area table header")?.clone();

    let county_idx = required_column(&headers, "County", "area table")?;
    let abbrev_idx = required_column(&headers, "ST", "area table")?;
    let miles_idx = required_column(&headers, "SQUARE MILES", "area table")?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.context("reading area table row")?;
        rows.push(AreaRow {
            county: record.get(county_idx).unwrap_or("").trim().to_string(),
            state_abbrev: record.get(abbrev_idx).unwrap_or("").trim().to_string(),
            square_miles: parse_numeric(record.get(miles_idx).unwrap_or("")),
        });
    }

    Ok(rows)
}

/// Parses the NOAA climate-division temperature file.
///
/// Rows are whitespace-delimited: a packed identifier
/// `StateCode(2) + CountyCode(3) + ClimateCode(2) + Year(4)` followed by
/// twelve monthly means. A leading header line is skipped if present.
pub fn parse_climate_table(mut reader: impl Read) -> Result<Vec<ClimateRow>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .context("reading temperature file")?;

    let mut rows = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_climate_line(line) {
            Ok(row) => rows.push(row),
            // The first line may be a column-name header.
            Err(_) if line_no == 0 => continue,
            Err(e) => return Err(e.context(format!("temperature file line {}", line_no + 1))),
        }
    }

    Ok(rows)
}

fn parse_climate_line(line: &str) -> Result<ClimateRow> {
    let mut fields = line.split_whitespace();
    let packed = fields.next().context("empty climate record")?;

    if packed.len() != 11 || !packed.bytes().all(|b| b.is_ascii_digit()) {
        bail!("malformed packed identifier '{packed}'");
    }

    let year: u16 = packed[7..11].parse()?;

    let mut monthly = [0.0f64; 12];
    for (i, slot) in monthly.iter_mut().enumerate() {
        let field = fields
            .next()
            .with_context(|| format!("missing month {} value", i + 1))?;
        *slot = field
            .parse()
            .with_context(|| format!("bad month {} value '{field}'", i + 1))?;
    }

    Ok(ClimateRow {
        state_code: packed[0..2].to_string(),
        county_code: packed[2..5].to_string(),
        climate_code: packed[5..7].to_string(),
        year,
        monthly,
    })
}

fn required_column(headers: &csv::StringRecord, name: &str, table: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .with_context(|| format!("{table}: missing required column '{name}'"))
}

/// Lenient numeric parse for attribute cells: strips thousands separators,
/// maps blanks and garbage to NaN. NaN never joins or qualifies downstream.
fn parse_numeric(cell: &str) -> f64 {
    let cleaned = cell.trim().replace(',', "");
    if cleaned.is_empty() {
        return f64::NAN;
    }
    cleaned.parse().unwrap_or(f64::NAN)
}
