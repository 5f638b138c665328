//! HTTP download support for the public source datasets.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::parser::{AREA_FILE, CASE_FILE, POPULATION_FILE, TEMPERATURE_FILE};

/// Datasets with a stable public URL, downloadable as-is.
pub static DATASET_SOURCES: &[(&str, &str)] = &[(
    CASE_FILE,
    "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_US.csv",
)];

/// Datasets published behind portals or versioned FTP paths; they have to be
/// prepared by hand into the expected layout.
pub static MANUAL_SOURCES: &[(&str, &str)] = &[
    (
        POPULATION_FILE,
        "https://www.census.gov/data/tables/time-series/demo/popest/2010s-counties-total.html",
    ),
    (
        AREA_FILE,
        "http://data.sagepub.com/sagestats/document.php?id=7604",
    ),
    (
        TEMPERATURE_FILE,
        "https://www.ncei.noaa.gov/pub/data/cirs/climdiv/",
    ),
];

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response>;
}

pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    Ok(resp.bytes().await?.to_vec())
}

/// Downloads `url` into `dest`.
pub async fn download_to<C: HttpClient>(client: &C, url: &str, dest: &Path) -> Result<()> {
    let bytes = fetch_bytes(client, url).await?;
    std::fs::write(dest, &bytes).with_context(|| format!("writing {}", dest.display()))?;
    info!(url, dest = %dest.display(), bytes = bytes.len(), "Dataset downloaded");
    Ok(())
}
