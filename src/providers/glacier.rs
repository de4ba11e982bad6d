//! Glacier mass-balance sources: the DataHub global series and WGMS
//! per-glacier series.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{info, instrument, warn};

use super::get_text;
use crate::config::GlacierConfig;
use crate::models::{GlacierDataset, GlacierRecord};
use crate::{EcoLensError, Result};

/// WGMS glacier ids sampled for each region
pub const REGIONAL_GLACIERS: &[(&str, &[u32])] = &[
    ("Himalayas", &[3806, 3807, 3808]),
    ("Andes", &[3809, 3810]),
    ("Alaska", &[3811, 3812]),
    ("Alps", &[3813, 3814]),
];

const DATASET_NOTE: &str = "Global data from DataHub, regional data from WGMS";

#[async_trait]
pub trait GlacierSource: Send + Sync {
    /// Global cumulative mass balance, sorted by year
    async fn global(&self) -> Result<Vec<GlacierRecord>>;

    /// Annual mass balance of a single glacier
    async fn glacier(&self, id: u32) -> Result<Vec<GlacierRecord>>;
}

/// Fetches both series over HTTP
pub struct HttpGlacierSource {
    http: ClientWithMiddleware,
    config: GlacierConfig,
}

impl HttpGlacierSource {
    #[must_use]
    pub fn new(http: ClientWithMiddleware, config: GlacierConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl GlacierSource for HttpGlacierSource {
    #[instrument(skip(self))]
    async fn global(&self) -> Result<Vec<GlacierRecord>> {
        let body = get_text(&self.http, "datahub", &self.config.global_url).await?;
        parse_global_csv(&body)
    }

    #[instrument(skip(self))]
    async fn glacier(&self, id: u32) -> Result<Vec<GlacierRecord>> {
        let body = get_text(&self.http, "wgms", &self.config.regional_url(id)).await?;
        parse_regional_csv(&body)
    }
}

fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

fn parse_record(year: Option<&str>, balance: Option<&str>) -> Option<GlacierRecord> {
    let year = year?.parse::<i32>().ok()?;
    let mass_balance = balance?.parse::<f64>().ok()?;
    mass_balance.is_finite().then_some(GlacierRecord { year, mass_balance })
}

/// Parse the global CSV.
///
/// The year column is the first header containing "year" and the value column
/// the first containing "mean cumulative mass-balance", then "cumulative";
/// columns 0 and 1 are used when no header matches. Unparsable rows are skipped.
pub fn parse_global_csv(text: &str) -> Result<Vec<GlacierRecord>> {
    let mut reader = csv_reader(text);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EcoLensError::upstream("datahub", format!("Malformed CSV header: {e}")))?
        .iter()
        .map(str::to_lowercase)
        .collect();

    let find = |needle: &str| headers.iter().position(|h| h.contains(needle));
    let year_index = find("year").unwrap_or(0);
    let balance_index = find("mean cumulative mass-balance")
        .or_else(|| find("cumulative"))
        .unwrap_or(1);

    let mut records: Vec<GlacierRecord> = reader
        .records()
        .filter_map(std::result::Result::ok)
        .filter_map(|row| parse_record(row.get(year_index), row.get(balance_index)))
        .collect();
    records.sort_by_key(|r| r.year);
    Ok(records)
}

/// Parse a WGMS per-glacier CSV: year in column 0, annual balance in column 2
pub fn parse_regional_csv(text: &str) -> Result<Vec<GlacierRecord>> {
    let mut reader = csv_reader(text);
    Ok(reader
        .records()
        .filter_map(std::result::Result::ok)
        .filter(|row| row.len() >= 3)
        .filter_map(|row| parse_record(row.get(0), row.get(2)))
        .collect())
}

/// Assemble the full dataset.
///
/// The global series is required. Regions and glaciers are fetched
/// concurrently, a failing glacier contributes nothing, and each region is
/// averaged by year.
#[instrument(skip(source))]
pub async fn load_glacier_dataset(source: &dyn GlacierSource) -> Result<GlacierDataset> {
    info!("Fetching fresh glacier data");
    let global = source.global().await?;

    let regions = REGIONAL_GLACIERS.iter().map(|(region, ids)| async move {
        let series = join_all(ids.iter().map(|id| async move {
            source.glacier(*id).await.unwrap_or_else(|e| {
                warn!("Glacier {} unavailable: {}", id, e);
                Vec::new()
            })
        }))
        .await;
        (
            (*region).to_string(),
            GlacierDataset::average_by_year(series.into_iter().flatten()),
        )
    });
    let regional: BTreeMap<String, Vec<GlacierRecord>> = join_all(regions).await.into_iter().collect();

    Ok(GlacierDataset {
        global,
        regional,
        note: DATASET_NOTE.to_string(),
        fetched_at: Some(Utc::now()),
    })
}
