//! Upstream environmental data providers
//!
//! Every provider is reached through a [`ClientWithMiddleware`] that retries
//! transient failures and enforces a per-request timeout. The aggregator and
//! the HTTP handlers only see the [`DomainProvider`] and [`GlacierSource`]
//! traits, so tests substitute in-process fakes.

pub mod glacier;
pub mod open_meteo;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ProvidersConfig;
use crate::models::{Domain, FetchWindow, HourlySeries, Location};
use crate::{EcoLensError, Result};

pub use glacier::{GlacierSource, HttpGlacierSource, REGIONAL_GLACIERS, load_glacier_dataset};
pub use open_meteo::OpenMeteoProvider;

/// User agent sent to every upstream service
pub const USER_AGENT: &str = concat!("EcoLens/", env!("CARGO_PKG_VERSION"));

/// Current conditions reported by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub timezone: Option<String>,
    pub time: Option<String>,
    pub values: BTreeMap<String, Option<f64>>,
    pub units: BTreeMap<String, String>,
}

impl CurrentConditions {
    #[must_use]
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied().flatten()
    }
}

/// Daily aggregates for the climate endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySeries {
    pub time: Vec<String>,
    pub temperature_max: Vec<Option<f64>>,
    pub temperature_min: Vec<Option<f64>>,
    pub precipitation_sum: Vec<Option<f64>>,
}

/// A source of time series for one domain
#[async_trait]
pub trait DomainProvider: Send + Sync {
    /// Hourly series covering the requested window
    async fn hourly(&self, location: &Location, window: FetchWindow) -> Result<HourlySeries>;

    /// Values at the provider's current time step
    async fn current(&self, location: &Location) -> Result<CurrentConditions>;

    /// Daily aggregates; providers without daily data report an empty series
    async fn daily(&self, _location: &Location, _days: u32) -> Result<DailySeries> {
        Ok(DailySeries::default())
    }
}

/// One provider per domain
#[derive(Clone)]
pub struct Providers {
    pub air_quality: Arc<dyn DomainProvider>,
    pub weather: Arc<dyn DomainProvider>,
    pub marine: Arc<dyn DomainProvider>,
}

impl Providers {
    /// Open-Meteo providers sharing one retrying client
    pub fn open_meteo(config: &ProvidersConfig) -> Result<Self> {
        let http = http_client(config.timeout(), config.max_retries)?;
        Ok(Self {
            air_quality: Arc::new(OpenMeteoProvider::new(
                http.clone(),
                Domain::AirQuality,
                config.air_quality_url.clone(),
            )),
            weather: Arc::new(OpenMeteoProvider::new(
                http.clone(),
                Domain::Weather,
                config.forecast_url.clone(),
            )),
            marine: Arc::new(OpenMeteoProvider::new(
                http,
                Domain::Marine,
                config.marine_url.clone(),
            )),
        })
    }

    #[must_use]
    pub fn for_domain(&self, domain: Domain) -> &Arc<dyn DomainProvider> {
        match domain {
            Domain::AirQuality => &self.air_quality,
            Domain::Weather => &self.weather,
            Domain::Marine => &self.marine,
        }
    }
}

/// Build a client that retries transient failures with exponential backoff
pub fn http_client(timeout: Duration, max_retries: u32) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| EcoLensError::config(format!("Failed to create HTTP client: {e}")))?;
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// GET `url` and return the body of a successful response
pub(crate) async fn get_text(
    http: &ClientWithMiddleware,
    provider: &str,
    url: &str,
) -> Result<String> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| EcoLensError::upstream(provider, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let preview: String = body.chars().take(200).collect();
        return Err(EcoLensError::upstream(
            provider,
            format!("HTTP {status}: {preview}"),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| EcoLensError::upstream(provider, format!("Failed to read body: {e}")))
}

/// GET `url` and decode a successful JSON response
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &ClientWithMiddleware,
    provider: &str,
    url: &str,
) -> Result<T> {
    let body = get_text(http, provider, url).await?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        EcoLensError::upstream(provider, format!("Failed to parse response: {e}: {preview}"))
    })
}
