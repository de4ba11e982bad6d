//! Open-Meteo air quality, forecast and marine APIs

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{CurrentConditions, DailySeries, DomainProvider, get_json};
use crate::Result;
use crate::models::{Domain, FetchWindow, HourlySeries, Location};

/// Daily aggregates requested for the weather domain
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum";

/// Open-Meteo client for a single domain
pub struct OpenMeteoProvider {
    http: ClientWithMiddleware,
    domain: Domain,
    base_url: String,
}

/// Shared response envelope of the three Open-Meteo APIs
#[derive(Debug, Default, Deserialize)]
struct OpenMeteoResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    elevation: Option<f64>,
    timezone: Option<String>,
    hourly: Option<TimeBlock>,
    current: Option<BTreeMap<String, Value>>,
    current_units: Option<BTreeMap<String, String>>,
    daily: Option<TimeBlock>,
}

/// `time` plus one array per requested variable
#[derive(Debug, Default, Deserialize)]
struct TimeBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(flatten)]
    variables: BTreeMap<String, Value>,
}

impl TimeBlock {
    /// Numeric array for `name`; non-numeric entries become `None`
    fn numbers(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.variables
            .get(name)
            .and_then(Value::as_array)
            .map(|values| values.iter().map(Value::as_f64).collect())
    }

    fn into_hourly(self, metrics: &[&str]) -> HourlySeries {
        let series = metrics
            .iter()
            .filter_map(|metric| self.numbers(metric).map(|v| ((*metric).to_string(), v)))
            .collect();
        HourlySeries {
            time: self.time,
            metrics: series,
        }
    }
}

impl OpenMeteoProvider {
    #[must_use]
    pub fn new(http: ClientWithMiddleware, domain: Domain, base_url: String) -> Self {
        Self {
            http,
            domain,
            base_url,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self.domain {
            Domain::AirQuality => "open-meteo air quality",
            Domain::Weather => "open-meteo forecast",
            Domain::Marine => "open-meteo marine",
        }
    }

    fn url(&self, location: &Location, params: &str) -> String {
        format!(
            "{}?latitude={}&longitude={}&{}&timezone=auto",
            self.base_url.trim_end_matches('/'),
            location.latitude,
            location.longitude,
            params
        )
    }

    fn hourly_url(&self, location: &Location, window: FetchWindow) -> String {
        self.url(
            location,
            &format!(
                "hourly={}&past_days={}&forecast_days={}",
                self.domain.metrics().join(","),
                window.past_days,
                window.forecast_days
            ),
        )
    }

    fn current_url(&self, location: &Location) -> String {
        self.url(
            location,
            &format!("current={}", self.domain.metrics().join(",")),
        )
    }

    fn daily_url(&self, location: &Location, days: u32) -> String {
        self.url(
            location,
            &format!("daily={DAILY_FIELDS}&forecast_days={days}"),
        )
    }
}

fn current_conditions(response: OpenMeteoResponse, metrics: &[&str]) -> CurrentConditions {
    let current = response.current.unwrap_or_default();
    let values = metrics
        .iter()
        .map(|metric| {
            (
                (*metric).to_string(),
                current.get(*metric).and_then(Value::as_f64),
            )
        })
        .collect();
    CurrentConditions {
        latitude: response.latitude,
        longitude: response.longitude,
        elevation: response.elevation,
        timezone: response.timezone,
        time: current.get("time").and_then(Value::as_str).map(str::to_string),
        values,
        units: response.current_units.unwrap_or_default(),
    }
}

fn daily_series(response: OpenMeteoResponse) -> DailySeries {
    let Some(daily) = response.daily else {
        return DailySeries::default();
    };
    DailySeries {
        temperature_max: daily.numbers("temperature_2m_max").unwrap_or_default(),
        temperature_min: daily.numbers("temperature_2m_min").unwrap_or_default(),
        precipitation_sum: daily.numbers("precipitation_sum").unwrap_or_default(),
        time: daily.time,
    }
}

#[async_trait]
impl DomainProvider for OpenMeteoProvider {
    #[instrument(skip(self), fields(domain = %self.domain))]
    async fn hourly(&self, location: &Location, window: FetchWindow) -> Result<HourlySeries> {
        let url = self.hourly_url(location, window);
        debug!("Fetching hourly series: {}", url);
        let response: OpenMeteoResponse = get_json(&self.http, self.provider_name(), &url).await?;
        Ok(response
            .hourly
            .map(|block| block.into_hourly(self.domain.metrics()))
            .unwrap_or_default())
    }

    #[instrument(skip(self), fields(domain = %self.domain))]
    async fn current(&self, location: &Location) -> Result<CurrentConditions> {
        let url = self.current_url(location);
        debug!("Fetching current conditions: {}", url);
        let response: OpenMeteoResponse = get_json(&self.http, self.provider_name(), &url).await?;
        Ok(current_conditions(response, self.domain.metrics()))
    }

    #[instrument(skip(self), fields(domain = %self.domain))]
    async fn daily(&self, location: &Location, days: u32) -> Result<DailySeries> {
        if self.domain != Domain::Weather {
            return Ok(DailySeries::default());
        }
        let url = self.daily_url(location, days);
        debug!("Fetching daily series: {}", url);
        let response: OpenMeteoResponse = get_json(&self.http, self.provider_name(), &url).await?;
        Ok(daily_series(response))
    }
}
