//! Metric extraction from pre-fetched endpoint payloads
//!
//! The suggestions entry point receives the JSON bodies of the `/api/aqi`,
//! `/api/climate` and `/api/marine` endpoints as the caller already holds
//! them. Missing fields become `None`; a reported zero is a real reading.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::aggregator::AggregatedSamples;
use crate::models::{Domain, DomainSample};

/// Values the synthesizer needs, pulled out of the three payloads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionInputs {
    pub aqi: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub rain: Option<f64>,
    pub wave_height: Option<f64>,
    pub sea_temp: Option<f64>,
    pub current_velocity: Option<f64>,
}

/// Echo of the analysed values in the suggestions response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAnalyzed {
    pub aqi: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wave_height: Option<f64>,
    pub sea_temp: Option<f64>,
}

fn number(value: &Value, path: &[&str]) -> Option<f64> {
    path.iter()
        .try_fold(value, |node, key| node.get(key))
        .and_then(Value::as_f64)
}

fn first_hourly(open_meteo: &Value, metric: &str) -> Option<f64> {
    open_meteo
        .get("hourly")?
        .get(metric)?
        .as_array()?
        .first()
        .and_then(Value::as_f64)
}

impl SuggestionInputs {
    #[must_use]
    pub fn from_payloads(aqi: &Value, weather: &Value, marine: &Value) -> Self {
        let open_meteo = aqi.get("openMeteo").unwrap_or(&Value::Null);
        let pollutant = |metric: &str| {
            number(open_meteo, &["current", metric]).or_else(|| first_hourly(open_meteo, metric))
        };

        Self {
            aqi: number(open_meteo, &["latestAQI"])
                .or_else(|| number(open_meteo, &["current", "us_aqi"])),
            pm25: pollutant("pm2_5"),
            pm10: pollutant("pm10"),
            temperature: number(weather, &["currentWeather", "temperature"]),
            humidity: number(weather, &["currentWeather", "humidity"]),
            wind_speed: number(weather, &["currentWeather", "windSpeed"]),
            rain: number(weather, &["currentWeather", "rain"]),
            wave_height: number(marine, &["currentMarine", "waveHeight"]),
            sea_temp: number(marine, &["currentMarine", "seaSurfaceTemperature"]),
            current_velocity: number(marine, &["currentMarine", "oceanCurrentVelocity"]),
        }
    }

    /// Samples for all three domains keyed by provider metric names
    #[must_use]
    pub fn samples(&self) -> AggregatedSamples {
        let air_quality = DomainSample::new(Domain::AirQuality)
            .with("us_aqi", self.aqi)
            .with("pm2_5", self.pm25)
            .with("pm10", self.pm10);
        let weather = DomainSample::new(Domain::Weather)
            .with("temperature_2m", self.temperature)
            .with("relative_humidity_2m", self.humidity)
            .with("wind_speed_10m", self.wind_speed)
            .with("rain", self.rain);
        let marine = DomainSample::new(Domain::Marine)
            .with("wave_height", self.wave_height)
            .with("sea_surface_temperature", self.sea_temp)
            .with("ocean_current_velocity", self.current_velocity);

        let per_domain = BTreeMap::from([
            (Domain::AirQuality, Some(air_quality)),
            (Domain::Weather, Some(weather)),
            (Domain::Marine, Some(marine)),
        ]);
        AggregatedSamples { per_domain }
    }

    #[must_use]
    pub fn analyzed(&self) -> DataAnalyzed {
        DataAnalyzed {
            aqi: self.aqi,
            pm25: self.pm25,
            pm10: self.pm10,
            temperature: self.temperature,
            humidity: self.humidity,
            wave_height: self.wave_height,
            sea_temp: self.sea_temp,
        }
    }
}
