//! Threshold table
//!
//! Static reference bands used to classify air quality, weather and marine
//! readings. Each metric has its own ordered band enum; [`Severity`] wraps
//! them so alert categories from different domains share one type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Domain;

/// US AQI bands, ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqiBand {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiBand {
    #[must_use]
    pub fn classify(aqi: f64) -> Self {
        if aqi >= 301.0 {
            Self::Hazardous
        } else if aqi >= 201.0 {
            Self::VeryUnhealthy
        } else if aqi >= 151.0 {
            Self::Unhealthy
        } else if aqi >= 101.0 {
            Self::UnhealthySensitive
        } else if aqi >= 51.0 {
            Self::Moderate
        } else {
            Self::Good
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }
}

/// PM2.5 concentration bands in µg/m³, ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pm25Band {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
}

impl Pm25Band {
    #[must_use]
    pub fn classify(pm25: f64) -> Self {
        if pm25 > 55.5 {
            Self::Unhealthy
        } else if pm25 >= 35.5 {
            Self::UnhealthySensitive
        } else if pm25 >= 12.0 {
            Self::Moderate
        } else {
            Self::Good
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
        }
    }
}

/// Air temperature bands in °C, coldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TemperatureBand {
    ColdAlert,
    Cool,
    Comfortable,
    Warm,
    HeatAlert,
}

impl TemperatureBand {
    #[must_use]
    pub fn classify(celsius: f64) -> Self {
        if celsius > 35.0 {
            Self::HeatAlert
        } else if celsius < 10.0 {
            Self::ColdAlert
        } else if celsius < 15.0 {
            Self::Cool
        } else if celsius <= 25.0 {
            Self::Comfortable
        } else {
            Self::Warm
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ColdAlert => "Cold Weather Alert",
            Self::Cool => "Cool",
            Self::Comfortable => "Comfortable",
            Self::Warm => "Warm",
            Self::HeatAlert => "Extreme Heat Warning",
        }
    }
}

/// Significant wave height bands in metres, ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WaveBand {
    Safe,
    Moderate,
    Dangerous,
}

impl WaveBand {
    #[must_use]
    pub fn classify(metres: f64) -> Self {
        if metres > 4.0 {
            Self::Dangerous
        } else if metres >= 2.0 {
            Self::Moderate
        } else {
            Self::Safe
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Moderate => "Moderate Wave Conditions",
            Self::Dangerous => "Dangerous Sea Conditions",
        }
    }
}

/// Hourly rainfall bands in mm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RainfallBand {
    Normal,
    Heavy,
}

impl RainfallBand {
    #[must_use]
    pub fn classify(mm: f64) -> Self {
        if mm > 10.0 { Self::Heavy } else { Self::Normal }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Heavy => "Heavy Rainfall",
        }
    }
}

/// A classified reading for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "metric", content = "band")]
pub enum Severity {
    Aqi(AqiBand),
    Pm25(Pm25Band),
    Temperature(TemperatureBand),
    WaveHeight(WaveBand),
    Rainfall(RainfallBand),
}

impl Severity {
    /// Whether the band is past the alerting floor for its metric.
    #[must_use]
    pub fn is_alert(self) -> bool {
        match self {
            Self::Aqi(band) => band >= AqiBand::UnhealthySensitive,
            Self::Pm25(band) => band >= Pm25Band::UnhealthySensitive,
            Self::Temperature(band) => {
                matches!(band, TemperatureBand::ColdAlert | TemperatureBand::HeatAlert)
            }
            Self::WaveHeight(band) => band >= WaveBand::Moderate,
            Self::Rainfall(band) => band == RainfallBand::Heavy,
        }
    }

    /// Cross-metric rank, 0 for safe readings and 4 for emergencies.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Aqi(band) => match band {
                AqiBand::Good | AqiBand::Moderate => 0,
                AqiBand::UnhealthySensitive => 1,
                AqiBand::Unhealthy => 2,
                AqiBand::VeryUnhealthy => 3,
                AqiBand::Hazardous => 4,
            },
            Self::Pm25(band) => match band {
                Pm25Band::Good | Pm25Band::Moderate => 0,
                Pm25Band::UnhealthySensitive => 1,
                Pm25Band::Unhealthy => 2,
            },
            Self::Temperature(band) => match band {
                TemperatureBand::ColdAlert | TemperatureBand::HeatAlert => 2,
                _ => 0,
            },
            Self::WaveHeight(band) => match band {
                WaveBand::Safe => 0,
                WaveBand::Moderate => 1,
                WaveBand::Dangerous => 3,
            },
            Self::Rainfall(band) => match band {
                RainfallBand::Normal => 0,
                RainfallBand::Heavy => 2,
            },
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Aqi(band) => band.label(),
            Self::Pm25(band) => band.label(),
            Self::Temperature(band) => band.label(),
            Self::WaveHeight(band) => band.label(),
            Self::Rainfall(band) => band.label(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A metric that the threshold table knows how to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdMetric {
    Aqi,
    Pm25,
    Temperature,
    WaveHeight,
    Rainfall,
}

impl ThresholdMetric {
    /// Sample key this metric is read from.
    #[must_use]
    pub fn sample_key(self) -> &'static str {
        match self {
            Self::Aqi => "us_aqi",
            Self::Pm25 => "pm2_5",
            Self::Temperature => "temperature_2m",
            Self::WaveHeight => "wave_height",
            Self::Rainfall => "rain",
        }
    }

    #[must_use]
    pub fn classify(self, value: f64) -> Severity {
        match self {
            Self::Aqi => Severity::Aqi(AqiBand::classify(value)),
            Self::Pm25 => Severity::Pm25(Pm25Band::classify(value)),
            Self::Temperature => Severity::Temperature(TemperatureBand::classify(value)),
            Self::WaveHeight => Severity::WaveHeight(WaveBand::classify(value)),
            Self::Rainfall => Severity::Rainfall(RainfallBand::classify(value)),
        }
    }
}

/// Reference bands, rendered into generative prompts and consulted by the
/// deterministic fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdTable;

impl ThresholdTable {
    /// Metrics evaluated for a domain, in evaluation priority order.
    #[must_use]
    pub fn metrics_for(&self, domain: Domain) -> &'static [ThresholdMetric] {
        match domain {
            Domain::AirQuality => &[ThresholdMetric::Aqi, ThresholdMetric::Pm25],
            Domain::Weather => &[ThresholdMetric::Temperature, ThresholdMetric::Rainfall],
            Domain::Marine => &[ThresholdMetric::WaveHeight],
        }
    }

    /// Human-readable reference ranges for the given domains.
    #[must_use]
    pub fn reference_lines(&self, domain: Domain) -> &'static [&'static str] {
        match domain {
            Domain::AirQuality => &[
                "AQI: 0-50 (Good), 51-100 (Moderate), 101-150 (Unhealthy for Sensitive Groups), 151-200 (Unhealthy), 201-300 (Very Unhealthy), 301+ (Hazardous)",
                "PM2.5: <12 µg/m³ (Good), 12-35.4 (Moderate), 35.5-55.4 (Unhealthy for Sensitive Groups), >55.5 (Unhealthy)",
            ],
            Domain::Weather => &[
                "Temperature: 15-25°C (Comfortable), <10°C (Cold), >35°C (Heat Risk)",
                "Rainfall: >10 mm (Heavy)",
            ],
            Domain::Marine => &["Wave Height: <2m (Safe), 2-4m (Moderate), >4m (Dangerous)"],
        }
    }
}
