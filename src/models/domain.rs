//! Upstream data domains

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An independent upstream data category.
///
/// Declaration order is the fixed rendering order of alert sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    AirQuality,
    Weather,
    Marine,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::AirQuality, Domain::Weather, Domain::Marine];

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::AirQuality => "Air Quality",
            Self::Weather => "Weather",
            Self::Marine => "Marine",
        }
    }

    /// Hourly and current metrics requested from the domain's provider
    #[must_use]
    pub fn metrics(self) -> &'static [&'static str] {
        match self {
            Self::AirQuality => &[
                "us_aqi",
                "pm2_5",
                "pm10",
                "carbon_monoxide",
                "nitrogen_dioxide",
                "ozone",
                "dust",
                "uv_index",
            ],
            Self::Weather => &[
                "temperature_2m",
                "relative_humidity_2m",
                "dew_point_2m",
                "wind_speed_10m",
                "wind_direction_10m",
                "rain",
            ],
            Self::Marine => &[
                "wave_height",
                "swell_wave_height",
                "ocean_current_velocity",
                "ocean_current_direction",
                "sea_surface_temperature",
            ],
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Non-empty set of domains to fetch.
///
/// An empty request resolves to every domain at construction time, so an
/// instance is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Domain>", from = "Vec<Domain>")]
pub struct DomainSet(BTreeSet<Domain>);

impl DomainSet {
    /// Build a set from matched domains; no matches means all domains.
    pub fn resolve<I: IntoIterator<Item = Domain>>(matched: I) -> Self {
        let set: BTreeSet<Domain> = matched.into_iter().collect();
        if set.is_empty() {
            Self::all()
        } else {
            Self(set)
        }
    }

    #[must_use]
    pub fn all() -> Self {
        Self(Domain::ALL.into_iter().collect())
    }

    #[must_use]
    pub fn contains(&self, domain: Domain) -> bool {
        self.0.contains(&domain)
    }

    /// Domains in rendering order.
    pub fn iter(&self) -> impl Iterator<Item = Domain> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DomainSet {
    fn default() -> Self {
        Self::all()
    }
}

impl From<Vec<Domain>> for DomainSet {
    fn from(domains: Vec<Domain>) -> Self {
        Self::resolve(domains)
    }
}

impl From<DomainSet> for Vec<Domain> {
    fn from(set: DomainSet) -> Self {
        set.0.into_iter().collect()
    }
}
