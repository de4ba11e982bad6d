//! Location model for geographic coordinates and resolution provenance

use serde::{Deserialize, Serialize};

/// A geographic point with an optional display name
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Display name (city, region, etc.)
    pub name: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: Option<String>) -> Self {
        Self {
            latitude,
            longitude,
            name,
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Name to show users; raw coordinates when no name is known
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.format_coordinates())
    }

    /// Whether both coordinates are finite and in range
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Strategy that produced a [`LocationCandidate`], most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationSource {
    RegexMatch,
    GeocodeApi,
    NearestCity,
    RawCoordinates,
}

/// Result of the location resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCandidate {
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub source: LocationSource,
}

impl LocationCandidate {
    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lon, self.name.clone())
    }
}
