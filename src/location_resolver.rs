//! Location Resolution Module
//!
//! Turns a place-name hint or raw coordinates into a [`LocationCandidate`]
//! through an ordered chain of strategies, first success wins:
//!
//! 1. Caller-supplied coordinates are wrapped as-is (`RawCoordinates`).
//! 2. A hint that is itself a coordinate pair such as `"48.85, 2.35"` is
//!    parsed. When a bundled settlement lies within the configured radius
//!    the point is named after it (`NearestCity`), otherwise it is kept
//!    unnamed (`RegexMatch`).
//! 3. The hint is sent to the geocoding service (`GeocodeApi`), bounded by
//!    the geocode timeout.
//! 4. The hint is looked up by name in the bundled settlement table
//!    (`NearestCity`).
//!
//! When every strategy misses the resolver fails with `LocationNotFound`.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::{GeocodingConfig, ResolverConfig};
use crate::geo::{SETTLEMENTS, Settlement, nearest_settlement, settlement_named};
use crate::models::{Location, LocationCandidate, LocationSource};
use crate::providers::get_json;
use crate::{EcoLensError, Result};

static COORDINATE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d{1,2}(?:\.\d+)?)\s*[,;\s]\s*(-?\d{1,3}(?:\.\d+)?)\s*$")
        .unwrap_or_else(|e| panic!("invalid coordinate pattern: {e}"))
});

/// What the caller knows about the location
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Pre-resolved coordinates, e.g. a selected map point
    Coordinates {
        lat: f64,
        lon: f64,
        name: Option<String>,
    },
    /// A free-text place name
    Name(String),
}

/// A place found for a coordinate pair
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversePlace {
    pub lat: f64,
    pub lon: f64,
    /// Short name, first two components of the display name
    pub name: String,
    pub display_name: String,
    pub address: BTreeMap<String, String>,
    pub source: LocationSource,
}

/// Geocoding service
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for `query`, `None` when the service knows no such place
    async fn geocode(&self, query: &str) -> Result<Option<Location>>;

    /// Place at `location`; services without reverse lookup report `None`
    async fn reverse(&self, _location: &Location) -> Result<Option<ReversePlace>> {
        Ok(None)
    }
}

/// Nominatim search API
pub struct NominatimGeocoder {
    http: ClientWithMiddleware,
    base_url: String,
    contact_email: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// `/reverse` answers with a single object, or `{"error": ..}` over open water
#[derive(Debug, Deserialize)]
struct NominatimReverse {
    lat: Option<String>,
    lon: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    address: BTreeMap<String, String>,
    error: Option<String>,
}

fn parse_coordinate(value: &str, axis: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|e| EcoLensError::upstream("nominatim", format!("Bad {axis}: {e}")))
}

impl NominatimGeocoder {
    #[must_use]
    pub fn new(http: ClientWithMiddleware, config: &GeocodingConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            contact_email: config.contact_email.clone(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?q={}&format=json&limit=1&email={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.contact_email)
        )
    }

    fn reverse_url(&self, location: &Location) -> String {
        format!(
            "{}/reverse?lat={}&lon={}&format=json&email={}",
            self.base_url,
            location.latitude,
            location.longitude,
            urlencoding::encode(&self.contact_email)
        )
    }
}

/// First two comma-separated parts of a Nominatim display name
#[must_use]
pub fn clean_display_name(display_name: &str) -> String {
    display_name
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Option<Location>> {
        let places: Vec<NominatimPlace> =
            get_json(&self.http, "nominatim", &self.search_url(query)).await?;
        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(Location::new(
            parse_coordinate(&place.lat, "latitude")?,
            parse_coordinate(&place.lon, "longitude")?,
            Some(clean_display_name(&place.display_name)),
        )))
    }

    #[instrument(skip(self))]
    async fn reverse(&self, location: &Location) -> Result<Option<ReversePlace>> {
        let place: NominatimReverse =
            get_json(&self.http, "nominatim", &self.reverse_url(location)).await?;
        if let Some(error) = place.error {
            debug!("Nominatim has no place at {}: {}", location.format_coordinates(), error);
            return Ok(None);
        }
        let Some(display_name) = place.display_name else {
            return Ok(None);
        };
        let lat = match place.lat.as_deref() {
            Some(lat) => parse_coordinate(lat, "latitude")?,
            None => location.latitude,
        };
        let lon = match place.lon.as_deref() {
            Some(lon) => parse_coordinate(lon, "longitude")?,
            None => location.longitude,
        };
        Ok(Some(ReversePlace {
            lat,
            lon,
            name: clean_display_name(&display_name),
            display_name,
            address: place.address,
            source: LocationSource::GeocodeApi,
        }))
    }
}

/// Service for resolving location inputs
pub struct LocationResolver {
    geocoder: Option<Arc<dyn Geocoder>>,
    geocode_timeout: Duration,
    settlements: &'static [Settlement],
    radius_km: f64,
}

impl LocationResolver {
    #[must_use]
    pub fn new(geocoder: Option<Arc<dyn Geocoder>>, config: &ResolverConfig) -> Self {
        Self {
            geocoder,
            geocode_timeout: config.geocode_timeout(),
            settlements: SETTLEMENTS,
            radius_km: config.nearest_city_radius_km,
        }
    }

    /// Resolver that never leaves the process
    #[must_use]
    pub fn offline(config: &ResolverConfig) -> Self {
        Self::new(None, config)
    }

    /// Resolve a location input into a candidate
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: LocationInput) -> Result<LocationCandidate> {
        let candidate = match input {
            LocationInput::Coordinates { lat, lon, name } => {
                let location = Location::new(lat, lon, name);
                if !location.is_valid() {
                    return Err(EcoLensError::invalid_input(format!(
                        "coordinates out of range: {lat}, {lon}"
                    )));
                }
                candidate(location, LocationSource::RawCoordinates)
            }
            LocationInput::Name(name) => self.resolve_name(name.trim()).await?,
        };

        debug!(
            "Resolved location: {:?} at ({}, {}) via {:?}",
            candidate.name, candidate.lat, candidate.lon, candidate.source
        );
        Ok(candidate)
    }

    async fn resolve_name(&self, name: &str) -> Result<LocationCandidate> {
        if name.is_empty() {
            return Err(EcoLensError::invalid_input("location name is empty"));
        }

        if let Some(found) = self.resolve_coordinate_literal(name) {
            return Ok(found);
        }

        if let Some(found) = self.resolve_geocoded(name).await {
            return Ok(found);
        }

        if let Some(found) = self.resolve_settlement_name(name) {
            return Ok(found);
        }

        Err(EcoLensError::location_not_found(name))
    }

    fn resolve_coordinate_literal(&self, text: &str) -> Option<LocationCandidate> {
        let caps = COORDINATE_PAIR.captures(text)?;
        let lat = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let lon = caps.get(2)?.as_str().parse::<f64>().ok()?;
        let mut location = Location::new(lat, lon, None);
        if !location.is_valid() {
            return None;
        }
        match self.nearest_within_radius(&location) {
            Some((settlement, distance)) => {
                debug!(
                    "{} is {:.1} km from {}",
                    location.format_coordinates(),
                    distance,
                    settlement.display_name()
                );
                location.name = Some(settlement.display_name());
                Some(candidate(location, LocationSource::NearestCity))
            }
            None => Some(candidate(location, LocationSource::RegexMatch)),
        }
    }

    async fn resolve_geocoded(&self, name: &str) -> Option<LocationCandidate> {
        let geocoder = self.geocoder.as_ref()?;
        match tokio::time::timeout(self.geocode_timeout, geocoder.geocode(name)).await {
            Ok(Ok(Some(location))) if location.is_valid() => {
                Some(candidate(location, LocationSource::GeocodeApi))
            }
            Ok(Ok(_)) => {
                debug!("No geocoding results for '{}'", name);
                None
            }
            Ok(Err(e)) => {
                warn!("Geocoding failed for '{}': {}", name, e);
                None
            }
            Err(_) => {
                warn!(
                    "Geocoding timed out for '{}' after {}s",
                    name,
                    self.geocode_timeout.as_secs_f32()
                );
                None
            }
        }
    }

    fn resolve_settlement_name(&self, name: &str) -> Option<LocationCandidate> {
        let settlement = settlement_named(name, self.settlements)?;
        debug!("'{}' matched bundled settlement {}", name, settlement.display_name());
        Some(candidate(settlement.location(), LocationSource::NearestCity))
    }

    fn nearest_within_radius(&self, location: &Location) -> Option<(&'static Settlement, f64)> {
        nearest_settlement(location, self.settlements)
            .filter(|(_, distance)| *distance <= self.radius_km)
    }

    /// Name the place at `location`.
    ///
    /// The geocoding service answers first; when it has no place there, or
    /// none is configured, the nearest bundled settlement within the radius
    /// is used. Geocoder failures and timeouts are upstream errors.
    #[instrument(skip(self))]
    pub async fn reverse(&self, location: &Location) -> Result<ReversePlace> {
        if !location.is_valid() {
            return Err(EcoLensError::invalid_input(format!(
                "coordinates out of range: {}",
                location.format_coordinates()
            )));
        }

        if let Some(geocoder) = &self.geocoder {
            let found = tokio::time::timeout(self.geocode_timeout, geocoder.reverse(location))
                .await
                .map_err(|_| {
                    EcoLensError::upstream(
                        "nominatim",
                        format!("timed out after {}s", self.geocode_timeout.as_secs_f32()),
                    )
                })??;
            if let Some(place) = found {
                return Ok(place);
            }
        }

        let (settlement, _) = self
            .nearest_within_radius(location)
            .ok_or_else(|| EcoLensError::location_not_found(location.format_coordinates()))?;
        Ok(ReversePlace {
            lat: location.latitude,
            lon: location.longitude,
            name: settlement.display_name(),
            display_name: settlement.display_name(),
            address: BTreeMap::from([
                ("city".to_string(), settlement.name.to_string()),
                ("country".to_string(), settlement.country.to_string()),
            ]),
            source: LocationSource::NearestCity,
        })
    }
}

fn candidate(location: Location, source: LocationSource) -> LocationCandidate {
    LocationCandidate {
        name: location.name,
        lat: location.latitude,
        lon: location.longitude,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeGeocoder {
        calls: AtomicUsize,
    }

    impl FakeGeocoder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, query: &str) -> Result<Option<Location>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match query {
                "Paris" => Ok(Some(Location::new(
                    48.8589,
                    2.3200,
                    Some(clean_display_name("Paris, Île-de-France, France métropolitaine, France")),
                ))),
                "Offline" => Err(EcoLensError::upstream("nominatim", "connection refused")),
                _ => Ok(None),
            }
        }
    }

    fn resolver_with(geocoder: Arc<dyn Geocoder>) -> LocationResolver {
        LocationResolver::new(Some(geocoder), &ResolverConfig::default())
    }

    #[tokio::test]
    async fn test_raw_coordinates_skip_the_chain() {
        let geocoder = Arc::new(FakeGeocoder::new());
        let resolver = resolver_with(geocoder.clone());
        let candidate = resolver
            .resolve(LocationInput::Coordinates {
                lat: 40.7128,
                lon: -74.006,
                name: Some("New York, USA".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(candidate.source, LocationSource::RawCoordinates);
        assert_eq!(candidate.name.as_deref(), Some("New York, USA"));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_coordinates_are_invalid_input() {
        let resolver = LocationResolver::offline(&ResolverConfig::default());
        let err = resolver
            .resolve(LocationInput::Coordinates {
                lat: 120.0,
                lon: 0.0,
                name: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EcoLensError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_geocoded_name_is_cleaned() {
        let resolver = resolver_with(Arc::new(FakeGeocoder::new()));
        let candidate = resolver
            .resolve(LocationInput::Name("Paris".to_string()))
            .await
            .unwrap();
        assert_eq!(candidate.source, LocationSource::GeocodeApi);
        assert_eq!(candidate.name.as_deref(), Some("Paris, Île-de-France"));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let resolver = resolver_with(Arc::new(FakeGeocoder::new()));
        let first = resolver
            .resolve(LocationInput::Name("Paris".to_string()))
            .await
            .unwrap();
        let second = resolver
            .resolve(LocationInput::Name("Paris".to_string()))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_geocoder_failure_falls_through_to_nearest_city() {
        let resolver = resolver_with(Arc::new(FakeGeocoder::new()));
        let candidate = resolver
            .resolve(LocationInput::Name("Tokyo".to_string()))
            .await
            .unwrap();
        assert_eq!(candidate.source, LocationSource::NearestCity);
        assert_eq!(candidate.name.as_deref(), Some("Tokyo, Japan"));

        let err = resolver
            .resolve(LocationInput::Name("Offline".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, EcoLensError::LocationNotFound { .. }));
    }

    struct HangingGeocoder;

    #[async_trait]
    impl Geocoder for HangingGeocoder {
        async fn geocode(&self, _query: &str) -> Result<Option<Location>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        async fn reverse(&self, _location: &Location) -> Result<Option<ReversePlace>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
    }

    struct ReverseOnly;

    #[async_trait]
    impl Geocoder for ReverseOnly {
        async fn geocode(&self, _query: &str) -> Result<Option<Location>> {
            Ok(None)
        }

        async fn reverse(&self, location: &Location) -> Result<Option<ReversePlace>> {
            if location.latitude < 0.0 {
                return Ok(None);
            }
            Ok(Some(ReversePlace {
                lat: location.latitude,
                lon: location.longitude,
                name: "Versailles, Yvelines".to_string(),
                display_name: "Versailles, Yvelines, Île-de-France, France".to_string(),
                address: BTreeMap::from([("town".to_string(), "Versailles".to_string())]),
                source: LocationSource::GeocodeApi,
            }))
        }
    }

    fn short_timeout() -> ResolverConfig {
        ResolverConfig {
            geocode_timeout_seconds: 1,
            ..ResolverConfig::default()
        }
    }

    #[tokio::test]
    async fn test_slow_geocoder_falls_through_to_bundled_settlement() {
        let resolver = LocationResolver::new(Some(Arc::new(HangingGeocoder)), &short_timeout());
        let candidate = tokio::time::timeout(
            Duration::from_secs(5),
            resolver.resolve(LocationInput::Name("Tokyo".to_string())),
        )
        .await
        .expect("resolution must not wait on the geocoder")
        .unwrap();
        assert_eq!(candidate.source, LocationSource::NearestCity);
        assert_eq!(candidate.name.as_deref(), Some("Tokyo, Japan"));
    }

    #[tokio::test]
    async fn test_coordinate_literal_near_settlement_is_nearest_city() {
        let resolver = LocationResolver::offline(&ResolverConfig::default());
        let candidate = resolver
            .resolve(LocationInput::Name("48.80, 2.12".to_string()))
            .await
            .unwrap();
        assert_eq!(candidate.source, LocationSource::NearestCity);
        assert_eq!(candidate.name.as_deref(), Some("Paris, France"));
        assert_eq!(candidate.lat, 48.80);

        let mid_ocean = resolver
            .resolve(LocationInput::Name("-40.0, -120.0".to_string()))
            .await
            .unwrap();
        assert_eq!(mid_ocean.source, LocationSource::RegexMatch);
        assert_eq!(mid_ocean.name, None);
    }

    #[tokio::test]
    async fn test_nearest_city_radius_boundary() {
        // Due north of Honolulu, 1 degree of latitude is ~111.19 km
        let resolver = LocationResolver::offline(&ResolverConfig::default());
        let inside = resolver
            .resolve(LocationInput::Name("23.5462, -157.8583".to_string()))
            .await
            .unwrap();
        assert_eq!(inside.source, LocationSource::NearestCity);
        assert_eq!(inside.name.as_deref(), Some("Honolulu, United States"));

        let outside = resolver
            .resolve(LocationInput::Name("23.5642, -157.8583".to_string()))
            .await
            .unwrap();
        assert_eq!(outside.source, LocationSource::RegexMatch);
        assert_eq!(outside.name, None);
    }

    #[tokio::test]
    async fn test_reverse_prefers_geocoder_then_bundled_settlement() {
        let resolver = resolver_with(Arc::new(ReverseOnly));
        let place = resolver
            .reverse(&Location::new(48.8049, 2.1204, None))
            .await
            .unwrap();
        assert_eq!(place.source, LocationSource::GeocodeApi);
        assert_eq!(place.name, "Versailles, Yvelines");

        let place = resolver
            .reverse(&Location::new(-33.9, 18.5, None))
            .await
            .unwrap();
        assert_eq!(place.source, LocationSource::NearestCity);
        assert_eq!(place.name, "Cape Town, South Africa");
        assert_eq!(place.address["country"], "South Africa");
    }

    #[tokio::test]
    async fn test_reverse_errors() {
        let offline = LocationResolver::offline(&ResolverConfig::default());
        let err = offline
            .reverse(&Location::new(-40.0, -120.0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, EcoLensError::LocationNotFound { .. }));

        let err = offline
            .reverse(&Location::new(91.0, 0.0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, EcoLensError::InvalidInput { .. }));

        let slow = LocationResolver::new(Some(Arc::new(HangingGeocoder)), &short_timeout());
        let err = slow
            .reverse(&Location::new(48.85, 2.35, None))
            .await
            .unwrap_err();
        assert!(matches!(err, EcoLensError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_unknown_place_is_not_found() {
        let resolver = LocationResolver::offline(&ResolverConfig::default());
        let err = resolver
            .resolve(LocationInput::Name("Atlantis".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, EcoLensError::LocationNotFound { query } if query == "Atlantis"));
    }

    #[test]
    fn test_clean_display_name() {
        assert_eq!(
            clean_display_name("Tokyo, Japan"),
            "Tokyo, Japan"
        );
        assert_eq!(
            clean_display_name("London, Greater London, England, United Kingdom"),
            "London, Greater London"
        );
        assert_eq!(clean_display_name("Nowhere"), "Nowhere");
    }

    #[test]
    fn test_search_url_encodes_query() {
        let http = crate::providers::http_client(Duration::from_secs(1), 0).unwrap();
        let geocoder = NominatimGeocoder::new(http, &GeocodingConfig::default());
        let url = geocoder.search_url("São Paulo");
        assert!(url.starts_with("https://nominatim.openstreetmap.org/search?q=S%C3%A3o%20Paulo&format=json&limit=1"));
    }

    #[test]
    fn test_reverse_url_carries_contact() {
        let http = crate::providers::http_client(Duration::from_secs(1), 0).unwrap();
        let geocoder = NominatimGeocoder::new(http, &GeocodingConfig::default());
        let url = geocoder.reverse_url(&Location::new(48.85, 2.35, None));
        assert_eq!(
            url,
            "https://nominatim.openstreetmap.org/reverse?lat=48.85&lon=2.35&format=json&email=ecolens%40example.com"
        );
    }

    #[test]
    fn test_reverse_body_over_water_is_an_error_object() {
        let body: NominatimReverse = serde_json::from_str(r#"{"error":"Unable to geocode"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("Unable to geocode"));
        assert!(body.display_name.is_none());
        assert!(body.address.is_empty());
    }
}
