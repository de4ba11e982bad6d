//! HTTP contract tests for the EcoLens API, run against in-process fakes

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use ecolens::api::{AppState, router};
use ecolens::config::ResolverConfig;
use ecolens::location_resolver::ReversePlace;
use ecolens::models::{FetchWindow, GlacierRecord, HourlySeries};
use ecolens::providers::{CurrentConditions, DailySeries, DomainProvider, GlacierSource, Providers};
use ecolens::{
    AlertSynthesizer, Aggregator, EcoLensError, Geocoder, Location, LocationResolver,
    Pipeline, Result,
};
use ecolens::models::LocationSource;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

struct StaticProvider {
    values: Vec<(&'static str, f64)>,
    fail: bool,
}

#[async_trait]
impl DomainProvider for StaticProvider {
    async fn hourly(&self, _location: &Location, _window: FetchWindow) -> Result<HourlySeries> {
        if self.fail {
            return Err(EcoLensError::upstream("fake", "HTTP 503"));
        }
        let metrics = self
            .values
            .iter()
            .map(|(metric, value)| (metric.to_string(), vec![Some(*value); 24]))
            .collect();
        Ok(HourlySeries {
            time: (0..24).map(|h| format!("2026-10-17T{h:02}:00")).collect(),
            metrics,
        })
    }

    async fn current(&self, location: &Location) -> Result<CurrentConditions> {
        if self.fail {
            return Err(EcoLensError::upstream("fake", "HTTP 503"));
        }
        Ok(CurrentConditions {
            latitude: Some(location.latitude),
            longitude: Some(location.longitude),
            elevation: Some(35.0),
            timezone: Some("Europe/Paris".to_string()),
            time: Some("2026-10-17T12:00".to_string()),
            values: self
                .values
                .iter()
                .map(|(metric, value)| (metric.to_string(), Some(*value)))
                .collect(),
            units: BTreeMap::from([("wave_height".to_string(), "m".to_string())]),
        })
    }

    async fn daily(&self, _location: &Location, _days: u32) -> Result<DailySeries> {
        Ok(DailySeries {
            time: vec!["2026-10-17".to_string()],
            temperature_max: vec![Some(24.0)],
            temperature_min: vec![Some(12.0)],
            precipitation_sum: vec![Some(0.0)],
        })
    }
}

struct FixedGlaciers;

#[async_trait]
impl GlacierSource for FixedGlaciers {
    async fn global(&self) -> Result<Vec<GlacierRecord>> {
        Ok(vec![GlacierRecord {
            year: 2020,
            mass_balance: -27.8,
        }])
    }

    async fn glacier(&self, id: u32) -> Result<Vec<GlacierRecord>> {
        Ok(vec![GlacierRecord {
            year: 2020,
            mass_balance: -f64::from(id % 10),
        }])
    }
}

struct ParisOnly;

#[async_trait]
impl Geocoder for ParisOnly {
    async fn geocode(&self, query: &str) -> Result<Option<Location>> {
        Ok((query == "Paris").then(|| Location::new(48.8566, 2.3522, Some("Paris, France".to_string()))))
    }

    async fn reverse(&self, location: &Location) -> Result<Option<ReversePlace>> {
        let near_paris = (location.latitude - 48.8566).abs() < 0.5 && (location.longitude - 2.3522).abs() < 0.5;
        Ok(near_paris.then(|| ReversePlace {
            lat: location.latitude,
            lon: location.longitude,
            name: "Paris, Île-de-France".to_string(),
            display_name: "Paris, Île-de-France, France métropolitaine, France".to_string(),
            address: BTreeMap::from([("city".to_string(), "Paris".to_string())]),
            source: LocationSource::GeocodeApi,
        }))
    }
}

/// Answers like a rate-limited Nominatim serving an HTML page
struct BlockedGeocoder;

#[async_trait]
impl Geocoder for BlockedGeocoder {
    async fn geocode(&self, _query: &str) -> Result<Option<Location>> {
        Err(EcoLensError::upstream("nominatim", "HTTP 403 Forbidden: <html>"))
    }

    async fn reverse(&self, _location: &Location) -> Result<Option<ReversePlace>> {
        Err(EcoLensError::upstream("nominatim", "Failed to parse response: expected value: <html>"))
    }
}

fn provider(values: Vec<(&'static str, f64)>, fail: bool) -> Arc<StaticProvider> {
    Arc::new(StaticProvider {
        values,
        fail,
    })
}

fn app(marine_fails: bool) -> axum::Router {
    app_with(marine_fails, Arc::new(ParisOnly))
}

fn app_with(marine_fails: bool, geocoder: Arc<dyn Geocoder>) -> axum::Router {
    let providers = Providers {
        air_quality: provider(vec![("us_aqi", 180.0), ("pm2_5", 20.0)], false),
        weather: provider(vec![("temperature_2m", 22.0), ("dew_point_2m", 11.5)], false),
        marine: provider(vec![("wave_height", 1.0)], marine_fails),
    };
    let aggregator = Aggregator::new(
        providers,
        Duration::from_secs(5),
        Arc::new(FixedGlaciers),
        Duration::from_secs(3600),
    );
    let resolver = LocationResolver::new(Some(geocoder), &ResolverConfig::default());
    let pipeline = Pipeline::new(resolver, Arc::new(aggregator), AlertSynthesizer::rule_based());
    router(Arc::new(AppState { pipeline }))
}

async fn send(app: axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app(false), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "service": "ecolens"}));
}

#[tokio::test]
async fn test_aqi_requires_coordinates() {
    let (status, body) = send(app(false), Method::GET, "/api/aqi?lat=48.85", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "lat & lon required");
}

#[tokio::test]
async fn test_malformed_coordinates_get_json_error() {
    let (status, body) = send(app(false), Method::GET, "/api/aqi?lat=abc&lon=2.35", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "lat & lon must be numbers");
    assert!(body["details"].as_str().unwrap().contains("abc"));
}

#[tokio::test]
async fn test_aqi_reports_current_values() {
    let (status, body) = send(app(false), Method::GET, "/api/aqi?lat=48.85&lon=2.35", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requestedCoordinates"], json!({"lat": 48.85, "lon": 2.35}));
    assert_eq!(body["openMeteo"]["latestAQI"], json!(180.0));
    assert_eq!(body["openMeteo"]["current"]["pm2_5"], json!(20.0));
    assert_eq!(body["openMeteo"]["coordinates"]["elevation"], json!(35.0));
    assert_eq!(body["sources"]["openMeteo"], json!(true));
}

#[tokio::test]
async fn test_climate_includes_dew_point_and_daily_data() {
    let (status, body) = send(app(false), Method::GET, "/api/climate?lat=48.85&lon=2.35", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentWeather"]["temperature"], json!(22.0));
    assert_eq!(body["currentDewPoint"], json!(11.5));
    assert_eq!(body["dailyData"]["temperatureMax"], json!([24.0]));
}

#[tokio::test]
async fn test_marine_upstream_failure_is_bad_gateway() {
    let (status, body) = send(app(true), Method::GET, "/api/marine?lat=43.3&lon=5.4", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn test_marine_reports_camel_case_fields() {
    let (status, body) = send(app(false), Method::GET, "/api/marine?lat=43.3&lon=5.4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentMarine"]["waveHeight"], json!(1.0));
    assert_eq!(body["currentMarine"]["seaSurfaceTemperature"], Value::Null);
    assert_eq!(body["units"]["wave_height"], "m");
}

#[tokio::test]
async fn test_glacier_dataset() {
    let (status, body) = send(app(false), Method::GET, "/api/glacier", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["global"], json!([{"year": 2020, "massBalance": -27.8}]));
    assert_eq!(body["regional"]["Alps"][0]["year"], json!(2020));
    assert!(body["fetchedAt"].is_string());
}

#[tokio::test]
async fn test_reverse_geocode_names_the_point() {
    let (status, body) = send(app(false), Method::GET, "/api/geo/reverse?lat=48.86&lon=2.34", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Paris, Île-de-France");
    assert_eq!(body["displayName"], "Paris, Île-de-France, France métropolitaine, France");
    assert_eq!(body["address"]["city"], "Paris");
    assert_eq!(body["source"], "geocodeApi");
}

#[tokio::test]
async fn test_reverse_geocode_falls_back_to_bundled_settlement() {
    let (status, body) = send(app(false), Method::GET, "/api/geo/reverse?lat=35.7&lon=139.7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Tokyo, Japan");
    assert_eq!(body["source"], "nearestCity");

    let (status, _) = send(app(false), Method::GET, "/api/geo/reverse?lat=-40&lon=-120", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reverse_geocode_input_and_upstream_errors() {
    let (status, body) = send(app(false), Method::GET, "/api/geo/reverse?lat=48.86", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "lat & lon required");

    let blocked = app_with(false, Arc::new(BlockedGeocoder));
    let (status, body) = send(blocked, Method::GET, "/api/geo/reverse?lat=48.86&lon=2.34", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["details"].as_str().unwrap().contains("<html>"));
}

#[tokio::test]
async fn test_chat_requires_query_and_location() {
    let (status, _) = send(
        app(false),
        Method::POST,
        "/api/ai/chat",
        Some(json!({"location": {"lat": 1.0, "lon": 2.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app(false),
        Method::POST,
        "/api/ai/chat",
        Some(json!({"query": "How is the air?"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_answers_with_partial_failure() {
    let (status, body) = send(
        app(true),
        Method::POST,
        "/api/ai/chat",
        Some(json!({
            "query": "How are the air and the sea today?",
            "location": {"lat": 43.3, "lon": 5.4, "name": "Marseille"}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["usedFallback"], json!(true));
    assert_eq!(body["location"]["source"], "rawCoordinates");
    assert_eq!(body["dataFetched"], json!({"aqi": true, "weather": false, "marine": false}));
    assert_eq!(body["temporal"]["scope"], "present");
    let response = body["response"].as_str().unwrap();
    assert!(response.contains("Unhealthy (AQI: 180)"));
    assert!(response.contains("Marine data is currently unavailable."));
}

#[tokio::test]
async fn test_chat_unknown_place_is_not_found() {
    let (status, _) = send(
        app(false),
        Method::POST,
        "/api/ai/chat",
        Some(json!({"query": "Air quality in Atlantis?", "location": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_suggestions_require_every_payload() {
    let (status, body) = send(
        app(false),
        Method::POST,
        "/api/ai/suggestions",
        Some(json!({"aqi": {}, "weather": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_suggestions_use_rule_based_fallback() {
    let (status, body) = send(
        app(false),
        Method::POST,
        "/api/ai/suggestions",
        Some(json!({
            "aqi": {"openMeteo": {"latestAQI": 40}},
            "weather": {"currentWeather": {"temperature": 38.0}},
            "marine": {"currentMarine": {"waveHeight": 4.5}}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usingFallback"], json!(true));
    assert_eq!(body["dataAnalyzed"]["temperature"], json!(38.0));
    assert_eq!(body["dataAnalyzed"]["waveHeight"], json!(4.5));
    let suggestions = body["suggestions"].as_str().unwrap();
    assert!(suggestions.contains("Air quality is within safe ranges."));
    assert!(suggestions.contains("[Weather]"));
    assert!(suggestions.contains("[Marine]"));
}
