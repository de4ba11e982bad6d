//! HTTP API: raw provider endpoints, the glacier dataset and the two
//! question-answering entry points

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::EcoLensError;
use crate::location_resolver::{LocationInput, ReversePlace};
use crate::models::{GlacierDataset, Location};
use crate::pipeline::{ChatAnswer, Pipeline, SuggestionsAnswer};
use crate::providers::{CurrentConditions, DailySeries};

const DAILY_FORECAST_DAYS: u32 = 7;

const AQI_NOTE: &str = "Air quality data from Open-Meteo API. Current values include US AQI, PM10, PM2.5, CO, NO2, Ozone, Dust, and UV Index.";
const CLIMATE_NOTE: &str = "Current weather data from Open-Meteo API";

/// Shared state handed to every handler
pub struct AppState {
    pub pipeline: Pipeline,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/aqi", get(get_aqi))
        .route("/api/climate", get(get_climate))
        .route("/api/marine", get(get_marine))
        .route("/api/glacier", get(get_glacier))
        .route("/api/geo/reverse", get(reverse_geocode))
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/suggestions", post(suggestions))
        .with_state(state)
}

/// Error response: `{"error": .., "details": ..}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<EcoLensError> for ApiError {
    fn from(err: EcoLensError) -> Self {
        let status = match &err {
            EcoLensError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            EcoLensError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            EcoLensError::LocationNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.user_message(),
            details: Some(err.to_string()),
        }
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Raw `lat`/`lon` query values, parsed in [`CoordinatesQuery::location`] so
/// malformed numbers get the JSON error body
#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl CoordinatesQuery {
    fn location(&self) -> Result<Location, ApiError> {
        let (Some(lat), Some(lon)) = (self.lat.as_deref(), self.lon.as_deref()) else {
            return Err(ApiError::bad_request("lat & lon required"));
        };
        let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) else {
            return Err(ApiError::bad_request("lat & lon must be numbers")
                .with_details(format!("got lat={lat}, lon={lon}")));
        };
        let location = Location::new(lat, lon, None);
        if !location.is_valid() {
            return Err(ApiError::bad_request("lat & lon out of range"));
        }
        Ok(location)
    }
}

#[derive(Debug, Serialize)]
pub struct RequestedCoordinates {
    pub lat: f64,
    pub lon: f64,
}

impl From<&Location> for RequestedCoordinates {
    fn from(location: &Location) -> Self {
        Self {
            lat: location.latitude,
            lon: location.longitude,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProviderCoordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl ProviderCoordinates {
    fn new(requested: &Location, current: &CurrentConditions) -> Self {
        Self {
            latitude: current.latitude.unwrap_or(requested.latitude),
            longitude: current.longitude.unwrap_or(requested.longitude),
            elevation: current.elevation,
            timezone: current.timezone.clone(),
        }
    }
}

/// Current values keyed by provider metric name, plus the step time
#[derive(Debug, Serialize)]
pub struct CurrentValues {
    pub time: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl From<&CurrentConditions> for CurrentValues {
    fn from(current: &CurrentConditions) -> Self {
        Self {
            time: current.time.clone(),
            values: current.values.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenMeteoAqi {
    pub coordinates: ProviderCoordinates,
    pub current: CurrentValues,
    #[serde(rename = "latestAQI")]
    pub latest_aqi: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AqiSources {
    #[serde(rename = "openMeteo")]
    pub open_meteo: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AqiResponse {
    pub requested_coordinates: RequestedCoordinates,
    pub open_meteo: OpenMeteoAqi,
    pub sources: AqiSources,
    pub note: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Climate {
    pub coordinates: ProviderCoordinates,
    pub current: CurrentValues,
    pub current_units: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub rain: Option<f64>,
    pub time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateResponse {
    pub requested_coordinates: RequestedCoordinates,
    pub climate: Climate,
    pub current_weather: CurrentWeather,
    pub current_dew_point: Option<f64>,
    pub daily_data: DailySeries,
    pub note: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMarine {
    pub wave_height: Option<f64>,
    pub swell_wave_height: Option<f64>,
    pub ocean_current_velocity: Option<f64>,
    pub ocean_current_direction: Option<f64>,
    pub sea_surface_temperature: Option<f64>,
    pub time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarineResponse {
    pub current_marine: CurrentMarine,
    pub units: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatLocation {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub name: Option<String>,
}

impl ChatLocation {
    /// Coordinates when both are present, else the name, else nothing
    fn into_input(self) -> Option<LocationInput> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(LocationInput::Coordinates {
                lat,
                lon,
                name: self.name,
            }),
            _ => self
                .name
                .filter(|name| !name.trim().is_empty())
                .map(LocationInput::Name),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: Option<String>,
    pub location: Option<ChatLocation>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(flatten)]
    pub answer: ChatAnswer,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsRequest {
    pub aqi: Option<Value>,
    pub weather: Option<Value>,
    pub marine: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub answer: SuggestionsAnswer,
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ecolens"
    }))
}

async fn get_aqi(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoordinatesQuery>,
) -> ApiResult<AqiResponse> {
    let location = query.location()?;
    let aggregator = state.pipeline.aggregator();
    let current = aggregator
        .bounded(aggregator.providers().air_quality.current(&location))
        .await?;

    Ok(Json(AqiResponse {
        requested_coordinates: (&location).into(),
        open_meteo: OpenMeteoAqi {
            coordinates: ProviderCoordinates::new(&location, &current),
            latest_aqi: current.get("us_aqi"),
            current: (&current).into(),
        },
        sources: AqiSources { open_meteo: true },
        note: AQI_NOTE,
    }))
}

async fn get_climate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoordinatesQuery>,
) -> ApiResult<ClimateResponse> {
    let location = query.location()?;
    let aggregator = state.pipeline.aggregator();
    let weather = &aggregator.providers().weather;

    let (current, daily) = futures::try_join!(
        aggregator.bounded(weather.current(&location)),
        aggregator.bounded(weather.daily(&location, DAILY_FORECAST_DAYS)),
    )?;

    Ok(Json(ClimateResponse {
        requested_coordinates: (&location).into(),
        current_weather: CurrentWeather {
            temperature: current.get("temperature_2m"),
            humidity: current.get("relative_humidity_2m"),
            wind_speed: current.get("wind_speed_10m"),
            wind_direction: current.get("wind_direction_10m"),
            rain: current.get("rain"),
            time: current.time.clone(),
        },
        current_dew_point: current.get("dew_point_2m"),
        climate: Climate {
            coordinates: ProviderCoordinates::new(&location, &current),
            current: (&current).into(),
            current_units: current.units.clone(),
        },
        daily_data: daily,
        note: CLIMATE_NOTE,
    }))
}

async fn get_marine(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoordinatesQuery>,
) -> ApiResult<MarineResponse> {
    let location = query.location()?;
    let aggregator = state.pipeline.aggregator();
    let current = aggregator
        .bounded(aggregator.providers().marine.current(&location))
        .await?;

    Ok(Json(MarineResponse {
        current_marine: CurrentMarine {
            wave_height: current.get("wave_height"),
            swell_wave_height: current.get("swell_wave_height"),
            ocean_current_velocity: current.get("ocean_current_velocity"),
            ocean_current_direction: current.get("ocean_current_direction"),
            sea_surface_temperature: current.get("sea_surface_temperature"),
            time: current.time.clone(),
        },
        units: current.units,
    }))
}

async fn get_glacier(State(state): State<Arc<AppState>>) -> ApiResult<GlacierDataset> {
    let dataset = state.pipeline.aggregator().glacier().await?;
    Ok(Json(GlacierDataset::clone(&dataset)))
}

async fn reverse_geocode(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CoordinatesQuery>,
) -> ApiResult<ReversePlace> {
    let location = query.location()?;
    let place = state.pipeline.resolver().reverse(&location).await?;
    Ok(Json(place))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    let query = request
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("query is required"))?;
    let location = request
        .location
        .ok_or_else(|| ApiError::bad_request("location is required"))?;

    info!(query = %query, "Processing chat request");
    let answer = state.pipeline.answer(&query, location.into_input()).await?;
    Ok(Json(ChatResponse {
        success: true,
        answer,
    }))
}

async fn suggestions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SuggestionsRequest>,
) -> ApiResult<SuggestionsResponse> {
    let (Some(aqi), Some(weather), Some(marine)) = (request.aqi, request.weather, request.marine)
    else {
        return Err(ApiError::bad_request("aqi, weather and marine data are required")
            .with_details("pass the bodies of /api/aqi, /api/climate and /api/marine"));
    };

    let answer = state.pipeline.suggest(&aqi, &weather, &marine).await;
    Ok(Json(SuggestionsResponse {
        success: true,
        answer,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (EcoLensError::invalid_input("bad"), StatusCode::BAD_REQUEST),
            (EcoLensError::upstream("open-meteo", "HTTP 500"), StatusCode::BAD_GATEWAY),
            (EcoLensError::location_not_found("Atlantis"), StatusCode::NOT_FOUND),
            (EcoLensError::config("broken"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    fn coordinates(lat: Option<&str>, lon: Option<&str>) -> CoordinatesQuery {
        CoordinatesQuery {
            lat: lat.map(str::to_string),
            lon: lon.map(str::to_string),
        }
    }

    #[test]
    fn test_coordinates_query_validation() {
        let missing = coordinates(Some("1.0"), None);
        assert_eq!(missing.location().unwrap_err().status, StatusCode::BAD_REQUEST);

        let not_a_number = coordinates(Some("abc"), Some("2.35")).location().unwrap_err();
        assert_eq!(not_a_number.status, StatusCode::BAD_REQUEST);
        assert_eq!(not_a_number.message, "lat & lon must be numbers");

        let out_of_range = coordinates(Some("95"), Some("0"));
        assert!(out_of_range.location().is_err());

        let ok = coordinates(Some("48.85"), Some(" 2.35"));
        assert_eq!(ok.location().unwrap().latitude, 48.85);
    }

    #[test]
    fn test_chat_location_input() {
        let coords = ChatLocation { lat: Some(1.0), lon: Some(2.0), name: None };
        assert!(matches!(coords.into_input(), Some(LocationInput::Coordinates { .. })));

        let named = ChatLocation { lat: Some(1.0), lon: None, name: Some("Lima".to_string()) };
        assert_eq!(named.into_input(), Some(LocationInput::Name("Lima".to_string())));

        let empty = ChatLocation { lat: None, lon: None, name: Some("  ".to_string()) };
        assert_eq!(empty.into_input(), None);
    }
}
