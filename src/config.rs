//! Configuration management for `EcoLens`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::EcoLensError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the `EcoLens` service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EcoLensConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Open-Meteo provider settings
    pub providers: ProvidersConfig,
    /// Geocoding service settings
    pub geocoding: GeocodingConfig,
    /// Location resolver settings
    pub resolver: ResolverConfig,
    /// Text-generation backend settings
    pub generative: GenerativeConfig,
    /// Glacier dataset sources and cache
    pub glacier: GlacierConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Allow cross-origin requests from any origin
    pub cors_allow_any: bool,
    /// Upper bound on a whole request, in seconds
    pub request_timeout_seconds: u64,
}

/// Upstream environmental data providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub air_quality_url: String,
    pub forecast_url: String,
    pub marine_url: String,
    /// Per-call timeout in seconds
    pub timeout_seconds: u64,
    /// Retries for transient failures
    pub max_retries: u32,
}

/// Forward geocoding (Nominatim)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
    /// Contact address sent with every request, as Nominatim's usage policy asks
    pub contact_email: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum distance for the bundled nearest-city strategy
    pub nearest_city_radius_km: f64,
    /// Upper bound on one geocoding call, in seconds
    pub geocode_timeout_seconds: u64,
}

/// OpenAI-compatible chat completion backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeConfig {
    /// API key; without one the deterministic strategy is always used
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlacierConfig {
    /// Global cumulative mass-balance CSV
    pub global_url: String,
    /// Per-glacier CSV; `{id}` is replaced by the glacier id
    pub regional_url_template: String,
    pub ttl_seconds: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_port() -> u16 {
    4000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_air_quality_url() -> String {
    "https://air-quality-api.open-meteo.com/v1/air-quality".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_marine_url() -> String {
    "https://marine-api.open-meteo.com/v1/marine".to_string()
}

fn default_provider_timeout() -> u64 {
    8
}

fn default_provider_max_retries() -> u32 {
    2
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_contact_email() -> String {
    "ecolens@example.com".to_string()
}

fn default_nearest_city_radius() -> f64 {
    250.0
}

fn default_geocode_timeout() -> u64 {
    8
}

fn default_generative_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_generative_timeout() -> u64 {
    10
}

fn default_glacier_global_url() -> String {
    "https://datahub.io/core/glacier-mass-balance/_r/-/data/glaciers.csv".to_string()
}

fn default_glacier_regional_template() -> String {
    "https://www.wgms.ch/data/min-data-series/FoG_MB_{id}.csv".to_string()
}

fn default_glacier_ttl() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_allow_any: true,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            air_quality_url: default_air_quality_url(),
            forecast_url: default_forecast_url(),
            marine_url: default_marine_url(),
            timeout_seconds: default_provider_timeout(),
            max_retries: default_provider_max_retries(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            contact_email: default_contact_email(),
            enabled: true,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nearest_city_radius_km: default_nearest_city_radius(),
            geocode_timeout_seconds: default_geocode_timeout(),
        }
    }
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_generative_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_generative_timeout(),
        }
    }
}

impl Default for GlacierConfig {
    fn default() -> Self {
        Self {
            global_url: default_glacier_global_url(),
            regional_url_template: default_glacier_regional_template(),
            ttl_seconds: default_glacier_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ProvidersConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_seconds)
    }
}

impl GenerativeConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl GlacierConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// URL of one glacier's mass-balance series
    #[must_use]
    pub fn regional_url(&self, glacier_id: u32) -> String {
        self.regional_url_template
            .replace("{id}", &glacier_id.to_string())
    }
}

impl EcoLensConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("ECOLENS_CONFIG").map(PathBuf::from);
        Self::load_from_path(path)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. ECOLENS_SERVER__PORT=8080
        builder = builder.add_source(
            Environment::with_prefix("ECOLENS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: EcoLensConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        if config.generative.api_key.is_none() {
            config.generative.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ecolens").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.port == 0 {
            self.server.port = default_port();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.providers.air_quality_url.is_empty() {
            self.providers.air_quality_url = default_air_quality_url();
        }
        if self.providers.forecast_url.is_empty() {
            self.providers.forecast_url = default_forecast_url();
        }
        if self.providers.marine_url.is_empty() {
            self.providers.marine_url = default_marine_url();
        }
        if self.providers.timeout_seconds == 0 {
            self.providers.timeout_seconds = default_provider_timeout();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.contact_email.is_empty() {
            self.geocoding.contact_email = default_contact_email();
        }
        if self.resolver.nearest_city_radius_km == 0.0 {
            self.resolver.nearest_city_radius_km = default_nearest_city_radius();
        }
        if self.resolver.geocode_timeout_seconds == 0 {
            self.resolver.geocode_timeout_seconds = default_geocode_timeout();
        }
        if self
            .generative
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            self.generative.api_key = None;
        }
        if self.generative.base_url.is_empty() {
            self.generative.base_url = default_generative_base_url();
        }
        if self.generative.model.is_empty() {
            self.generative.model = default_model();
        }
        if self.generative.max_tokens == 0 {
            self.generative.max_tokens = default_max_tokens();
        }
        if self.generative.timeout_seconds == 0 {
            self.generative.timeout_seconds = default_generative_timeout();
        }
        if self.glacier.global_url.is_empty() {
            self.glacier.global_url = default_glacier_global_url();
        }
        if self.glacier.regional_url_template.is_empty() {
            self.glacier.regional_url_template = default_glacier_regional_template();
        }
        if self.glacier.ttl_seconds == 0 {
            self.glacier.ttl_seconds = default_glacier_ttl();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.providers.timeout_seconds > 60 {
            return Err(
                EcoLensError::config("Provider timeout cannot exceed 60 seconds").into(),
            );
        }

        if self.providers.max_retries > 10 {
            return Err(EcoLensError::config("Provider max retries cannot exceed 10").into());
        }

        if self.resolver.geocode_timeout_seconds > 60 {
            return Err(
                EcoLensError::config("Geocode timeout cannot exceed 60 seconds").into(),
            );
        }

        if self.generative.timeout_seconds > 60 {
            return Err(
                EcoLensError::config("Generative timeout cannot exceed 60 seconds").into(),
            );
        }

        if !(0.0..=2.0).contains(&self.generative.temperature) {
            return Err(
                EcoLensError::config("Generative temperature must be between 0 and 2").into(),
            );
        }

        let radius = self.resolver.nearest_city_radius_km;
        if !(radius > 0.0 && radius <= 20_000.0) {
            return Err(EcoLensError::config(
                "Nearest city radius must be greater than 0 and at most 20000 km",
            )
            .into());
        }

        if self.server.request_timeout_seconds > 600 {
            return Err(
                EcoLensError::config("Request timeout cannot exceed 600 seconds").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(EcoLensError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(EcoLensError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("providers.air_quality_url", &self.providers.air_quality_url),
            ("providers.forecast_url", &self.providers.forecast_url),
            ("providers.marine_url", &self.providers.marine_url),
            ("geocoding.base_url", &self.geocoding.base_url),
            ("generative.base_url", &self.generative.base_url),
            ("glacier.global_url", &self.glacier.global_url),
            ("glacier.regional_url_template", &self.glacier.regional_url_template),
        ];
        for (key, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(EcoLensError::config(format!(
                    "{key} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if !self.glacier.regional_url_template.contains("{id}") {
            return Err(EcoLensError::config(
                "glacier.regional_url_template must contain an {id} placeholder",
            )
            .into());
        }

        Ok(())
    }
}
