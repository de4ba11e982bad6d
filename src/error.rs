//! Error types and handling for the `EcoLens` service

use thiserror::Error;

/// Main error type for the `EcoLens` service
#[derive(Error, Debug)]
pub enum EcoLensError {
    /// Missing or malformed coordinates, query text or request body
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// An upstream provider answered with a non-OK status, an unparsable body, or not at all
    #[error("Upstream {provider} unavailable: {message}")]
    UpstreamUnavailable { provider: String, message: String },

    /// Every location strategy was exhausted
    #[error("Location not found: {query}")]
    LocationNotFound { query: String },

    /// The text-generation backend failed; always absorbed by the synthesis engine
    #[error("Generative strategy failed: {message}")]
    GenerativeStrategyFailed { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EcoLensError {
    /// Create a new input validation error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new upstream error for the named provider
    pub fn upstream<P: Into<String>, S: Into<String>>(provider: P, message: S) -> Self {
        Self::UpstreamUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a new location-not-found error
    pub fn location_not_found<S: Into<String>>(query: S) -> Self {
        Self::LocationNotFound {
            query: query.into(),
        }
    }

    /// Create a new generative strategy error
    pub fn generative<S: Into<String>>(message: S) -> Self {
        Self::GenerativeStrategyFailed {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            EcoLensError::InvalidInput { message } => format!("Invalid input: {message}"),
            EcoLensError::UpstreamUnavailable { provider, .. } => {
                format!("The {provider} data service is currently unavailable. Please try again later.")
            }
            EcoLensError::LocationNotFound { query } => {
                format!("Could not find a location for '{query}'. Try a city name or coordinates.")
            }
            EcoLensError::GenerativeStrategyFailed { .. } => {
                "Text generation is unavailable; rule-based alerts were used instead.".to_string()
            }
            EcoLensError::Config { .. } => {
                "Configuration error. Please check your config file and environment.".to_string()
            }
        }
    }
}
