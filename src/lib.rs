//! `EcoLens` - environmental questions answered with alerts
//!
//! This library classifies free-text environmental questions, resolves the
//! location they are about, aggregates air quality, weather and marine data
//! from independent upstream providers, and synthesizes alert text with a
//! generative strategy backed by deterministic rules.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod intent;
pub mod location_resolver;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod synthesis;
pub mod telemetry;
pub mod thresholds;
pub mod web;

// Re-export core types for public API
pub use aggregator::{AggregatedSamples, Aggregator};
pub use cache::TtlCache;
pub use config::EcoLensConfig;
pub use error::EcoLensError;
pub use intent::{IntentClassifier, QueryIntent};
pub use location_resolver::{Geocoder, LocationInput, LocationResolver, NominatimGeocoder, ReversePlace};
pub use models::{Domain, DomainSet, DomainSample, Location, LocationCandidate, TemporalScope};
pub use pipeline::{ChatAnswer, Pipeline, SuggestionsAnswer};
pub use synthesis::{AlertSynthesizer, SynthesisOutput};
pub use thresholds::{Severity, ThresholdTable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, EcoLensError>;
