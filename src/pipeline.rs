//! The two question-answering entry points
//!
//! `answer` runs the full chain: classify the question, resolve the
//! location, aggregate the requested domains and synthesize alerts.
//! `suggest` skips classification and resolution and synthesizes straight
//! from payloads the caller already fetched.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::aggregator::Aggregator;
use crate::intent::IntentClassifier;
use crate::location_resolver::{LocationInput, LocationResolver};
use crate::models::{Domain, DomainSet, LocationCandidate, TemporalScope};
use crate::synthesis::{
    AlertCategory, AlertSynthesizer, DataAnalyzed, SuggestionInputs, SynthesisContext,
};
use crate::{EcoLensError, Result};

/// Which domains produced a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataFetched {
    pub aqi: bool,
    pub weather: bool,
    pub marine: bool,
}

/// Temporal interpretation of the question and the window fetched for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalSummary {
    pub scope: &'static str,
    pub days: Option<u32>,
    pub past_days: u32,
    pub forecast_days: u32,
}

impl From<TemporalScope> for TemporalSummary {
    fn from(scope: TemporalScope) -> Self {
        let window = scope.fetch_window();
        Self {
            scope: scope.label(),
            days: scope.days(),
            past_days: window.past_days,
            forecast_days: window.forecast_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnswer {
    pub response: String,
    pub used_fallback: bool,
    pub location: LocationCandidate,
    pub data_fetched: DataFetched,
    pub temporal: TemporalSummary,
    pub categories: Vec<AlertCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsAnswer {
    pub suggestions: String,
    pub using_fallback: bool,
    pub data_analyzed: DataAnalyzed,
    pub categories: Vec<AlertCategory>,
}

pub struct Pipeline {
    classifier: IntentClassifier,
    resolver: LocationResolver,
    aggregator: Arc<Aggregator>,
    synthesizer: AlertSynthesizer,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        resolver: LocationResolver,
        aggregator: Arc<Aggregator>,
        synthesizer: AlertSynthesizer,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            resolver,
            aggregator,
            synthesizer,
        }
    }

    #[must_use]
    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    #[must_use]
    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    /// Answer a free-text question.
    ///
    /// The caller's location wins over a place name found in the question;
    /// with neither, the request is invalid.
    #[instrument(skip(self, location))]
    pub async fn answer(&self, query: &str, location: Option<LocationInput>) -> Result<ChatAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EcoLensError::invalid_input("query is required"));
        }

        let intent = self.classifier.classify(query);
        let input = location
            .or_else(|| intent.place_name_hint.clone().map(LocationInput::Name))
            .ok_or_else(|| EcoLensError::invalid_input("location is required"))?;

        let candidate = self.resolver.resolve(input).await?;
        let point = candidate.location();
        info!(
            "Answering {} question for {} across {} domain(s)",
            intent.temporal_scope.label(),
            point.display_name(),
            intent.domains.len()
        );

        let samples = self
            .aggregator
            .aggregate(&point, intent.temporal_scope, &intent.domains)
            .await;

        let context = SynthesisContext {
            question: Some(query.to_string()),
            location_name: Some(point.display_name()),
            scope: intent.temporal_scope,
        };
        let output = self
            .synthesizer
            .synthesize(&samples, &intent.domains, &context)
            .await;

        Ok(ChatAnswer {
            response: output.text,
            used_fallback: output.used_fallback,
            location: candidate,
            data_fetched: DataFetched {
                aqi: samples.fetched(Domain::AirQuality),
                weather: samples.fetched(Domain::Weather),
                marine: samples.fetched(Domain::Marine),
            },
            temporal: intent.temporal_scope.into(),
            categories: output.categories,
        })
    }

    /// Alerts for payloads the caller already holds, across all domains
    #[instrument(skip_all)]
    pub async fn suggest(&self, aqi: &Value, weather: &Value, marine: &Value) -> SuggestionsAnswer {
        let inputs = SuggestionInputs::from_payloads(aqi, weather, marine);
        let output = self
            .synthesizer
            .synthesize(&inputs.samples(), &DomainSet::all(), &SynthesisContext::default())
            .await;

        SuggestionsAnswer {
            suggestions: output.text,
            using_fallback: output.used_fallback,
            data_analyzed: inputs.analyzed(),
            categories: output.categories,
        }
    }
}
