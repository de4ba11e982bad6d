//! Alert synthesis
//!
//! Turns aggregated samples into alert text. The generative strategy is
//! tried first when a generator is configured; any failure, timeout or empty
//! answer falls back to the deterministic rule evaluation. Callers always
//! learn which strategy produced the text through `used_fallback`.

pub mod fallback;
pub mod generative;
pub mod payload;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::aggregator::AggregatedSamples;
use crate::models::{Domain, DomainSet, TemporalScope};
use crate::thresholds::{Severity, ThresholdTable};
use crate::{EcoLensError, Result};

pub use fallback::{evaluate, render, split_sections};
pub use generative::{OpenAiGenerator, TextGenerator, build_prompt, strip_markup};
pub use payload::{DataAnalyzed, SuggestionInputs};

/// A metric reading past its alerting floor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCategory {
    pub domain: Domain,
    pub severity: Severity,
    pub value: f64,
    pub narrative: String,
}

/// What the question was about, for prompt context
#[derive(Debug, Clone, Default)]
pub struct SynthesisContext {
    pub question: Option<String>,
    pub location_name: Option<String>,
    pub scope: TemporalScope,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisOutput {
    pub text: String,
    pub used_fallback: bool,
    /// Rule-based categorisation, present whichever strategy wrote the text
    pub categories: Vec<AlertCategory>,
}

pub struct AlertSynthesizer {
    generator: Option<Arc<dyn TextGenerator>>,
    thresholds: ThresholdTable,
    timeout: Duration,
}

impl AlertSynthesizer {
    #[must_use]
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self {
            generator,
            thresholds: ThresholdTable,
            timeout,
        }
    }

    /// Synthesizer that only uses the deterministic rules
    #[must_use]
    pub fn rule_based() -> Self {
        Self::new(None, Duration::ZERO)
    }

    #[instrument(skip_all, fields(domains = domains.len()))]
    pub async fn synthesize(
        &self,
        samples: &AggregatedSamples,
        domains: &DomainSet,
        context: &SynthesisContext,
    ) -> SynthesisOutput {
        let categories = evaluate(samples, domains, &self.thresholds);

        match self.generate(samples, domains, context).await {
            Ok(text) => {
                debug!("Generative strategy produced {} characters", text.len());
                SynthesisOutput {
                    text,
                    used_fallback: false,
                    categories,
                }
            }
            Err(e) => {
                if self.generator.is_some() {
                    warn!("Falling back to rule-based alerts: {}", e);
                } else {
                    debug!("No text generator configured, using rule-based alerts");
                }
                SynthesisOutput {
                    text: render(samples, domains, &self.thresholds),
                    used_fallback: true,
                    categories,
                }
            }
        }
    }

    async fn generate(
        &self,
        samples: &AggregatedSamples,
        domains: &DomainSet,
        context: &SynthesisContext,
    ) -> Result<String> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| EcoLensError::generative("no text generator configured"))?;

        let prompt = build_prompt(samples, domains, &self.thresholds, context);
        let raw = tokio::time::timeout(self.timeout, generator.generate(&prompt))
            .await
            .map_err(|_| EcoLensError::generative("text generation timed out"))??;

        let text = strip_markup(&raw);
        if text.is_empty() {
            return Err(EcoLensError::generative("empty completion"));
        }
        Ok(text)
    }
}
