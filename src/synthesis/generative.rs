//! Generative alert strategy: prompt construction and the chat completion client

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::SynthesisContext;
use crate::aggregator::AggregatedSamples;
use crate::config::GenerativeConfig;
use crate::models::{Domain, DomainSet, TemporalScope};
use crate::thresholds::ThresholdTable;
use crate::{EcoLensError, Result};

/// Characters removed from generated text before it is returned
const MARKUP: &[char] = &['*', '#', '`'];

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible `chat/completions` client
pub struct OpenAiGenerator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiGenerator {
    /// Client for `config`; `None` when no API key is configured
    pub fn from_config(config: &GenerativeConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EcoLensError::config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Some(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }))
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EcoLensError::generative(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(EcoLensError::generative(format!("HTTP {status}: {preview}")));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| EcoLensError::generative(format!("malformed completion: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EcoLensError::generative("completion had no content"))?;
        debug!("Received completion of {} characters", content.len());
        Ok(content)
    }
}

/// Remove markup characters and surrounding whitespace on every line
#[must_use]
pub fn strip_markup(text: &str) -> String {
    text.lines()
        .map(|line| line.replace(MARKUP, "").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn metric_label(metric: &str) -> (&'static str, &'static str) {
    match metric {
        "us_aqi" => ("Air Quality Index (AQI)", ""),
        "pm2_5" => ("PM2.5", " µg/m³"),
        "pm10" => ("PM10", " µg/m³"),
        "carbon_monoxide" => ("Carbon Monoxide", " µg/m³"),
        "nitrogen_dioxide" => ("Nitrogen Dioxide", " µg/m³"),
        "ozone" => ("Ozone", " µg/m³"),
        "dust" => ("Dust", " µg/m³"),
        "uv_index" => ("UV Index", ""),
        "temperature_2m" => ("Temperature", "°C"),
        "relative_humidity_2m" => ("Humidity", "%"),
        "dew_point_2m" => ("Dew Point", "°C"),
        "wind_speed_10m" => ("Wind Speed", " km/h"),
        "wind_direction_10m" => ("Wind Direction", "°"),
        "rain" => ("Rain", " mm"),
        "wave_height" => ("Wave Height", " m"),
        "swell_wave_height" => ("Swell Wave Height", " m"),
        "ocean_current_velocity" => ("Ocean Current Velocity", " km/h"),
        "ocean_current_direction" => ("Ocean Current Direction", "°"),
        "sea_surface_temperature" => ("Sea Surface Temperature", "°C"),
        _ => ("Other", ""),
    }
}

fn scope_phrase(scope: TemporalScope) -> String {
    match scope {
        TemporalScope::Present => "current conditions".to_string(),
        TemporalScope::Past(1) => "conditions about 1 day ago".to_string(),
        TemporalScope::Past(days) => format!("conditions about {days} days ago"),
        TemporalScope::Future(_) => "forecast conditions for the next 24 hours".to_string(),
    }
}

fn write_domain_values(prompt: &mut String, domain: Domain, samples: &AggregatedSamples) {
    let _ = writeln!(prompt, "{}:", domain.title());
    let Some(sample) = samples.get(domain) else {
        let _ = writeln!(prompt, "- data unavailable");
        return;
    };
    for metric in domain.metrics() {
        let (label, unit) = metric_label(metric);
        match sample.get(metric) {
            Some(value) => {
                let _ = writeln!(prompt, "- {label}: {value}{unit}");
            }
            None => {
                let _ = writeln!(prompt, "- {label}: N/A");
            }
        }
    }
}

/// Single structured prompt embedding the requested domains' values and reference bands
#[must_use]
pub fn build_prompt(
    samples: &AggregatedSamples,
    domains: &DomainSet,
    thresholds: &ThresholdTable,
    context: &SynthesisContext,
) -> String {
    let mut prompt = String::from(
        "You are an environmental health advisor. Analyze the following environmental data \
         and provide specific alerts and actionable suggestions if values are outside safe \
         ranges. Focus on health impacts and practical recommendations.\n\n",
    );

    if let Some(question) = &context.question {
        let _ = writeln!(prompt, "User question: {question}");
    }
    if let Some(name) = &context.location_name {
        let _ = writeln!(prompt, "Location: {name}");
    }
    let _ = writeln!(prompt, "Time frame: {}\n", scope_phrase(context.scope));

    prompt.push_str("Environmental Data:\n");
    for domain in domains.iter() {
        write_domain_values(&mut prompt, domain, samples);
    }

    prompt.push_str("\nSafe Ranges Reference:\n");
    for domain in domains.iter() {
        for line in thresholds.reference_lines(domain) {
            let _ = writeln!(prompt, "- {line}");
        }
    }

    prompt.push_str(
        "\nIMPORTANT: Only provide alerts for unsafe conditions. If all values are within safe \
         ranges, simply state that conditions are safe.\n\n\
         Provide alerts only for values outside safe ranges with:\n\
         1. Clear alert title indicating the unsafe condition\n\
         2. Specific health impacts\n\
         3. Actionable recommendations\n\n\
         Keep responses concise and practical. Do not use emojis, asterisks, or dashes for formatting.",
    );
    prompt
}
