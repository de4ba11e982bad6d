use std::sync::Arc;

use anyhow::{Context, Result};
use ecolens::api::AppState;
use ecolens::providers::{HttpGlacierSource, Providers, http_client};
use ecolens::synthesis::{OpenAiGenerator, TextGenerator};
use ecolens::{
    AlertSynthesizer, Aggregator, EcoLensConfig, Geocoder, LocationResolver, NominatimGeocoder,
    Pipeline, telemetry, web,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = EcoLensConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.logging);
    info!("Starting EcoLens {}", ecolens::VERSION);

    let providers =
        Providers::open_meteo(&config.providers).context("Failed to create provider clients")?;
    let http = http_client(config.providers.timeout(), config.providers.max_retries)
        .context("Failed to create HTTP client")?;

    let glacier_source = Arc::new(HttpGlacierSource::new(http.clone(), config.glacier.clone()));
    let aggregator = Aggregator::new(
        providers,
        config.providers.timeout(),
        glacier_source,
        config.glacier.ttl(),
    );

    let resolver = if config.geocoding.enabled {
        let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(http, &config.geocoding));
        LocationResolver::new(Some(geocoder), &config.resolver)
    } else {
        info!("Geocoding disabled, resolving names from the bundled settlements only");
        LocationResolver::offline(&config.resolver)
    };

    let generator: Option<Arc<dyn TextGenerator>> = OpenAiGenerator::from_config(&config.generative)
        .context("Failed to create text generator")?
        .map(|g| Arc::new(g) as Arc<dyn TextGenerator>);
    if generator.is_none() {
        info!("No generative API key configured, alerts use the rule-based strategy");
    }
    let synthesizer = AlertSynthesizer::new(generator, config.generative.timeout());

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(resolver, Arc::new(aggregator), synthesizer),
    });

    web::run(&config.server, state).await
}
