//! Deterministic rule-based alerts.
//!
//! Output layout, one section per requested domain in render order:
//!
//! ```text
//! [Air Quality]
//! Unhealthy (AQI: 180)
//! Health Impact: ...
//! Recommendation: ...
//!
//! [Weather]
//! Weather conditions are within safe ranges.
//! ```
//!
//! [`split_sections`] parses this layout back into per-domain bodies.

use crate::aggregator::AggregatedSamples;
use crate::models::{Domain, DomainSample, DomainSet};
use crate::thresholds::{
    AqiBand, Pm25Band, RainfallBand, Severity, TemperatureBand, ThresholdTable, WaveBand,
};

use super::AlertCategory;

/// Section header for a domain
#[must_use]
pub fn header(domain: Domain) -> String {
    format!("[{}]", domain.title())
}

fn safe_sentence(domain: Domain) -> &'static str {
    match domain {
        Domain::AirQuality => "Air quality is within safe ranges. Great time for outdoor activities.",
        Domain::Weather => "Weather conditions are within safe ranges.",
        Domain::Marine => "Sea conditions are within safe ranges for water activities.",
    }
}

fn unavailable_sentence(domain: Domain) -> String {
    format!("{} data is currently unavailable.", domain.title())
}

fn headline(severity: Severity, value: f64) -> String {
    match severity {
        Severity::Aqi(band) => format!("{} (AQI: {value:.0})", band.label()),
        Severity::Pm25(Pm25Band::Unhealthy) => format!("High PM2.5 Levels ({value:.1} µg/m³)"),
        Severity::Pm25(_) => format!("Elevated PM2.5 ({value:.1} µg/m³)"),
        Severity::Temperature(band) => format!("{} ({value:.1}°C)", band.label()),
        Severity::WaveHeight(band) => format!("{} (Wave Height: {value:.1}m)", band.label()),
        Severity::Rainfall(band) => format!("{} ({value:.1}mm)", band.label()),
    }
}

/// Fixed health or safety impact and recommendation for an alerting band
fn guidance(severity: Severity) -> (&'static str, &'static str) {
    match severity {
        Severity::Aqi(AqiBand::Hazardous) => (
            "Serious health effects for everyone. Emergency conditions.",
            "Stay indoors with air purifiers. Avoid all outdoor activities. Wear N95 masks if you must go outside.",
        ),
        Severity::Aqi(AqiBand::VeryUnhealthy) => (
            "Health warnings of emergency conditions. Everyone may experience serious health effects.",
            "Avoid outdoor activities. Keep windows closed. Use air purifiers indoors.",
        ),
        Severity::Aqi(AqiBand::Unhealthy) => (
            "Everyone may begin to experience health effects; sensitive groups at higher risk.",
            "Limit prolonged outdoor exertion. Sensitive groups should avoid outdoor activities.",
        ),
        Severity::Aqi(_) => (
            "People with respiratory conditions may experience symptoms.",
            "Sensitive individuals should reduce outdoor activities. Consider wearing masks outdoors.",
        ),
        Severity::Pm25(Pm25Band::Unhealthy) => (
            "Fine particles can penetrate deep into lungs, causing respiratory issues.",
            "Stay indoors. Use HEPA air filters. Monitor symptoms like coughing or shortness of breath.",
        ),
        Severity::Pm25(_) => (
            "Sensitive groups may experience irritation of the airways.",
            "Sensitive groups should limit outdoor exposure. Consider indoor exercise alternatives.",
        ),
        Severity::Temperature(TemperatureBand::ColdAlert) => (
            "Risk of hypothermia and frostbite with prolonged exposure.",
            "Dress in layers. Cover extremities. Limit outdoor exposure time. Stay dry.",
        ),
        Severity::Temperature(_) => (
            "Risk of heat exhaustion, heat stroke, and dehydration.",
            "Stay hydrated (drink 2-3L water). Avoid outdoor activities 10 AM to 4 PM. Wear light, loose clothing.",
        ),
        Severity::WaveHeight(WaveBand::Dangerous) => (
            "High waves pose significant danger to swimmers and small vessels.",
            "Avoid beach activities, swimming, and boating. Stay away from coastal areas.",
        ),
        Severity::WaveHeight(_) => (
            "Caution advised for water activities.",
            "Strong swimmers only. Avoid small boats.",
        ),
        Severity::Rainfall(RainfallBand::Heavy | RainfallBand::Normal) => (
            "Risk of flooding and reduced visibility.",
            "Avoid unnecessary travel. Drive carefully if you must go out.",
        ),
    }
}

fn narrative(severity: Severity, value: f64) -> String {
    let (impact, recommendation) = guidance(severity);
    format!(
        "{}\nHealth Impact: {impact}\nRecommendation: {recommendation}",
        headline(severity, value)
    )
}

/// Alerting readings of one sample, most severe first, ties in priority order
fn domain_alerts(
    domain: Domain,
    sample: &DomainSample,
    thresholds: &ThresholdTable,
) -> Vec<AlertCategory> {
    let mut alerts: Vec<AlertCategory> = thresholds
        .metrics_for(domain)
        .iter()
        .filter_map(|metric| {
            let value = sample.get(metric.sample_key())?;
            let severity = metric.classify(value);
            severity.is_alert().then(|| AlertCategory {
                domain,
                severity,
                value,
                narrative: narrative(severity, value),
            })
        })
        .collect();
    alerts.sort_by_key(|alert| std::cmp::Reverse(alert.severity.rank()));
    alerts
}

fn has_readings(sample: &DomainSample) -> bool {
    sample.values.values().any(Option::is_some)
}

/// Every alerting reading across the requested domains, in render order
#[must_use]
pub fn evaluate(
    samples: &AggregatedSamples,
    domains: &DomainSet,
    thresholds: &ThresholdTable,
) -> Vec<AlertCategory> {
    domains
        .iter()
        .filter_map(|domain| samples.get(domain).map(|sample| (domain, sample)))
        .flat_map(|(domain, sample)| domain_alerts(domain, sample, thresholds))
        .collect()
}

/// Render the rule-based text for the requested domains
#[must_use]
pub fn render(samples: &AggregatedSamples, domains: &DomainSet, thresholds: &ThresholdTable) -> String {
    domains
        .iter()
        .map(|domain| {
            let body = match samples.get(domain) {
                Some(sample) if has_readings(sample) => {
                    let alerts = domain_alerts(domain, sample, thresholds);
                    if alerts.is_empty() {
                        safe_sentence(domain).to_string()
                    } else {
                        alerts
                            .into_iter()
                            .map(|alert| alert.narrative)
                            .collect::<Vec<_>>()
                            .join("\n")
                    }
                }
                _ => unavailable_sentence(domain),
            };
            format!("{}\n{}", header(domain), body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split rendered text back into `(domain, body)` pairs.
///
/// Lines before the first header are ignored. Unknown bracketed lines are
/// treated as body text.
#[must_use]
pub fn split_sections(text: &str) -> Vec<(Domain, String)> {
    let mut sections: Vec<(Domain, Vec<&str>)> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(domain) = Domain::ALL.into_iter().find(|d| trimmed == header(*d)) {
            sections.push((domain, Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        }
    }
    sections
        .into_iter()
        .map(|(domain, body)| (domain, body.join("\n").trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn samples(entries: &[(Domain, Option<Vec<(&str, f64)>>)]) -> AggregatedSamples {
        let per_domain: BTreeMap<Domain, Option<DomainSample>> = entries
            .iter()
            .map(|(domain, values)| {
                let sample = values.as_ref().map(|values| {
                    values
                        .iter()
                        .fold(DomainSample::new(*domain), |s, (k, v)| s.with(k, Some(*v)))
                });
                (*domain, sample)
            })
            .collect();
        AggregatedSamples { per_domain }
    }

    fn render_all(samples: &AggregatedSamples) -> String {
        render(samples, &DomainSet::all(), &ThresholdTable)
    }

    #[test]
    fn test_hazardous_aqi_block() {
        let samples = samples(&[(Domain::AirQuality, Some(vec![("us_aqi", 301.0)]))]);
        let text = render(&samples, &DomainSet::resolve([Domain::AirQuality]), &ThresholdTable);
        assert!(text.starts_with("[Air Quality]\nHazardous (AQI: 301)"));
        assert!(text.contains("Health Impact: Serious health effects"));
        assert!(text.contains("Recommendation: Stay indoors"));
    }

    #[test]
    fn test_mixed_scenario_from_unhealthy_air() {
        let samples = samples(&[
            (Domain::AirQuality, Some(vec![("us_aqi", 180.0)])),
            (Domain::Weather, Some(vec![("temperature_2m", 22.0)])),
            (Domain::Marine, Some(vec![("wave_height", 1.0)])),
        ]);
        let text = render_all(&samples);
        let sections = split_sections(&text);

        assert_eq!(sections.len(), 3);
        assert!(sections[0].1.starts_with("Unhealthy (AQI: 180)"));
        assert_eq!(sections[1], (Domain::Weather, safe_sentence(Domain::Weather).to_string()));
        assert_eq!(sections[2], (Domain::Marine, safe_sentence(Domain::Marine).to_string()));
    }

    #[test]
    fn test_every_domain_safe() {
        let samples = samples(&[
            (Domain::AirQuality, Some(vec![("us_aqi", 50.0), ("pm2_5", 5.0)])),
            (Domain::Weather, Some(vec![("temperature_2m", 18.0), ("rain", 0.0)])),
            (Domain::Marine, Some(vec![("wave_height", 0.5)])),
        ]);
        let sections = split_sections(&render_all(&samples));
        for (domain, body) in sections {
            assert_eq!(body, safe_sentence(domain));
        }
    }

    #[test]
    fn test_null_and_empty_samples_are_unavailable() {
        let samples = samples(&[
            (Domain::AirQuality, None),
            (Domain::Weather, Some(vec![])),
            (Domain::Marine, Some(vec![("wave_height", 0.5)])),
        ]);
        let sections = split_sections(&render_all(&samples));
        assert_eq!(sections[0].1, "Air Quality data is currently unavailable.");
        assert_eq!(sections[1].1, "Weather data is currently unavailable.");
        assert_eq!(sections[2].1, safe_sentence(Domain::Marine));
    }

    #[test]
    fn test_unrequested_domains_are_omitted() {
        let samples = samples(&[(Domain::AirQuality, Some(vec![("us_aqi", 20.0)]))]);
        let text = render(&samples, &DomainSet::resolve([Domain::AirQuality]), &ThresholdTable);
        assert!(!text.contains("[Weather]"));
        assert!(!text.contains("[Marine]"));
    }

    #[test]
    fn test_most_severe_alert_comes_first() {
        let samples = samples(&[(
            Domain::AirQuality,
            Some(vec![("us_aqi", 120.0), ("pm2_5", 70.0)]),
        )]);
        let alerts = evaluate(&samples, &DomainSet::all(), &ThresholdTable);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, Severity::Pm25(Pm25Band::Unhealthy));
        assert_eq!(alerts[1].severity, Severity::Aqi(AqiBand::UnhealthySensitive));
    }

    #[test]
    fn test_weather_and_marine_alerts() {
        let samples = samples(&[
            (Domain::Weather, Some(vec![("temperature_2m", 38.2), ("rain", 14.0)])),
            (Domain::Marine, Some(vec![("wave_height", 4.6)])),
        ]);
        let text = render(
            &samples,
            &DomainSet::resolve([Domain::Weather, Domain::Marine]),
            &ThresholdTable,
        );
        assert!(text.contains("Extreme Heat Warning (38.2°C)"));
        assert!(text.contains("Heavy Rainfall (14.0mm)"));
        assert!(text.contains("Dangerous Sea Conditions (Wave Height: 4.6m)"));
    }

    #[test]
    fn test_split_sections_ignores_preamble() {
        let text = "intro line\n[Marine]\nCalm seas.\n\n[Air Quality]\nGood.";
        let sections = split_sections(text);
        assert_eq!(
            sections,
            vec![
                (Domain::Marine, "Calm seas.".to_string()),
                (Domain::AirQuality, "Good.".to_string()),
            ]
        );
    }
}
