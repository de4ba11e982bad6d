//! Multi-source data aggregation
//!
//! Fetches every requested domain concurrently, each under its own timeout,
//! and flattens each provider's hourly series into a [`DomainSample`] at the
//! index implied by the temporal scope. A failing or slow provider only
//! nulls its own domain.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::cache::TtlCache;
use crate::models::{
    Domain, DomainSample, DomainSet, GlacierDataset, HourlySeries, Location, TemporalScope,
};
use crate::providers::{GlacierSource, Providers, load_glacier_dataset};
use crate::{EcoLensError, Result};

/// One entry per requested domain; `None` when the domain could not be fetched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedSamples {
    pub per_domain: BTreeMap<Domain, Option<DomainSample>>,
}

impl AggregatedSamples {
    #[must_use]
    pub fn get(&self, domain: Domain) -> Option<&DomainSample> {
        self.per_domain.get(&domain).and_then(Option::as_ref)
    }

    /// Whether the domain was requested and fetched successfully
    #[must_use]
    pub fn fetched(&self, domain: Domain) -> bool {
        self.get(domain).is_some()
    }
}

/// Flatten `series` at the hour selected by `scope`.
///
/// Every domain metric gets a key; missing arrays or short arrays give `None`.
/// An empty series yields no sample.
#[must_use]
pub fn sample_at(domain: Domain, series: &HourlySeries, scope: TemporalScope) -> Option<DomainSample> {
    let index = scope.select_index(series.len())?;
    let mut sample = DomainSample::new(domain);
    sample.time = series.time.get(index).cloned();
    for metric in domain.metrics() {
        sample = sample.with(metric, series.value_at(metric, index));
    }
    Some(sample)
}

pub struct Aggregator {
    providers: Providers,
    call_timeout: Duration,
    glacier_source: Arc<dyn GlacierSource>,
    glacier_cache: TtlCache<GlacierDataset>,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        providers: Providers,
        call_timeout: Duration,
        glacier_source: Arc<dyn GlacierSource>,
        glacier_ttl: Duration,
    ) -> Self {
        Self {
            providers,
            call_timeout,
            glacier_source,
            glacier_cache: TtlCache::new(glacier_ttl),
        }
    }

    #[must_use]
    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Fetch and align samples for every domain in `domains`.
    ///
    /// Never fails: provider errors and timeouts are logged and recorded as
    /// `None`. Dropping the returned future cancels all in-flight fetches.
    #[instrument(skip(self, location), fields(lat = location.latitude, lon = location.longitude))]
    pub async fn aggregate(
        &self,
        location: &Location,
        scope: TemporalScope,
        domains: &DomainSet,
    ) -> AggregatedSamples {
        let fetches = domains
            .iter()
            .map(|domain| async move { (domain, self.fetch_domain(domain, location, scope).await) });

        let per_domain = join_all(fetches).await.into_iter().collect();
        AggregatedSamples { per_domain }
    }

    async fn fetch_domain(
        &self,
        domain: Domain,
        location: &Location,
        scope: TemporalScope,
    ) -> Option<DomainSample> {
        let provider = self.providers.for_domain(domain);
        let window = scope.fetch_window();

        let series = match self.bounded(provider.hourly(location, window)).await {
            Ok(series) => series,
            Err(e) => {
                warn!("{} data unavailable: {}", domain, e);
                return None;
            }
        };

        let sample = sample_at(domain, &series, scope);
        if sample.is_none() {
            warn!("{} provider returned an empty series", domain);
        } else {
            debug!("{} sampled {} hourly steps", domain, series.len());
        }
        sample
    }

    /// Run an upstream call under the per-call timeout; elapsing counts as an upstream failure
    pub async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| {
                EcoLensError::upstream(
                    "upstream",
                    format!("timed out after {}s", self.call_timeout.as_secs_f32()),
                )
            })?
    }

    /// Glacier dataset, served from the cache while fresh
    #[instrument(skip(self))]
    pub async fn glacier(&self) -> Result<Arc<GlacierDataset>> {
        let source = Arc::clone(&self.glacier_source);
        self.glacier_cache
            .get_or_refresh(|| async move { load_glacier_dataset(source.as_ref()).await })
            .await
    }
}
