//! Hourly provider series and the flattened per-domain samples taken from them

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Domain;

/// Hourly time-indexed arrays as returned by a provider, one per metric.
///
/// Metric arrays may be shorter than `time` or missing altogether; upstream
/// services omit fields freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub metrics: BTreeMap<String, Vec<Option<f64>>>,
}

impl HourlySeries {
    /// Number of hourly steps in the series
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Value of `metric` at `index`; `None` for missing arrays, short arrays or nulls
    #[must_use]
    pub fn value_at(&self, metric: &str, index: usize) -> Option<f64> {
        self.metrics
            .get(metric)
            .and_then(|values| values.get(index))
            .copied()
            .flatten()
    }
}

/// Flattened snapshot of one domain at a single selected hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSample {
    pub domain: Domain,
    /// Timestamp of the selected hour, when the provider reported one
    pub time: Option<String>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl DomainSample {
    #[must_use]
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            time: None,
            values: BTreeMap::new(),
        }
    }

    /// Set a metric value, keeping explicit nulls
    #[must_use]
    pub fn with(mut self, metric: &str, value: Option<f64>) -> Self {
        self.values.insert(metric.to_string(), value);
        self
    }

    #[must_use]
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied().flatten()
    }
}
