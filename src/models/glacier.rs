//! Glacier mass-balance dataset

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mass balance for one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlacierRecord {
    pub year: i32,
    pub mass_balance: f64,
}

/// Global and per-region mass-balance series, each sorted by year
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlacierDataset {
    pub global: Vec<GlacierRecord>,
    pub regional: BTreeMap<String, Vec<GlacierRecord>>,
    pub note: String,
    /// When the upstream series were downloaded
    pub fetched_at: Option<DateTime<Utc>>,
}

impl GlacierDataset {
    /// Average per-glacier records by year, ascending.
    #[must_use]
    pub fn average_by_year(records: impl IntoIterator<Item = GlacierRecord>) -> Vec<GlacierRecord> {
        let mut by_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for record in records {
            let entry = by_year.entry(record.year).or_insert((0.0, 0));
            entry.0 += record.mass_balance;
            entry.1 += 1;
        }
        by_year
            .into_iter()
            .map(|(year, (sum, count))| GlacierRecord {
                year,
                mass_balance: sum / count as f64,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_by_year_sorts_and_means() {
        let records = vec![
            GlacierRecord { year: 2001, mass_balance: -1.0 },
            GlacierRecord { year: 2000, mass_balance: -0.5 },
            GlacierRecord { year: 2001, mass_balance: -3.0 },
        ];
        let averaged = GlacierDataset::average_by_year(records);
        assert_eq!(
            averaged,
            vec![
                GlacierRecord { year: 2000, mass_balance: -0.5 },
                GlacierRecord { year: 2001, mass_balance: -2.0 },
            ]
        );
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let json = serde_json::to_value(GlacierRecord { year: 2020, mass_balance: -25.1 }).unwrap();
        assert_eq!(json, serde_json::json!({"year": 2020, "massBalance": -25.1}));
    }
}
