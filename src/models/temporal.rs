//! Temporal scope of a question and the fetch window it implies

use serde::{Deserialize, Serialize};

/// Hours per day in provider series
pub const HOURS_PER_DAY: usize = 24;

/// Whether a question concerns past, present or future conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "days", rename_all = "camelCase")]
pub enum TemporalScope {
    Past(u32),
    #[default]
    Present,
    Future(u32),
}

impl TemporalScope {
    /// Days of history and forecast to request from providers
    #[must_use]
    pub fn fetch_window(self) -> FetchWindow {
        match self {
            Self::Present => FetchWindow {
                past_days: 0,
                forecast_days: 1,
            },
            Self::Past(days) => FetchWindow {
                past_days: days,
                forecast_days: 0,
            },
            Self::Future(days) => FetchWindow {
                past_days: 0,
                forecast_days: days,
            },
        }
    }

    /// Index of the hourly step that answers this scope in a series of `len` steps.
    ///
    /// `Future` deliberately looks at a fixed near-horizon offset of 24 hours,
    /// not at the full forecast depth.
    #[must_use]
    pub fn select_index(self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let index = match self {
            Self::Present => len - 1,
            Self::Past(days) => len.saturating_sub(HOURS_PER_DAY * days as usize),
            Self::Future(_) => HOURS_PER_DAY.min(len - 1),
        };
        Some(index)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Past(_) => "past",
            Self::Present => "present",
            Self::Future(_) => "future",
        }
    }

    #[must_use]
    pub fn days(self) -> Option<u32> {
        match self {
            Self::Past(days) | Self::Future(days) => Some(days),
            Self::Present => None,
        }
    }
}

/// `past_days` / `forecast_days` request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchWindow {
    pub past_days: u32,
    pub forecast_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TemporalScope::Present, 48, Some(47))]
    #[case(TemporalScope::Present, 1, Some(0))]
    #[case(TemporalScope::Past(1), 48, Some(24))]
    #[case(TemporalScope::Past(7), 168, Some(0))]
    #[case(TemporalScope::Past(7), 24, Some(0))]
    #[case(TemporalScope::Future(2), 48, Some(24))]
    #[case(TemporalScope::Future(7), 10, Some(9))]
    #[case(TemporalScope::Present, 0, None)]
    #[case(TemporalScope::Future(1), 0, None)]
    fn test_select_index(
        #[case] scope: TemporalScope,
        #[case] len: usize,
        #[case] expected: Option<usize>,
    ) {
        assert_eq!(scope.select_index(len), expected);
    }

    #[test]
    fn test_fetch_window_per_scope() {
        assert_eq!(
            TemporalScope::Present.fetch_window(),
            FetchWindow { past_days: 0, forecast_days: 1 }
        );
        assert_eq!(
            TemporalScope::Past(7).fetch_window(),
            FetchWindow { past_days: 7, forecast_days: 0 }
        );
        assert_eq!(
            TemporalScope::Future(2).fetch_window(),
            FetchWindow { past_days: 0, forecast_days: 2 }
        );
    }

    #[test]
    fn test_scope_serialization() {
        let json = serde_json::to_value(TemporalScope::Past(7)).unwrap();
        assert_eq!(json, serde_json::json!({"scope": "past", "days": 7}));
        let json = serde_json::to_value(TemporalScope::Present).unwrap();
        assert_eq!(json, serde_json::json!({"scope": "present"}));
    }
}
