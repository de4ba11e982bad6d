//! Query intent classifier
//!
//! Parses a free-text environmental question into a temporal scope, the
//! data domains it asks about, and an optional place-name hint. The
//! classification is a pure function of the text: rules are evaluated in a
//! fixed priority order and the first matching temporal rule wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Domain, DomainSet, TemporalScope};

/// Result of classifying a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryIntent {
    pub temporal_scope: TemporalScope,
    pub domains: DomainSet,
    pub place_name_hint: Option<String>,
}

/// A temporal rule: matches when the indicator matches and, if present, the granularity too
struct TemporalRule {
    indicator: &'static Regex,
    granularity: Option<&'static Regex>,
    scope: TemporalScope,
}

impl TemporalRule {
    fn matches(&self, text: &str) -> bool {
        self.indicator.is_match(text) && self.granularity.is_none_or(|g| g.is_match(text))
    }
}

fn compile(pattern: &str) -> Regex {
    // Patterns are literals in this module and covered by tests.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

static PAST_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(yesterday|last\s+(night|week|month|year|few\s+days)|past|previous|ago|was|were|historical|history|earlier)\b",
    )
});

static FUTURE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(tomorrow|forecast\w*|next\s+(week|few\s+days|days?)|will|upcoming|coming|later|predict\w*)\b",
    )
});

static WEEK_SCALE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(week|7\s+days|seven\s+days)\b"));

static YESTERDAY_SCALE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(yesterday|last\s+night)\b"));

static TOMORROW_SCALE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\btomorrow\b"));

static AIR_QUALITY_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\b(air|aqi|pollut\w*|pm\s?2\.?5|pm\s?10|smog|ozone|haze|particulates?|smoke)\b")
});

static WEATHER_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(weather|temperature|temp|hot|cold|heat\w*|warm|rain\w*|humid\w*|wind\w*|storm\w*|snow\w*|sunny|climate|dew)\b",
    )
});

static MARINE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(marine|sea|ocean|waves?|surf\w*|swell|tides?|beach\w*|coast\w*|boat\w*|sail\w*|swim\w*)\b",
    )
});

static PLACE_AFTER_PREPOSITION: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?i:in|at|for|of|near)\s+(\p{Lu}[\p{L}'.-]*(?:\s+\p{Lu}[\p{L}'.-]*)*)")
});

static PLACE_BEFORE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\b(\p{Lu}[\p{L}'.-]*(?:\s+\p{Lu}[\p{L}'.-]*)*)\s+(?i:air\s+quality|weather|temperature|forecast|conditions|marine)",
    )
});

static BARE_PLACE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\s*(\p{Lu}[\p{L}'.-]*(?:\s+\p{Lu}[\p{L}'.-]*)*)\s*[?.!]?\s*$")
});

/// Capitalised words that open sentences rather than name places
const LEADING_STOPWORDS: &[&str] = &[
    "what", "what's", "whats", "how", "how's", "is", "are", "was", "were", "will", "show",
    "tell", "give", "the", "today", "tomorrow", "yesterday", "current", "please", "any",
    "air", "weather", "marine", "i", "me", "my",
];

/// Strips leading stopwords and trailing punctuation from a captured phrase.
fn clean_place(phrase: &str) -> Option<String> {
    let words: Vec<&str> = phrase
        .split_whitespace()
        .skip_while(|w| LEADING_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    let joined = words.join(" ");
    let trimmed = joined.trim_end_matches(['.', '\'', '-']);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Pattern-based classifier over free-text questions
pub struct IntentClassifier {
    temporal_rules: Vec<TemporalRule>,
    domain_rules: Vec<(&'static Regex, Domain)>,
    place_patterns: Vec<&'static Regex>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    #[must_use]
    pub fn new() -> Self {
        // Future rules come first: when both past and future language appear, Future wins.
        let temporal_rules = vec![
            TemporalRule {
                indicator: &*FUTURE_TERMS,
                granularity: Some(&*TOMORROW_SCALE),
                scope: TemporalScope::Future(2),
            },
            TemporalRule {
                indicator: &*FUTURE_TERMS,
                granularity: Some(&*WEEK_SCALE),
                scope: TemporalScope::Future(7),
            },
            TemporalRule {
                indicator: &*FUTURE_TERMS,
                granularity: None,
                scope: TemporalScope::Future(7),
            },
            TemporalRule {
                indicator: &*PAST_TERMS,
                granularity: Some(&*WEEK_SCALE),
                scope: TemporalScope::Past(7),
            },
            TemporalRule {
                indicator: &*PAST_TERMS,
                granularity: Some(&*YESTERDAY_SCALE),
                scope: TemporalScope::Past(1),
            },
            TemporalRule {
                indicator: &*PAST_TERMS,
                granularity: None,
                scope: TemporalScope::Past(7),
            },
        ];

        let domain_rules = vec![
            (&*AIR_QUALITY_TERMS, Domain::AirQuality),
            (&*WEATHER_TERMS, Domain::Weather),
            (&*MARINE_TERMS, Domain::Marine),
        ];

        let place_patterns = vec![&*PLACE_AFTER_PREPOSITION, &*PLACE_BEFORE_KEYWORD, &*BARE_PLACE];

        Self {
            temporal_rules,
            domain_rules,
            place_patterns,
        }
    }

    /// Classify a question. Deterministic and side-effect free.
    #[must_use]
    pub fn classify(&self, text: &str) -> QueryIntent {
        QueryIntent {
            temporal_scope: self.temporal_scope(text),
            domains: self.domains(text),
            place_name_hint: self.place_name(text),
        }
    }

    /// First matching temporal rule, `Present` when none match.
    #[must_use]
    pub fn temporal_scope(&self, text: &str) -> TemporalScope {
        self.temporal_rules
            .iter()
            .find(|rule| rule.matches(text))
            .map_or(TemporalScope::Present, |rule| rule.scope)
    }

    /// Every domain whose keywords appear; all domains when none do.
    #[must_use]
    pub fn domains(&self, text: &str) -> DomainSet {
        DomainSet::resolve(
            self.domain_rules
                .iter()
                .filter(|(pattern, _)| pattern.is_match(text))
                .map(|(_, domain)| *domain),
        )
    }

    /// First place-like phrase found by the ordered extraction patterns.
    #[must_use]
    pub fn place_name(&self, text: &str) -> Option<String> {
        self.place_patterns.iter().find_map(|pattern| {
            pattern
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .find_map(|m| clean_place(m.as_str()))
        })
    }
}
