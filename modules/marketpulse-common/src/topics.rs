//! Topic key derivation.
//!
//! A topic key is `category:primary_indicator` where the primary indicator is
//! the first linked indicator in enum order, falling back to
//! `category:general` for events with no linked indicators. Deterministic by
//! construction: the same classified event always lands on the same key.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{EventCategory, IndicatorId};

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Normalize an arbitrary label into topic-key form: lowercase, runs of
/// non-alphanumerics collapsed to `_`, no leading/trailing `_`.
pub fn normalize_topic(label: &str) -> String {
    let lowered = label.to_lowercase();
    NON_ALNUM_RE
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Derive the topic key for a classified event.
pub fn topic_key(category: EventCategory, indicators: &BTreeSet<IndicatorId>) -> String {
    match indicators.iter().next() {
        Some(primary) => format!("{category}:{primary}"),
        None => format!("{category}:general"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_punctuation() {
        assert_eq!(normalize_topic("Fed -- Rate Hike!"), "fed_rate_hike");
        assert_eq!(normalize_topic("  CPI / core  "), "cpi_core");
    }

    #[test]
    fn topic_key_uses_first_indicator_in_enum_order() {
        let mut set = BTreeSet::new();
        set.insert(IndicatorId::Vix);
        set.insert(IndicatorId::Cpi);
        assert_eq!(topic_key(EventCategory::Inflation, &set), "inflation:cpi");
    }

    #[test]
    fn topic_key_falls_back_to_general() {
        let set = BTreeSet::new();
        assert_eq!(
            topic_key(EventCategory::Geopolitics, &set),
            "geopolitics:general"
        );
    }
}
