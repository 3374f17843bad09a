//! Sliding-window topic frequency.
//!
//! Recomputed in full from the event table at the end of every run; never
//! incrementally updated, so a re-run cannot double-count. Hot topics feed
//! the *next* run's ranking boost, not the one that computed them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use marketpulse_common::{topic_key, ReviewState};
use marketpulse_store::{EventRecord, TopicFrequency};

pub const WINDOW_DAYS: i64 = 7;
pub const HOT_THRESHOLD: u32 = 3;

/// Recompute the topic table from events published inside the window.
/// Irrelevant, parked, and uncategorized events carry no topic.
pub fn compute_topics(events: &[EventRecord], now: DateTime<Utc>) -> Vec<TopicFrequency> {
    let cutoff = now - Duration::days(WINDOW_DAYS);
    let mut by_topic: BTreeMap<String, TopicFrequency> = BTreeMap::new();

    for event in events {
        if event.published_at < cutoff
            || !event.is_market_relevant
            || event.review_state != ReviewState::Ok
        {
            continue;
        }
        let Some(category) = event.category else {
            continue;
        };
        let key = topic_key(category, &event.linked_indicators);

        let entry = by_topic.entry(key.clone()).or_insert_with(|| TopicFrequency {
            topic: key,
            occurrence_count: 0,
            first_seen: event.published_at,
            last_seen: event.published_at,
            related_event_ids: Vec::new(),
            is_hot: false,
        });
        entry.occurrence_count += 1;
        entry.first_seen = entry.first_seen.min(event.published_at);
        entry.last_seen = entry.last_seen.max(event.published_at);
        entry.related_event_ids.push(event.id.clone());
    }

    let mut topics: Vec<TopicFrequency> = by_topic.into_values().collect();
    for topic in &mut topics {
        topic.related_event_ids.sort();
        topic.is_hot = topic.occurrence_count >= HOT_THRESHOLD;
    }
    topics
}
