//! Temporal re-ranking: decay, boost, sectioning, and the key-events cap.
//!
//! Runs over every event, every run — not just new ones. Events past the
//! retention horizon decay to zero and fall into the archive, so a stored
//! section can never outlive its score. Pure function of `(events, today,
//! hot topics, open investigations)`; re-running with unchanged inputs
//! yields identical output, which is what makes re-runs after partial
//! failure safe.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use marketpulse_common::{topic_key, DisplaySection, EventId, FollowUpRef, ReviewState};
use marketpulse_store::{EventRecord, RankingUpdate};

/// Events older than this decay to zero and rank into the archive.
pub const RETENTION_DAYS: i64 = 30;

/// Hard cap on the key-events section.
pub const KEY_EVENTS_CAP: usize = 15;

const KEY_SCORE_MIN: f64 = 50.0;
const OTHER_SCORE_MIN: f64 = 20.0;

const FOLLOW_UP_BOOST: f64 = 0.20;
const HOT_TOPIC_BOOST: f64 = 0.15;
const MULTI_INDICATOR_BOOST: f64 = 0.10;

/// Non-event inputs to a ranking pass, read once at the start of the pass.
#[derive(Debug, Default)]
pub struct RankingInputs {
    /// Topic keys currently flagged hot.
    pub hot_topics: HashSet<String>,
    /// Ids of investigations still in play (open/updated/escalated).
    pub open_investigation_ids: HashSet<Uuid>,
    /// Source events of those open investigations, for follow-ups that
    /// reference the originating event rather than the investigation.
    pub open_investigation_sources: HashSet<EventId>,
}

/// Age-bucketed decay. Monotonically non-increasing in age.
pub fn decay_factor(age_days: i64) -> f64 {
    match age_days {
        i64::MIN..=0 => 1.0,
        1..=3 => 0.9,
        4..=7 => 0.7,
        8..=14 => 0.5,
        15..=RETENTION_DAYS => 0.3,
        _ => 0.0,
    }
}

/// Additive boosts, independently triggered. May exceed 1.45 when all fire.
fn boost_factor(event: &EventRecord, inputs: &RankingInputs) -> f64 {
    let mut boost = 1.0;
    if follows_up_open_investigation(event, inputs) {
        boost += FOLLOW_UP_BOOST;
    }
    if event_topic(event)
        .map(|t| inputs.hot_topics.contains(&t))
        .unwrap_or(false)
    {
        boost += HOT_TOPIC_BOOST;
    }
    if event.linked_indicators.len() >= 2 {
        boost += MULTI_INDICATOR_BOOST;
    }
    boost
}

fn follows_up_open_investigation(event: &EventRecord, inputs: &RankingInputs) -> bool {
    if !event.is_follow_up {
        return false;
    }
    match &event.follows_up_on {
        Some(FollowUpRef::Investigation { investigation_id }) => {
            inputs.open_investigation_ids.contains(investigation_id)
        }
        Some(FollowUpRef::Event { event_id }) => {
            inputs.open_investigation_sources.contains(event_id)
        }
        None => false,
    }
}

fn event_topic(event: &EventRecord) -> Option<String> {
    event
        .category
        .map(|c| topic_key(c, &event.linked_indicators))
}

/// Recompute ranking fields for every event.
///
/// Returns one update per event. Past the retention horizon the decay factor
/// is 0.0, so the update demotes the event to the archive no matter what
/// section it held before. The key-events section is capped at the top
/// [`KEY_EVENTS_CAP`] by score (ties broken by more recent publication);
/// overflow is demoted to other-news.
pub fn rank(
    events: &[EventRecord],
    today: DateTime<Utc>,
    inputs: &RankingInputs,
) -> Vec<RankingUpdate> {
    let mut updates: Vec<RankingUpdate> = Vec::new();
    let mut key_candidates: Vec<usize> = Vec::new();

    for event in events {
        let age_days = (today - event.published_at).num_days();
        let decay = decay_factor(age_days);
        let boost = boost_factor(event, inputs);
        let base = event.base_score.unwrap_or(0) as f64;
        let current_score = base * decay * boost;

        let scorable = event.is_market_relevant && event.review_state == ReviewState::Ok;
        let section = if scorable && current_score >= KEY_SCORE_MIN
            && !event.linked_indicators.is_empty()
        {
            DisplaySection::KeyEvents
        } else if scorable && current_score >= OTHER_SCORE_MIN {
            DisplaySection::OtherNews
        } else {
            DisplaySection::Archive
        };

        let topic = event_topic(event);
        let hot_topic = topic.filter(|t| inputs.hot_topics.contains(t));

        if section == DisplaySection::KeyEvents {
            key_candidates.push(updates.len());
        }
        updates.push(RankingUpdate {
            event_id: event.id.clone(),
            current_score,
            decay_factor: decay,
            boost_factor: boost,
            display_section: section,
            hot_topic,
        });
    }

    // Cap key_events at the top N by score, ties broken by more recent
    // publication, then by id for a total order.
    if key_candidates.len() > KEY_EVENTS_CAP {
        let published_at = |idx: usize| {
            events
                .iter()
                .find(|e| e.id == updates[idx].event_id)
                .map(|e| e.published_at)
                .unwrap_or(today)
        };
        key_candidates.sort_by(|&a, &b| {
            updates[b]
                .current_score
                .partial_cmp(&updates[a].current_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| published_at(b).cmp(&published_at(a)))
                .then_with(|| updates[a].event_id.cmp(&updates[b].event_id))
        });
        for &idx in key_candidates.iter().skip(KEY_EVENTS_CAP) {
            updates[idx].display_section = DisplaySection::OtherNews;
        }
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::classified_event;
    use chrono::Duration;
    use marketpulse_common::IndicatorId;

    fn inputs() -> RankingInputs {
        RankingInputs::default()
    }

    #[test]
    fn decay_buckets_by_age() {
        assert_eq!(decay_factor(0), 1.0);
        assert_eq!(decay_factor(2), 0.9);
        assert_eq!(decay_factor(5), 0.7);
        assert_eq!(decay_factor(10), 0.5);
        assert_eq!(decay_factor(20), 0.3);
        assert_eq!(decay_factor(31), 0.0);
    }

    #[test]
    fn decay_is_monotonically_non_increasing() {
        let mut prev = decay_factor(0);
        for age in 1..=40 {
            let d = decay_factor(age);
            assert!(d <= prev, "decay increased at age {age}");
            prev = d;
        }
    }

    #[test]
    fn current_score_non_increasing_with_age_without_boosts() {
        let today = Utc::now();
        let mut prev_score = f64::MAX;
        for age in [0, 2, 5, 10, 20] {
            let mut event = classified_event("e", 80, &[IndicatorId::Cpi]);
            event.published_at = today - Duration::days(age);
            let updates = rank(&[event], today, &inputs());
            assert!(updates[0].current_score <= prev_score);
            prev_score = updates[0].current_score;
        }
    }

    #[test]
    fn events_past_horizon_decay_into_archive() {
        let today = Utc::now();
        let mut event = classified_event("old", 90, &[IndicatorId::Cpi]);
        event.published_at = today - Duration::days(31);
        // The stored section must not outlive the horizon.
        event.display_section = DisplaySection::KeyEvents;

        let updates = rank(&[event], today, &inputs());
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].decay_factor, 0.0);
        assert_eq!(updates[0].current_score, 0.0);
        assert_eq!(updates[0].display_section, DisplaySection::Archive);
    }

    #[test]
    fn fresh_multi_indicator_event_lands_in_key_events() {
        // base 80, day 0, two indicators: 80 * 1.0 * 1.10 = 88.0
        let today = Utc::now();
        let mut event = classified_event("a", 80, &[IndicatorId::Cpi, IndicatorId::CoreCpi]);
        event.published_at = today;
        let updates = rank(&[event], today, &inputs());
        assert_eq!(updates[0].current_score, 88.0);
        assert_eq!(updates[0].decay_factor, 1.0);
        assert_eq!(updates[0].boost_factor, 1.1);
        assert_eq!(updates[0].display_section, DisplaySection::KeyEvents);
    }

    #[test]
    fn decayed_follow_up_misses_key_events_on_score() {
        // base 80, day 10, follow-up to open investigation, one indicator:
        // 80 * 0.5 * 1.20 = 48.0 — below the key threshold despite indicators.
        let today = Utc::now();
        let inv_id = Uuid::new_v4();
        let mut event = classified_event("b", 80, &[IndicatorId::Treasury10y]);
        event.published_at = today - Duration::days(10);
        event.is_follow_up = true;
        event.follows_up_on = Some(FollowUpRef::Investigation {
            investigation_id: inv_id,
        });

        let mut inputs = inputs();
        inputs.open_investigation_ids.insert(inv_id);

        let updates = rank(&[event], today, &inputs);
        assert_eq!(updates[0].current_score, 48.0);
        assert_eq!(updates[0].boost_factor, 1.2);
        assert_eq!(updates[0].display_section, DisplaySection::OtherNews);
    }

    #[test]
    fn follow_up_boost_requires_open_investigation() {
        let today = Utc::now();
        let mut event = classified_event("c", 80, &[IndicatorId::Cpi]);
        event.published_at = today;
        event.is_follow_up = true;
        event.follows_up_on = Some(FollowUpRef::Investigation {
            investigation_id: Uuid::new_v4(),
        });
        // The referenced investigation is not open.
        let updates = rank(&[event], today, &inputs());
        assert_eq!(updates[0].boost_factor, 1.0);
    }

    #[test]
    fn boosts_are_additive_and_can_exceed_1_45() {
        let today = Utc::now();
        let inv_id = Uuid::new_v4();
        let mut event = classified_event("d", 60, &[IndicatorId::Cpi, IndicatorId::Vix]);
        event.published_at = today;
        event.is_follow_up = true;
        event.follows_up_on = Some(FollowUpRef::Investigation {
            investigation_id: inv_id,
        });

        let mut inputs = inputs();
        inputs.open_investigation_ids.insert(inv_id);
        inputs
            .hot_topics
            .insert(topic_key(event.category.unwrap(), &event.linked_indicators));

        let updates = rank(&[event.clone()], today, &inputs);
        assert!((updates[0].boost_factor - 1.45).abs() < 1e-9);
        assert_eq!(updates[0].hot_topic, event_topic(&event));
    }

    #[test]
    fn key_events_capped_at_fifteen() {
        let today = Utc::now();
        let events: Vec<EventRecord> = (0..20)
            .map(|i| {
                let mut e =
                    classified_event(&format!("ev{i:02}"), 90, &[IndicatorId::Sp500]);
                e.published_at = today - Duration::hours(i);
                e
            })
            .collect();

        let updates = rank(&events, today, &inputs());
        let key_count = updates
            .iter()
            .filter(|u| u.display_section == DisplaySection::KeyEvents)
            .count();
        let other_count = updates
            .iter()
            .filter(|u| u.display_section == DisplaySection::OtherNews)
            .count();
        assert_eq!(key_count, KEY_EVENTS_CAP);
        assert_eq!(other_count, 5);
    }

    #[test]
    fn cap_tie_break_prefers_more_recent() {
        let today = Utc::now();
        // 16 events, identical scores; the oldest one should be demoted.
        let events: Vec<EventRecord> = (0..16)
            .map(|i| {
                let mut e =
                    classified_event(&format!("tie{i:02}"), 80, &[IndicatorId::Gdp]);
                e.published_at = today - Duration::hours(i);
                e
            })
            .collect();

        let updates = rank(&events, today, &inputs());
        let demoted: Vec<_> = updates
            .iter()
            .filter(|u| u.display_section == DisplaySection::OtherNews)
            .collect();
        assert_eq!(demoted.len(), 1);
        assert_eq!(demoted[0].event_id, EventId::from("tie15"));
    }

    #[test]
    fn non_relevant_events_rank_into_archive() {
        let today = Utc::now();
        let mut event = classified_event("junk", 80, &[IndicatorId::Cpi]);
        event.is_market_relevant = false;
        event.published_at = today;
        let updates = rank(&[event], today, &inputs());
        assert_eq!(updates[0].display_section, DisplaySection::Archive);
    }

    #[test]
    fn ranking_is_idempotent() {
        let today = Utc::now();
        let events: Vec<EventRecord> = (0..8)
            .map(|i| {
                let mut e =
                    classified_event(&format!("idem{i}"), 40 + i * 5, &[IndicatorId::Pmi]);
                e.published_at = today - Duration::days(i as i64);
                e
            })
            .collect();

        let first = rank(&events, today, &inputs());
        let second = rank(&events, today, &inputs());
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.event_id, b.event_id);
            assert_eq!(a.current_score, b.current_score);
            assert_eq!(a.display_section, b.display_section);
        }
    }
}
