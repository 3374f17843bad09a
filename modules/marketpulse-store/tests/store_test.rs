//! MemoryStore behavior tests: fingerprint-conflict handling, evidence
//! consistency, ranking atomicity, and run-lock mutual exclusion.

use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use uuid::Uuid;

use marketpulse_common::{
    DisplaySection, EventCategory, EventId, EvidenceType, IndicatorId, InvestigationStatus,
    PredictionStatus, Priority, ReviewState,
};
use marketpulse_store::{
    EventRecord, InsertOutcome, Investigation, InvestigationEvidence, MemoryStore, Prediction,
    RankingUpdate, Store,
};

fn test_event(id: &str, title: &str) -> EventRecord {
    EventRecord {
        id: EventId::from(id),
        title: title.to_string(),
        summary: format!("{title} summary"),
        source: "reuters".to_string(),
        region: Some("us".to_string()),
        category: Some(EventCategory::MonetaryPolicy),
        linked_indicators: BTreeSet::from([IndicatorId::FedFundsRate]),
        is_market_relevant: true,
        review_state: ReviewState::Ok,
        base_score: Some(70),
        current_score: 70.0,
        decay_factor: 1.0,
        boost_factor: 1.0,
        display_section: DisplaySection::KeyEvents,
        hot_topic: None,
        published_at: Utc::now(),
        run_date: Utc::now(),
        is_follow_up: false,
        follows_up_on: None,
    }
}

#[tokio::test]
async fn duplicate_fingerprint_is_a_conflict_not_an_error() {
    let store = MemoryStore::new();
    let outcome = store.insert_event(test_event("abc123", "Fed holds")).await.unwrap();
    assert_eq!(outcome, InsertOutcome::Inserted);

    let outcome = store.insert_event(test_event("abc123", "Fed holds")).await.unwrap();
    assert_eq!(outcome, InsertOutcome::Duplicate(EventId::from("abc123")));

    let events = store.events_since(Utc::now() - Duration::days(1)).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn evidence_count_tracks_appended_rows() {
    let store = MemoryStore::new();
    let investigation = Investigation::new("Will the Fed cut?".to_string(), Priority::High, None, Utc::now());
    let inv_id = investigation.id;
    store.insert_investigation(investigation).await.unwrap();

    for i in 0..3 {
        store
            .append_evidence(InvestigationEvidence {
                id: Uuid::new_v4(),
                investigation_id: inv_id,
                event_id: EventId::from(format!("ev{i}").as_str()),
                evidence_type: EvidenceType::Supports,
                summary: "corroborating".to_string(),
                added_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    let investigation = store.get_investigation(inv_id).await.unwrap().unwrap();
    let rows = store.evidence_for(inv_id).await.unwrap();
    assert_eq!(investigation.evidence_count, 3);
    assert_eq!(rows.len() as u32, investigation.evidence_count);
    assert!(investigation.last_evidence_at.is_some());
}

#[tokio::test]
async fn evidence_for_unknown_investigation_is_an_error() {
    let store = MemoryStore::new();
    let err = store
        .append_evidence(InvestigationEvidence {
            id: Uuid::new_v4(),
            investigation_id: Uuid::new_v4(),
            event_id: EventId::from("ev1"),
            evidence_type: EvidenceType::Neutral,
            summary: "orphan".to_string(),
            added_at: Utc::now(),
        })
        .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn apply_rankings_rewrites_ranking_fields_only() {
    let store = MemoryStore::new();
    store.insert_event(test_event("aaa", "Event A")).await.unwrap();

    store
        .apply_rankings(vec![RankingUpdate {
            event_id: EventId::from("aaa"),
            current_score: 31.5,
            decay_factor: 0.9,
            boost_factor: 1.15,
            display_section: DisplaySection::OtherNews,
            hot_topic: Some("monetary_policy:fed_funds_rate".to_string()),
        }])
        .await
        .unwrap();

    let event = store.get_event(&EventId::from("aaa")).await.unwrap().unwrap();
    assert_eq!(event.current_score, 31.5);
    assert_eq!(event.decay_factor, 0.9);
    assert_eq!(event.display_section, DisplaySection::OtherNews);
    // Immutable fields untouched
    assert_eq!(event.base_score, Some(70));
    assert_eq!(event.title, "Event A");
}

#[tokio::test]
async fn events_by_section_sorted_by_score_desc() {
    let store = MemoryStore::new();
    let mut low = test_event("low", "Low scorer");
    low.current_score = 55.0;
    let mut high = test_event("high", "High scorer");
    high.current_score = 90.0;
    store.insert_event(low).await.unwrap();
    store.insert_event(high).await.unwrap();

    let key = store.events_by_section(DisplaySection::KeyEvents).await.unwrap();
    assert_eq!(key.len(), 2);
    assert_eq!(key[0].id, EventId::from("high"));
}

#[tokio::test]
async fn follow_up_marker_sets_both_fields() {
    let store = MemoryStore::new();
    store.insert_event(test_event("aaa", "Event A")).await.unwrap();

    let investigation_id = Uuid::new_v4();
    store
        .set_event_follow_up(
            &EventId::from("aaa"),
            marketpulse_common::FollowUpRef::Investigation { investigation_id },
        )
        .await
        .unwrap();

    let event = store.get_event(&EventId::from("aaa")).await.unwrap().unwrap();
    assert!(event.is_follow_up);
    assert_eq!(
        event.follows_up_on,
        Some(marketpulse_common::FollowUpRef::Investigation { investigation_id })
    );
}

#[tokio::test]
async fn run_lock_is_mutually_exclusive() {
    let store = MemoryStore::new();
    assert!(store.acquire_run_lock().await.unwrap());
    assert!(!store.acquire_run_lock().await.unwrap());
    store.release_run_lock().await.unwrap();
    assert!(store.acquire_run_lock().await.unwrap());
}

#[tokio::test]
async fn open_investigations_excludes_terminal_states() {
    let store = MemoryStore::new();
    let mut resolved = Investigation::new("done?".to_string(), Priority::Low, None, Utc::now());
    resolved.status = InvestigationStatus::Resolved;
    let mut stale = Investigation::new("old?".to_string(), Priority::Low, None, Utc::now());
    stale.status = InvestigationStatus::Stale;
    let open = Investigation::new("live?".to_string(), Priority::High, None, Utc::now());
    let mut escalated = Investigation::new("conflicted?".to_string(), Priority::High, None, Utc::now());
    escalated.status = InvestigationStatus::Escalated;

    for inv in [resolved, stale, open, escalated] {
        store.insert_investigation(inv).await.unwrap();
    }

    let open = store.open_investigations().await.unwrap();
    assert_eq!(open.len(), 2);
    assert!(open
        .iter()
        .all(|i| i.status != InvestigationStatus::Resolved && i.status != InvestigationStatus::Stale));
}

#[tokio::test]
async fn pending_predictions_filters_by_status() {
    let store = MemoryStore::new();
    let pending = Prediction {
        id: Uuid::new_v4(),
        event_id: EventId::from("ev1"),
        statement: "10y yield above 4.5% within 30 days".to_string(),
        horizon_days: 30,
        created_at: Utc::now(),
        status: PredictionStatus::Pending,
    };
    let pending_id = pending.id;
    store.insert_prediction(pending).await.unwrap();

    assert_eq!(store.pending_predictions().await.unwrap().len(), 1);

    store
        .update_prediction_status(pending_id, PredictionStatus::Expired)
        .await
        .unwrap();
    assert!(store.pending_predictions().await.unwrap().is_empty());
}

#[tokio::test]
async fn injected_write_failure_surfaces_as_error() {
    let store = MemoryStore::new();
    store.set_fail_writes(true);
    assert!(store.insert_event(test_event("x", "X")).await.is_err());
    store.set_fail_writes(false);
    assert!(store.insert_event(test_event("x", "X")).await.is_ok());
}
