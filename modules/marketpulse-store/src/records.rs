//! Persisted record types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marketpulse_common::{
    ChainStep, DisplaySection, EventCategory, EventId, EvidenceType, FollowUpRef, IndicatorId,
    InvestigationStatus, PredictionStatus, Priority, ReviewState, RunStatus,
};

/// A single analyzed news item. Identity is the content fingerprint, so a
/// re-crawled item maps onto the same row. Ranking fields
/// (`current_score`/`decay_factor`/`boost_factor`/`display_section`/
/// `hot_topic`) are rewritten by the ranker every run; everything else is
/// immutable after classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub region: Option<String>,
    pub category: Option<EventCategory>,
    pub linked_indicators: BTreeSet<IndicatorId>,
    pub is_market_relevant: bool,
    pub review_state: ReviewState,
    /// Set at scoring time for relevant events; None means never scored.
    pub base_score: Option<u8>,
    pub current_score: f64,
    pub decay_factor: f64,
    pub boost_factor: f64,
    pub display_section: DisplaySection,
    /// Topic key if this event's topic was hot at last ranking.
    pub hot_topic: Option<String>,
    pub published_at: DateTime<Utc>,
    pub run_date: DateTime<Utc>,
    pub is_follow_up: bool,
    pub follows_up_on: Option<FollowUpRef>,
}

/// Causal-chain explanation, 1:1 with a relevant event. Written once at
/// scoring time and never mutated — a correction requires a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalAnalysis {
    pub event_id: EventId,
    pub template_id: String,
    pub chain_steps: Vec<ChainStep>,
    pub confidence: f64,
    pub needs_investigation: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// An open factual question tracked across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    pub id: Uuid,
    pub question: String,
    pub status: InvestigationStatus,
    pub priority: Priority,
    /// Always equals the number of linked evidence rows; the store bumps it
    /// on every append so the two can never drift.
    pub evidence_count: u32,
    /// The event whose scoring opened this question.
    pub source_event_id: Option<EventId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_evidence_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub resolved_by_event_id: Option<EventId>,
    /// Set iff `status == Resolved`.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Investigation {
    /// `now` is the run clock, so a lifecycle pass under a fixed clock is
    /// fully deterministic.
    pub fn new(
        question: String,
        priority: Priority,
        source_event_id: Option<EventId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            status: InvestigationStatus::Open,
            priority,
            evidence_count: 0,
            source_event_id,
            created_at: now,
            updated_at: now,
            last_evidence_at: None,
            resolution: None,
            resolved_by_event_id: None,
            resolved_at: None,
        }
    }
}

/// Append-only link between an event and an investigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationEvidence {
    pub id: Uuid,
    pub investigation_id: Uuid,
    pub event_id: EventId,
    pub evidence_type: EvidenceType,
    pub summary: String,
    pub added_at: DateTime<Utc>,
}

/// Sliding 7-day occurrence count for a normalized topic key.
/// Recomputed in full every run; `is_hot` is derived (`count >= 3`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicFrequency {
    pub topic: String,
    pub occurrence_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub related_event_ids: Vec<EventId>,
    pub is_hot: bool,
}

/// A forward-looking statement attached to a scored event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub event_id: EventId,
    pub statement: String,
    pub horizon_days: i64,
    pub created_at: DateTime<Utc>,
    pub status: PredictionStatus,
}

/// One row per pipeline execution, written exactly once at the end of a run
/// (or on fatal abort).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistory {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub events_processed: u32,
    pub events_relevant: u32,
    pub key_events: u32,
    pub other_events: u32,
    pub investigations_opened: u32,
    pub investigations_updated: u32,
    pub investigations_resolved: u32,
    pub status: RunStatus,
}
