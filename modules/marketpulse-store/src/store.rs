//! The `Store` trait — transactional read/write primitives for every
//! component above it.
//!
//! Contract notes:
//! - `insert_event` resolves a unique-fingerprint conflict as
//!   `InsertOutcome::Duplicate`, never as an error. Dedup idempotence lives
//!   here, not in the caller.
//! - `append_evidence` bumps the owning investigation's `evidence_count` and
//!   `last_evidence_at` in the same write, so the count and the evidence rows
//!   can never drift no matter who appends.
//! - `apply_rankings` is all-or-nothing: consumers never observe a
//!   half-ranked population.
//! - `acquire_run_lock`/`release_run_lock` enforce at most one pipeline run
//!   in flight.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use marketpulse_common::{
    CalendarRecord, DisplaySection, EventId, InvestigationStatus, MetricRecord, PredictionStatus,
};

use crate::records::{
    CausalAnalysis, EventRecord, Investigation, InvestigationEvidence, Prediction, RunHistory,
    TopicFrequency,
};

/// Outcome of inserting an event row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same fingerprint already exists.
    Duplicate(EventId),
}

/// One event's ranking fields for the batch ranking write.
#[derive(Debug, Clone)]
pub struct RankingUpdate {
    pub event_id: EventId,
    pub current_score: f64,
    pub decay_factor: f64,
    pub boost_factor: f64,
    pub display_section: DisplaySection,
    pub hot_topic: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // --- Events ---

    async fn insert_event(&self, event: EventRecord) -> Result<InsertOutcome>;

    async fn get_event(&self, id: &EventId) -> Result<Option<EventRecord>>;

    /// All events with `published_at >= cutoff`, as a consistent snapshot.
    async fn events_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<EventRecord>>;

    /// Consumer read: events in a display section, ordered by current score
    /// descending.
    async fn events_by_section(&self, section: DisplaySection) -> Result<Vec<EventRecord>>;

    /// Apply a run's ranking pass atomically.
    async fn apply_rankings(&self, updates: Vec<RankingUpdate>) -> Result<()>;

    /// Record the base score produced by scoring. Written once per event.
    async fn set_event_base_score(&self, id: &EventId, base_score: u8) -> Result<()>;

    /// Park or clear an event for manual review.
    async fn set_event_review_state(
        &self,
        id: &EventId,
        state: marketpulse_common::ReviewState,
    ) -> Result<()>;

    /// Mark an event as a follow-up. Written once, at scoring time, when the
    /// scorer links the event to an open investigation.
    async fn set_event_follow_up(
        &self,
        id: &EventId,
        follows_up_on: marketpulse_common::FollowUpRef,
    ) -> Result<()>;

    // --- Causal analyses ---

    async fn insert_analysis(&self, analysis: CausalAnalysis) -> Result<()>;

    async fn get_analysis(&self, event_id: &EventId) -> Result<Option<CausalAnalysis>>;

    // --- Investigations ---

    async fn insert_investigation(&self, investigation: Investigation) -> Result<()>;

    async fn get_investigation(&self, id: Uuid) -> Result<Option<Investigation>>;

    /// Overwrite an investigation row (status/resolution fields only; the
    /// lifecycle is the sole writer).
    async fn update_investigation(&self, investigation: Investigation) -> Result<()>;

    /// Investigations still in play: Open, Updated, or Escalated.
    async fn open_investigations(&self) -> Result<Vec<Investigation>>;

    async fn investigations_by_status(
        &self,
        status: InvestigationStatus,
    ) -> Result<Vec<Investigation>>;

    /// Append an evidence row and bump the owning investigation's
    /// `evidence_count` and `last_evidence_at` in the same write.
    async fn append_evidence(&self, evidence: InvestigationEvidence) -> Result<()>;

    async fn evidence_for(&self, investigation_id: Uuid) -> Result<Vec<InvestigationEvidence>>;

    // --- Topic frequencies ---

    /// Replace the full topic table with this run's recomputation.
    async fn replace_topics(&self, topics: Vec<TopicFrequency>) -> Result<()>;

    async fn hot_topics(&self) -> Result<Vec<TopicFrequency>>;

    // --- Predictions ---

    async fn insert_prediction(&self, prediction: Prediction) -> Result<()>;

    async fn pending_predictions(&self) -> Result<Vec<Prediction>>;

    async fn update_prediction_status(&self, id: Uuid, status: PredictionStatus) -> Result<()>;

    // --- Indicator readings / calendar (no LLM involvement) ---

    async fn insert_metric(&self, metric: MetricRecord) -> Result<()>;

    async fn metrics_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<MetricRecord>>;

    async fn insert_calendar(&self, entry: CalendarRecord) -> Result<()>;

    async fn upcoming_calendar(&self, after: DateTime<Utc>) -> Result<Vec<CalendarRecord>>;

    // --- Run history ---

    async fn insert_run(&self, run: RunHistory) -> Result<()>;

    async fn latest_run(&self) -> Result<Option<RunHistory>>;

    async fn runs_page(&self, offset: usize, limit: usize) -> Result<Vec<RunHistory>>;

    // --- Run lock ---

    /// Returns false if another run already holds the lock.
    async fn acquire_run_lock(&self) -> Result<bool>;

    async fn release_run_lock(&self) -> Result<()>;
}
