//! In-memory reference implementation of `Store`.
//!
//! Backs the binary in single-process deployments and every test. A single
//! `RwLock` over the whole dataset gives the read-committed behavior the
//! ranking pass needs: reads see a consistent snapshot, batch writes are
//! all-or-nothing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use marketpulse_common::{
    CalendarRecord, DisplaySection, EventId, InvestigationStatus, MetricRecord, PredictionStatus,
};

use crate::records::{
    CausalAnalysis, EventRecord, Investigation, InvestigationEvidence, Prediction, RunHistory,
    TopicFrequency,
};
use crate::store::{InsertOutcome, RankingUpdate, Store};

#[derive(Default)]
struct Inner {
    events: BTreeMap<EventId, EventRecord>,
    analyses: HashMap<EventId, CausalAnalysis>,
    investigations: HashMap<Uuid, Investigation>,
    evidence: Vec<InvestigationEvidence>,
    topics: HashMap<String, TopicFrequency>,
    predictions: HashMap<Uuid, Prediction>,
    metrics: Vec<MetricRecord>,
    calendar: Vec<CalendarRecord>,
    runs: Vec<RunHistory>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    run_lock: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail. Used by tests to exercise the
    /// fatal-storage-failure path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(anyhow!("injected storage failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_event(&self, event: EventRecord) -> Result<InsertOutcome> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        if inner.events.contains_key(&event.id) {
            return Ok(InsertOutcome::Duplicate(event.id));
        }
        inner.events.insert(event.id.clone(), event);
        Ok(InsertOutcome::Inserted)
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<EventRecord>> {
        Ok(self.inner.read().await.events.get(id).cloned())
    }

    async fn events_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<EventRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .values()
            .filter(|e| e.published_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn events_by_section(&self, section: DisplaySection) -> Result<Vec<EventRecord>> {
        let inner = self.inner.read().await;
        let mut events: Vec<_> = inner
            .events
            .values()
            .filter(|e| e.display_section == section)
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            b.current_score
                .partial_cmp(&a.current_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.published_at.cmp(&a.published_at))
        });
        Ok(events)
    }

    async fn apply_rankings(&self, updates: Vec<RankingUpdate>) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        for update in updates {
            match inner.events.get_mut(&update.event_id) {
                Some(event) => {
                    event.current_score = update.current_score;
                    event.decay_factor = update.decay_factor;
                    event.boost_factor = update.boost_factor;
                    event.display_section = update.display_section;
                    event.hot_topic = update.hot_topic;
                }
                None => warn!(event_id = %update.event_id, "Ranking update for unknown event"),
            }
        }
        Ok(())
    }

    async fn set_event_base_score(&self, id: &EventId, base_score: u8) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let event = inner
            .events
            .get_mut(id)
            .ok_or_else(|| anyhow!("unknown event {id}"))?;
        event.base_score = Some(base_score);
        Ok(())
    }

    async fn set_event_review_state(
        &self,
        id: &EventId,
        state: marketpulse_common::ReviewState,
    ) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let event = inner
            .events
            .get_mut(id)
            .ok_or_else(|| anyhow!("unknown event {id}"))?;
        event.review_state = state;
        Ok(())
    }

    async fn set_event_follow_up(
        &self,
        id: &EventId,
        follows_up_on: marketpulse_common::FollowUpRef,
    ) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let event = inner
            .events
            .get_mut(id)
            .ok_or_else(|| anyhow!("unknown event {id}"))?;
        event.is_follow_up = true;
        event.follows_up_on = Some(follows_up_on);
        Ok(())
    }

    async fn insert_analysis(&self, analysis: CausalAnalysis) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        if inner.analyses.contains_key(&analysis.event_id) {
            return Err(anyhow!(
                "causal analysis already exists for event {}",
                analysis.event_id
            ));
        }
        inner.analyses.insert(analysis.event_id.clone(), analysis);
        Ok(())
    }

    async fn get_analysis(&self, event_id: &EventId) -> Result<Option<CausalAnalysis>> {
        Ok(self.inner.read().await.analyses.get(event_id).cloned())
    }

    async fn insert_investigation(&self, investigation: Investigation) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        inner
            .investigations
            .insert(investigation.id, investigation);
        Ok(())
    }

    async fn get_investigation(&self, id: Uuid) -> Result<Option<Investigation>> {
        Ok(self.inner.read().await.investigations.get(&id).cloned())
    }

    async fn update_investigation(&self, investigation: Investigation) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        if !inner.investigations.contains_key(&investigation.id) {
            return Err(anyhow!("unknown investigation {}", investigation.id));
        }
        inner
            .investigations
            .insert(investigation.id, investigation);
        Ok(())
    }

    async fn open_investigations(&self) -> Result<Vec<Investigation>> {
        let inner = self.inner.read().await;
        Ok(inner
            .investigations
            .values()
            .filter(|i| {
                matches!(
                    i.status,
                    InvestigationStatus::Open
                        | InvestigationStatus::Updated
                        | InvestigationStatus::Escalated
                )
            })
            .cloned()
            .collect())
    }

    async fn investigations_by_status(
        &self,
        status: InvestigationStatus,
    ) -> Result<Vec<Investigation>> {
        let inner = self.inner.read().await;
        Ok(inner
            .investigations
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect())
    }

    async fn append_evidence(&self, evidence: InvestigationEvidence) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let investigation = inner
            .investigations
            .get_mut(&evidence.investigation_id)
            .ok_or_else(|| anyhow!("unknown investigation {}", evidence.investigation_id))?;
        investigation.evidence_count += 1;
        investigation.last_evidence_at = Some(evidence.added_at);
        investigation.updated_at = evidence.added_at;
        inner.evidence.push(evidence);
        Ok(())
    }

    async fn evidence_for(&self, investigation_id: Uuid) -> Result<Vec<InvestigationEvidence>> {
        let inner = self.inner.read().await;
        Ok(inner
            .evidence
            .iter()
            .filter(|e| e.investigation_id == investigation_id)
            .cloned()
            .collect())
    }

    async fn replace_topics(&self, topics: Vec<TopicFrequency>) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        inner.topics = topics.into_iter().map(|t| (t.topic.clone(), t)).collect();
        Ok(())
    }

    async fn hot_topics(&self) -> Result<Vec<TopicFrequency>> {
        let inner = self.inner.read().await;
        Ok(inner.topics.values().filter(|t| t.is_hot).cloned().collect())
    }

    async fn insert_prediction(&self, prediction: Prediction) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        inner.predictions.insert(prediction.id, prediction);
        Ok(())
    }

    async fn pending_predictions(&self) -> Result<Vec<Prediction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .predictions
            .values()
            .filter(|p| p.status == PredictionStatus::Pending)
            .cloned()
            .collect())
    }

    async fn update_prediction_status(&self, id: Uuid, status: PredictionStatus) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let prediction = inner
            .predictions
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown prediction {id}"))?;
        prediction.status = status;
        Ok(())
    }

    async fn insert_metric(&self, metric: MetricRecord) -> Result<()> {
        self.check_writable()?;
        self.inner.write().await.metrics.push(metric);
        Ok(())
    }

    async fn metrics_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<MetricRecord>> {
        let inner = self.inner.read().await;
        let mut metrics: Vec<_> = inner
            .metrics
            .iter()
            .filter(|m| m.recorded_at >= cutoff)
            .cloned()
            .collect();
        metrics.sort_by_key(|m| m.recorded_at);
        Ok(metrics)
    }

    async fn insert_calendar(&self, entry: CalendarRecord) -> Result<()> {
        self.check_writable()?;
        self.inner.write().await.calendar.push(entry);
        Ok(())
    }

    async fn upcoming_calendar(&self, after: DateTime<Utc>) -> Result<Vec<CalendarRecord>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<_> = inner
            .calendar
            .iter()
            .filter(|c| c.scheduled_for >= after)
            .cloned()
            .collect();
        entries.sort_by_key(|c| c.scheduled_for);
        Ok(entries)
    }

    async fn insert_run(&self, run: RunHistory) -> Result<()> {
        self.check_writable()?;
        self.inner.write().await.runs.push(run);
        Ok(())
    }

    async fn latest_run(&self) -> Result<Option<RunHistory>> {
        let inner = self.inner.read().await;
        Ok(inner.runs.last().cloned())
    }

    async fn runs_page(&self, offset: usize, limit: usize) -> Result<Vec<RunHistory>> {
        let inner = self.inner.read().await;
        Ok(inner
            .runs
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn acquire_run_lock(&self) -> Result<bool> {
        Ok(self
            .run_lock
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    async fn release_run_lock(&self) -> Result<()> {
        self.run_lock.store(false, Ordering::SeqCst);
        Ok(())
    }
}
