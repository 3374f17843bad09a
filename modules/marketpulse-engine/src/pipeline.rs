//! Single-run orchestration.
//!
//! Stage order is load-bearing: lifecycle mutations land before the ranker
//! reads open-investigation state, and the topic table is recomputed after
//! ranking so hot-topic boosts always come from the previous run. A run
//! holds the store-level run lock end to end; concurrent invocations bail
//! out instead of interleaving.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use marketpulse_analyst::{Classifier, InvestigationReviewer, Scorer};
use marketpulse_common::{
    Config, CrawlItem, DisplaySection, MarketPulseError, PredictionStatus, RunStatus,
};
use marketpulse_store::{RunHistory, Store};

use crate::context::build_snapshot;
use crate::crawl::{fetch_all, Crawler};
use crate::dedup::partition_fresh;
use crate::gate::with_retry;
use crate::lifecycle::InvestigationLifecycle;
use crate::ranker::{rank, RankingInputs};
use crate::run_log::RunLog;
use crate::scoring::{classify_batch, review_actions, score_events};
use crate::topics::compute_topics;

#[derive(Debug, Clone)]
pub struct RunStats {
    pub run_id: String,
    pub status: RunStatus,
    pub fetched: u32,
    pub duplicates: u32,
    pub relevant: u32,
    pub irrelevant: u32,
    pub parked: u32,
    pub scored: u32,
    pub predictions_recorded: u32,
    pub predictions_expired: u32,
    pub investigations_opened: u32,
    pub investigations_updated: u32,
    pub investigations_resolved: u32,
    pub investigations_escalated: u32,
    pub investigations_stale: u32,
    pub key_events: u32,
    pub other_events: u32,
    pub hot_topics: u32,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} finished: {}", self.run_id, self.status)?;
        writeln!(
            f,
            "  events: {} fetched, {} duplicates, {} relevant, {} irrelevant, {} parked",
            self.fetched, self.duplicates, self.relevant, self.irrelevant, self.parked
        )?;
        writeln!(
            f,
            "  scoring: {} scored, {} predictions recorded, {} expired",
            self.scored, self.predictions_recorded, self.predictions_expired
        )?;
        writeln!(
            f,
            "  investigations: {} opened, {} updated, {} resolved, {} escalated, {} stale",
            self.investigations_opened,
            self.investigations_updated,
            self.investigations_resolved,
            self.investigations_escalated,
            self.investigations_stale
        )?;
        write!(
            f,
            "  sections: {} key events, {} other news, {} hot topics",
            self.key_events, self.other_events, self.hot_topics
        )
    }
}

pub struct PipelineOrchestrator<S: Store> {
    store: S,
    classifier: Arc<dyn Classifier>,
    scorer: Arc<dyn Scorer>,
    reviewer: Arc<dyn InvestigationReviewer>,
    crawlers: Vec<Box<dyn Crawler>>,
    config: Config,
}

impl<S: Store> PipelineOrchestrator<S> {
    pub fn new(
        store: S,
        classifier: Arc<dyn Classifier>,
        scorer: Arc<dyn Scorer>,
        reviewer: Arc<dyn InvestigationReviewer>,
        crawlers: Vec<Box<dyn Crawler>>,
        config: Config,
    ) -> Self {
        Self {
            store,
            classifier,
            scorer,
            reviewer,
            crawlers,
            config,
        }
    }

    /// Execute one full pipeline run. At most one run may be in flight per
    /// store; a held lock yields [`MarketPulseError::RunLockConflict`].
    pub async fn run(&self) -> Result<RunStats, MarketPulseError> {
        if !self.store.acquire_run_lock().await? {
            warn!("Run lock held, refusing to start a second run");
            return Err(MarketPulseError::RunLockConflict);
        }

        let run_id = Uuid::new_v4().to_string();
        let mut run_log = RunLog::new(&self.config.data_dir, &run_id);
        let result = self.run_inner(&run_id, &mut run_log).await;

        if let Err(e) = &result {
            error!(run_id, error = %e, "Pipeline run aborted");
            // Best effort: the store may be the thing that is broken.
            let now = Utc::now();
            let _ = self
                .store
                .insert_run(RunHistory {
                    run_id: run_id.clone(),
                    started_at: now,
                    finished_at: now,
                    events_processed: 0,
                    events_relevant: 0,
                    key_events: 0,
                    other_events: 0,
                    investigations_opened: 0,
                    investigations_updated: 0,
                    investigations_resolved: 0,
                    status: RunStatus::Failed,
                })
                .await;
            if let Err(log_err) = run_log.write(RunStatus::Failed) {
                warn!(error = %log_err, "Failed to write run log for aborted run");
            }
        }

        self.store.release_run_lock().await?;
        result.map_err(MarketPulseError::from)
    }

    async fn run_inner(&self, run_id: &str, run_log: &mut RunLog) -> Result<RunStats> {
        let started_at = Utc::now();
        let now = started_at;
        info!(run_id, "Pipeline run starting");

        // Ingest. Metrics and calendar entries bypass the scoring engine.
        let items = fetch_all(&self.crawlers).await;
        let mut news = Vec::new();
        for item in items {
            match item {
                CrawlItem::News(raw) => news.push(raw),
                CrawlItem::Metric(metric) => self.store.insert_metric(metric).await?,
                CrawlItem::Calendar(entry) => self.store.insert_calendar(entry).await?,
            }
        }
        let fetched = news.len() as u32;
        run_log.record("crawl", format!("{fetched} news items fetched"));

        let dedup = partition_fresh(&self.store, news).await?;
        run_log.record(
            "dedup",
            format!("{} fresh, {} duplicates", dedup.fresh.len(), dedup.duplicates),
        );

        // Context reflects the previous run's stored state; in particular hot
        // topics are last run's, never this run's.
        let snapshot = build_snapshot(&self.store, self.config.context_lookback_days, now).await?;
        let mut degraded = snapshot.degraded;

        let classified = classify_batch(&self.store, &*self.classifier, dedup.fresh, now).await?;
        run_log.record(
            "classify",
            format!(
                "{} relevant, {} irrelevant, {} parked",
                classified.relevant.len(),
                classified.irrelevant,
                classified.parked
            ),
        );

        let scoring = score_events(
            &self.store,
            &*self.scorer,
            &classified.relevant,
            &snapshot,
            now,
        )
        .await?;
        run_log.record(
            "score",
            format!("{} scored, {} parked", scoring.scored, scoring.parked),
        );

        let mut actions = scoring.actions;
        if !snapshot.open_investigations.is_empty() && !classified.relevant.is_empty() {
            let review = with_retry("review", run_id, || {
                self.reviewer
                    .review(&snapshot.open_investigations, &classified.relevant)
            })
            .await;
            match review {
                Ok(response) => {
                    let reviewed = review_actions(response);
                    run_log.record("review", format!("{} evidence actions", reviewed.len()));
                    actions.extend(reviewed);
                }
                Err(e) => {
                    warn!(error = %e, "Investigation review failed, continuing without it");
                    run_log.record("review", "skipped after repeated failure");
                    degraded = true;
                }
            }
        }

        let lifecycle = InvestigationLifecycle::new(&self.store);
        let outcome = lifecycle.apply(actions, now).await?;
        let stale = lifecycle.apply_staleness(now).await?;
        run_log.record(
            "lifecycle",
            format!(
                "{} opened, {} updated, {} resolved, {} escalated, {} stale",
                outcome.opened, outcome.updated, outcome.resolved, outcome.escalated, stale
            ),
        );

        let mut predictions_expired = 0;
        for prediction in self.store.pending_predictions().await? {
            if prediction.created_at + Duration::days(prediction.horizon_days) < now {
                self.store
                    .update_prediction_status(prediction.id, PredictionStatus::Expired)
                    .await?;
                predictions_expired += 1;
            }
        }

        // Ranking reads post-lifecycle investigation state. The whole event
        // population is re-ranked, so rows drifting past the retention
        // horizon get their archive demotion even across infrequent runs.
        let events = self.store.events_since(DateTime::<Utc>::MIN_UTC).await?;
        let open = self.store.open_investigations().await?;
        let inputs = RankingInputs {
            hot_topics: snapshot
                .hot_topics
                .iter()
                .map(|t| t.topic.clone())
                .collect::<HashSet<_>>(),
            open_investigation_ids: open.iter().map(|i| i.id).collect(),
            open_investigation_sources: open
                .iter()
                .filter_map(|i| i.source_event_id.clone())
                .collect(),
        };
        let updates = rank(&events, now, &inputs);
        let key_events = updates
            .iter()
            .filter(|u| u.display_section == DisplaySection::KeyEvents)
            .count() as u32;
        let other_events = updates
            .iter()
            .filter(|u| u.display_section == DisplaySection::OtherNews)
            .count() as u32;
        self.store.apply_rankings(updates).await?;
        run_log.record(
            "rank",
            format!("{key_events} key events, {other_events} other news"),
        );

        // Topic recomputation last: this run's counts boost the next run.
        let topics = compute_topics(&events, now);
        let hot_topics = topics.iter().filter(|t| t.is_hot).count() as u32;
        self.store.replace_topics(topics).await?;
        run_log.record("topics", format!("{hot_topics} hot topics"));

        let status = if degraded || classified.parked > 0 || scoring.parked > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Success
        };
        let stats = RunStats {
            run_id: run_id.to_string(),
            status,
            fetched,
            duplicates: dedup.duplicates + classified.duplicates,
            relevant: classified.relevant.len() as u32,
            irrelevant: classified.irrelevant,
            parked: classified.parked + scoring.parked,
            scored: scoring.scored,
            predictions_recorded: scoring.predictions,
            predictions_expired,
            investigations_opened: outcome.opened,
            investigations_updated: outcome.updated,
            investigations_resolved: outcome.resolved,
            investigations_escalated: outcome.escalated,
            investigations_stale: stale,
            key_events,
            other_events,
            hot_topics,
        };

        self.store
            .insert_run(RunHistory {
                run_id: run_id.to_string(),
                started_at,
                finished_at: Utc::now(),
                events_processed: fetched,
                events_relevant: stats.relevant,
                key_events,
                other_events,
                investigations_opened: outcome.opened,
                investigations_updated: outcome.updated,
                investigations_resolved: outcome.resolved,
                status,
            })
            .await?;
        if let Err(e) = run_log.write(status) {
            warn!(error = %e, "Failed to write run log");
        }

        info!(run_id, %status, "Pipeline run finished");
        Ok(stats)
    }
}
