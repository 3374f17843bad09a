//! Classification and scoring stages.
//!
//! Both stages call a collaborator once per event (with one retry via
//! [`crate::gate`]) and translate the loose wire response into domain types
//! at this boundary. A collaborator that fails twice parks the item for
//! manual review; a storage write failure aborts the run.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use marketpulse_analyst::{
    Classifier, ClassifierResponse, ReviewerResponse, Scorer, ScorerResponse,
};
use marketpulse_common::{
    ChainStep, ChainStepStatus, DisplaySection, EventCategory, EventId, EvidenceType, FollowUpRef,
    IndicatorId, Priority, RawEvent, ReviewState, ScoreFactors,
};
use marketpulse_store::{CausalAnalysis, ContextSnapshot, EventRecord, InsertOutcome, Prediction, Store};

use crate::gate::{clamp_base_score, clamp_confidence, with_retry};
use crate::lifecycle::InvestigationAction;

/// How many classification calls run concurrently.
const CLASSIFY_CONCURRENCY: usize = 4;

const SUMMARY_MAX_CHARS: usize = 400;

pub struct ClassificationOutcome {
    /// Newly inserted events that are relevant and clean, ready for scoring.
    pub relevant: Vec<EventRecord>,
    pub irrelevant: u32,
    pub parked: u32,
    /// Lost insert races (another run slipped the same fingerprint in).
    pub duplicates: u32,
}

/// Classify fresh items and insert one event row per item. Relevance,
/// category, and indicators come from the classifier; unknown slugs are
/// dropped here and never stored.
pub async fn classify_batch<S: Store, C: Classifier + ?Sized>(
    store: &S,
    classifier: &C,
    fresh: Vec<(EventId, RawEvent)>,
    run_date: DateTime<Utc>,
) -> Result<ClassificationOutcome> {
    let mut outcome = ClassificationOutcome {
        relevant: Vec::new(),
        irrelevant: 0,
        parked: 0,
        duplicates: 0,
    };

    // Collaborator calls fan out; inserts happen afterwards in batch order.
    let classified: Vec<(EventId, RawEvent, Result<ClassifierResponse>)> =
        stream::iter(fresh.into_iter().map(|(id, item)| async move {
            let response = with_retry("classify", &item.title, || classifier.classify(&item)).await;
            (id, item, response)
        }))
        .buffered(CLASSIFY_CONCURRENCY)
        .collect()
        .await;

    for (id, item, response) in classified {
        let record = match response {
            Ok(response) => event_from_classification(&id, &item, response, run_date),
            Err(e) => {
                warn!(event_id = %id, error = %e, "Classification failed twice, parking event");
                outcome.parked += 1;
                parked_event(&id, &item, run_date)
            }
        };

        let relevant = record.is_market_relevant && record.review_state == ReviewState::Ok;
        match store.insert_event(record.clone()).await? {
            InsertOutcome::Inserted => {
                if relevant {
                    outcome.relevant.push(record);
                } else if record.review_state == ReviewState::Ok {
                    outcome.irrelevant += 1;
                }
            }
            InsertOutcome::Duplicate(_) => {
                debug!(event_id = %id, "Lost insert race, treating as duplicate");
                outcome.duplicates += 1;
            }
        }
    }

    info!(
        relevant = outcome.relevant.len(),
        irrelevant = outcome.irrelevant,
        parked = outcome.parked,
        "Classification complete"
    );
    Ok(outcome)
}

fn event_from_classification(
    id: &EventId,
    item: &RawEvent,
    response: ClassifierResponse,
    run_date: DateTime<Utc>,
) -> EventRecord {
    let category = if response.is_market_relevant {
        let parsed = EventCategory::from_str_loose(&response.category);
        if parsed.is_none() {
            warn!(
                event_id = %id,
                category = response.category,
                "Unknown category from classifier, storing uncategorized"
            );
        }
        parsed
    } else {
        None
    };

    let mut linked_indicators = std::collections::BTreeSet::new();
    for slug in &response.linked_indicators {
        match IndicatorId::from_str_loose(slug) {
            Some(indicator) => {
                linked_indicators.insert(indicator);
            }
            None => warn!(event_id = %id, slug, "Unknown indicator slug, dropping"),
        }
    }

    EventRecord {
        id: id.clone(),
        title: item.title.clone(),
        summary: truncate_chars(&item.content, SUMMARY_MAX_CHARS),
        source: item.source.clone(),
        region: item.region.clone(),
        category,
        linked_indicators,
        is_market_relevant: response.is_market_relevant,
        review_state: ReviewState::Ok,
        base_score: None,
        current_score: 0.0,
        decay_factor: 1.0,
        boost_factor: 1.0,
        display_section: DisplaySection::Archive,
        hot_topic: None,
        published_at: item.published_at,
        run_date,
        is_follow_up: false,
        follows_up_on: None,
    }
}

fn parked_event(id: &EventId, item: &RawEvent, run_date: DateTime<Utc>) -> EventRecord {
    EventRecord {
        id: id.clone(),
        title: item.title.clone(),
        summary: truncate_chars(&item.content, SUMMARY_MAX_CHARS),
        source: item.source.clone(),
        region: item.region.clone(),
        category: None,
        linked_indicators: Default::default(),
        is_market_relevant: false,
        review_state: ReviewState::NeedsManualReview,
        base_score: None,
        current_score: 0.0,
        decay_factor: 1.0,
        boost_factor: 1.0,
        display_section: DisplaySection::Archive,
        hot_topic: None,
        published_at: item.published_at,
        run_date,
        is_follow_up: false,
        follows_up_on: None,
    }
}

#[derive(Default)]
pub struct ScoringOutcome {
    pub scored: u32,
    pub parked: u32,
    pub predictions: u32,
    /// Lifecycle mutations requested by the scorer, applied after the stage.
    pub actions: Vec<InvestigationAction>,
}

/// Score relevant events against the context snapshot. Runs sequentially so
/// the resulting lifecycle actions have a stable order.
pub async fn score_events<S: Store, Sc: Scorer + ?Sized>(
    store: &S,
    scorer: &Sc,
    events: &[EventRecord],
    context: &ContextSnapshot,
    now: DateTime<Utc>,
) -> Result<ScoringOutcome> {
    let mut outcome = ScoringOutcome::default();

    for event in events {
        let response =
            with_retry("score", &event.id.0, || scorer.score(event, context)).await;
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Scoring failed twice, parking event");
                store
                    .set_event_review_state(&event.id, ReviewState::NeedsManualReview)
                    .await?;
                outcome.parked += 1;
                continue;
            }
        };
        apply_score(store, event, response, now, &mut outcome).await?;
    }

    info!(
        scored = outcome.scored,
        parked = outcome.parked,
        actions = outcome.actions.len(),
        "Scoring complete"
    );
    Ok(outcome)
}

async fn apply_score<S: Store>(
    store: &S,
    event: &EventRecord,
    response: ScorerResponse,
    now: DateTime<Utc>,
    outcome: &mut ScoringOutcome,
) -> Result<()> {
    let subject = event.id.0.as_str();
    let base_score = clamp_base_score(subject, response.base_score);

    let mut factors = ScoreFactors {
        direct_impact: saturate_u8(response.score_factors.direct_impact),
        policy: saturate_u8(response.score_factors.policy),
        breadth: saturate_u8(response.score_factors.breadth),
        novelty: saturate_u8(response.score_factors.novelty),
        authority: saturate_u8(response.score_factors.authority),
    };
    if factors.clamp_to_budgets() {
        warn!(event_id = %event.id, "Score factors exceeded budgets, clamped");
    }
    if factors.total() != base_score as u32 {
        debug!(
            event_id = %event.id,
            factor_total = factors.total(),
            base_score,
            "Factor total disagrees with base score"
        );
    }

    let chain_steps: Vec<ChainStep> = response
        .chain_steps
        .into_iter()
        .map(|step| ChainStep {
            step: step.step,
            description: step.description,
            status: ChainStepStatus::from_str_loose(&step.status),
        })
        .collect();

    store
        .insert_analysis(CausalAnalysis {
            event_id: event.id.clone(),
            template_id: response.template_id,
            chain_steps,
            confidence: clamp_confidence(subject, response.confidence),
            needs_investigation: response.needs_investigation,
            created_at: now,
        })
        .await?;
    store.set_event_base_score(&event.id, base_score).await?;
    outcome.scored += 1;

    if let Some(open) = response.opens_investigation {
        outcome.actions.push(InvestigationAction::Create {
            question: open.question,
            priority: Priority::from_str_loose(&open.priority),
            source_event_id: event.id.clone(),
        });
    }

    let mut followed_up: Option<Uuid> = None;
    if let Some(resolve) = response.resolves_investigation {
        match resolve.investigation_id.parse::<Uuid>() {
            Ok(investigation_id) => {
                followed_up.get_or_insert(investigation_id);
                outcome.actions.push(InvestigationAction::Resolve {
                    investigation_id,
                    resolution: resolve.resolution,
                    resolved_by: event.id.clone(),
                });
            }
            Err(_) => warn!(
                event_id = %event.id,
                raw = resolve.investigation_id,
                "Unparseable investigation id in resolve, dropping"
            ),
        }
    }
    for link in response.evidence_links {
        match link.investigation_id.parse::<Uuid>() {
            Ok(investigation_id) => {
                followed_up.get_or_insert(investigation_id);
                outcome.actions.push(InvestigationAction::AddEvidence {
                    investigation_id,
                    event_id: event.id.clone(),
                    evidence_type: EvidenceType::from_str_loose(&link.evidence_type),
                    summary: link.summary,
                });
            }
            Err(_) => warn!(
                event_id = %event.id,
                raw = link.investigation_id,
                "Unparseable investigation id in evidence link, dropping"
            ),
        }
    }
    if let Some(investigation_id) = followed_up {
        store
            .set_event_follow_up(&event.id, FollowUpRef::Investigation { investigation_id })
            .await?;
    }

    for prediction in response.predictions {
        store
            .insert_prediction(Prediction {
                id: Uuid::new_v4(),
                event_id: event.id.clone(),
                statement: prediction.statement,
                horizon_days: prediction.horizon_days.max(1),
                created_at: now,
                status: marketpulse_common::PredictionStatus::Pending,
            })
            .await?;
        outcome.predictions += 1;
    }

    Ok(())
}

/// Translate reviewer findings into evidence actions. Malformed ids are
/// dropped with a warning, matching the scorer boundary.
pub fn review_actions(response: ReviewerResponse) -> Vec<InvestigationAction> {
    let mut actions = Vec::new();
    for finding in response.findings {
        let Ok(investigation_id) = finding.investigation_id.parse::<Uuid>() else {
            warn!(
                raw = finding.investigation_id,
                "Unparseable investigation id in review finding, dropping"
            );
            continue;
        };
        if let Some(suggested) = &finding.new_status {
            // Advisory only. Status is derived from the evidence.
            debug!(%investigation_id, suggested, "Reviewer suggested a status");
        }
        for evidence in finding.evidence_today {
            actions.push(InvestigationAction::AddEvidence {
                investigation_id,
                event_id: EventId(evidence.event_id),
                evidence_type: EvidenceType::from_str_loose(&evidence.evidence_type),
                summary: evidence.summary,
            });
        }
    }
    actions
}

fn saturate_u8(raw: i32) -> u8 {
    raw.clamp(0, u8::MAX as i32) as u8
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
