//! Investigation lifecycle state machine.
//!
//! States: open → updated → resolved, with escape hatches to stale and
//! escalated. Status is a pure function of the evidence history plus the
//! 14-day clock: re-running the lifecycle pass over the same data yields the
//! same statuses, and the clock-dependent stale transition is monotonic —
//! it never reverses without new evidence.
//!
//! The scorer and reviewer only *request* actions; this module is the sole
//! writer of investigation state.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use marketpulse_common::{EventId, EvidenceType, InvestigationStatus, Priority};
use marketpulse_store::{Investigation, InvestigationEvidence, Store};

/// Days without new evidence before an open/updated investigation goes stale.
pub const STALE_AFTER_DAYS: i64 = 14;

/// A requested mutation, produced by scoring or review, applied here.
#[derive(Debug, Clone)]
pub enum InvestigationAction {
    Create {
        question: String,
        priority: Priority,
        source_event_id: EventId,
    },
    Resolve {
        investigation_id: Uuid,
        resolution: String,
        resolved_by: EventId,
    },
    AddEvidence {
        investigation_id: Uuid,
        event_id: EventId,
        evidence_type: EvidenceType,
        summary: String,
    },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LifecycleOutcome {
    pub opened: u32,
    pub updated: u32,
    pub resolved: u32,
    pub escalated: u32,
    pub evidence_appended: u32,
    /// Resolve attempts against already-resolved investigations (no-ops).
    pub resolve_conflicts: u32,
}

/// Pure staleness rule: open/updated investigations with no evidence for more
/// than [`STALE_AFTER_DAYS`] go stale. Escalated investigations are exempt —
/// they are waiting on human review, not on evidence.
pub fn is_stale(
    status: InvestigationStatus,
    last_evidence_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    if !matches!(
        status,
        InvestigationStatus::Open | InvestigationStatus::Updated
    ) {
        return false;
    }
    let reference = last_evidence_at.unwrap_or(created_at);
    (now - reference).num_days() > STALE_AFTER_DAYS
}

pub struct InvestigationLifecycle<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> InvestigationLifecycle<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Apply one run's worth of requested actions: creates, then evidence
    /// appends (with same-run conflict escalation), then resolves. Resolve
    /// wins when the same run both touches and resolves an investigation.
    pub async fn apply(
        &self,
        actions: Vec<InvestigationAction>,
        now: DateTime<Utc>,
    ) -> Result<LifecycleOutcome> {
        let mut outcome = LifecycleOutcome::default();

        let mut creates = Vec::new();
        let mut evidence = Vec::new();
        let mut resolves = Vec::new();
        for action in actions {
            match action {
                InvestigationAction::Create { .. } => creates.push(action),
                InvestigationAction::AddEvidence { .. } => evidence.push(action),
                InvestigationAction::Resolve { .. } => resolves.push(action),
            }
        }

        for action in creates {
            let InvestigationAction::Create {
                question,
                priority,
                source_event_id,
            } = action
            else {
                unreachable!()
            };
            let investigation =
                Investigation::new(question.clone(), priority, Some(source_event_id), now);
            info!(id = %investigation.id, priority = %priority, question = %question, "Investigation opened");
            self.store.insert_investigation(investigation).await?;
            outcome.opened += 1;
        }

        // Evidence phase. Track which evidence directions each investigation
        // saw this run; supports+contradicts in the same run escalates.
        let mut touched: HashMap<Uuid, (bool, bool)> = HashMap::new();
        for action in evidence {
            let InvestigationAction::AddEvidence {
                investigation_id,
                event_id,
                evidence_type,
                summary,
            } = action
            else {
                unreachable!()
            };

            let Some(investigation) = self.store.get_investigation(investigation_id).await? else {
                warn!(%investigation_id, "Evidence for unknown investigation, dropping");
                continue;
            };
            match investigation.status {
                InvestigationStatus::Resolved | InvestigationStatus::Stale => {
                    warn!(
                        %investigation_id,
                        status = %investigation.status,
                        "Evidence for closed investigation, dropping"
                    );
                    continue;
                }
                _ => {}
            }

            self.store
                .append_evidence(InvestigationEvidence {
                    id: Uuid::new_v4(),
                    investigation_id,
                    event_id,
                    evidence_type,
                    summary,
                    added_at: now,
                })
                .await?;
            outcome.evidence_appended += 1;

            let flags = touched.entry(investigation_id).or_default();
            match evidence_type {
                EvidenceType::Supports => flags.0 = true,
                EvidenceType::Contradicts => flags.1 = true,
                EvidenceType::Neutral => {}
            }
        }

        for (investigation_id, (supports, contradicts)) in touched {
            let Some(mut investigation) = self.store.get_investigation(investigation_id).await?
            else {
                continue;
            };
            let new_status = if supports && contradicts {
                InvestigationStatus::Escalated
            } else {
                match investigation.status {
                    InvestigationStatus::Open => InvestigationStatus::Updated,
                    current => current,
                }
            };
            if new_status != investigation.status {
                if new_status == InvestigationStatus::Escalated {
                    warn!(
                        %investigation_id,
                        "Conflicting evidence in one run, escalating for review"
                    );
                    outcome.escalated += 1;
                } else {
                    outcome.updated += 1;
                }
                investigation.status = new_status;
                investigation.updated_at = now;
                self.store.update_investigation(investigation).await?;
            } else if new_status == InvestigationStatus::Updated {
                outcome.updated += 1;
            }
        }

        for action in resolves {
            let InvestigationAction::Resolve {
                investigation_id,
                resolution,
                resolved_by,
            } = action
            else {
                unreachable!()
            };

            let Some(mut investigation) = self.store.get_investigation(investigation_id).await?
            else {
                warn!(%investigation_id, "Resolve for unknown investigation, dropping");
                continue;
            };
            if investigation.status == InvestigationStatus::Resolved {
                warn!(
                    %investigation_id,
                    attempted_by = %resolved_by,
                    "Resolve conflict: investigation already resolved"
                );
                outcome.resolve_conflicts += 1;
                continue;
            }

            info!(%investigation_id, by = %resolved_by, "Investigation resolved");
            investigation.status = InvestigationStatus::Resolved;
            investigation.resolution = Some(resolution);
            investigation.resolved_by_event_id = Some(resolved_by);
            investigation.resolved_at = Some(now);
            investigation.updated_at = now;
            self.store.update_investigation(investigation).await?;
            outcome.resolved += 1;
        }

        Ok(outcome)
    }

    /// Background housekeeping, run during the ranking pass: close out
    /// investigations that have gone quiet. Returns how many went stale.
    pub async fn apply_staleness(&self, now: DateTime<Utc>) -> Result<u32> {
        let mut count = 0;
        for mut investigation in self.store.open_investigations().await? {
            if is_stale(
                investigation.status,
                investigation.last_evidence_at,
                investigation.created_at,
                now,
            ) {
                info!(id = %investigation.id, "Investigation stale, closing");
                investigation.status = InvestigationStatus::Stale;
                investigation.updated_at = now;
                self.store.update_investigation(investigation).await?;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use marketpulse_store::MemoryStore;

    fn create(question: &str) -> InvestigationAction {
        InvestigationAction::Create {
            question: question.to_string(),
            priority: Priority::High,
            source_event_id: EventId::from("src-event"),
        }
    }

    fn add_evidence(id: Uuid, evidence_type: EvidenceType) -> InvestigationAction {
        InvestigationAction::AddEvidence {
            investigation_id: id,
            event_id: EventId::from("ev"),
            evidence_type,
            summary: "evidence".to_string(),
        }
    }

    async fn only_investigation(store: &MemoryStore) -> Investigation {
        let all = store.open_investigations().await.unwrap();
        assert_eq!(all.len(), 1);
        all.into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn create_starts_open_with_no_evidence() {
        let store = MemoryStore::new();
        let lifecycle = InvestigationLifecycle::new(&store);
        let now = Utc::now() - Duration::hours(2);
        let outcome = lifecycle.apply(vec![create("q?")], now).await.unwrap();
        assert_eq!(outcome.opened, 1);

        let investigation = only_investigation(&store).await;
        assert_eq!(investigation.status, InvestigationStatus::Open);
        assert_eq!(investigation.evidence_count, 0);
        assert!(investigation.resolved_at.is_none());
        // Timestamps come from the run clock, not the wall clock.
        assert_eq!(investigation.created_at, now);
        assert_eq!(investigation.updated_at, now);
    }

    #[tokio::test]
    async fn evidence_moves_open_to_updated() {
        let store = MemoryStore::new();
        let lifecycle = InvestigationLifecycle::new(&store);
        lifecycle.apply(vec![create("q?")], Utc::now()).await.unwrap();
        let id = only_investigation(&store).await.id;

        let outcome = lifecycle
            .apply(vec![add_evidence(id, EvidenceType::Supports)], Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.evidence_appended, 1);

        let investigation = store.get_investigation(id).await.unwrap().unwrap();
        assert_eq!(investigation.status, InvestigationStatus::Updated);
        assert_eq!(investigation.evidence_count, 1);
        assert!(investigation.last_evidence_at.is_some());
    }

    #[tokio::test]
    async fn conflicting_evidence_in_one_run_escalates() {
        let store = MemoryStore::new();
        let lifecycle = InvestigationLifecycle::new(&store);
        lifecycle.apply(vec![create("q?")], Utc::now()).await.unwrap();
        let id = only_investigation(&store).await.id;

        let outcome = lifecycle
            .apply(
                vec![
                    add_evidence(id, EvidenceType::Supports),
                    add_evidence(id, EvidenceType::Contradicts),
                ],
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.escalated, 1);
        assert_eq!(outcome.updated, 0);

        let investigation = store.get_investigation(id).await.unwrap().unwrap();
        assert_eq!(investigation.status, InvestigationStatus::Escalated);
        assert_eq!(investigation.evidence_count, 2);
    }

    #[tokio::test]
    async fn conflicting_evidence_across_runs_does_not_escalate() {
        let store = MemoryStore::new();
        let lifecycle = InvestigationLifecycle::new(&store);
        lifecycle.apply(vec![create("q?")], Utc::now()).await.unwrap();
        let id = only_investigation(&store).await.id;

        lifecycle
            .apply(vec![add_evidence(id, EvidenceType::Supports)], Utc::now())
            .await
            .unwrap();
        lifecycle
            .apply(vec![add_evidence(id, EvidenceType::Contradicts)], Utc::now())
            .await
            .unwrap();

        let investigation = store.get_investigation(id).await.unwrap().unwrap();
        assert_eq!(investigation.status, InvestigationStatus::Updated);
    }

    #[tokio::test]
    async fn resolve_sets_terminal_fields() {
        let store = MemoryStore::new();
        let lifecycle = InvestigationLifecycle::new(&store);
        lifecycle.apply(vec![create("q?")], Utc::now()).await.unwrap();
        let id = only_investigation(&store).await.id;

        let outcome = lifecycle
            .apply(
                vec![InvestigationAction::Resolve {
                    investigation_id: id,
                    resolution: "Yes, confirmed by the release.".to_string(),
                    resolved_by: EventId::from("resolver"),
                }],
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.resolved, 1);

        let investigation = store.get_investigation(id).await.unwrap().unwrap();
        assert_eq!(investigation.status, InvestigationStatus::Resolved);
        assert_eq!(
            investigation.resolved_by_event_id,
            Some(EventId::from("resolver"))
        );
        assert!(investigation.resolved_at.is_some());
    }

    #[tokio::test]
    async fn second_resolve_is_a_logged_no_op() {
        let store = MemoryStore::new();
        let lifecycle = InvestigationLifecycle::new(&store);
        lifecycle.apply(vec![create("q?")], Utc::now()).await.unwrap();
        let id = only_investigation(&store).await.id;

        let resolve = |by: &str| InvestigationAction::Resolve {
            investigation_id: id,
            resolution: "answer".to_string(),
            resolved_by: EventId::from(by),
        };
        lifecycle.apply(vec![resolve("first")], Utc::now()).await.unwrap();
        let outcome = lifecycle.apply(vec![resolve("second")], Utc::now()).await.unwrap();
        assert_eq!(outcome.resolved, 0);
        assert_eq!(outcome.resolve_conflicts, 1);

        let investigation = store.get_investigation(id).await.unwrap().unwrap();
        assert_eq!(
            investigation.resolved_by_event_id,
            Some(EventId::from("first"))
        );
    }

    #[tokio::test]
    async fn evidence_never_reopens_resolved() {
        let store = MemoryStore::new();
        let lifecycle = InvestigationLifecycle::new(&store);
        lifecycle.apply(vec![create("q?")], Utc::now()).await.unwrap();
        let id = only_investigation(&store).await.id;
        lifecycle
            .apply(
                vec![InvestigationAction::Resolve {
                    investigation_id: id,
                    resolution: "done".to_string(),
                    resolved_by: EventId::from("r"),
                }],
                Utc::now(),
            )
            .await
            .unwrap();

        let outcome = lifecycle
            .apply(vec![add_evidence(id, EvidenceType::Supports)], Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome.evidence_appended, 0);

        let investigation = store.get_investigation(id).await.unwrap().unwrap();
        assert_eq!(investigation.status, InvestigationStatus::Resolved);
        assert_eq!(investigation.evidence_count, 0);
    }

    #[tokio::test]
    async fn quiet_investigations_go_stale_after_fourteen_days() {
        let store = MemoryStore::new();
        let lifecycle = InvestigationLifecycle::new(&store);
        let created = Utc::now() - Duration::days(20);
        let investigation = Investigation::new("old?".to_string(), Priority::Low, None, created);
        let id = investigation.id;
        store.insert_investigation(investigation).await.unwrap();

        let count = lifecycle.apply_staleness(Utc::now()).await.unwrap();
        assert_eq!(count, 1);
        let investigation = store.get_investigation(id).await.unwrap().unwrap();
        assert_eq!(investigation.status, InvestigationStatus::Stale);
    }

    #[tokio::test]
    async fn recent_evidence_prevents_staleness() {
        let now = Utc::now();
        assert!(!is_stale(
            InvestigationStatus::Updated,
            Some(now - Duration::days(10)),
            now - Duration::days(60),
            now,
        ));
        assert!(is_stale(
            InvestigationStatus::Updated,
            Some(now - Duration::days(15)),
            now - Duration::days(60),
            now,
        ));
    }

    #[tokio::test]
    async fn escalated_is_exempt_from_staleness() {
        let now = Utc::now();
        assert!(!is_stale(
            InvestigationStatus::Escalated,
            Some(now - Duration::days(90)),
            now - Duration::days(90),
            now,
        ));
    }
}
