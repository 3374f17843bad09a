//! Collaborator contracts.
//!
//! Response shapes are deliberately loose (strings for enums, unclamped
//! numbers): they mirror what the model actually returns. The engine
//! validates at its boundary and treats violations as contract errors to
//! clamp or drop, never to crash on.

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use marketpulse_common::RawEvent;
use marketpulse_store::{ContextSnapshot, EventRecord, Investigation};

// --- Classifier ---

/// What the classifier returns for one raw event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassifierResponse {
    /// Whether the event is relevant to markets at all.
    pub is_market_relevant: bool,
    /// Category slug, e.g. "monetary_policy". Validated against the fixed set.
    pub category: String,
    /// Indicator slugs this event bears on. Unknown slugs are dropped.
    #[serde(default)]
    pub linked_indicators: Vec<String>,
    /// One-sentence justification.
    pub reasoning: String,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, event: &RawEvent) -> Result<ClassifierResponse>;
}

// --- Scorer ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireScoreFactors {
    pub direct_impact: i32,
    pub policy: i32,
    pub breadth: i32,
    pub novelty: i32,
    pub authority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireChainStep {
    pub step: u32,
    pub description: String,
    /// "verified", "likely", or "uncertain".
    pub status: String,
}

/// Request to resolve an existing investigation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireResolveAction {
    /// Id of the investigation this event answers.
    pub investigation_id: String,
    /// The factual resolution.
    pub resolution: String,
}

/// Request to open a new investigation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireOpenAction {
    pub question: String,
    /// "high", "medium", or "low".
    pub priority: String,
}

/// Evidence the scorer noticed for an already-open investigation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireEvidenceLink {
    pub investigation_id: String,
    /// "supports", "contradicts", or "neutral".
    pub evidence_type: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WirePrediction {
    pub statement: String,
    pub horizon_days: i64,
}

/// Full scoring result for one relevant event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScorerResponse {
    /// Base impact score, expected in [1,100]. Out-of-range values are
    /// clamped by the engine.
    pub base_score: i32,
    pub score_factors: WireScoreFactors,
    /// Causal-chain template this event matched.
    pub template_id: String,
    pub chain_steps: Vec<WireChainStep>,
    /// Confidence in the causal match, 0.0-1.0.
    pub confidence: f64,
    /// Open factual questions this analysis could not settle.
    #[serde(default)]
    pub needs_investigation: Vec<String>,
    /// May both resolve one investigation and open another; the two are
    /// independent questions.
    #[serde(default)]
    pub resolves_investigation: Option<WireResolveAction>,
    #[serde(default)]
    pub opens_investigation: Option<WireOpenAction>,
    #[serde(default)]
    pub evidence_links: Vec<WireEvidenceLink>,
    #[serde(default)]
    pub predictions: Vec<WirePrediction>,
}

#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, event: &EventRecord, context: &ContextSnapshot)
        -> Result<ScorerResponse>;
}

// --- Investigation reviewer ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireReviewEvidence {
    /// Id of the event carrying the evidence.
    pub event_id: String,
    /// "supports", "contradicts", or "neutral".
    pub evidence_type: String,
    pub summary: String,
}

/// One reviewed investigation: the evidence today's events contribute to it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReviewFinding {
    pub investigation_id: String,
    /// The reviewer's opinion of where the investigation stands. Advisory:
    /// actual status transitions are derived from the evidence itself.
    #[serde(default)]
    pub new_status: Option<String>,
    #[serde(default)]
    pub evidence_today: Vec<WireReviewEvidence>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReviewerResponse {
    #[serde(default)]
    pub findings: Vec<ReviewFinding>,
}

#[async_trait]
pub trait InvestigationReviewer: Send + Sync {
    /// Cross-examine open investigations against this run's relevant events.
    async fn review(
        &self,
        open_investigations: &[Investigation],
        todays_events: &[EventRecord],
    ) -> Result<ReviewerResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewer_response_defaults_to_no_findings() {
        assert!(ReviewerResponse::default().findings.is_empty());

        let parsed: ReviewerResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.findings.is_empty());
    }
}
