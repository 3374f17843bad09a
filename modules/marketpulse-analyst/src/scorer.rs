use anyhow::Result;
use async_trait::async_trait;

use marketpulse_store::{ContextSnapshot, EventRecord};

use crate::client::Claude;
use crate::traits::{Scorer, ScorerResponse};

const SCORING_SYSTEM_PROMPT: &str = r#"You are a market-event impact scorer with causal-chain attribution.

Score the event's market impact and explain the causal chain from the event to market variables.

## Base score (1-100)
Sum of five factor components, each with a hard budget:
- direct_impact (0-30): immediate, mechanical effect on prices or rates
- policy (0-25): likelihood of a policy response or policy signal content
- breadth (0-20): how many asset classes and sectors are touched
- novelty (0-15): how surprising versus already priced in
- authority (0-10): credibility and officialness of the source

## Causal chain
Give the template id of the causal pattern matched (e.g. "rate-hike-to-duration", "supply-shock-to-headline-cpi") and 2-5 ordered chain steps. Mark each step verified (directly stated or data-confirmed), likely (standard transmission), or uncertain (speculative).

## Investigations
You receive the currently open investigations in the context.
- If this event factually answers one, resolve it: give its id and the resolution.
- If this analysis surfaces a concrete open question that future events could settle, open one (question + priority).
- If this event bears on an open investigation without settling it, add an evidence link (supports/contradicts/neutral).
An event may resolve one investigation and open a different one; those are independent.

## Predictions
If the causal chain implies a checkable near-term outcome, state it as a prediction with a horizon in days. Only concrete, falsifiable statements."#;

pub struct ClaudeScorer {
    claude: Claude,
}

impl ClaudeScorer {
    pub fn new(claude: Claude) -> Self {
        Self { claude }
    }

    pub fn from_api_key(api_key: &str, model: &str) -> Self {
        Self::new(Claude::new(api_key, model))
    }
}

#[async_trait]
impl Scorer for ClaudeScorer {
    async fn score(
        &self,
        event: &EventRecord,
        context: &ContextSnapshot,
    ) -> Result<ScorerResponse> {
        let context_json = serde_json::to_string_pretty(context)?;

        let user_prompt = format!(
            "Score this classified market event.\n\n\
             Title: {}\nSummary: {}\nSource: {}\nCategory: {}\nLinked indicators: {}\nPublished: {}\n\n\
             ## Current context\n{}\n",
            event.title,
            event.summary,
            event.source,
            event
                .category
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unclassified".to_string()),
            event
                .linked_indicators
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            event.published_at,
            context_json,
        );

        self.claude
            .extract::<ScorerResponse>(SCORING_SYSTEM_PROMPT, &user_prompt)
            .await
    }
}
