use anyhow::Result;
use async_trait::async_trait;

use marketpulse_store::{EventRecord, Investigation};

use crate::client::Claude;
use crate::traits::{InvestigationReviewer, ReviewerResponse};

const REVIEW_SYSTEM_PROMPT: &str = r#"You are an investigation reviewer for a market-news analysis system.

You receive the open factual questions ("investigations") the system is tracking, and the market-relevant events from today's run. For each investigation, report which of today's events bear on it:

- supports: the event corroborates the direction the question implies
- contradicts: the event cuts against it
- neutral: the event is relevant context without leaning either way

Only report genuine evidence. Most investigations get no evidence on most days; an empty findings list is a normal answer. Never invent event ids — use exactly the ids given."#;

pub struct ClaudeReviewer {
    claude: Claude,
}

impl ClaudeReviewer {
    pub fn new(claude: Claude) -> Self {
        Self { claude }
    }

    pub fn from_api_key(api_key: &str, model: &str) -> Self {
        Self::new(Claude::new(api_key, model))
    }
}

#[async_trait]
impl InvestigationReviewer for ClaudeReviewer {
    async fn review(
        &self,
        open_investigations: &[Investigation],
        todays_events: &[EventRecord],
    ) -> Result<ReviewerResponse> {
        if open_investigations.is_empty() || todays_events.is_empty() {
            return Ok(ReviewerResponse { findings: vec![] });
        }

        let investigations: Vec<String> = open_investigations
            .iter()
            .map(|i| format!("- {} [{}] {}", i.id, i.priority, i.question))
            .collect();
        let events: Vec<String> = todays_events
            .iter()
            .map(|e| format!("- {} ({}) {}: {}", e.id, e.source, e.title, e.summary))
            .collect();

        let user_prompt = format!(
            "## Open investigations\n{}\n\n## Today's events\n{}",
            investigations.join("\n"),
            events.join("\n"),
        );

        self.claude
            .extract::<ReviewerResponse>(REVIEW_SYSTEM_PROMPT, &user_prompt)
            .await
    }
}
