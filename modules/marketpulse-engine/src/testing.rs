//! Fixtures and deterministic collaborator doubles for tests.
//!
//! Available to integration tests through the `test-support` feature. The
//! mocks are scripted per title/event so failure injection and structured
//! responses stay deterministic without a network.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use marketpulse_analyst::{
    Classifier, ClassifierResponse, InvestigationReviewer, ReviewerResponse, Scorer,
    ScorerResponse,
};
use marketpulse_common::{CrawlItem, RawEvent};
use marketpulse_store::{ContextSnapshot, EventRecord, Investigation};

use crate::crawl::Crawler;

pub mod fixtures {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use marketpulse_common::{
        DisplaySection, EventCategory, EventId, IndicatorId, RawEvent, ReviewState,
    };
    use marketpulse_store::EventRecord;

    pub fn raw_event(title: &str) -> RawEvent {
        RawEvent {
            title: title.to_string(),
            content: format!("Full wire copy for: {title}"),
            source: "TestWire".to_string(),
            region: Some("US".to_string()),
            published_at: Utc::now(),
        }
    }

    /// An already-classified, scored, clean event ready for ranking.
    /// Ranking fields start at their pre-ranking defaults.
    pub fn classified_event(
        id: &str,
        base_score: u8,
        indicators: &[IndicatorId],
    ) -> EventRecord {
        let now = Utc::now();
        EventRecord {
            id: EventId::from(id),
            title: format!("event {id}"),
            summary: format!("summary for {id}"),
            source: "TestWire".to_string(),
            region: Some("US".to_string()),
            category: Some(EventCategory::Markets),
            linked_indicators: indicators.iter().copied().collect::<BTreeSet<_>>(),
            is_market_relevant: true,
            review_state: ReviewState::Ok,
            base_score: Some(base_score),
            current_score: 0.0,
            decay_factor: 1.0,
            boost_factor: 1.0,
            display_section: DisplaySection::Archive,
            hot_topic: None,
            published_at: now,
            run_date: now,
            is_follow_up: false,
            follows_up_on: None,
        }
    }

    pub fn classifier_response(
        category: &str,
        indicators: &[&str],
    ) -> marketpulse_analyst::ClassifierResponse {
        marketpulse_analyst::ClassifierResponse {
            is_market_relevant: true,
            category: category.to_string(),
            linked_indicators: indicators.iter().map(|s| s.to_string()).collect(),
            reasoning: "fixture".to_string(),
        }
    }

    pub fn irrelevant_response() -> marketpulse_analyst::ClassifierResponse {
        marketpulse_analyst::ClassifierResponse {
            is_market_relevant: false,
            category: "markets".to_string(),
            linked_indicators: Vec::new(),
            reasoning: "fixture: not market news".to_string(),
        }
    }

    pub fn scorer_response(base_score: i32) -> marketpulse_analyst::ScorerResponse {
        marketpulse_analyst::ScorerResponse {
            base_score,
            score_factors: marketpulse_analyst::WireScoreFactors {
                direct_impact: 25,
                policy: 20,
                breadth: 15,
                novelty: 10,
                authority: 10,
            },
            template_id: "generic_market_move".to_string(),
            chain_steps: vec![marketpulse_analyst::WireChainStep {
                step: 1,
                description: "event moves the indicator".to_string(),
                status: "likely".to_string(),
            }],
            confidence: 0.8,
            needs_investigation: Vec::new(),
            resolves_investigation: None,
            opens_investigation: None,
            evidence_links: Vec::new(),
            predictions: Vec::new(),
        }
    }
}

/// Scripted classifier. Responses are keyed by event title; unscripted
/// titles get a plain relevant `markets` classification. Failures are
/// consumed in order, so "fail once then succeed" scripts retry paths.
#[derive(Default)]
pub struct MockClassifier {
    by_title: HashMap<String, ClassifierResponse>,
    failures: Mutex<HashMap<String, u32>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, title: &str, response: ClassifierResponse) -> Self {
        self.by_title.insert(title.to_string(), response);
        self
    }

    pub fn failing(self, title: &str, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(title.to_string(), times);
        self
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, event: &RawEvent) -> Result<ClassifierResponse> {
        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&event.title) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(anyhow!("mock classifier failure for {}", event.title));
            }
        }
        Ok(self
            .by_title
            .get(&event.title)
            .cloned()
            .unwrap_or_else(|| fixtures::classifier_response("markets", &["sp500"])))
    }
}

/// Scripted scorer, keyed by event id. Unscripted events score 50.
#[derive(Default)]
pub struct MockScorer {
    by_event: HashMap<String, ScorerResponse>,
    failures: Mutex<HashMap<String, u32>>,
}

impl MockScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, event_id: &str, response: ScorerResponse) -> Self {
        self.by_event.insert(event_id.to_string(), response);
        self
    }

    pub fn failing(self, event_id: &str, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(event_id.to_string(), times);
        self
    }
}

#[async_trait]
impl Scorer for MockScorer {
    async fn score(
        &self,
        event: &EventRecord,
        _context: &ContextSnapshot,
    ) -> Result<ScorerResponse> {
        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&event.id.0) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(anyhow!("mock scorer failure for {}", event.id));
            }
        }
        Ok(self
            .by_event
            .get(&event.id.0)
            .cloned()
            .unwrap_or_else(|| fixtures::scorer_response(50)))
    }
}

/// Reviewer double returning a fixed response (empty by default).
#[derive(Default)]
pub struct MockReviewer {
    response: ReviewerResponse,
}

impl MockReviewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, response: ReviewerResponse) -> Self {
        self.response = response;
        self
    }
}

#[async_trait]
impl InvestigationReviewer for MockReviewer {
    async fn review(
        &self,
        _open_investigations: &[Investigation],
        _todays_events: &[EventRecord],
    ) -> Result<ReviewerResponse> {
        Ok(self.response.clone())
    }
}

/// Crawler double serving a fixed batch.
pub struct StaticCrawler {
    items: Vec<CrawlItem>,
}

impl StaticCrawler {
    pub fn new(items: Vec<CrawlItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl Crawler for StaticCrawler {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<Vec<CrawlItem>> {
        Ok(self.items.clone())
    }
}
