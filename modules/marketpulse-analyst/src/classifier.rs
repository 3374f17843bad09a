use anyhow::Result;
use async_trait::async_trait;

use marketpulse_common::RawEvent;

use crate::client::Claude;
use crate::traits::{Classifier, ClassifierResponse};

const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are a market-news relevance classifier.

Your job: decide whether a news item matters to financial markets, assign it a category, and link it to the economic indicators it bears on.

## Categories (pick exactly one)
monetary_policy, fiscal_policy, inflation, employment, energy, geopolitics, corporate, markets, trade, housing

## Indicators (link zero or more)
cpi, core_cpi, unemployment, nonfarm_payrolls, fed_funds_rate, gdp, pmi, retail_sales, treasury_10y, wti_crude, sp500, vix

## Relevance rules
- Relevant: central bank decisions and speeches, macro data releases, major fiscal/trade/energy policy, geopolitical shocks with market transmission, systemically important corporate news.
- Not relevant: sports, entertainment, local crime, celebrity news, product reviews.
- When in doubt about transmission to prices, rates, or risk sentiment, lean not relevant.

Only link indicators the item plausibly moves or measures. Do not link indicators just because they are mentioned."#;

pub struct ClaudeClassifier {
    claude: Claude,
}

impl ClaudeClassifier {
    pub fn new(claude: Claude) -> Self {
        Self { claude }
    }

    pub fn from_api_key(api_key: &str, model: &str) -> Self {
        Self::new(Claude::new(api_key, model))
    }
}

#[async_trait]
impl Classifier for ClaudeClassifier {
    async fn classify(&self, event: &RawEvent) -> Result<ClassifierResponse> {
        // Truncate content to avoid token limits
        let content = truncate_chars(&event.content, 8_000);

        let user_prompt = format!(
            "Classify this news item.\n\nTitle: {}\nSource: {}\nPublished: {}\n\n---\n\n{}",
            event.title, event.source, event.published_at, content
        );

        self.claude
            .extract::<ClassifierResponse>(CLASSIFY_SYSTEM_PROMPT, &user_prompt)
            .await
    }
}

/// Truncate at a char boundary without panicking mid-UTF-8.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
