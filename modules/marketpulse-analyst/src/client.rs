//! Minimal Claude messages-API client with tool-forced structured output.

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Cap each request at `timeout`; a hung call counts as a failure and
    /// goes through the caller's retry path.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Run a prompt with the response schema forced via a required tool call
    /// and deserialize the tool input into `T`.
    pub async fn extract<T: DeserializeOwned + JsonSchema>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<T> {
        let schema = schemars::gen::SchemaSettings::draft07()
            .into_generator()
            .into_root_schema_for::<T>();

        const TOOL_NAME: &str = "structured_response";
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            system: Some(system_prompt.to_string()),
            temperature: Some(0.0),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            }],
            tools: Some(vec![ToolDefinitionWire {
                name: TOOL_NAME.to_string(),
                description: "Report the analysis in the required shape.".to_string(),
                input_schema: serde_json::to_value(schema)?,
            }]),
            tool_choice: Some(serde_json::json!({ "type": "tool", "name": TOOL_NAME })),
        };

        let url = format!("{}/messages", self.base_url);
        debug!(model = %self.model, "Claude extract request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Claude API error ({status}): {error_text}"));
        }

        let response: ChatResponse = response.json().await?;
        for block in &response.content {
            if let ContentBlock::ToolUse { input, .. } = block {
                return serde_json::from_value(input.clone())
                    .map_err(|e| anyhow!("Failed to deserialize response: {e}"));
            }
        }

        Err(anyhow!("No structured output in Claude response"))
    }
}

// --- Wire types ---

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinitionWire>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ToolDefinitionWire {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    #[allow(dead_code)]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[allow(dead_code)]
        id: String,
        #[allow(dead_code)]
        name: String,
        input: serde_json::Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_carries_model_and_base_url() {
        let claude = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001")
            .with_base_url("http://localhost:9999");
        assert_eq!(claude.model(), "claude-haiku-4-5-20251001");
        assert_eq!(claude.base_url, "http://localhost:9999");
    }
}
