//! Agent client for communicating with the Anthropic API.

use anyhow::{Result, anyhow};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::env;

use super::types::{ContentBlock, LanguageModel, Message};

const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Stateless LLM client. The caller supplies the system context and the
/// full message history on every call; the client holds only connection
/// configuration.
#[derive(Clone)]
pub struct Agent {
    api_key: String,
    model: String,
    max_tokens: u32,
}

// Anthropic API request/response types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    #[serde(rename = "type")]
    response_type: String,
    role: String,
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl Agent {
    /// Create an agent configured from the environment.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create an agent with custom configuration
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    /// One request/response round trip against the Messages API.
    async fn send(&self, system: String, messages: Vec<Message>) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
            system: Some(system),
        };
        let api_key = self.api_key.clone();

        // smolhttp is synchronous, so run the round trip off the executor
        let response = smol::unblock(move || run_inference(&api_key, &request)).await?;

        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "assistant turn complete"
        );

        let text: String = response
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect();

        if text.is_empty() {
            return Err(anyhow!("No text in assistant response"));
        }

        Ok(text)
    }
}

impl LanguageModel for Agent {
    fn complete(&self, system: String, messages: Vec<Message>) -> BoxFuture<'static, Result<String>> {
        let agent = self.clone();
        Box::pin(async move { agent.send(system, messages).await })
    }
}

fn run_inference(api_key: &str, request: &AnthropicRequest) -> Result<AnthropicResponse> {
    let body =
        serde_json::to_string(request).map_err(|e| anyhow!("Failed to serialize request: {}", e))?;

    let response = smolhttp::Client::new("https://api.anthropic.com/v1/messages")
        .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?
        .post()
        .headers(vec![
            ("x-api-key".to_string(), api_key.to_string()),
            ("anthropic-version".to_string(), "2023-06-01".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
        ])
        .body(body.into())
        .send()
        .map_err(|e| anyhow!("API request failed: {}", e))?;

    let response_text = response.text();

    if response_text.contains("\"error\"") && response_text.contains("\"type\"") {
        return Err(anyhow!("API error: {}", response_text));
    }

    let api_response: AnthropicResponse = serde_json::from_str(&response_text).map_err(|e| {
        anyhow!(
            "Failed to parse response: {}. Response: {}",
            e,
            response_text
        )
    })?;

    Ok(api_response)
}

/// Builder for creating agents with custom configuration
pub struct AgentBuilder {
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            model: env::var("QUERYPILOT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: 1024,
        }
    }
}

impl AgentBuilder {
    pub fn api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let api_key = match self.api_key {
            Some(key) => key,
            None => env::var("ANTHROPIC_API_KEY")
                .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?,
        };

        Ok(Agent {
            api_key,
            model: self.model,
            max_tokens: self.max_tokens,
        })
    }
}
