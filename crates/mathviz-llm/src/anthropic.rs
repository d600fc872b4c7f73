//! Anthropic Claude Messages API client.

use std::time::Instant;

use mathviz_core::EngineError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::llm_err;
use crate::{CompletionRequest, LlmMetrics, LlmResponse};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

/// Client for Anthropic's Claude API.
pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    /// Creates a new Anthropic client.
    pub fn new(model: &str, api_key: &str) -> Self {
        debug!("AnthropicClient: model={}, api_key_len={}", model, api_key.len());
        Self {
            client: Client::new(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Points the client at another host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a non-streaming request and returns the concatenated text blocks.
    pub async fn chat(&self, request: &CompletionRequest) -> Result<LlmResponse, EngineError> {
        let start = Instant::now();

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.user,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(llm_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Llm(format!(
                "Anthropic API error {}: {}",
                status, body
            )));
        }

        let resp: MessagesResponse = response.json().await.map_err(llm_err)?;
        let content = resp.content.into_iter().map(|c| c.text).collect::<String>();

        Ok(LlmResponse {
            content,
            metrics: LlmMetrics {
                input_tokens: resp.usage.input_tokens.unwrap_or(0),
                output_tokens: resp.usage.output_tokens.unwrap_or(0),
                elapsed_ms: start.elapsed().as_millis() as u64,
            },
        })
    }
}
