//! Provider-neutral request/response types and the OpenAI chat client.
//!
//! The OpenAI client always asks for `json_object` output: every planner call
//! expects raw JSON back.

use std::time::Instant;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use mathviz_core::EngineError;
use tracing::debug;

/// Token usage and timing metrics from an LLM call.
#[derive(Debug, Clone, Default)]
pub struct LlmMetrics {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub elapsed_ms: u64,
}

/// Complete response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub metrics: LlmMetrics,
}

/// A single system + user completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Short tag used in cost logs (e.g. `outline`, `chapter:intro`).
    pub label: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 1024,
            temperature: 0.7,
            label: "llm".into(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Anything that can answer a completion request.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Sends the request and returns the full text response.
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, EngineError>;

    /// Provider name for logs and health output.
    fn provider(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;
}

/// Converts any error into an EngineError::Llm.
pub(crate) fn llm_err(e: impl ToString) -> EngineError {
    EngineError::Llm(e.to_string())
}

/// Builds the message list for a simple system + user request.
fn build_messages(
    system_prompt: &str,
    user_input: &str,
) -> Result<Vec<ChatCompletionRequestMessage>, EngineError> {
    Ok(vec![
        ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(llm_err)?,
        ),
        ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()
                .map_err(llm_err)?,
        ),
    ])
}

/// Extracts content and metrics from a completion response.
fn extract_response(
    response: CreateChatCompletionResponse,
    elapsed_ms: u64,
) -> Result<LlmResponse, EngineError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| EngineError::Llm("No response content".into()))?;

    let (input_tokens, output_tokens) = response
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));

    Ok(LlmResponse {
        content,
        metrics: LlmMetrics {
            input_tokens,
            output_tokens,
            elapsed_ms,
        },
    })
}

/// Client for OpenAI chat completions.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    /// Creates a client for the given model and key.
    pub fn new(model: &str, api_key: &str) -> Self {
        Self::with_config(model, OpenAIConfig::new().with_api_key(api_key))
    }

    /// Creates a client against a custom API base (proxies, test servers).
    pub fn with_api_base(model: &str, api_key: &str, api_base: &str) -> Self {
        Self::with_config(
            model,
            OpenAIConfig::new().with_api_key(api_key).with_api_base(api_base),
        )
    }

    fn with_config(model: &str, config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a JSON-mode chat request and returns the complete response.
    pub async fn chat(&self, request: &CompletionRequest) -> Result<LlmResponse, EngineError> {
        let start = Instant::now();
        let messages = build_messages(&request.system, &request.user)?;

        let body = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(request.max_tokens)
            .temperature(request.temperature)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(llm_err)?;

        debug!("OpenAI request: model={}, label={}", self.model, request.label);
        let response = self.client.chat().create(body).await.map_err(llm_err)?;
        extract_response(response, start.elapsed().as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn request_builder_sets_fields() {
        let req = CompletionRequest::new("sys", "user")
            .max_tokens(600)
            .temperature(0.6)
            .label("outline");
        assert_eq!(req.max_tokens, 600);
        assert_eq!(req.temperature, 0.6);
        assert_eq!(req.label, "outline");
    }

    #[tokio::test]
    async fn openai_chat_requests_json_mode() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-test")
                .body_contains("\"json_object\"")
                .body_contains("\"gpt-4o\"");
            then.status(200).json_body(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "{\"title\": \"T\"}"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
            }));
        });

        let client = OpenAiClient::with_api_base("gpt-4o", "sk-test", &server.base_url());
        let response = client
            .chat(&CompletionRequest::new("Return JSON.", "Outline"))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(response.content, "{\"title\": \"T\"}");
        assert_eq!(response.metrics.input_tokens, 12);
        assert_eq!(response.metrics.output_tokens, 5);
    }

    #[tokio::test]
    async fn openai_error_status_is_an_llm_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401).json_body(json!({
                "error": {"message": "bad key", "type": "invalid_request_error", "param": null, "code": "invalid_api_key"}
            }));
        });

        let client = OpenAiClient::with_api_base("gpt-4o", "sk-bad", &server.base_url());
        let err = client
            .chat(&CompletionRequest::new("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Llm(_)));
    }
}
