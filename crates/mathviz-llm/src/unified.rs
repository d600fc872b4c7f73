//! Unified LLM client that routes to the configured provider.

use async_trait::async_trait;
use mathviz_core::EngineError;
use tracing::info;

use crate::anthropic::AnthropicClient;
use crate::client::OpenAiClient;
use crate::pricing::estimate_cost;
use crate::{CompletionRequest, LlmBackend, LlmResponse};

/// Provider-specific client behind the unified facade.
enum Provider {
    Anthropic(AnthropicClient),
    OpenAi(OpenAiClient),
}

/// Unified client that routes requests to Anthropic or OpenAI by provider name.
pub struct UnifiedLlmClient {
    provider_name: String,
    model: String,
    provider: Provider,
}

impl UnifiedLlmClient {
    /// Creates a client for `provider` (`claude` or `openai`).
    ///
    /// Fails when the key is empty or the provider is unknown.
    pub fn new(provider: &str, model: &str, api_key: &str) -> Result<Self, EngineError> {
        if api_key.is_empty() {
            return Err(EngineError::Config(format!(
                "LLM_API_KEY is not set (provider '{}')",
                provider
            )));
        }

        let inner = match provider.to_lowercase().as_str() {
            "claude" | "anthropic" => Provider::Anthropic(AnthropicClient::new(model, api_key)),
            "openai" => Provider::OpenAi(OpenAiClient::new(model, api_key)),
            other => {
                return Err(EngineError::Config(format!(
                    "Unknown LLM provider '{}'. Supported: claude, openai",
                    other
                )))
            }
        };

        Ok(Self {
            provider_name: provider.to_string(),
            model: model.to_string(),
            provider: inner,
        })
    }

    /// Returns true if this client is configured for Anthropic.
    pub fn is_anthropic(&self) -> bool {
        matches!(self.provider, Provider::Anthropic(_))
    }
}

#[async_trait]
impl LlmBackend for UnifiedLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, EngineError> {
        let response = match &self.provider {
            Provider::Anthropic(client) => client.chat(request).await?,
            Provider::OpenAi(client) => client.chat(request).await?,
        };

        let m = &response.metrics;
        info!(
            "LLM [{}] {}: {}ms, tokens: {}/{} (in/out), est. ${:.4}",
            request.label,
            self.model,
            m.elapsed_ms,
            m.input_tokens,
            m.output_tokens,
            estimate_cost(&self.model, m.input_tokens, m.output_tokens)
        );

        Ok(response)
    }

    fn provider(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }
}
