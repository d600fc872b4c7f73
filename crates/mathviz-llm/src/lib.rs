//! LLM client abstractions for the Anthropic and OpenAI APIs.
//!
//! The planner talks to a single trait, [`LlmBackend`], so providers are
//! interchangeable and tests can script responses:
//!
//! - [`UnifiedLlmClient`] - Recommended: picks the provider from settings
//! - [`OpenAiClient`] - OpenAI chat completions in JSON-object mode
//! - [`AnthropicClient`] - Claude models via the Messages API
//! - [`pricing`] - Per-model token prices and cost estimates
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use mathviz_llm::{CompletionRequest, LlmBackend, UnifiedLlmClient};
//!
//! let client = UnifiedLlmClient::new("claude", "claude-opus-4-6", &api_key)?;
//! let request = CompletionRequest::new("You are a planner.", "Outline eigenvalues.")
//!     .max_tokens(600)
//!     .temperature(0.6)
//!     .label("outline");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! ```

mod anthropic;
mod client;
pub mod pricing;
mod unified;

pub use anthropic::AnthropicClient;
pub use client::{CompletionRequest, LlmBackend, LlmMetrics, LlmResponse, OpenAiClient};
pub use unified::UnifiedLlmClient;
