//! Core domain types and error definitions for mathviz.
//!
//! This crate provides the fundamental types shared across the engine:
//!
//! - [`EngineError`] - Error type for every pipeline stage
//! - [`Beat`], [`Visual`], [`Plan`] - The flat beat list a video is rendered from
//! - [`Outline`] and [`Chapter`] - Phase-one planner output
//! - [`BeatType`] - The fixed catalogue of visual kinds
//! - [`validator`] - Deterministic schema and LaTeX checks, zero LLM cost
//!
//! # Example
//!
//! ```rust
//! use mathviz_core::{Beat, BeatType, Visual};
//! use mathviz_core::validator::validate_beat;
//!
//! let beat = Beat::new(
//!     "intro_1",
//!     "What happens when a matrix only stretches a vector?",
//!     Visual::new(BeatType::TextCard).with("text", "Stretch, don't rotate"),
//! );
//!
//! assert!(validate_beat(&beat).is_empty());
//! ```

mod beat;
pub mod validator;

pub use beat::{Beat, BeatType, Chapter, Outline, Plan, Visual};

use thiserror::Error;

/// Errors that can occur while planning, narrating, rendering or publishing a video.
#[derive(Error, Debug)]
pub enum EngineError {
    /// LLM API request failed.
    #[error("LLM request failed: {0}")]
    Llm(String),

    /// Failed to parse structured output (LLM JSON, plan files, API bodies).
    #[error("Failed to parse structured output: {0}")]
    Parse(String),

    /// Beat or outline schema validation failed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Text-to-speech synthesis failed.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Manim scene build or render failed.
    #[error("Render failed: {0}")]
    Render(String),

    /// FFmpeg merge/concat/encode failed.
    #[error("Compose failed: {0}")]
    Compose(String),

    /// Object storage upload failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem operation failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Creates an IO error with path context.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(err.to_string())
    }
}
